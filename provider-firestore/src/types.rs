//! Firestore REST wire types
//!
//! Data structures for (de)serializing Firestore v1 documents, list/query
//! responses and Firebase Storage object metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A Firestore typed value.
///
/// Encoded externally tagged, e.g. `{"stringValue": "Oceans"}`. Integers
/// travel as decimal strings.
///
/// See: https://firebase.google.com/docs/firestore/reference/rest/v1/Value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::StringValue(value.into())
    }

    pub fn integer(value: i64) -> Self {
        Value::IntegerValue(value.to_string())
    }

    pub fn double(value: f64) -> Self {
        Value::DoubleValue(value)
    }

    pub fn timestamp(rfc3339: impl Into<String>) -> Self {
        Value::TimestampValue(rfc3339.into())
    }

    pub fn string_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::ArrayValue(ArrayValue {
            values: values.into_iter().map(|v| Value::StringValue(v.into())).collect(),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view accepting both integer and whole double encodings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::IntegerValue(raw) => raw.parse().ok(),
            Value::DoubleValue(d) if d.is_finite() && d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    /// Floating view accepting both double and integer encodings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::DoubleValue(d) => Some(*d),
            Value::IntegerValue(raw) => raw.parse::<i64>().ok().map(|i| i as f64),
            _ => None,
        }
    }

    /// String elements of an array value; non-string elements are skipped.
    pub fn as_string_array(&self) -> Option<Vec<String>> {
        match self {
            Value::ArrayValue(array) => Some(
                array
                    .values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Firestore document resource
///
/// See: https://firebase.google.com/docs/firestore/reference/rest/v1/projects.databases.documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name (`projects/.../documents/{collection}/{id}`)
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub fields: HashMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Document id, the last segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Write body for create and patch requests
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentFields {
    pub fields: HashMap<String, Value>,
}

/// Response of `documents.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,

    pub next_page_token: Option<String>,
}

/// Body of `documents:runQuery`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where")]
    pub filter: QueryFilter,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub field_filter: FieldFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: &'static str,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

impl RunQueryRequest {
    /// `SELECT * FROM {collection} WHERE {field} == {value} LIMIT {limit}`
    pub fn field_equals(collection: &str, field: &str, value: Value, limit: u32) -> Self {
        Self {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection.to_string(),
                }],
                filter: QueryFilter {
                    field_filter: FieldFilter {
                        field: FieldReference {
                            field_path: field.to_string(),
                        },
                        op: "EQUAL",
                        value,
                    },
                },
                limit,
            },
        }
    }
}

/// One element of the `runQuery` response stream.
///
/// Elements without a document only carry progress information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponseItem {
    pub document: Option<Document>,
    pub read_time: Option<String>,
}

/// Google API error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorStatus {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

/// Firebase Storage object metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    pub name: Option<String>,
    pub bucket: Option<String>,
    pub content_type: Option<String>,
    /// Comma-separated download tokens
    pub download_tokens: Option<String>,
}

impl StorageObject {
    pub fn first_download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
    }
}
