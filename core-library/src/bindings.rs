//! Consumer bindings
//!
//! Presentation code observes the store either through a raw listener
//! ([`LibraryStore::subscribe`]) or through slice bindings that only fire when
//! the selected slice actually changed. Track slices compare by slot identity;
//! status compares by value.
//!
//! Slice bindings deliver the current value once on registration, then on
//! every change. Snapshots older than the last one a binding has seen are
//! ignored, so a binding never moves backwards when two transitions notify
//! from different threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::models::{same_slots, Artist, Playlist, Track};
use crate::store::{LibrarySnapshot, LibraryStatus, LibraryStore};

type Listener = Arc<dyn Fn(&LibrarySnapshot) + Send + Sync>;

/// Registered listeners, keyed by a registration id.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn register(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(registered, _)| *registered != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Invokes every listener with `snapshot`.
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may subscribe, unsubscribe or mutate the store.
    pub(crate) fn notify(&self, snapshot: &LibrarySnapshot) {
        let listeners: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Unregisters the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Last slice a binding delivered, with the snapshot version it came from.
struct SliceState<T> {
    version: u64,
    value: T,
}

struct SliceBinding<T, S, E, F> {
    select: S,
    same: E,
    callback: F,
    last: Mutex<Option<SliceState<T>>>,
}

impl<T, S, E, F> SliceBinding<T, S, E, F>
where
    S: Fn(&LibrarySnapshot) -> T,
    E: Fn(&T, &T) -> bool,
    F: Fn(&T),
{
    fn offer(&self, snapshot: &LibrarySnapshot) {
        let next = (self.select)(snapshot);
        {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = last.as_mut() {
                if snapshot.version <= previous.version {
                    return;
                }
                previous.version = snapshot.version;
                if (self.same)(&previous.value, &next) {
                    return;
                }
            }
        }

        // Callback runs unlocked; it may mutate the store and re-enter.
        (self.callback)(&next);

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match last.as_ref() {
            Some(previous) if previous.version > snapshot.version => {}
            _ => {
                *last = Some(SliceState {
                    version: snapshot.version,
                    value: next,
                })
            }
        }
    }
}

impl LibraryStore {
    /// Binds a derived slice of the state.
    ///
    /// `select` computes the slice from a snapshot, `same` decides whether two
    /// slices are equivalent, and `callback` receives each new slice.
    pub fn bind_slice<T, S, E, F>(&self, select: S, same: E, callback: F) -> Subscription
    where
        T: Send + 'static,
        S: Fn(&LibrarySnapshot) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let binding = Arc::new(SliceBinding {
            select,
            same,
            callback,
            last: Mutex::new(None),
        });

        let listener = Arc::clone(&binding);
        let subscription = self.subscribe(move |snapshot| listener.offer(snapshot));
        binding.offer(&self.snapshot());
        subscription
    }

    /// Fires when the collection changes.
    pub fn bind_tracks<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Arc<Track>]) + Send + Sync + 'static,
    {
        self.bind_slice(
            |snapshot| Arc::clone(&snapshot.tracks),
            |a: &Arc<Vec<Arc<Track>>>, b: &Arc<Vec<Arc<Track>>>| {
                Arc::ptr_eq(a, b) || same_slots(a, b)
            },
            move |tracks: &Arc<Vec<Arc<Track>>>| callback(tracks),
        )
    }

    /// Fires when the set of favorited slots changes.
    pub fn bind_favorites<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Arc<Track>]) + Send + Sync + 'static,
    {
        self.bind_slice(
            |snapshot| snapshot.favorites(),
            |a: &Vec<Arc<Track>>, b: &Vec<Arc<Track>>| same_slots(a, b),
            move |favorites: &Vec<Arc<Track>>| callback(favorites),
        )
    }

    /// Fires when the artist grouping changes.
    pub fn bind_artists<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Artist]) + Send + Sync + 'static,
    {
        self.bind_slice(
            |snapshot| snapshot.artists(),
            |a: &Vec<Artist>, b: &Vec<Artist>| {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.name == y.name && same_slots(&x.tracks, &y.tracks))
            },
            move |artists: &Vec<Artist>| callback(artists),
        )
    }

    /// Fires when the playlist grouping changes.
    pub fn bind_playlists<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Playlist]) + Send + Sync + 'static,
    {
        let placeholder = self.placeholder_artwork().to_string();
        self.bind_slice(
            move |snapshot| snapshot.playlists(&placeholder),
            |a: &Vec<Playlist>, b: &Vec<Playlist>| {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| {
                        x.name == y.name
                            && x.artwork_preview == y.artwork_preview
                            && same_slots(&x.tracks, &y.tracks)
                    })
            },
            move |playlists: &Vec<Playlist>| callback(playlists),
        )
    }

    /// Fires when `is_loading` or `error` changes.
    pub fn bind_status<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LibraryStatus) + Send + Sync + 'static,
    {
        self.bind_slice(
            |snapshot: &LibrarySnapshot| LibraryStatus::from(snapshot),
            |a: &LibraryStatus, b: &LibraryStatus| a == b,
            callback,
        )
    }
}
