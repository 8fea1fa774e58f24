//! In-memory listing store.
//!
//! Holds every listing for the lifetime of the process. Ids come from a
//! monotonic counter that is advanced under the same write lock as the
//! insert, so concurrent creates never share an id.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use types::ids::ListingId;
use types::listing::{Listing, NewListing};

/// First id handed out by `create` on a fresh store.
pub const FIRST_LISTING_ID: u64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("listing {0} already exists")]
    DuplicateId(ListingId),
}

struct Inner {
    records: BTreeMap<ListingId, Listing>,
    /// Strictly greater than every key in `records`.
    next_id: u64,
}

pub struct ListingStore {
    inner: RwLock<Inner>,
}

impl ListingStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: BTreeMap::new(),
                next_id: FIRST_LISTING_ID,
            }),
        }
    }

    /// Assign the next id and store the finalized record.
    pub fn create(&self, candidate: NewListing) -> Listing {
        let mut inner = self.write();
        let id = ListingId::new(inner.next_id);
        inner.next_id += 1;

        let listing = candidate.into_listing(id);
        if inner.records.insert(id, listing.clone()).is_some() {
            tracing::error!(
                listing_id = %id,
                "Invariant violation: create replaced an existing listing; id counter is out of sync"
            );
        }
        listing
    }

    /// Bootstrap insert with a caller-chosen id.
    ///
    /// Only meant for startup seeding. The counter is raised past the seeded
    /// id so later creates never collide with it.
    pub fn seed(&self, listing: Listing) -> Result<(), StoreError> {
        let mut inner = self.write();
        let id = listing.id;
        if inner.records.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        inner.next_id = inner.next_id.max(id.value() + 1);
        inner.records.insert(id, listing);
        Ok(())
    }

    /// Owned snapshot of every listing, in ascending id order.
    pub fn list_all(&self) -> Vec<Listing> {
        self.read().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Critical sections never leave `Inner` half-updated, so a poisoned lock
    // still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ListingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn candidate(title: &str) -> NewListing {
        NewListing {
            title: title.to_string(),
            description: "desc".to_string(),
            price: Decimal::from(100),
            image_url: "http://img/1.png".to_string(),
        }
    }

    #[test]
    fn test_sequential_ids() {
        let store = ListingStore::new();
        let a = store.create(candidate("a"));
        let b = store.create(candidate("b"));

        assert_eq!(a.id, ListingId::new(1));
        assert_eq!(b.id, ListingId::new(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_all_is_ordered_snapshot() {
        let store = ListingStore::new();
        store.create(candidate("a"));
        store.create(candidate("b"));

        let snapshot = store.list_all();
        store.create(candidate("c"));

        let titles: Vec<_> = snapshot.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(store.list_all().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_unique_ids() {
        let store = Arc::new(ListingStore::new());
        let mut handles = Vec::new();

        for i in 0..200 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(candidate(&format!("listing-{i}"))).id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }

        let expected: HashSet<_> = (1..=200).map(ListingId::new).collect();
        assert_eq!(ids, expected);
        assert_eq!(store.len(), 200);
    }

    #[test]
    fn test_snapshot_never_sees_partial_records() {
        let store = Arc::new(ListingStore::new());
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    store.create(candidate(&format!("t{i}")));
                }
            })
        };

        let mut last_len = 0;
        while !writer.is_finished() {
            let snapshot = store.list_all();
            assert!(snapshot.len() >= last_len);
            for (pos, listing) in snapshot.iter().enumerate() {
                assert_eq!(listing.id, ListingId::new(pos as u64 + 1));
                assert_eq!(listing.title, format!("t{pos}"));
            }
            last_len = snapshot.len();
        }
        writer.join().unwrap();
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn test_seed_advances_counter() {
        let store = ListingStore::new();
        store
            .seed(candidate("seeded").into_listing(ListingId::new(0)))
            .unwrap();

        // Seeding id 0 leaves the counter at its starting point.
        assert_eq!(store.create(candidate("a")).id, ListingId::new(1));

        store
            .seed(candidate("far").into_listing(ListingId::new(10)))
            .unwrap();
        assert_eq!(store.create(candidate("b")).id, ListingId::new(11));

        let ids: Vec<_> = store.list_all().iter().map(|l| l.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 10, 11]);
    }

    #[test]
    fn test_seed_rejects_duplicate_id() {
        let store = ListingStore::new();
        let created = store.create(candidate("a"));

        let err = store
            .seed(candidate("dup").into_listing(created.id))
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(created.id));
        assert_eq!(store.list_all()[0].title, "a");
    }
}
