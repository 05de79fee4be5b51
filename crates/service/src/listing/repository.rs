use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Listing, ListingDetails};
use crate::errors::ServiceError;

/// Repository abstraction for listing persistence.
///
/// Deletes run inside a unit of work (`Tx`) that the review collection joins,
/// so the row and its reviews are removed together or not at all.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    type Tx: Send + Sync + 'static;

    async fn list(&self) -> Result<Vec<Listing>, ServiceError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, ServiceError>;
    /// Listing with owner, reviews and review authors resolved.
    async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>, ServiceError>;
    async fn insert(&self, listing: Listing) -> Result<Listing, ServiceError>;
    /// Persist scalar fields and the image; owner and review refs stay as stored.
    async fn save(&self, listing: Listing) -> Result<Listing, ServiceError>;
    async fn begin(&self) -> Result<Self::Tx, ServiceError>;
    /// Remove the row within `tx`, returning what was deleted.
    async fn delete_by_id(&self, tx: &Self::Tx, id: Uuid) -> Result<Option<Listing>, ServiceError>;
    /// Make every change staged in `tx` visible. Dropping `tx` discards them.
    async fn commit(&self, tx: Self::Tx) -> Result<(), ServiceError>;
}

/// Referential store of reviews owned by listings.
#[async_trait]
pub trait ReviewCollection<Tx: Send + Sync>: Send + Sync {
    /// Delete every review in `ids` within `tx`; an empty slice is a no-op returning 0.
    async fn delete_many(&self, tx: &Tx, ids: &[Uuid]) -> Result<u64, ServiceError>;
}

/// In-memory repositories for tests and doc examples.
///
/// Every call lands in a shared [`mock::Journal`] so tests can assert on
/// ordering across stores.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::listing::domain::{ReviewView, UserSummary};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Insert(Uuid),
        Save(Uuid),
        DeleteListing(Uuid),
        DeleteReviews(Vec<Uuid>),
        Upload(String),
        Destroy(String),
    }

    #[derive(Debug, Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<Call>>>);

    impl Journal {
        pub fn record(&self, call: Call) { self.0.lock().unwrap().push(call); }
        pub fn calls(&self) -> Vec<Call> { self.0.lock().unwrap().clone() }
        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
        }
        pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
            self.0.lock().unwrap().iter().position(|c| pred(c))
        }
    }

    type ReviewMap = Arc<Mutex<HashMap<Uuid, ReviewView>>>;

    /// Deletes staged by one unit of work; applied on commit.
    #[derive(Debug, Default)]
    pub struct MockTx {
        listings: Mutex<Vec<Uuid>>,
        reviews: Mutex<Vec<Uuid>>,
    }

    #[derive(Default)]
    pub struct MockListingRepository {
        listings: Mutex<HashMap<Uuid, Listing>>,
        users: Mutex<HashMap<Uuid, UserSummary>>,
        reviews: ReviewMap,
        journal: Journal,
        pub fail_save: AtomicBool,
        pub fail_delete: AtomicBool,
    }

    #[derive(Default)]
    pub struct MockReviewCollection {
        reviews: ReviewMap,
        journal: Journal,
        pub fail_delete: AtomicBool,
    }

    /// Build a listing repository and review collection sharing one review table.
    pub fn backend(journal: Journal) -> (MockListingRepository, MockReviewCollection) {
        let reviews: ReviewMap = Arc::default();
        let repo = MockListingRepository { reviews: Arc::clone(&reviews), journal: journal.clone(), ..Default::default() };
        let coll = MockReviewCollection { reviews, journal, ..Default::default() };
        (repo, coll)
    }

    impl MockListingRepository {
        /// Seed a listing directly, bypassing the journal.
        pub fn seed(&self, listing: Listing) { self.listings.lock().unwrap().insert(listing.id, listing); }

        pub fn seed_user(&self, user: UserSummary) { self.users.lock().unwrap().insert(user.id, user); }

        /// Seed a review and link it to `listing_id`.
        pub fn seed_review(&self, listing_id: Uuid, review: ReviewView) {
            if let Some(l) = self.listings.lock().unwrap().get_mut(&listing_id) {
                if !l.reviews.contains(&review.id) { l.reviews.push(review.id); }
            }
            self.reviews.lock().unwrap().insert(review.id, review);
        }

        pub fn get(&self, id: Uuid) -> Option<Listing> { self.listings.lock().unwrap().get(&id).cloned() }

        pub fn len(&self) -> usize { self.listings.lock().unwrap().len() }

        pub fn is_empty(&self) -> bool { self.len() == 0 }
    }

    impl MockReviewCollection {
        pub fn contains(&self, id: Uuid) -> bool { self.reviews.lock().unwrap().contains_key(&id) }
    }

    #[async_trait]
    impl ListingRepository for MockListingRepository {
        type Tx = MockTx;

        async fn list(&self) -> Result<Vec<Listing>, ServiceError> {
            Ok(self.listings.lock().unwrap().values().cloned().collect())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, ServiceError> {
            Ok(self.get(id))
        }

        async fn find_details(&self, id: Uuid) -> Result<Option<ListingDetails>, ServiceError> {
            let Some(listing) = self.get(id) else { return Ok(None) };
            let users = self.users.lock().unwrap();
            let reviews = self.reviews.lock().unwrap();
            let resolved = listing
                .reviews
                .iter()
                .filter_map(|rid| reviews.get(rid).cloned())
                .map(|mut r| {
                    if let Some(a) = r.author.as_ref().and_then(|a| users.get(&a.id)) { r.author = Some(a.clone()); }
                    r
                })
                .collect();
            Ok(Some(ListingDetails { owner: users.get(&listing.owner_id).cloned(), reviews: resolved, listing }))
        }

        async fn insert(&self, listing: Listing) -> Result<Listing, ServiceError> {
            listing.validate()?;
            self.journal.record(Call::Insert(listing.id));
            self.listings.lock().unwrap().insert(listing.id, listing.clone());
            Ok(listing)
        }

        async fn save(&self, listing: Listing) -> Result<Listing, ServiceError> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(ServiceError::Storage("save failed".into()));
            }
            listing.validate()?;
            self.journal.record(Call::Save(listing.id));
            let mut map = self.listings.lock().unwrap();
            let stored = map.get_mut(&listing.id).ok_or_else(|| ServiceError::not_found("listing"))?;
            let reviews = std::mem::take(&mut stored.reviews);
            let owner_id = stored.owner_id;
            *stored = Listing { owner_id, reviews, ..listing };
            Ok(stored.clone())
        }

        async fn begin(&self) -> Result<MockTx, ServiceError> { Ok(MockTx::default()) }

        async fn delete_by_id(&self, tx: &MockTx, id: Uuid) -> Result<Option<Listing>, ServiceError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ServiceError::Storage("delete failed".into()));
            }
            self.journal.record(Call::DeleteListing(id));
            let found = self.get(id);
            if found.is_some() {
                tx.listings.lock().unwrap().push(id);
            }
            Ok(found)
        }

        async fn commit(&self, tx: MockTx) -> Result<(), ServiceError> {
            let mut listings = self.listings.lock().unwrap();
            for id in tx.listings.into_inner().unwrap() {
                listings.remove(&id);
            }
            let mut reviews = self.reviews.lock().unwrap();
            for id in tx.reviews.into_inner().unwrap() {
                reviews.remove(&id);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReviewCollection<MockTx> for MockReviewCollection {
        async fn delete_many(&self, tx: &MockTx, ids: &[Uuid]) -> Result<u64, ServiceError> {
            self.journal.record(Call::DeleteReviews(ids.to_vec()));
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ServiceError::Storage("review delete failed".into()));
            }
            let reviews = self.reviews.lock().unwrap();
            let present: Vec<Uuid> = ids.iter().copied().filter(|id| reviews.contains_key(id)).collect();
            let count = present.len() as u64;
            tx.reviews.lock().unwrap().extend(present);
            Ok(count)
        }
    }
}
