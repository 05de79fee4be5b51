use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::domain::{CreateListingInput, EditForm, ImageRef, Listing, ListingDetails, UpdateListingInput};
use super::repository::{ListingRepository, ReviewCollection};
use crate::asset::AssetStore;
use crate::errors::ServiceError;

/// Listing lifecycle: keeps the record, its image asset and its reviews in step.
///
/// Each operation runs its store calls sequentially. Existence checks and the
/// image read always happen before anything destructive reaches the asset
/// store or the review collection.
pub struct ListingService<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>> {
    repo: Arc<R>,
    assets: Arc<A>,
    reviews: Arc<C>,
}

impl<R: ListingRepository, A: AssetStore, C: ReviewCollection<R::Tx>> ListingService<R, A, C> {
    pub fn new(repo: Arc<R>, assets: Arc<A>, reviews: Arc<C>) -> Self { Self { repo, assets, reviews } }

    pub async fn list(&self) -> Result<Vec<Listing>, ServiceError> {
        self.repo.list().await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ListingDetails, ServiceError> {
        self.repo.find_details(id).await?.ok_or_else(|| ServiceError::not_found("listing"))
    }

    /// Load a listing for editing together with a small preview of its image.
    #[instrument(skip(self))]
    pub async fn edit_form(&self, id: Uuid) -> Result<EditForm, ServiceError> {
        let listing = self.load(id).await?;
        let preview_url = listing.image.thumbnail_url();
        Ok(EditForm { listing, preview_url })
    }

    /// Create a listing owned by `input.owner_id`, uploading the image first if one was sent.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::ListingService;
    /// use service::asset::mock::MockAssetStore;
    /// use service::listing::domain::{CreateListingInput, ListingFields};
    /// use service::listing::repository::mock::{backend, Journal};
    /// let journal = Journal::default();
    /// let (repo, reviews) = backend(journal.clone());
    /// let svc = ListingService::new(Arc::new(repo), Arc::new(MockAssetStore::new(journal)), Arc::new(reviews));
    /// let owner = uuid::Uuid::new_v4();
    /// let fields = ListingFields { title: "Cabin".into(), description: None, price: 120.0, location: None, country: None };
    /// let created = tokio_test::block_on(svc.create(CreateListingInput { fields, owner_id: owner, file: None })).unwrap();
    /// assert_eq!(created.owner_id, owner);
    /// assert_eq!(created.image.filename, "listingimage");
    /// ```
    #[instrument(skip(self, input), fields(owner_id = %input.owner_id, has_file = input.file.is_some()))]
    pub async fn create(&self, input: CreateListingInput) -> Result<Listing, ServiceError> {
        let mut listing = Listing::new(input.fields, input.owner_id);
        listing.validate()?;

        if let Some(file) = input.file {
            listing.image = self.assets.upload(file).await?.into();
        }

        let created = self.repo.insert(listing).await?;
        info!(listing_id = %created.id, image = %created.image.filename, "listing_created");
        Ok(created)
    }

    /// Apply a partial update and optionally replace the image.
    ///
    /// The new image is uploaded before the record is saved and the old one is
    /// destroyed only after the save succeeds, so a failure never loses the
    /// image the record points at.
    #[instrument(skip(self, input), fields(listing_id = %input.id, has_file = input.file.is_some()))]
    pub async fn update(&self, input: UpdateListingInput) -> Result<Listing, ServiceError> {
        let mut listing = self.load(input.id).await?;
        let old_image = listing.image.clone();

        listing.apply(&input.patch);
        listing.validate()?;

        let mut new_image: Option<ImageRef> = None;
        if let Some(file) = input.file {
            let uploaded: ImageRef = self.assets.upload(file).await?.into();
            listing.image = uploaded.clone();
            new_image = Some(uploaded);
        }

        let saved = match self.repo.save(listing).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Some(img) = new_image {
                    self.discard_asset(&img, "rollback_new_image").await;
                }
                return Err(e);
            }
        };

        if new_image.is_some() && old_image.filename != saved.image.filename {
            self.discard_asset(&old_image, "replace_old_image").await;
        }

        info!(listing_id = %saved.id, image = %saved.image.filename, "listing_updated");
        Ok(saved)
    }

    /// Delete a listing, its uploaded image and every review it references.
    /// Returns the id of the removed listing.
    ///
    /// The row delete and the review cascade share one transaction: if the
    /// cascade fails the listing stays, so a retry can finish the job.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Uuid, ServiceError> {
        let listing = self.load(id).await?;

        self.discard_asset(&listing.image, "delete_listing").await;

        let tx = self.repo.begin().await?;
        let deleted = self.repo.delete_by_id(&tx, id).await?.ok_or_else(|| ServiceError::not_found("listing"))?;

        if deleted.reviews.is_empty() {
            debug!(listing_id = %id, "no reviews to cascade");
        } else {
            let removed = self.reviews.delete_many(&tx, &deleted.reviews).await.map_err(|e| {
                error!(listing_id = %id, reviews = deleted.reviews.len(), error = %e, "review_cascade_failed");
                e
            })?;
            debug!(listing_id = %id, removed, "reviews_cascaded");
        }

        self.repo.commit(tx).await?;
        info!(listing_id = %id, "listing_deleted");
        Ok(id)
    }

    async fn load(&self, id: Uuid) -> Result<Listing, ServiceError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| ServiceError::not_found("listing"))
    }

    /// Destroy an uploaded image; placeholders are skipped and failures only logged.
    async fn discard_asset(&self, image: &ImageRef, reason: &'static str) {
        if !image.is_uploaded() {
            return;
        }
        if let Err(e) = self.assets.destroy(&image.filename).await {
            warn!(filename = %image.filename, reason, error = %e, "asset_destroy_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::asset::mock::MockAssetStore;
    use crate::asset::UploadedFile;
    use crate::listing::domain::{ListingFields, ListingPatch, ReviewView, UserSummary};
    use crate::listing::repository::mock::{backend, Call, Journal, MockListingRepository, MockReviewCollection};

    struct Fixture {
        svc: ListingService<MockListingRepository, MockAssetStore, MockReviewCollection>,
        repo: Arc<MockListingRepository>,
        assets: Arc<MockAssetStore>,
        reviews: Arc<MockReviewCollection>,
        journal: Journal,
    }

    fn fixture() -> Fixture {
        let journal = Journal::default();
        let (repo, reviews) = backend(journal.clone());
        let repo = Arc::new(repo);
        let reviews = Arc::new(reviews);
        let assets = Arc::new(MockAssetStore::new(journal.clone()));
        let svc = ListingService::new(Arc::clone(&repo), Arc::clone(&assets), Arc::clone(&reviews));
        Fixture { svc, repo, assets, reviews, journal }
    }

    fn cabin() -> ListingFields {
        ListingFields { title: "Cabin".into(), description: None, price: 120.0, location: None, country: None }
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile { original_name: name.into(), content_type: Some("image/jpeg".into()), bytes: vec![0xff, 0xd8, 0xff] }
    }

    fn seeded(f: &Fixture, filename: &str) -> Listing {
        let mut l = Listing::new(cabin(), Uuid::new_v4());
        if filename != models::listing::DEFAULT_IMAGE_FILENAME {
            l.image = ImageRef { filename: filename.into(), url: format!("https://res.cloudinary.com/x/image/upload/{filename}.jpg") };
            f.assets.seed(filename);
        }
        f.repo.seed(l.clone());
        l
    }

    fn review(author: Uuid) -> ReviewView {
        ReviewView { id: Uuid::new_v4(), comment: "nice".into(), rating: 4, author: Some(UserSummary { id: author, username: "a".into(), email: "a@x.io".into() }) }
    }

    fn destroys(j: &Journal) -> usize { j.count(|c| matches!(c, Call::Destroy(_))) }
    fn review_deletes(j: &Journal) -> usize { j.count(|c| matches!(c, Call::DeleteReviews(_))) }

    #[tokio::test]
    async fn create_without_file_uses_placeholder_and_session_owner() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let created = f.svc.create(CreateListingInput { fields: cabin(), owner_id: owner, file: None }).await.unwrap();
        assert_eq!(created.title, "Cabin");
        assert_eq!(created.price, 120.0);
        assert_eq!(created.owner_id, owner);
        assert_eq!(created.image, ImageRef::default());
        assert!(created.reviews.is_empty());
        assert_eq!(f.journal.calls(), vec![Call::Insert(created.id)]);
    }

    #[tokio::test]
    async fn create_uploads_before_insert() {
        let f = fixture();
        let created = f.svc.create(CreateListingInput { fields: cabin(), owner_id: Uuid::new_v4(), file: Some(file("a.jpg")) }).await.unwrap();
        assert!(created.image.is_uploaded());
        assert!(f.assets.contains(&created.image.filename));
        assert_eq!(f.journal.calls(), vec![Call::Upload("a.jpg".into()), Call::Insert(created.id)]);
    }

    #[tokio::test]
    async fn create_upload_failure_persists_nothing() {
        let f = fixture();
        f.assets.fail_upload.store(true, Ordering::SeqCst);
        let err = f.svc.create(CreateListingInput { fields: cabin(), owner_id: Uuid::new_v4(), file: Some(file("a.jpg")) }).await.unwrap_err();
        assert!(matches!(err, ServiceError::AssetStore(_)));
        assert!(f.repo.is_empty());
    }

    #[tokio::test]
    async fn create_validation_failure_skips_upload() {
        let f = fixture();
        let mut fields = cabin();
        fields.price = -5.0;
        let err = f.svc.create(CreateListingInput { fields, owner_id: Uuid::new_v4(), file: Some(file("a.jpg")) }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(f.journal.calls().is_empty());
    }

    #[tokio::test]
    async fn get_resolves_owner_and_review_authors() {
        let f = fixture();
        let l = seeded(&f, "listingimage");
        f.repo.seed_user(UserSummary { id: l.owner_id, username: "host".into(), email: "host@x.io".into() });
        let r = review(Uuid::new_v4());
        f.repo.seed_review(l.id, r.clone());

        let details = f.svc.get(l.id).await.unwrap();
        assert_eq!(details.owner.unwrap().username, "host");
        assert_eq!(details.reviews, vec![r]);
    }

    #[tokio::test]
    async fn get_missing_is_not_found_without_mutation() {
        let f = fixture();
        let err = f.svc.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.journal.calls().is_empty());
    }

    #[tokio::test]
    async fn edit_form_previews_thumbnail() {
        let f = fixture();
        let l = seeded(&f, "img123");
        let form = f.svc.edit_form(l.id).await.unwrap();
        assert_eq!(form.preview_url, "https://res.cloudinary.com/x/image/upload/h_200,w_200/img123.jpg");
        assert!(matches!(f.svc.edit_form(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_with_new_file_replaces_and_destroys_old_image() {
        let f = fixture();
        let l = seeded(&f, "img123");
        let input = UpdateListingInput { id: l.id, patch: ListingPatch { price: Some(150.0), ..Default::default() }, file: Some(file("new.jpg")) };
        let updated = f.svc.update(input).await.unwrap();

        assert_eq!(updated.price, 150.0);
        assert_eq!(updated.title, l.title);
        assert_eq!(updated.owner_id, l.owner_id);
        assert_ne!(updated.image.filename, "img123");
        assert_eq!(f.journal.count(|c| *c == Call::Destroy("img123".into())), 1);
        assert_eq!(destroys(&f.journal), 1);
        assert_eq!(f.journal.count(|c| matches!(c, Call::Upload(_))), 1);
        assert!(!f.assets.contains("img123"));

        // upload, then save, then destroy the old asset
        let up = f.journal.position(|c| matches!(c, Call::Upload(_))).unwrap();
        let save = f.journal.position(|c| matches!(c, Call::Save(_))).unwrap();
        let destroy = f.journal.position(|c| matches!(c, Call::Destroy(_))).unwrap();
        assert!(up < save && save < destroy);
    }

    #[tokio::test]
    async fn update_without_file_keeps_image_and_is_idempotent() {
        let f = fixture();
        let l = seeded(&f, "img123");
        let patch = ListingPatch { title: Some("Lake Cabin".into()), ..Default::default() };
        let first = f.svc.update(UpdateListingInput { id: l.id, patch: patch.clone(), file: None }).await.unwrap();
        let second = f.svc.update(UpdateListingInput { id: l.id, patch, file: None }).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.image, l.image);
        assert_eq!(second.price, l.price);
        assert_eq!(destroys(&f.journal), 0);
    }

    #[tokio::test]
    async fn update_on_placeholder_never_destroys() {
        let f = fixture();
        let l = seeded(&f, "listingimage");
        let updated = f.svc.update(UpdateListingInput { id: l.id, patch: ListingPatch::default(), file: Some(file("n.jpg")) }).await.unwrap();
        assert!(updated.image.is_uploaded());
        assert_eq!(destroys(&f.journal), 0);
    }

    #[tokio::test]
    async fn update_upload_failure_leaves_record_and_old_image() {
        let f = fixture();
        let l = seeded(&f, "img123");
        f.assets.fail_upload.store(true, Ordering::SeqCst);
        let input = UpdateListingInput { id: l.id, patch: ListingPatch { price: Some(1.0), ..Default::default() }, file: Some(file("n.jpg")) };
        let err = f.svc.update(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::AssetStore(_)));
        assert_eq!(f.repo.get(l.id).unwrap(), l);
        assert!(f.assets.contains("img123"));
        assert_eq!(destroys(&f.journal), 0);
    }

    #[tokio::test]
    async fn update_save_failure_discards_new_upload_only() {
        let f = fixture();
        let l = seeded(&f, "img123");
        f.repo.fail_save.store(true, Ordering::SeqCst);
        let err = f.svc.update(UpdateListingInput { id: l.id, patch: ListingPatch::default(), file: Some(file("n.jpg")) }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(f.assets.contains("img123"));
        assert_eq!(f.journal.count(|c| *c == Call::Destroy("img123".into())), 0);
        assert_eq!(destroys(&f.journal), 1);
    }

    #[tokio::test]
    async fn update_old_image_destroy_failure_is_ignored() {
        let f = fixture();
        let l = seeded(&f, "img123");
        f.assets.fail_destroy.store(true, Ordering::SeqCst);
        let updated = f.svc.update(UpdateListingInput { id: l.id, patch: ListingPatch::default(), file: Some(file("n.jpg")) }).await.unwrap();
        assert_ne!(updated.image.filename, "img123");
        assert_eq!(f.repo.get(l.id).unwrap().image, updated.image);
    }

    #[tokio::test]
    async fn update_invalid_patch_is_rejected_before_any_asset_call() {
        let f = fixture();
        let l = seeded(&f, "img123");
        let input = UpdateListingInput { id: l.id, patch: ListingPatch { title: Some(" ".into()), ..Default::default() }, file: Some(file("n.jpg")) };
        assert!(matches!(f.svc.update(input).await, Err(ServiceError::Validation(_))));
        assert!(f.journal.calls().is_empty());
        assert_eq!(f.repo.get(l.id).unwrap(), l);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let f = fixture();
        let err = f.svc.update(UpdateListingInput { id: Uuid::new_v4(), patch: ListingPatch::default(), file: Some(file("n.jpg")) }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.journal.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_image_and_reviews() {
        let f = fixture();
        let l = seeded(&f, "imgX");
        let (r1, r2) = (review(Uuid::new_v4()), review(Uuid::new_v4()));
        f.repo.seed_review(l.id, r1.clone());
        f.repo.seed_review(l.id, r2.clone());

        let id = f.svc.delete(l.id).await.unwrap();
        assert_eq!(id, l.id);
        assert_eq!(
            f.journal.calls(),
            vec![Call::Destroy("imgX".into()), Call::DeleteListing(l.id), Call::DeleteReviews(vec![r1.id, r2.id])]
        );
        assert!(f.repo.get(l.id).is_none());
        assert!(!f.reviews.contains(r1.id) && !f.reviews.contains(r2.id));
        assert!(!f.assets.contains("imgX"));
    }

    #[tokio::test]
    async fn delete_without_reviews_or_upload_touches_only_the_record() {
        let f = fixture();
        let l = seeded(&f, "listingimage");
        f.svc.delete(l.id).await.unwrap();
        assert_eq!(f.journal.calls(), vec![Call::DeleteListing(l.id)]);
        assert_eq!(review_deletes(&f.journal), 0);
        assert_eq!(destroys(&f.journal), 0);
    }

    #[tokio::test]
    async fn delete_proceeds_when_asset_destroy_fails() {
        let f = fixture();
        let l = seeded(&f, "imgX");
        f.assets.fail_destroy.store(true, Ordering::SeqCst);
        f.svc.delete(l.id).await.unwrap();
        assert!(f.repo.get(l.id).is_none());
    }

    #[tokio::test]
    async fn delete_record_failure_skips_cascade() {
        let f = fixture();
        let l = seeded(&f, "listingimage");
        let r = review(Uuid::new_v4());
        f.repo.seed_review(l.id, r.clone());
        f.repo.fail_delete.store(true, Ordering::SeqCst);
        let err = f.svc.delete(l.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(review_deletes(&f.journal), 0);
        assert!(f.reviews.contains(r.id));
    }

    #[tokio::test]
    async fn delete_review_failure_keeps_listing_and_reviews() {
        let f = fixture();
        let l = seeded(&f, "listingimage");
        let r = review(Uuid::new_v4());
        f.repo.seed_review(l.id, r.clone());
        f.reviews.fail_delete.store(true, Ordering::SeqCst);

        let err = f.svc.delete(l.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(f.repo.get(l.id).map(|x| x.reviews), Some(vec![r.id]));
        assert!(f.reviews.contains(r.id));

        // once the store recovers the same delete goes through
        f.reviews.fail_delete.store(false, Ordering::SeqCst);
        assert_eq!(f.svc.delete(l.id).await.unwrap(), l.id);
        assert!(f.repo.get(l.id).is_none());
        assert!(!f.reviews.contains(r.id));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found_without_side_effects() {
        let f = fixture();
        let err = f.svc.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.journal.calls().is_empty());
    }

    #[tokio::test]
    async fn list_returns_everything() {
        let f = fixture();
        seeded(&f, "listingimage");
        seeded(&f, "img1");
        assert_eq!(f.svc.list().await.unwrap().len(), 2);
    }
}
