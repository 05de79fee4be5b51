//! Asset store abstraction for uploaded listing images.
//!
//! The store is external object storage addressed by filename (public id).
//! `destroy` on a missing key must succeed so concurrent deletes stay harmless.

pub mod cloudinary;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub use cloudinary::CloudinaryStore;

/// An uploaded file handle, already read off the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Identifier and retrieval URL returned by an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub filename: String,
    pub url: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, file: UploadedFile) -> Result<StoredAsset, ServiceError>;
    async fn destroy(&self, filename: &str) -> Result<(), ServiceError>;
}

/// In-memory asset store for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    use crate::listing::repository::mock::{Call, Journal};

    #[derive(Default)]
    pub struct MockAssetStore {
        objects: Mutex<HashSet<String>>,
        seq: AtomicU64,
        journal: Journal,
        pub fail_upload: AtomicBool,
        pub fail_destroy: AtomicBool,
    }

    impl MockAssetStore {
        pub fn new(journal: Journal) -> Self { Self { journal, ..Default::default() } }

        /// Pretend `filename` was uploaded earlier.
        pub fn seed(&self, filename: &str) { self.objects.lock().unwrap().insert(filename.to_string()); }

        pub fn contains(&self, filename: &str) -> bool { self.objects.lock().unwrap().contains(filename) }
    }

    #[async_trait]
    impl AssetStore for MockAssetStore {
        async fn upload(&self, file: UploadedFile) -> Result<StoredAsset, ServiceError> {
            self.journal.record(Call::Upload(file.original_name.clone()));
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(ServiceError::AssetStore("upload rejected".into()));
            }
            let n = self.seq.fetch_add(1, Ordering::SeqCst);
            let filename = format!("wanderlust_DEV/mock{}", n);
            self.objects.lock().unwrap().insert(filename.clone());
            let url = format!("https://res.cloudinary.com/mock/image/upload/v1/{}.jpg", filename);
            Ok(StoredAsset { filename, url })
        }

        async fn destroy(&self, filename: &str) -> Result<(), ServiceError> {
            self.journal.record(Call::Destroy(filename.to_string()));
            if self.fail_destroy.load(Ordering::SeqCst) {
                return Err(ServiceError::AssetStore("destroy failed".into()));
            }
            self.objects.lock().unwrap().remove(filename);
            Ok(())
        }
    }
}
