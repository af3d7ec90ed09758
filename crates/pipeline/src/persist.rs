//! Stores a classified sample: image into the blob store, then one
//! `waste_uploads` row pointing at it.

use std::sync::Arc;

use rand::Rng;
use smartbin_core::{ClassificationResult, WasteSample};
use smartbin_storage::{BlobStore, NewWasteUpload, RecordStore, UploadOptions, WasteUploadRecord};
use time::OffsetDateTime;

use crate::error::PersistError;
use crate::location::Coordinates;

/// Bucket holding waste images.
pub const DEFAULT_BUCKET: &str = "waste-images";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Optional columns attached to an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UploadMetadata {
    pub weight_grams: Option<f64>,
    pub location: Option<Coordinates>,
}

/// Object key of the form `waste-<unix-millis>-<6 base36 chars>.<ext>`.
pub fn object_key<R: Rng + ?Sized>(now: OffsetDateTime, ext: &str, rng: &mut R) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let suffix: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("waste-{}-{}.{}", millis, suffix, ext)
}

/// Writes samples to a [`BlobStore`] and a [`RecordStore`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    bucket: String,
}

impl PersistenceAdapter {
    pub fn new(blobs: Arc<dyn BlobStore>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            blobs,
            records,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Upload the image, then insert the row.
    ///
    /// A failed upload means no insert is attempted. A failed insert after a
    /// successful upload leaves the object in place and reports its key.
    pub async fn upload(
        &self,
        sample: WasteSample,
        classification: &ClassificationResult,
        metadata: &UploadMetadata,
    ) -> Result<WasteUploadRecord, PersistError> {
        let key = object_key(
            OffsetDateTime::now_utc(),
            sample.image.extension(),
            &mut rand::thread_rng(),
        );
        let options = UploadOptions::new(sample.image.mime_type());
        let size = sample.image.len();

        if let Err(source) = self
            .blobs
            .upload(&self.bucket, &key, sample.image.into_bytes(), options)
            .await
        {
            tracing::error!(bucket = %self.bucket, key = %key, error = %source, "image upload failed");
            return Err(PersistError::BlobUpload { key, source });
        }
        tracing::debug!(bucket = %self.bucket, key = %key, size, "image uploaded");

        let analysis = serde_json::to_value(classification)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
        let row = NewWasteUpload {
            image_url: self.blobs.public_url(&self.bucket, &key),
            image_path: key.clone(),
            analysis,
            waste_type: Some(classification.waste_type.clone()),
            classification: Some(classification.classification.clone()),
            weight_grams: metadata.weight_grams,
            pickup_lat: metadata.location.map(|c| c.latitude),
            pickup_lng: metadata.location.map(|c| c.longitude),
        };

        match self.records.insert_waste_upload(row).await {
            Ok(record) => {
                tracing::info!(id = %record.id, key = %key, "waste upload recorded");
                Ok(record)
            }
            Err(source) => {
                tracing::error!(
                    orphaned_key = %key,
                    error = %source,
                    "record insert failed after image upload; image left orphaned"
                );
                Err(PersistError::RecordInsert {
                    orphaned_key: key,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use time::macros::datetime;

    #[test]
    fn object_key_has_millis_and_base36_suffix() {
        let now = datetime!(2024-01-15 10:00:00 UTC);
        let key = object_key(now, "jpg", &mut StdRng::seed_from_u64(7));
        let rest = key.strip_prefix("waste-1705312800000-").unwrap();
        let (suffix, ext) = rest.split_once('.').unwrap();
        assert_eq!(ext, "jpg");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn object_keys_differ_between_draws() {
        let now = datetime!(2024-01-15 10:00:00 UTC);
        let mut rng = StdRng::seed_from_u64(1);
        let a = object_key(now, "jpg", &mut rng);
        let b = object_key(now, "jpg", &mut rng);
        assert_ne!(a, b);
    }
}
