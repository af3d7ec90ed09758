use smartbin_core::MeasureError;
use smartbin_storage::StorageError;

/// Failures acquiring an image or a position from a device.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Permission denied, device absent or timed out.
    #[error("device access failed: {0}")]
    DeviceAccess(String),

    /// The frame could not be encoded, or the file is not an image we know.
    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures storing a classified sample.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The image never reached the blob store; no row was written.
    #[error("image upload failed for {key}: {source}")]
    BlobUpload {
        key: String,
        #[source]
        source: StorageError,
    },

    /// The image was stored but the row insert failed. The blob at
    /// `orphaned_key` stays behind.
    #[error("record insert failed, image {orphaned_key} left orphaned: {source}")]
    RecordInsert {
        orphaned_key: String,
        #[source]
        source: StorageError,
    },
}

/// Failures that stop a deposit before anything is classified.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("measurement failed: {0}")]
    Measure(#[from] MeasureError),

    /// A deposit is already running for this session.
    #[error("a deposit is already in progress")]
    Busy,
}
