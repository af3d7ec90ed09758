/// All errors that can be returned by a blob or record store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An object already exists under this key and upsert was not requested.
    #[error("object already exists: {bucket}/{key}")]
    AlreadyExists { bucket: String, key: String },

    /// No object under this key.
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// A referenced row does not exist (foreign-key violation).
    #[error("record not found in {table}: {id}")]
    RecordNotFound { table: String, id: String },

    /// The row was rejected by the store (constraint or validation failure).
    #[error("invalid record for {table}: {message}")]
    InvalidRecord { table: String, message: String },

    /// A backend-specific error (connection, HTTP status, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
