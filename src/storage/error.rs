use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),

    /// A row references a parent that was never written.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("storage task failed: {0}")]
    TaskJoin(String),
}
