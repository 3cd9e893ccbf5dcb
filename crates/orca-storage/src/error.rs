/// Errors surfaced by the storage layer.
///
/// Only the variants the callers dispatch on are distinguished: missing rows
/// carry the item identifier, a closed instance is terminal, and a driver
/// outside the supported set indicates misconfiguration. Everything else is
/// an opaque database error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A requested record does not exist.
    #[error("Item with ID {item} was not found in the storage")]
    NotFound { item: String },

    /// The storage has been closed; the instance cannot be used again.
    #[error("storage is closed")]
    Closed,

    /// The configured or detected database driver is outside the known set.
    #[error("DB driver {0} is not supported")]
    UnsupportedDriver(String),

    /// An underlying SeaORM/SQL error.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl StorageError {
    pub fn not_found(item: impl Into<String>) -> Self {
        StorageError::NotFound { item: item.into() }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
