use thiserror::Error;

/// All the ways the dashboard layer can go wrong
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] quillboard_api::ApiError),

    #[error("Cache operation failed: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token store error: {0}")]
    TokenStoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<quillboard_cache::CacheError> for Error {
    fn from(e: quillboard_cache::CacheError) -> Self {
        Self::CacheError(e.to_string())
    }
}
