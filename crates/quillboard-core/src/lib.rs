// Dashboard-side business logic lives here - config, persisted sessions,
// access checks and the cached post type catalog
pub mod acl;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod token_store;

pub use acl::{PermissionChecker, PermissionSet};
pub use config::Config;
pub use directory::PostTypeDirectory;
pub use error::Error;
pub use models::Role;
pub use token_store::FileTokenStore;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
