//! crates/rainfall_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the hosted database, identity provider, and blob
//! storage it ultimately talks to.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    AuthProvider, BucketKey, ExternalUser, RainfallReading, StationRegistration, StorageRef, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services
/// (identity provider, database, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The outcome of a conditional profile write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No profile existed; the default one was written.
    Created,
    /// A profile was already present and was left untouched.
    AlreadyExists,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external identity provider behind the popup sign-in flow.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Verifies a credential produced by the client-side popup flow and
    /// returns the provider's user record.
    async fn sign_in(&self, provider: AuthProvider, credential: &str) -> PortResult<ExternalUser>;

    /// Revokes the credential with the provider.
    async fn sign_out(&self, provider: AuthProvider, credential: &str) -> PortResult<()>;
}

/// The hosted tree-structured database holding profiles and readings.
///
/// Paths in play: `users/<id>` for profiles and
/// `rainfallData/<date>/<hour>` for observation buckets.
#[async_trait]
pub trait RainfallStore: Send + Sync {
    /// Writes the profile at `users/<id>` only if nothing is stored there.
    ///
    /// This must be a single conditional write, not a read-then-branch, so
    /// that two near-simultaneous first sign-ins cannot both decide "absent".
    async fn create_user_if_absent(&self, user: &User) -> PortResult<UpsertOutcome>;

    /// Loads the profile stored at `users/<id>`.
    async fn load_user(&self, user_id: &str) -> PortResult<User>;

    /// Partial update of `users/<id>`: marks the profile registered and
    /// attaches the station metadata. Other profile fields are untouched.
    async fn update_registration(
        &self,
        user_id: &str,
        registration: &StationRegistration,
    ) -> PortResult<()>;

    /// Merges `{<user_id>: <reading>}` into `rainfallData/<date>/<hour>`.
    ///
    /// A second write by the same user under the same bucket replaces the
    /// first; other users' entries in the bucket are untouched.
    async fn put_reading(
        &self,
        bucket: &BucketKey,
        user_id: &str,
        reading: &RainfallReading,
    ) -> PortResult<()>;
}

/// The hosted blob store for station photos.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Uploads the bytes at the given object path.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> PortResult<StorageRef>;

    /// Resolves a previously uploaded object to a public download URL.
    async fn download_url(&self, storage_ref: &StorageRef) -> PortResult<String>;
}
