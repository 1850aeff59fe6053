pub mod identity;
pub mod storage;
pub mod store;

pub use identity::OAuthIdentityAdapter;
pub use storage::BucketStorage;
pub use store::RealtimeDbStore;
