pub mod domain;
pub mod flows;
pub mod ports;
pub mod state;

pub use domain::{
    AuthProvider, BucketKey, ExternalUser, RainfallReading, RaingaugeType, StationRegistration,
    StorageRef, User,
};
pub use ports::{BlobStorage, IdentityService, PortError, PortResult, RainfallStore, UpsertOutcome};
pub use state::{reduce, Action, AppState, Panel};
