pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers and middleware the binary wires into the router.
pub use auth::{sign_in_handler, sign_out_handler};
pub use middleware::require_auth;
pub use rest::{
    photo_upload_handler, reading_handler, registration_handler, show_map_handler,
    upload_request_handler, view_handler, ApiDoc,
};
