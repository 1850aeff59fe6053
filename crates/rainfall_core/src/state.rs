//! crates/rainfall_core/src/state.rs
//!
//! The application state and its reducer. The original UI kept a bag of
//! boolean visibility flags plus a mutable user object; here both collapse
//! into one value and every transition is a pure function from
//! `(state, action)` to the next state, so the panel logic is testable
//! without any of the external services.

use crate::domain::User;

//=========================================================================================
// State
//=========================================================================================

/// Which panel is currently visible. Exactly one, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Map,
    RegistrationForm,
    UploadForm,
}

/// The per-browser application state: the mirrored profile of the signed-in
/// user (if any) and the visible panel.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub user: Option<User>,
    pub panel: Panel,
}

//=========================================================================================
// Actions and the Reducer
//=========================================================================================

/// Everything that can change the application state.
#[derive(Debug, Clone)]
pub enum Action {
    /// A sign-in completed and the upsert produced this profile.
    SignedIn(User),
    /// The user signed out; the session empties and the map comes back.
    SignedOut,
    /// The "upload data" menu action.
    RequestUpload,
    /// Hide whatever form is up and show the map.
    ShowMapOnly,
    /// A registration submission was accepted remotely; carry the updated
    /// profile and return to the map.
    RegistrationAccepted(User),
}

/// Applies one action to the state.
pub fn reduce(state: AppState, action: Action) -> AppState {
    match action {
        Action::SignedIn(user) => AppState {
            user: Some(user),
            panel: state.panel,
        },
        Action::SignedOut => AppState::default(),
        Action::RequestUpload => {
            let panel = match &state.user {
                // Registered stations go straight to the upload form;
                // everyone else must register first.
                Some(user) if user.is_registered => Panel::UploadForm,
                Some(_) => Panel::RegistrationForm,
                // The menu disables the action when signed out; a stray
                // request changes nothing.
                None => state.panel,
            };
            AppState { panel, ..state }
        }
        Action::ShowMapOnly => AppState {
            panel: Panel::Map,
            ..state
        },
        Action::RegistrationAccepted(user) => AppState {
            user: Some(user),
            panel: Panel::Map,
        },
    }
}
