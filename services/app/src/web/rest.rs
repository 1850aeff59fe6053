//! services/app/src/web/rest.rs
//!
//! Contains the Axum handlers for the view toggles, station registration,
//! photo upload, and reading submission, plus the master definition for the
//! OpenAPI specification.

use axum::{
    extract::{Extension, Multipart, State},
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::error::AppError;
use crate::web::middleware::{session_id_from_headers, CurrentSession};
use crate::web::state::{AppState, SessionEntry};
use rainfall_core::domain::{
    RainfallReading, RaingaugeType, StationRegistration, User,
};
use rainfall_core::flows;
use rainfall_core::ports::{PortError, PortResult};
use rainfall_core::state::{reduce, Action, AppState as ClientState, Panel};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::sign_in_handler,
        crate::web::auth::sign_out_handler,
        view_handler,
        upload_request_handler,
        show_map_handler,
        registration_handler,
        photo_upload_handler,
        reading_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignInRequest,
            ProfileResponse,
            RegistrationDto,
            ViewResponse,
            RegistrationRequest,
            PhotoUploadResponse,
            ReadingRequest,
            ReadingResponse,
        )
    ),
    tags(
        (name = "Rainfall Reporting API", description = "API endpoints for the community rainfall reporting front end.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The signed-in user's profile as the browser sees it.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationDto>,
}

impl ProfileResponse {
    pub fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_registered: user.is_registered,
            registration: user.registration.as_ref().map(RegistrationDto::from_domain),
        }
    }
}

/// Station metadata in wire form.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDto {
    pub permission_to_show_location: bool,
    pub latitude: String,
    pub longitude: String,
    pub raingauge_type: String,
    pub raingauge_photo: String,
    pub add_more_data: bool,
}

impl RegistrationDto {
    fn from_domain(registration: &StationRegistration) -> Self {
        Self {
            permission_to_show_location: registration.permission_to_show_location,
            latitude: registration.latitude.clone(),
            longitude: registration.longitude.clone(),
            raingauge_type: registration.raingauge_type.as_str().to_string(),
            raingauge_photo: registration.raingauge_photo.clone(),
            add_more_data: registration.add_more_data,
        }
    }
}

/// The navigation surface: which panel is up and who is signed in.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub panel: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ProfileResponse>,
}

impl ViewResponse {
    pub fn from_state(app: &ClientState) -> Self {
        Self {
            panel: panel_name(app.panel),
            user: app.user.as_ref().map(ProfileResponse::from_domain),
        }
    }
}

pub fn panel_name(panel: Panel) -> &'static str {
    match panel {
        Panel::Map => "map",
        Panel::RegistrationForm => "registration-form",
        Panel::UploadForm => "upload-form",
    }
}

/// The station registration form payload.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default)]
    pub permission_to_show_location: bool,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
    pub raingauge_type: String,
    #[serde(default)]
    pub raingauge_photo: String,
    #[serde(default)]
    pub add_more_data: bool,
}

impl RegistrationRequest {
    fn to_domain(&self) -> PortResult<StationRegistration> {
        let raingauge_type = RaingaugeType::parse(&self.raingauge_type).ok_or_else(|| {
            PortError::Validation(format!(
                "'{}' is not a known raingauge type",
                self.raingauge_type
            ))
        })?;
        Ok(StationRegistration {
            permission_to_show_location: self.permission_to_show_location,
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            raingauge_type,
            raingauge_photo: self.raingauge_photo.clone(),
            add_more_data: self.add_more_data,
        })
    }
}

/// The response payload sent after a successful photo upload.
#[derive(Serialize, ToSchema)]
pub struct PhotoUploadResponse {
    pub url: String,
}

/// The rainfall observation form payload. Every field except the amount is
/// optional; unchecked boxes and untouched inputs simply stay at their
/// defaults, as the original form submitted them.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRequest {
    pub rainfall_amount: String,
    #[serde(default)]
    pub is_hail: bool,
    #[serde(default)]
    pub is_snow: bool,
    #[serde(default)]
    pub is_frost: bool,
    #[serde(default)]
    pub hail_size: String,
    #[serde(default)]
    pub hail_time: String,
    #[serde(default)]
    pub snow_amount: String,
    #[serde(default)]
    pub snow_time: String,
}

impl ReadingRequest {
    fn to_domain(&self) -> RainfallReading {
        RainfallReading {
            rainfall_amount: self.rainfall_amount.clone(),
            is_hail: self.is_hail,
            is_snow: self.is_snow,
            is_frost: self.is_frost,
            hail_size: self.hail_size.clone(),
            hail_time: self.hail_time.clone(),
            snow_amount: self.snow_amount.clone(),
            snow_time: self.snow_time.clone(),
        }
    }
}

/// The response payload sent after a reading was stored.
#[derive(Serialize, ToSchema)]
pub struct ReadingResponse {
    /// Date component of the bucket the reading landed in.
    pub date: String,
    /// Hour component of the bucket (0-23).
    pub hour: u32,
    pub panel: &'static str,
}

//=========================================================================================
// Shared Handler Helpers
//=========================================================================================

/// Fetches the live session and the signed-in user, or fails with 401.
async fn signed_in(state: &AppState, session_id: &str) -> Result<(SessionEntry, User), AppError> {
    let entry = state
        .sessions
        .get(session_id)
        .await
        .ok_or(AppError::Port(PortError::Unauthorized))?;
    let user = entry
        .app
        .user
        .clone()
        .ok_or(AppError::Port(PortError::Unauthorized))?;
    Ok((entry, user))
}

async fn apply_transition(
    state: &AppState,
    session_id: &str,
    action: Action,
) -> Result<ClientState, AppError> {
    state
        .sessions
        .update_app(session_id, |app| reduce(app, action))
        .await
        .ok_or(AppError::Port(PortError::Unauthorized))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report the current view state.
///
/// Works with or without a session: an anonymous browser sees the map and no
/// profile.
#[utoipa::path(
    get,
    path = "/view",
    responses(
        (status = 200, description = "Current panel and profile", body = ViewResponse)
    )
)]
pub async fn view_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<ViewResponse> {
    let app = match session_id_from_headers(&headers) {
        Some(session_id) => state
            .sessions
            .get(&session_id)
            .await
            .map(|entry| entry.app)
            .unwrap_or_default(),
        None => ClientState::default(),
    };
    Json(ViewResponse::from_state(&app))
}

/// The "upload data" menu action.
///
/// Registered stations land on the upload form, unregistered users on the
/// registration form.
#[utoipa::path(
    post,
    path = "/view/upload-request",
    responses(
        (status = 200, description = "The resulting view state", body = ViewResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn upload_request_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session_id)): Extension<CurrentSession>,
) -> Result<Json<ViewResponse>, AppError> {
    let app = apply_transition(&state, &session_id, Action::RequestUpload).await?;
    Ok(Json(ViewResponse::from_state(&app)))
}

/// Hide whatever form is up and show the map.
#[utoipa::path(
    post,
    path = "/view/map",
    responses(
        (status = 200, description = "The resulting view state", body = ViewResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn show_map_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session_id)): Extension<CurrentSession>,
) -> Result<Json<ViewResponse>, AppError> {
    let app = apply_transition(&state, &session_id, Action::ShowMapOnly).await?;
    Ok(Json(ViewResponse::from_state(&app)))
}

/// Submit the station registration form.
///
/// The remote profile is updated first; only then does the session flip to
/// registered and return to the map, so a rejected write never leaves the
/// mirror ahead of the store.
#[utoipa::path(
    post,
    path = "/registration",
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Registration stored", body = ViewResponse),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Missing coordinates, photo, or permission"),
        (status = 502, description = "The hosted database rejected the write")
    )
)]
pub async fn registration_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session_id)): Extension<CurrentSession>,
    Json(request): Json<RegistrationRequest>,
) -> Result<Json<ViewResponse>, AppError> {
    let (_, user) = signed_in(&state, &session_id).await?;
    let registration = request.to_domain()?;

    let updated =
        flows::submit_registration(state.store.as_ref(), &user, registration).await?;

    let app =
        apply_transition(&state, &session_id, Action::RegistrationAccepted(updated)).await?;
    Ok(Json(ViewResponse::from_state(&app)))
}

/// Upload the rain gauge photo for the registration form.
///
/// Accepts a multipart/form-data request with a single file part, stores it
/// under `<userId>/<filename>`, and returns the public download URL the form
/// carries into submission.
#[utoipa::path(
    post,
    path = "/registration/photo",
    request_body(content_type = "multipart/form-data", description = "The photo to upload."),
    responses(
        (status = 200, description = "Photo stored", body = PhotoUploadResponse),
        (status = 422, description = "No file part in the request"),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The blob store rejected the upload")
    )
)]
pub async fn photo_upload_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session_id)): Extension<CurrentSession>,
    mut multipart: Multipart,
) -> Result<Json<PhotoUploadResponse>, AppError> {
    let (_, user) = signed_in(&state, &session_id).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Internal(format!("failed to read multipart data: {e}")))?
        .ok_or_else(|| {
            AppError::Port(PortError::Validation(
                "multipart form must include a file".to_string(),
            ))
        })?;

    let file_name = field.file_name().unwrap_or("photo.jpg").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Internal(format!("failed to read file bytes: {e}")))?;

    let path = format!("{}/{}", user.id, file_name);
    let storage_ref = state.storage.upload(&path, data, &content_type).await?;
    let url = state.storage.download_url(&storage_ref).await?;

    Ok(Json(PhotoUploadResponse { url }))
}

/// Submit one rainfall observation.
///
/// The reading lands under the current date/hour bucket keyed by the user's
/// id; a same-hour resubmission replaces the earlier entry.
#[utoipa::path(
    post,
    path = "/readings",
    request_body = ReadingRequest,
    responses(
        (status = 200, description = "Reading stored", body = ReadingResponse),
        (status = 401, description = "Not signed in"),
        (status = 502, description = "The hosted database rejected the write")
    )
)]
pub async fn reading_handler(
    State(state): State<AppState>,
    Extension(CurrentSession(session_id)): Extension<CurrentSession>,
    Json(request): Json<ReadingRequest>,
) -> Result<Json<ReadingResponse>, AppError> {
    let (_, user) = signed_in(&state, &session_id).await?;

    let bucket =
        flows::submit_reading(state.store.as_ref(), &user.id, request.to_domain(), Utc::now())
            .await?;

    let app = apply_transition(&state, &session_id, Action::ShowMapOnly).await?;
    Ok(Json(ReadingResponse {
        date: bucket.date,
        hour: bucket.hour,
        panel: panel_name(app.panel),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_names_match_the_browser_vocabulary() {
        assert_eq!(panel_name(Panel::Map), "map");
        assert_eq!(panel_name(Panel::RegistrationForm), "registration-form");
        assert_eq!(panel_name(Panel::UploadForm), "upload-form");
    }

    #[test]
    fn reading_requests_default_their_optional_fields() {
        let request: ReadingRequest =
            serde_json::from_value(serde_json::json!({ "rainfallAmount": "5" })).unwrap();
        let reading = request.to_domain();
        assert_eq!(reading.rainfall_amount, "5");
        assert!(!reading.is_hail && !reading.is_snow && !reading.is_frost);
        assert!(reading.hail_size.is_empty());
    }

    #[test]
    fn registration_requests_reject_unknown_gauge_types() {
        let request: RegistrationRequest = serde_json::from_value(serde_json::json!({
            "permissionToShowLocation": true,
            "latitude": "51.5",
            "longitude": "-0.1",
            "raingaugeType": "laser",
            "raingaugePhoto": "https://x",
        }))
        .unwrap();
        assert!(matches!(
            request.to_domain(),
            Err(PortError::Validation(_))
        ));
    }

    #[test]
    fn profiles_serialize_with_camel_case_names() {
        let user = User {
            id: "u1".to_string(),
            username: Some("Ada".to_string()),
            email: None,
            phone: None,
            is_registered: false,
            registration: None,
        };
        let value = serde_json::to_value(ProfileResponse::from_domain(&user)).unwrap();
        assert_eq!(value["isRegistered"], false);
        assert!(value.get("registration").is_none());
    }
}
