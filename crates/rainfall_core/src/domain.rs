//! crates/rainfall_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any wire format or serialization;
//! the adapters own the camelCase JSON records and convert at the edge.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// The identity provider used for the popup sign-in flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    Google,
    Facebook,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Facebook => "facebook",
        }
    }
}

/// The record the identity provider hands back after a successful sign-in.
/// Provider user ids are opaque strings, not UUIDs.
#[derive(Debug, Clone)]
pub struct ExternalUser {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A community member's profile as stored under `users/<id>`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_registered: bool,
    pub registration: Option<StationRegistration>,
}

impl User {
    /// The default profile written on first sign-in. Registration comes later
    /// through the station registration form.
    pub fn from_external(external: &ExternalUser) -> Self {
        Self {
            id: external.id.clone(),
            username: external.username.clone(),
            email: external.email.clone(),
            phone: external.phone.clone(),
            is_registered: false,
            registration: None,
        }
    }
}

/// The kind of rain gauge a station operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaingaugeType {
    Manual,
    TippingBucket,
    Weighing,
}

impl RaingaugeType {
    /// The stored spelling of each variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            RaingaugeType::Manual => "manual",
            RaingaugeType::TippingBucket => "tipping-bucket",
            RaingaugeType::Weighing => "weighing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(RaingaugeType::Manual),
            "tipping-bucket" => Some(RaingaugeType::TippingBucket),
            "weighing" => Some(RaingaugeType::Weighing),
            _ => None,
        }
    }
}

/// Station metadata collected by the registration form and embedded in the
/// user's profile.
///
/// Latitude and longitude come from a client geolocation step, not manual
/// entry, and are only meaningful when `permission_to_show_location` is set.
#[derive(Debug, Clone)]
pub struct StationRegistration {
    pub permission_to_show_location: bool,
    pub latitude: String,
    pub longitude: String,
    pub raingauge_type: RaingaugeType,
    pub raingauge_photo: String,
    pub add_more_data: bool,
}

/// A single rainfall observation.
///
/// Amounts stay strings end to end; the original form never constrained them
/// to numbers and existing stored data would not survive a stricter type.
#[derive(Debug, Clone, Default)]
pub struct RainfallReading {
    pub rainfall_amount: String,
    pub is_hail: bool,
    pub is_snow: bool,
    pub is_frost: bool,
    pub hail_size: String,
    pub hail_time: String,
    pub snow_amount: String,
    pub snow_time: String,
}

/// The composite `date/hour` path under which readings are grouped.
///
/// The date component is `day-month-year` with no zero padding, so
/// 2024-03-01 becomes `"1-3-2024"`. Submissions by the same user within the
/// same hour share a key and the later write wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub date: String,
    pub hour: u32,
}

impl BucketKey {
    pub fn from_datetime(now: DateTime<Utc>) -> Self {
        Self {
            date: format!("{}-{}-{}", now.day(), now.month(), now.year()),
            hour: now.hour(),
        }
    }
}

/// A handle to an uploaded blob, resolvable to a public download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef {
    pub path: String,
}
