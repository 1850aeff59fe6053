//! services/app/src/adapters/store.rs
//!
//! This module contains the adapter for the hosted realtime tree database.
//! It implements the `RainfallStore` port from the core crate over the
//! database's REST surface: `GET`/`PUT`/`PATCH` on `<base>/<path>.json`,
//! where `PATCH` merges and `PUT` overwrites.
//!
//! Profile creation uses an ETag-conditional `PUT` (`if-match: null_etag`),
//! which the database only accepts when nothing is stored at the path. That
//! makes the upsert's existence check and write one atomic operation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use rainfall_core::domain::{
    BucketKey, RainfallReading, RaingaugeType, StationRegistration, User,
};
use rainfall_core::ports::{PortError, PortResult, RainfallStore, UpsertOutcome};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RainfallStore` port.
#[derive(Clone)]
pub struct RealtimeDbStore {
    client: reqwest::Client,
    base_url: String,
}

impl RealtimeDbStore {
    /// Creates a new `RealtimeDbStore`. The base URL must not end with a
    /// trailing slash.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// The REST endpoint for one node of the tree.
    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn status_error(path: &str, status: StatusCode) -> PortError {
    PortError::Unexpected(format!("database returned {status} for {path}"))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: String,
    username: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    is_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    registration: Option<RegistrationRecord>,
}

impl UserRecord {
    fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_registered: user.is_registered,
            registration: user.registration.as_ref().map(RegistrationRecord::from_domain),
        }
    }

    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            phone: self.phone,
            is_registered: self.is_registered,
            registration: self.registration.map(RegistrationRecord::to_domain).transpose()?,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRecord {
    permission_to_show_location: bool,
    latitude: String,
    longitude: String,
    raingauge_type: String,
    raingauge_photo: String,
    add_more_data: bool,
}

impl RegistrationRecord {
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

    fn to_domain(self) -> PortResult<StationRegistration> {
        let raingauge_type = RaingaugeType::parse(&self.raingauge_type).ok_or_else(|| {
            PortError::Unexpected(format!("unknown raingauge type '{}'", self.raingauge_type))
        })?;
        Ok(StationRegistration {
            permission_to_show_location: self.permission_to_show_location,
            latitude: self.latitude,
            longitude: self.longitude,
            raingauge_type,
            raingauge_photo: self.raingauge_photo,
            add_more_data: self.add_more_data,
        })
    }
}

/// The partial update merged into `users/<id>` on registration submission.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationPatch {
    is_registered: bool,
    registration: RegistrationRecord,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingRecord {
    rainfall_amount: String,
    is_hail: bool,
    is_snow: bool,
    is_frost: bool,
    hail_size: String,
    hail_time: String,
    snow_amount: String,
    snow_time: String,
}

impl ReadingRecord {
    fn from_domain(reading: &RainfallReading) -> Self {
        Self {
            rainfall_amount: reading.rainfall_amount.clone(),
            is_hail: reading.is_hail,
            is_snow: reading.is_snow,
            is_frost: reading.is_frost,
            hail_size: reading.hail_size.clone(),
            hail_time: reading.hail_time.clone(),
            snow_amount: reading.snow_amount.clone(),
            snow_time: reading.snow_time.clone(),
        }
    }
}

//=========================================================================================
// `RainfallStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RainfallStore for RealtimeDbStore {
    async fn create_user_if_absent(&self, user: &User) -> PortResult<UpsertOutcome> {
        let path = format!("users/{}", user.id);
        let response = self
            .client
            .put(self.node_url(&path))
            // Only succeeds while the node is empty; a concurrent creator
            // makes this come back 412 instead of overwriting.
            .header("if-match", "null_etag")
            .json(&UserRecord::from_domain(user))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED => Ok(UpsertOutcome::AlreadyExists),
            status if status.is_success() => Ok(UpsertOutcome::Created),
            status => Err(status_error(&path, status)),
        }
    }

    async fn load_user(&self, user_id: &str) -> PortResult<User> {
        let path = format!("users/{user_id}");
        let response = self
            .client
            .get(self.node_url(&path))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&path, status));
        }

        // The database answers 200 with a JSON `null` body for empty nodes.
        let record: Option<UserRecord> = response.json().await.map_err(transport_error)?;
        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::NotFound(path)),
        }
    }

    async fn update_registration(
        &self,
        user_id: &str,
        registration: &StationRegistration,
    ) -> PortResult<()> {
        let path = format!("users/{user_id}");
        let patch = RegistrationPatch {
            is_registered: true,
            registration: RegistrationRecord::from_domain(registration),
        };
        let response = self
            .client
            .patch(self.node_url(&path))
            .json(&patch)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(&path, status))
        }
    }

    async fn put_reading(
        &self,
        bucket: &BucketKey,
        user_id: &str,
        reading: &RainfallReading,
    ) -> PortResult<()> {
        let path = format!("rainfallData/{}/{}", bucket.date, bucket.hour);
        // Merge keeps other users' same-hour entries; the same user's entry
        // is replaced wholesale.
        let body =
            serde_json::json!({ user_id: ReadingRecord::from_domain(reading) });
        let response = self
            .client
            .patch(self.node_url(&path))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(&path, status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rainfall_core::domain::ExternalUser;

    fn store() -> RealtimeDbStore {
        RealtimeDbStore::new(
            reqwest::Client::new(),
            "https://rainfall.example.com".to_string(),
        )
    }

    #[test]
    fn node_urls_append_the_json_suffix() {
        let store = store();
        assert_eq!(
            store.node_url("users/u1"),
            "https://rainfall.example.com/users/u1.json"
        );
        assert_eq!(
            store.node_url("rainfallData/1-3-2024/14"),
            "https://rainfall.example.com/rainfallData/1-3-2024/14.json"
        );
    }

    #[test]
    fn reading_bucket_path_matches_the_stored_layout() {
        let bucket = BucketKey::from_datetime(Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap());
        assert_eq!(
            format!("rainfallData/{}/{}", bucket.date, bucket.hour),
            "rainfallData/1-3-2024/14"
        );
    }

    #[test]
    fn user_records_serialize_with_camel_case_names() {
        let user = User::from_external(&ExternalUser {
            id: "u1".to_string(),
            username: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            phone: None,
        });
        let value = serde_json::to_value(UserRecord::from_domain(&user)).unwrap();
        assert_eq!(value["id"], "u1");
        assert_eq!(value["isRegistered"], false);
        // An unregistered profile carries no registration node at all.
        assert!(value.get("registration").is_none());
    }

    #[test]
    fn registration_patch_serializes_the_merged_fields() {
        let registration = StationRegistration {
            permission_to_show_location: true,
            latitude: "51.5".to_string(),
            longitude: "-0.1".to_string(),
            raingauge_type: RaingaugeType::TippingBucket,
            raingauge_photo: "https://storage.example.com/u1/gauge.jpg".to_string(),
            add_more_data: true,
        };
        let patch = RegistrationPatch {
            is_registered: true,
            registration: RegistrationRecord::from_domain(&registration),
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["isRegistered"], true);
        assert_eq!(value["registration"]["permissionToShowLocation"], true);
        assert_eq!(value["registration"]["raingaugeType"], "tipping-bucket");
        assert_eq!(value["registration"]["addMoreData"], true);
    }

    #[test]
    fn reading_records_serialize_with_camel_case_names() {
        let reading = RainfallReading {
            rainfall_amount: "5".to_string(),
            is_hail: true,
            hail_size: "pea".to_string(),
            hail_time: "14:10".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(ReadingRecord::from_domain(&reading)).unwrap();
        assert_eq!(value["rainfallAmount"], "5");
        assert_eq!(value["isHail"], true);
        assert_eq!(value["hailSize"], "pea");
        assert_eq!(value["isSnow"], false);
    }

    #[test]
    fn stored_registrations_round_trip_to_domain() {
        let json = serde_json::json!({
            "permissionToShowLocation": true,
            "latitude": "51.5",
            "longitude": "-0.1",
            "raingaugeType": "weighing",
            "raingaugePhoto": "https://storage.example.com/u1/gauge.jpg",
            "addMoreData": false
        });
        let record: RegistrationRecord = serde_json::from_value(json).unwrap();
        let domain = record.to_domain().unwrap();
        assert_eq!(domain.raingauge_type, RaingaugeType::Weighing);
        assert!(domain.permission_to_show_location);
    }

    #[test]
    fn unknown_raingauge_types_are_rejected_on_load() {
        let json = serde_json::json!({
            "permissionToShowLocation": true,
            "latitude": "51.5",
            "longitude": "-0.1",
            "raingaugeType": "Option 1",
            "raingaugePhoto": "x",
            "addMoreData": false
        });
        let record: RegistrationRecord = serde_json::from_value(json).unwrap();
        assert!(matches!(
            record.to_domain(),
            Err(PortError::Unexpected(_))
        ));
    }
}
