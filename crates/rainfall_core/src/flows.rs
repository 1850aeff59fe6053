//! crates/rainfall_core/src/flows.rs
//!
//! The application flows: sign-in with profile upsert, sign-out, station
//! registration, and reading submission. Each flow is an async function over
//! the port traits so the whole set runs against in-memory fakes in tests.
//!
//! Every failure propagates to the caller. The original swallowed external
//! errors in logged-and-forgotten catch blocks; here the web layer decides
//! what the user sees.

use chrono::{DateTime, Utc};

use crate::domain::{
    AuthProvider, BucketKey, ExternalUser, RainfallReading, StationRegistration, User,
};
use crate::ports::{IdentityService, PortError, PortResult, RainfallStore, UpsertOutcome};

/// Signs the user in with the given provider and mirrors their stored
/// profile: first sign-ins get a default profile, returning users get the
/// one already on record.
pub async fn sign_in(
    identity: &dyn IdentityService,
    store: &dyn RainfallStore,
    provider: AuthProvider,
    credential: &str,
) -> PortResult<User> {
    let external = identity.sign_in(provider, credential).await?;
    upsert_user(store, &external).await
}

/// Create-if-absent-else-load against `users/<id>`.
///
/// The existence check and the default-profile write are one conditional
/// store operation, so two racing first sign-ins cannot both create; the
/// loser of the race simply loads what the winner wrote.
pub async fn upsert_user(store: &dyn RainfallStore, external: &ExternalUser) -> PortResult<User> {
    let default_profile = User::from_external(external);
    match store.create_user_if_absent(&default_profile).await? {
        UpsertOutcome::Created => Ok(default_profile),
        UpsertOutcome::AlreadyExists => store.load_user(&external.id).await,
    }
}

/// Revokes the credential with the provider. Clearing the local session and
/// resetting the view is the caller's reducer action.
pub async fn sign_out(
    identity: &dyn IdentityService,
    provider: AuthProvider,
    credential: &str,
) -> PortResult<()> {
    identity.sign_out(provider, credential).await
}

/// Submits the station registration form for a signed-in user.
///
/// The remote merge happens before the returned profile is handed back, so
/// callers never mirror a registration the store rejected.
pub async fn submit_registration(
    store: &dyn RainfallStore,
    user: &User,
    registration: StationRegistration,
) -> PortResult<User> {
    validate_registration(&registration)?;
    store.update_registration(&user.id, &registration).await?;

    let mut updated = user.clone();
    updated.is_registered = true;
    updated.registration = Some(registration);
    Ok(updated)
}

/// The gating the original only expressed as a disabled submit button:
/// coordinates must have been produced by the geolocation step (which needs
/// the permission checkbox) and the gauge photo must already be uploaded.
fn validate_registration(registration: &StationRegistration) -> PortResult<()> {
    if !registration.permission_to_show_location {
        return Err(PortError::Validation(
            "location permission is required to register a station".to_string(),
        ));
    }
    if registration.latitude.trim().is_empty() || registration.longitude.trim().is_empty() {
        return Err(PortError::Validation(
            "station coordinates are missing; run the location step first".to_string(),
        ));
    }
    if registration.raingauge_photo.trim().is_empty() {
        return Err(PortError::Validation(
            "a rain gauge photo must be uploaded before submitting".to_string(),
        ));
    }
    Ok(())
}

/// Submits one rainfall observation under the current wall-clock bucket.
///
/// The caller supplies `now` so the bucket computation stays deterministic
/// under test. A same-hour resubmission by the same user replaces the
/// earlier entry.
pub async fn submit_reading(
    store: &dyn RainfallStore,
    user_id: &str,
    reading: RainfallReading,
    now: DateTime<Utc>,
) -> PortResult<BucketKey> {
    let bucket = BucketKey::from_datetime(now);
    store.put_reading(&bucket, user_id, &reading).await?;
    Ok(bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RaingaugeType;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for the hosted tree store.
    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<String, User>>,
        readings: Mutex<HashMap<BucketKey, HashMap<String, RainfallReading>>>,
    }

    #[async_trait]
    impl RainfallStore for FakeStore {
        async fn create_user_if_absent(&self, user: &User) -> PortResult<UpsertOutcome> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&user.id) {
                Ok(UpsertOutcome::AlreadyExists)
            } else {
                users.insert(user.id.clone(), user.clone());
                Ok(UpsertOutcome::Created)
            }
        }

        async fn load_user(&self, user_id: &str) -> PortResult<User> {
            self.users
                .lock()
                .unwrap()
                .get(user_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("users/{user_id}")))
        }

        async fn update_registration(
            &self,
            user_id: &str,
            registration: &StationRegistration,
        ) -> PortResult<()> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(user_id)
                .ok_or_else(|| PortError::NotFound(format!("users/{user_id}")))?;
            user.is_registered = true;
            user.registration = Some(registration.clone());
            Ok(())
        }

        async fn put_reading(
            &self,
            bucket: &BucketKey,
            user_id: &str,
            reading: &RainfallReading,
        ) -> PortResult<()> {
            self.readings
                .lock()
                .unwrap()
                .entry(bucket.clone())
                .or_default()
                .insert(user_id.to_string(), reading.clone());
            Ok(())
        }
    }

    fn external(id: &str) -> ExternalUser {
        ExternalUser {
            id: id.to_string(),
            username: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            phone: None,
        }
    }

    fn valid_registration() -> StationRegistration {
        StationRegistration {
            permission_to_show_location: true,
            latitude: "51.5072".to_string(),
            longitude: "-0.1276".to_string(),
            raingauge_type: RaingaugeType::TippingBucket,
            raingauge_photo: "https://storage.example.com/u1/gauge.jpg".to_string(),
            add_more_data: false,
        }
    }

    #[tokio::test]
    async fn upsert_creates_a_default_profile_for_a_new_user() {
        let store = FakeStore::default();
        let user = upsert_user(&store, &external("u1")).await.unwrap();

        assert!(!user.is_registered);
        let stored = store.load_user("u1").await.unwrap();
        assert_eq!(stored.id, "u1");
        assert!(!stored.is_registered);
    }

    #[tokio::test]
    async fn upsert_loads_an_existing_profile_without_overwriting_it() {
        let store = FakeStore::default();
        let mut registered = User::from_external(&external("u1"));
        registered.is_registered = true;
        store.users.lock().unwrap().insert("u1".into(), registered);

        let user = upsert_user(&store, &external("u1")).await.unwrap();
        assert!(user.is_registered);
    }

    #[tokio::test]
    async fn registration_round_trips_through_the_store() {
        let store = FakeStore::default();
        let user = upsert_user(&store, &external("u1")).await.unwrap();

        let updated = submit_registration(&store, &user, valid_registration())
            .await
            .unwrap();
        assert!(updated.is_registered);
        assert!(store.load_user("u1").await.unwrap().is_registered);
    }

    #[tokio::test]
    async fn registration_without_coordinates_is_rejected() {
        let store = FakeStore::default();
        let user = upsert_user(&store, &external("u1")).await.unwrap();

        let mut form = valid_registration();
        form.latitude.clear();
        let err = submit_registration(&store, &user, form).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        // The remote profile must not have flipped.
        assert!(!store.load_user("u1").await.unwrap().is_registered);
    }

    #[tokio::test]
    async fn registration_without_a_photo_is_rejected() {
        let store = FakeStore::default();
        let user = upsert_user(&store, &external("u1")).await.unwrap();

        let mut form = valid_registration();
        form.raingauge_photo.clear();
        let err = submit_registration(&store, &user, form).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn registration_without_location_permission_is_rejected() {
        let store = FakeStore::default();
        let user = upsert_user(&store, &external("u1")).await.unwrap();

        let mut form = valid_registration();
        form.permission_to_show_location = false;
        let err = submit_registration(&store, &user, form).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn reading_lands_in_the_wall_clock_bucket() {
        let store = FakeStore::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let reading = RainfallReading {
            rainfall_amount: "5".to_string(),
            ..Default::default()
        };

        let bucket = submit_reading(&store, "u1", reading, now).await.unwrap();
        assert_eq!(bucket.date, "1-3-2024");
        assert_eq!(bucket.hour, 14);

        let readings = store.readings.lock().unwrap();
        let entries = readings.get(&bucket).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("u1").unwrap().rainfall_amount, "5");
    }

    #[tokio::test]
    async fn same_hour_resubmission_keeps_only_the_second_payload() {
        // Pins the observed overwrite behavior: no append, no dedup key.
        let store = FakeStore::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 14, 45, 0).unwrap();

        let first = RainfallReading {
            rainfall_amount: "5".to_string(),
            ..Default::default()
        };
        let second = RainfallReading {
            rainfall_amount: "9".to_string(),
            is_hail: true,
            hail_size: "pea".to_string(),
            ..Default::default()
        };

        submit_reading(&store, "u1", first, now).await.unwrap();
        let bucket = submit_reading(&store, "u1", second, later).await.unwrap();

        let readings = store.readings.lock().unwrap();
        let entries = readings.get(&bucket).unwrap();
        assert_eq!(entries.len(), 1);
        let kept = entries.get("u1").unwrap();
        assert_eq!(kept.rainfall_amount, "9");
        assert!(kept.is_hail);
    }

    #[tokio::test]
    async fn different_users_share_a_bucket_without_clobbering() {
        let store = FakeStore::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();

        submit_reading(&store, "u1", RainfallReading::default(), now)
            .await
            .unwrap();
        let bucket = submit_reading(&store, "u2", RainfallReading::default(), now)
            .await
            .unwrap();

        let readings = store.readings.lock().unwrap();
        assert_eq!(readings.get(&bucket).unwrap().len(), 2);
    }
}
