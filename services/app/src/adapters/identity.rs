//! services/app/src/adapters/identity.rs
//!
//! This module contains the adapter for the external identity providers.
//! It implements the `IdentityService` port from the core crate.
//!
//! The browser runs the actual popup flow and hands the resulting OAuth
//! access token to this service; the adapter verifies the token against the
//! provider's userinfo endpoint and turns the answer into an `ExternalUser`.

use async_trait::async_trait;
use serde::Deserialize;

use rainfall_core::domain::{AuthProvider, ExternalUser};
use rainfall_core::ports::{IdentityService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityService` port against the Google
/// and Facebook OAuth endpoints.
#[derive(Clone)]
pub struct OAuthIdentityAdapter {
    client: reqwest::Client,
    google_userinfo_url: String,
    google_revoke_url: String,
    facebook_userinfo_url: String,
    facebook_revoke_url: String,
}

impl OAuthIdentityAdapter {
    /// Creates a new `OAuthIdentityAdapter`.
    pub fn new(
        client: reqwest::Client,
        google_userinfo_url: String,
        google_revoke_url: String,
        facebook_userinfo_url: String,
        facebook_revoke_url: String,
    ) -> Self {
        Self {
            client,
            google_userinfo_url,
            google_revoke_url,
            facebook_userinfo_url,
            facebook_revoke_url,
        }
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn auth_status_error(provider: AuthProvider, status: reqwest::StatusCode) -> PortError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        PortError::Unauthorized
    } else {
        PortError::Unexpected(format!(
            "{} endpoint returned {status}",
            provider.as_str()
        ))
    }
}

//=========================================================================================
// Provider Userinfo Payloads
//=========================================================================================

/// Google's OpenID Connect userinfo answer (the fields we read).
#[derive(Deserialize)]
struct GoogleUserinfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
}

/// Facebook's Graph API `/me` answer.
#[derive(Deserialize)]
struct FacebookUserinfo {
    id: String,
    name: Option<String>,
    email: Option<String>,
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for OAuthIdentityAdapter {
    async fn sign_in(&self, provider: AuthProvider, credential: &str) -> PortResult<ExternalUser> {
        match provider {
            AuthProvider::Google => {
                let response = self
                    .client
                    .get(&self.google_userinfo_url)
                    .bearer_auth(credential)
                    .send()
                    .await
                    .map_err(transport_error)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(auth_status_error(provider, status));
                }
                let info: GoogleUserinfo = response.json().await.map_err(transport_error)?;
                Ok(ExternalUser {
                    id: info.sub,
                    username: info.name,
                    email: info.email,
                    phone: info.phone_number,
                })
            }
            AuthProvider::Facebook => {
                let response = self
                    .client
                    .get(&self.facebook_userinfo_url)
                    .query(&[("fields", "id,name,email"), ("access_token", credential)])
                    .send()
                    .await
                    .map_err(transport_error)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(auth_status_error(provider, status));
                }
                let info: FacebookUserinfo = response.json().await.map_err(transport_error)?;
                Ok(ExternalUser {
                    id: info.id,
                    username: info.name,
                    email: info.email,
                    // The Graph API does not expose a phone number.
                    phone: None,
                })
            }
        }
    }

    async fn sign_out(&self, provider: AuthProvider, credential: &str) -> PortResult<()> {
        let response = match provider {
            AuthProvider::Google => self
                .client
                .post(&self.google_revoke_url)
                .form(&[("token", credential)])
                .send()
                .await
                .map_err(transport_error)?,
            AuthProvider::Facebook => self
                .client
                .delete(&self.facebook_revoke_url)
                .query(&[("access_token", credential)])
                .send()
                .await
                .map_err(transport_error)?,
        };

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(auth_status_error(provider, status))
        }
    }
}
