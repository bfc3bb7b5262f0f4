use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CollaboratorError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self) -> Result<AuthenticatedUser, CollaboratorError>;
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

/// Resolves an OAuth access token to a profile via Google's userinfo
/// endpoint. The Google subject is a decimal string; a v5 UUID of it gives
/// the stable opaque id the tables key on.
pub struct GoogleIdentity {
    http: reqwest::Client,
    access_token: String,
}

impl GoogleIdentity {
    pub fn new(access_token: String) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, access_token })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn authenticate(&self) -> Result<AuthenticatedUser, CollaboratorError> {
        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let email = info
            .email
            .ok_or_else(|| CollaboratorError::Malformed("userinfo without email".to_string()))?;

        Ok(AuthenticatedUser {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, info.sub.as_bytes()),
            name: info.name.unwrap_or_else(|| email.clone()),
            email,
            avatar_url: info.picture,
        })
    }
}

/// Fixed local identity for offline use and tests.
pub struct StaticIdentity {
    user: AuthenticatedUser,
}

impl StaticIdentity {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self { user }
    }

    pub fn local(id: Uuid) -> Self {
        Self {
            user: AuthenticatedUser {
                id,
                name: "Local user".to_string(),
                email: "local@goalguardian".to_string(),
                avatar_url: None,
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn authenticate(&self) -> Result<AuthenticatedUser, CollaboratorError> {
        Ok(self.user.clone())
    }
}
