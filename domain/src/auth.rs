//! Caller identity.
//!
//! Request handlers never read identity from ambient state. They hand the raw
//! token to an [`Authenticator`] and pass the resolved [`Caller`] explicitly to
//! the operations that need it.
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use events::UserId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The identity of whoever issued the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<UserId>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// The caller's user id, or `Unauthenticated` for anonymous callers.
    pub fn require_user(&self) -> Result<&UserId, Error> {
        self.user_id.as_ref().ok_or_else(Error::unauthenticated)
    }
}

/// Resolves a bearer token to the user it was issued for.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with `Unauthenticated` when the token is malformed, forged or expired.
    async fn resolve(&self, token: &str) -> Result<UserId, Error>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: i64,
    exp: i64,
}

/// A freshly signed token and the moment it stops being accepted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 tokens whose `sub` claim is the user id.
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, lifetime: Duration) -> Result<Self, Error> {
        if secret.is_empty() {
            warn!("Refusing to sign tokens with an empty JWT key");
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    pub fn issue(&self, user_id: &str) -> Result<IssuedToken, Error> {
        let issued_at = Utc::now();
        let expires_at = issued_at
            + chrono::Duration::from_std(self.lifetime).map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            })?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken { token, expires_at })
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn resolve(&self, token: &str) -> Result<UserId, Error> {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => {
                debug!("Rejected token: {e}");
                Err(Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::Unauthenticated,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn issued_token_resolves_to_its_user() -> Result<(), Error> {
        let authenticator = JwtAuthenticator::new("secret", HOUR)?;

        let issued = authenticator.issue("user-1")?;

        assert_eq!(authenticator.resolve(&issued.token).await?, "user-1");
        assert!(issued.expires_at > Utc::now());
        Ok(())
    }

    #[tokio::test]
    async fn token_signed_with_another_key_is_unauthenticated() -> Result<(), Error> {
        let ours = JwtAuthenticator::new("secret", HOUR)?;
        let theirs = JwtAuthenticator::new("other secret", HOUR)?;

        let issued = theirs.issue("user-1")?;
        let result = ours.resolve(&issued.token).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthenticated
        );
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() -> Result<(), Error> {
        let authenticator = JwtAuthenticator::new("secret", HOUR)?;
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )?;

        let result = authenticator.resolve(&token).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthenticated
        );
        Ok(())
    }

    #[tokio::test]
    async fn garbage_is_unauthenticated() -> Result<(), Error> {
        let authenticator = JwtAuthenticator::new("secret", HOUR)?;

        let result = authenticator.resolve("not-a-token").await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Unauthenticated
        );
        Ok(())
    }

    #[test]
    fn empty_key_is_a_config_error() {
        let result = JwtAuthenticator::new("", HOUR);

        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(DomainErrorKind::Internal(InternalErrorKind::Config))
        );
    }

    #[test]
    fn anonymous_caller_requires_a_user() {
        assert_eq!(
            Caller::anonymous().require_user().unwrap_err().error_kind,
            DomainErrorKind::Unauthenticated
        );
        assert_eq!(Caller::user("u-1").require_user().unwrap(), "u-1");
    }
}
