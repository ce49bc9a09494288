use axum::{
    async_trait,
    extract::{rejection::TypedHeaderRejectionReason, FromRequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::{error::ServerError, models::Role, server::AppState};

/// Payload carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user id, as a string
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_secs: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
        }
    }

    /// Sign a token for the given user, valid for the configured lifetime.
    pub fn issue(&self, id: i64, name: &str, role: Role) -> Result<String, ServerError> {
        let iat = Utc::now().timestamp().max(0) as u64;
        self.issue_with_claims(&Claims {
            sub: id.to_string(),
            name: name.to_owned(),
            role,
            iat,
            exp: iat.saturating_add(self.expiry_secs),
        })
    }

    pub fn issue_with_claims(&self, claims: &Claims) -> Result<String, ServerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(ServerError::TokenEncodeError)
    }

    /// Verify signature and expiry, returning the identity the token was issued to.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ServerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(ServerError::InvalidToken)?;
        let id = data
            .claims
            .sub
            .parse()
            .map_err(|_| ServerError::InvalidToken(ErrorKind::InvalidSubject.into()))?;

        Ok(AuthUser {
            id,
            name: data.claims.name,
            role: data.claims.role,
        })
    }
}

/// The authenticated identity of the user making a request.
///
/// Extracting this from a request is what makes a route protected: a missing
/// bearer token rejects with 401, a bad or expired one with 403.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    if matches!(rejection.reason(), TypedHeaderRejectionReason::Missing) {
                        ServerError::Unauthenticated
                    } else {
                        ServerError::InvalidToken(ErrorKind::InvalidToken.into())
                    }
                })?;

        let user = state.jwt.verify(bearer.token())?;
        tracing::debug!(user_id = user.id, role = ?user.role, "authenticated request");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("unit-secret", 60)
    }

    #[test]
    fn issued_tokens_verify_to_the_same_identity() {
        let token = keys().issue(7, "ana", Role::Tecnico).unwrap();
        let user = keys().verify(&token).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "ana");
        assert_eq!(user.role, Role::Tecnico);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = JwtKeys::new("other-secret", 60)
            .issue(7, "ana", Role::Admin)
            .unwrap();
        assert!(matches!(
            keys().verify(&token),
            Err(ServerError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = Utc::now().timestamp() as u64;
        let token = keys()
            .issue_with_claims(&Claims {
                sub: "7".into(),
                name: "ana".into(),
                role: Role::Tecnico,
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();
        assert!(matches!(
            keys().verify(&token),
            Err(ServerError::InvalidToken(_))
        ));
    }

    #[test]
    fn oversized_lifetime_saturates() {
        let token = JwtKeys::new("unit-secret", u64::MAX)
            .issue(7, "ana", Role::Tecnico)
            .unwrap();
        assert_eq!(keys().verify(&token).unwrap().id, 7);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            keys().verify("not.a.token"),
            Err(ServerError::InvalidToken(_))
        ));
    }
}
