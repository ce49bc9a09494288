use axum::{
    async_trait,
    body::HttpBody,
    extract::{FromRequest, FromRequestParts, Path},
    http::{request::Parts, Request},
    BoxError, Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

pub(crate) mod assignment;
pub(crate) mod history;
pub(crate) mod job;
pub(crate) mod lifecycle;
pub(crate) mod location;
pub(crate) mod login;
pub(crate) mod user;

pub(crate) use assignment::*;
pub(crate) use history::*;
pub(crate) use job::*;
pub(crate) use lifecycle::*;
pub(crate) use location::*;
pub(crate) use login::*;
pub(crate) use user::*;

/// A validated JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ValidatedJson<T>(pub(crate) T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ServerError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Path parameters, rejected the same way as every other bad input.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Params<T>(pub(crate) T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Params(value))
    }
}

/// Current time, as stored.
pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
