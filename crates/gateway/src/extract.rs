//! Request extractors that reject with the API's JSON error body.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    Json,
};
use casebook_common::errors::AppError;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Path parameters; malformed values are a 400 with the usual error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// JSON body that has passed its `validator` rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}
