use core::str::FromStr;

use axum::{
    Json,
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use fitshop_core::DomainError;

use crate::error::ApiError;

/// JSON body whose rejection is an [`ApiError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string whose rejection is an [`ApiError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Parse a path id, reporting a malformed one as a validation error.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use fitshop_core::ItemId;

    use super::*;

    #[test]
    fn malformed_ids_are_validation_errors() {
        assert!(matches!(parse_id::<ItemId>("nope"), Err(ApiError::Validation(_))));
        let id = ItemId::new();
        assert_eq!(parse_id::<ItemId>(&id.to_string()), Ok(id));
    }
}
