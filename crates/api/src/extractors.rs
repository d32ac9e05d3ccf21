//! Request extractors.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use pipeline_core::error::ValidationErrorCode;
use pipeline_core::TenantId;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::response::ApiError;
use crate::state::AppState;

/// Tenant owning the request, resolved from the tenant header.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantId);

#[async_trait]
impl FromRequestParts<AppState> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let hint = parts
            .headers
            .get(state.tenant_header.as_str())
            .and_then(|h| h.to_str().ok());

        Ok(Tenant(state.tenants.resolve(hint)?))
    }
}

/// JSON body whose rejections use the API error format.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected request body");
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    ApiError::with_code(
        status,
        ValidationErrorCode::InvalidPayload.code(),
        rejection.body_text(),
    )
}

/// Query string whose rejections use the API error format.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(
        ValidationErrorCode::InvalidParameter.code(),
        rejection.body_text(),
    )
}
