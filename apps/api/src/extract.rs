use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// `Json<T>` whose rejections become `AppError::Validation`, so malformed
/// bodies get the usual error envelope instead of axum's plain-text reply.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_validation)?;
        Ok(ValidJson(value))
    }
}

/// A JSON body that may be left out entirely. An empty body yields `None`;
/// anything else must parse as `T`.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes).map_err(rejection_to_validation)?;
        Ok(OptionalJson(Some(value)))
    }
}

fn rejection_to_validation(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Days {
        days: Option<u32>,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_json_type_mismatch_is_validation_error() {
        let result =
            ValidJson::<Days>::from_request(request(Some("application/json"), r#"{"days":"x"}"#), &())
                .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_valid_json_missing_content_type_is_validation_error() {
        let result = ValidJson::<Days>::from_request(request(None, r#"{"days":1}"#), &()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_optional_json_empty_body_is_none() {
        let OptionalJson(days) = OptionalJson::<Days>::from_request(request(None, ""), &())
            .await
            .unwrap();
        assert!(days.is_none());
    }

    #[tokio::test]
    async fn test_optional_json_rejects_negative_and_oversized_numbers() {
        for body in [r#"{"days":-5}"#, r#"{"days":99999999999}"#, "not json"] {
            let result =
                OptionalJson::<Days>::from_request(request(Some("application/json"), body), &())
                    .await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{body}");
        }
    }

    #[tokio::test]
    async fn test_optional_json_parses_present_body() {
        let OptionalJson(days) = OptionalJson::<Days>::from_request(
            request(Some("application/json"), r#"{"days":7}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(days.unwrap().days, Some(7));
    }
}
