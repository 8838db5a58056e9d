use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::TicketingError;

/// JSON body that has passed its `validator` rules. Malformed JSON and rule
/// violations are both answered as 400 with the usual `{"error": ...}` body.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = TicketingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| TicketingError::Validation(rejection.body_text()))?;

        data.validate()
            .map_err(|errors| TicketingError::Validation(errors.to_string()))?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    fn request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let ValidatedJson(named) = ValidatedJson::<Named>::from_request(request(r#"{"name":"A"}"#), &())
            .await
            .unwrap();
        assert_eq!(named.name, "A");
    }

    #[tokio::test]
    async fn rule_violation_is_a_validation_error() {
        let err = ValidatedJson::<Named>::from_request(request(r#"{"name":""}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TicketingError::Validation(ref msg) if msg.contains("name")));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let err = ValidatedJson::<Named>::from_request(request("{"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TicketingError::Validation(_)));
    }
}
