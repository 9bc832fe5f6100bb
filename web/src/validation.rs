//! JSON body extraction with field-level validation.
//!
//! [`ValidatedJson`] deserializes the body and runs the type's
//! [`validator::Validate`] rules. Every failing rule becomes one
//! [`FieldError`] with a camelCase path matching the JSON the client sent,
//! e.g. `contactInfo.email` or `images[2]`.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    Json,
};
use hotel_booking_core::FieldError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// JSON body that has passed validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value
            .validate()
            .map_err(|errors| AppError::validation_failed(field_errors(&errors)))?;

        Ok(Self(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        // Well-formed JSON of the wrong shape: report it against the body
        JsonRejection::JsonDataError(err) => AppError::invalid_field("body", err.body_text()),
        other => AppError::bad_request(other.body_text()),
    }
}

/// Flatten nested validation errors into `{path, message}` pairs.
#[must_use]
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort();
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let name = camel_case(&field.to_string());
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|err| FieldError::new(path.clone(), describe(err))));
            },
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{path}[{index}]"), out);
                }
            },
        }
    }
}

fn describe(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "email" => "must be a valid email address".to_string(),
        "url" => "must be a valid URL".to_string(),
        "required" => "is required".to_string(),
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), Some(max)) => format!("length must be between {min} and {max}"),
            (Some(min), None) => format!("length must be at least {min}"),
            (None, Some(max)) => format!("length must be at most {max}"),
            (None, None) => "has an invalid length".to_string(),
        },
        "range" => "is out of range".to_string(),
        code => format!("failed the {code} check"),
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Contact {
        #[validate(email(message = "Invalid email"))]
        email: Option<String>,
    }

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Listing {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
        price_per_night: f64,
        #[validate(nested)]
        contact_info: Option<Contact>,
    }

    async fn post_json(body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route(
            "/",
            post(|ValidatedJson(listing): ValidatedJson<Listing>| async move { listing.name }),
        );
        let response = app
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("price_per_night"), "pricePerNight");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("contactInfo"), "contactInfo");
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, _) = post_json(r#"{"name":"Inn","pricePerNight":90}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_every_invalid_field_is_itemised() {
        let (status, body) = post_json(
            r#"{"name":"","pricePerNight":0,"contactInfo":{"email":"nope"}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let paths: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["contactInfo.email", "name", "pricePerNight"]);
        assert_eq!(body["errors"][2]["message"], "Price must be positive");
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_validation_error() {
        let (status, body) = post_json(r#"{"name":"Inn","pricePerNight":"cheap"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["path"], "body");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_bad_request() {
        let (status, body) = post_json("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}
