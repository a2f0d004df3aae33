//! Issue request body: JSON, or multipart with a `data` JSON part plus files

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidationRejection};
use crate::api::types::ApiError;
use crate::core::constants::MAX_ATTACHMENTS;
use crate::data::files::{Attachment, UploadError, UploadService};

/// Multipart part holding the JSON body
pub const DATA_FIELD: &str = "data";
/// Multipart part name for uploaded files (repeatable)
pub const ATTACHMENTS_FIELD: &str = "attachments";

/// Validated issue body plus any uploaded files
#[derive(Debug)]
pub struct IssuePayload<T> {
    pub body: T,
    pub attachments: Vec<Attachment>,
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request("MULTIPART_ERROR", e.body_text())
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<(T, Vec<Attachment>), ApiError> {
    let mut data: Option<T> = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            DATA_FIELD => {
                let text = field.text().await.map_err(multipart_error)?;
                let parsed = serde_json::from_str(&text).map_err(|e| {
                    ApiError::bad_request("JSON_PARSE_ERROR", format!("Invalid data field: {}", e))
                })?;
                data = Some(parsed);
            }
            ATTACHMENTS_FIELD => {
                if attachments.len() >= MAX_ATTACHMENTS {
                    return Err(ApiError::from_upload(UploadError::TooMany {
                        count: attachments.len() + 1,
                        max: MAX_ATTACHMENTS,
                    }));
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.is_empty() {
                    continue;
                }
                attachments.push(Attachment {
                    file_name,
                    content_type,
                    data: bytes.to_vec(),
                });
            }
            _ => tracing::debug!(field = %name, "Ignoring multipart field"),
        }
    }

    let data = data.ok_or_else(|| {
        ApiError::bad_request(
            "MISSING_DATA",
            format!("Multipart body requires a '{}' field", DATA_FIELD),
        )
    })?;
    UploadService::check_limits(&attachments).map_err(ApiError::from_upload)?;

    Ok((data, attachments))
}

impl<S, T> FromRequest<S> for IssuePayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(req.headers()) {
            let ValidatedJson(body) = ValidatedJson::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self {
                body,
                attachments: Vec::new(),
            });
        }

        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let (body, attachments) = read_multipart::<T>(multipart)
            .await
            .map_err(IntoResponse::into_response)?;
        body.validate()
            .map_err(|e| ValidationRejection::Validation(e).into_response())?;

        Ok(Self { body, attachments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Body1 {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    name, f
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Crash"}"#))
            .unwrap();
        let payload = IssuePayload::<Body1>::from_request(req, &()).await.unwrap();
        assert_eq!(payload.body.title, "Crash");
        assert!(payload.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_with_attachments() {
        let req = multipart_request(&[
            ("data", None, r#"{"title":"Crash"}"#),
            ("attachments", Some("shot.png"), "PNGDATA"),
            ("attachments", Some("empty.png"), ""),
        ]);
        let payload = IssuePayload::<Body1>::from_request(req, &()).await.unwrap();
        assert_eq!(payload.body.title, "Crash");
        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].file_name.as_deref(), Some("shot.png"));
        assert_eq!(payload.attachments[0].data, b"PNGDATA");
    }

    #[tokio::test]
    async fn test_multipart_without_data_is_400() {
        let req = multipart_request(&[("attachments", Some("shot.png"), "PNGDATA")]);
        let err = IssuePayload::<Body1>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_multipart_data_is_validated() {
        let req = multipart_request(&[("data", None, r#"{"title":""}"#)]);
        let err = IssuePayload::<Body1>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_too_many_attachments_is_400() {
        let mut parts = vec![("data", None, r#"{"title":"Crash"}"#)];
        for _ in 0..=MAX_ATTACHMENTS {
            parts.push(("attachments", Some("shot.png"), "PNGDATA"));
        }
        let err = IssuePayload::<Body1>::from_request(multipart_request(&parts), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    async fn echo_title(payload: IssuePayload<Body1>) -> String {
        payload.body.title
    }

    #[tokio::test]
    async fn test_payload_works_as_handler_extractor() {
        use tower::ServiceExt;

        let app = axum::Router::new().route("/", axum::routing::post(echo_title));
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Crash"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Crash");
    }
}
