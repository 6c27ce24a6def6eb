use axum::{
    extract::{FromRequestParts, Multipart, Query},
    http::{header, request::Parts, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::{
    errors::{FieldError, ServiceError},
    i18n::Locale,
    services::{documents::UploadedFile, order_form::OrderForm},
    ApiResponse, AppState,
};

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Name substring filter for list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Case-insensitive substring
    pub search: Option<String>,
}

/// Irreversible deletes must be confirmed explicitly
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeleteConfirmation {
    /// Must be `true`
    pub confirm: Option<bool>,
}

impl DeleteConfirmation {
    pub fn require(&self) -> Result<(), ServiceError> {
        match self.confirm {
            Some(true) => Ok(()),
            _ => Err(ServiceError::BadRequest(
                "Deletion is irreversible; repeat the request with confirm=true".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LangParam {
    lang: Option<String>,
}

/// Locale picked from `lang`, then `Accept-Language`, then the configured default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(param) = Query::<LangParam>::try_from_uri(&parts.uri).unwrap_or_default();
        let accept = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(RequestLocale(Locale::resolve(
            param.lang.as_deref(),
            accept,
            state.config.default_locale,
        )))
    }
}

/// Parts of a multipart body carrying an order and/or a file
#[derive(Debug, Default)]
pub struct MultipartUpload {
    pub order: Option<OrderForm>,
    pub file: Option<UploadedFile>,
}

/// Reads the `order` (JSON) and `file` parts; other parts are ignored.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartUpload, ServiceError> {
    let mut upload = MultipartUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("order") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::BadRequest(format!("Unreadable order part: {}", e)))?;
                let form = serde_json::from_str::<OrderForm>(&text).map_err(|e| {
                    ServiceError::InvalidFields(vec![FieldError::new(
                        "order",
                        format!("Must be a JSON order: {}", e),
                    )])
                })?;
                upload.order = Some(form);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        ServiceError::PayloadTooLarge(e.body_text())
                    } else {
                        ServiceError::BadRequest(format!("File could not be read: {}", e))
                    }
                })?;
                upload.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// The `file` part, or a field error when absent
pub fn require_file(file: Option<UploadedFile>) -> Result<UploadedFile, ServiceError> {
    file.ok_or_else(|| ServiceError::InvalidFields(vec![FieldError::new("file", "A file is required")]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn delete_requires_explicit_true() {
        assert!(DeleteConfirmation { confirm: Some(true) }.require().is_ok());
        assert_matches!(
            DeleteConfirmation { confirm: Some(false) }.require(),
            Err(ServiceError::BadRequest(_))
        );
        assert_matches!(DeleteConfirmation::default().require(), Err(ServiceError::BadRequest(_)));
    }

    #[test]
    fn missing_file_is_a_field_error() {
        assert_matches!(require_file(None), Err(ServiceError::InvalidFields(f)) if f[0].field == "file");
    }
}
