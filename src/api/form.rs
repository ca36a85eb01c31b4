//! Multipart form decoding shared by the page flow and the API.

use axum::extract::multipart::{ Multipart, MultipartError };

use crate::error::{ AppError, Result };
use crate::services::qr_service::{ LogoUpload, QrRequest };

/// Reads the `url` and `logo` fields of a multipart body into a validated
/// request. Unknown fields are skipped. A logo part without a file name is
/// what browsers send when no file was picked, so it counts as no logo.
pub async fn read_qr_form(mut multipart: Multipart, limit: usize) -> Result<QrRequest> {
    let mut url = String::new();
    let mut logo = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "url" => {
                url = field.text().await.map_err(|e| multipart_error(e, limit))?;
            }
            "logo" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

                if !file_name.is_empty() {
                    logo = Some(LogoUpload {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            other => {
                tracing::debug!("Ignoring unexpected form field '{}'", other);
            }
        }
    }

    QrRequest::new(&url, logo)
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    AppError::from_body_rejection(
        err.status(),
        format!("Malformed form data: {}", err.body_text()),
        limit
    )
}
