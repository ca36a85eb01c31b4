use axum::{
    extract::{ FromRequest, Multipart, Request, State },
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{ Deserialize, Serialize };

use crate::error::{ AppError, Result };
use crate::services::qr_service::QrRequest;

use super::{ form, render_base64, AppState };

/// JSON body accepted by the API. JSON mode carries no logo.
#[derive(Debug, Deserialize)]
pub struct GenerateQrRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QrCodeResponse {
    /// Base64 (standard alphabet, padded) PNG.
    pub qrb64: String,
}

/// `POST /api/qrcode`: multipart (`url`, optional `logo`) or JSON (`url`).
pub async fn generate_qr(
    State(state): State<AppState>,
    request: Request
) -> Result<Json<QrCodeResponse>> {
    let limit = state.config.max_upload_bytes;
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let qr_request = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state).await.map_err(|e|
            AppError::from_body_rejection(e.status(), e.body_text(), limit)
        )?;
        form::read_qr_form(multipart, limit).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<GenerateQrRequest>
            ::from_request(request, &state).await
            .map_err(|e| AppError::from_body_rejection(e.status(), e.body_text(), limit))?;
        QrRequest::new(&body.url, None)?
    } else {
        return Err(AppError::UnsupportedMediaType(content_type));
    };

    let qrb64 = render_base64(&state, qr_request).await?;

    Ok(Json(QrCodeResponse { qrb64 }))
}
