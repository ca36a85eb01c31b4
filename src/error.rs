use thiserror::Error;

pub const EMPTY_URL_MESSAGE: &str = "Please enter a valid link.";

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Upload limit as shown to users, rounded up so it never reads as zero.
pub fn human_size(bytes: usize) -> String {
    if bytes >= MIB {
        format!("{} MB", bytes.div_ceil(MIB))
    } else if bytes >= KIB {
        format!("{} KB", bytes.div_ceil(KIB))
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Unsupported image format: {0}")] UnsupportedFormat(String),

    #[error("Image decode error: {0}")] ImageDecode(String),

    #[error("Upload exceeds the {limit} byte limit")] PayloadTooLarge {
        limit: usize,
    },

    #[error("Unsupported content type: {0}")] UnsupportedMediaType(String),

    #[error("QR generation error: {0}")] Generation(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// Message safe to show to the person who submitted the request.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::UnsupportedFormat(_) =>
                "Unsupported image format. Use PNG or JPG.".to_string(),
            AppError::ImageDecode(_) =>
                "Could not read the image. Try another file (PNG/JPG).".to_string(),
            AppError::PayloadTooLarge { limit } =>
                format!("File too large (max {}).", human_size(*limit)),
            AppError::UnsupportedMediaType(content_type) =>
                format!(
                    "Unsupported content type '{}'. Use multipart/form-data or application/json.",
                    content_type
                ),
            | AppError::Generation(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "Could not generate the QR code.".to_string(),
        }
    }

    /// Failures that are not the client's fault and must be logged in full.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AppError::Generation(_) | AppError::Config(_) | AppError::Internal(_))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFormat(_) | AppError::UnsupportedMediaType(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps an extractor rejection while reading the request body. Hitting
    /// the body limit is reported as such, anything else as malformed input.
    pub fn from_body_rejection(
        status: axum::http::StatusCode,
        body_text: String,
        limit: usize
    ) -> Self {
        if status == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge { limit }
        } else {
            AppError::InvalidInput(body_text)
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.user_message(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let status = self.status_code();
        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
