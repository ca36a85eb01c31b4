use std::sync::Arc;

pub mod flash;
pub mod form;
pub mod page;
pub mod qrcode;

use axum::{
    extract::DefaultBodyLimit,
    http::{ header::CONTENT_TYPE, HeaderValue, Method },
    routing::{ get, post },
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{ cors::{ AllowOrigin, CorsLayer }, services::ServeDir, trace::TraceLayer };

use crate::config::Config;
use crate::error::{ AppError, Result };
use crate::services::qr_service::{ QrRequest, QrService };

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub qr_service: Arc<QrService>,
}

impl AppState {
    pub fn new(config: Arc<Config>, qr_service: Arc<QrService>) -> Self {
        Self {
            config,
            qr_service,
        }
    }
}

/// Builds the full application: page flow, JSON API behind the CORS
/// allow-list, static assets and the shared body limit.
pub fn router(state: AppState) -> Result<Router> {
    let origins = state.config.cors_allowed_origins
        .iter()
        .map(|origin|
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::Config(format!("Invalid CORS origin: {}", origin)))
        )
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let api = Router::new().route("/api/qrcode", post(qrcode::generate_qr)).layer(cors);

    let app = Router::new()
        .route("/", get(page::index).post(page::generate))
        .route("/health", get(health_check))
        .merge(api)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        )
        .with_state(state);

    Ok(app)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Runs the compositor off the async workers and returns the PNG as base64.
pub async fn render_base64(state: &AppState, request: QrRequest) -> Result<String> {
    let service = state.qr_service.clone();

    tracing::debug!(
        "Generating QR code ({} byte url, logo: {})",
        request.url.len(),
        request.logo.as_ref().map_or("none", |logo| logo.file_name.as_str())
    );

    let png = tokio::task
        ::spawn_blocking(move || service.generate(&request)).await
        .map_err(|e| AppError::Internal(format!("QR generation task failed: {}", e)))??;

    Ok(STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use axum::http::{ header, StatusCode };
    use axum_test::multipart::{ MultipartForm, Part };
    use axum_test::TestServer;
    use image::{ DynamicImage, ImageFormat, Rgba, RgbaImage };
    use serde_json::{ json, Value };

    use super::qrcode::QrCodeResponse;
    use crate::error::ErrorResponse;

    fn server_with(config: Config) -> TestServer {
        let config = Arc::new(config);
        let qr_service = Arc::new(QrService::new(&config));
        let app = router(AppState::new(config, qr_service)).unwrap();
        TestServer::new(app).unwrap()
    }

    fn server() -> TestServer {
        server_with(Config {
            cors_allowed_origins: vec!["https://allowed.example".to_string()],
            ..Config::default()
        })
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(
            RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]))
        );
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png).unwrap();
        buffer
    }

    fn decode_b64_png(qrb64: &str) -> DynamicImage {
        let png = STANDARD.decode(qrb64).unwrap();
        image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "OK");
    }

    #[tokio::test]
    async fn test_json_api_returns_base64_png() {
        let response = server()
            .post("/api/qrcode")
            .json(&json!({ "url": "https://example.com" })).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: QrCodeResponse = response.json();
        let image = decode_b64_png(&body.qrb64);
        assert_eq!(image.width(), image.height());
    }

    #[tokio::test]
    async fn test_json_api_rejects_blank_url() {
        let response = server()
            .post("/api/qrcode")
            .json(&json!({ "url": "   " })).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Please enter a valid link.");

        let response = server().post("/api/qrcode").json(&json!({})).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_multipart_api_with_logo() {
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(png_bytes(300, 300)).file_name("logo.png").mime_type("image/png"));

        let response = server().post("/api/qrcode").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: QrCodeResponse = response.json();
        let image = decode_b64_png(&body.qrb64).to_rgba8();
        let center = image.get_pixel(image.width() / 2, image.height() / 2);
        assert!(center[0] > 200 && center[1] < 50, "center {:?}", center);
    }

    #[tokio::test]
    async fn test_multipart_api_rejects_unsupported_logo_type() {
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(b"GIF89a".to_vec()).file_name("logo.gif").mime_type("image/gif"));

        let response = server().post("/api/qrcode").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "Unsupported image format. Use PNG or JPG.");
    }

    #[tokio::test]
    async fn test_multipart_api_rejects_corrupt_logo() {
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(b"not an image".to_vec()).file_name("logo.png").mime_type("image/png"));

        let response = server().post("/api/qrcode").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_api_rejects_other_content_types() {
        let response = server().post("/api/qrcode").text("https://example.com").await;

        assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("text/plain"));
    }

    #[tokio::test]
    async fn test_api_rejects_oversized_upload() {
        let server = server_with(Config { max_upload_bytes: 4 * 1024, ..Config::default() });
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(vec![0u8; 16 * 1024]).file_name("logo.png").mime_type("image/png"));

        let response = server.post("/api/qrcode").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_allows_only_configured_origins() {
        let server = server();

        let response = server
            .method(Method::OPTIONS, "/api/qrcode")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://allowed.example"))
            .add_header(header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST")).await;
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            HeaderValue::from_static("https://allowed.example")
        );

        let response = server
            .post("/api/qrcode")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example"))
            .json(&json!({ "url": "https://example.com" })).await;
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_page_renders_empty_form() {
        let response = server().get("/").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.text();
        assert!(body.contains("<form id=\"qr-form\""));
        assert!(body.contains("The QR code will appear here"));
    }

    #[tokio::test]
    async fn test_page_post_renders_preview_with_url() {
        let form = MultipartForm::new().add_text("url", "  https://example.com/page  ");

        let response = server().post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.text();
        assert!(body.contains("data:image/png;base64,"));
        assert!(body.contains("value=\"https://example.com/page\""));
    }

    #[tokio::test]
    async fn test_page_post_keeps_brace_markers_in_url() {
        let form = MultipartForm::new().add_text("url", "https://x.example/{{preview}}");

        let response = server().post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.text();
        assert!(body.contains(r#"value="https://x.example/{{preview}}""#));
        // One <img> and one download link, nothing injected into the input.
        assert_eq!(body.matches("data:image/png;base64,").count(), 2);
    }

    #[tokio::test]
    async fn test_page_post_without_file_is_plain_code() {
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(Vec::new()).file_name("").mime_type("application/octet-stream"));

        let response = server().post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_page_failure_flashes_and_redirects() {
        let server = server();
        let form = MultipartForm::new().add_text("url", "");

        let response = server.post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/");
        let cookie = response.cookie(flash::FLASH_COOKIE);

        let page = server.get("/").add_cookie(cookie).await;
        assert!(page.text().contains("Please enter a valid link."));
    }

    #[tokio::test]
    async fn test_page_oversized_upload_flashes_size_message() {
        let server = server_with(Config { max_upload_bytes: 4 * 1024, ..Config::default() });
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(vec![0u8; 16 * 1024]).file_name("logo.png").mime_type("image/png"));

        let response = server.post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let cookie = response.cookie(flash::FLASH_COOKIE);
        let page = server.get("/").add_cookie(cookie).await;
        assert!(page.text().contains("File too large (max 4 KB)."));
    }

    #[tokio::test]
    async fn test_page_bad_logo_type_flashes_format_message() {
        let server = server();
        let form = MultipartForm::new()
            .add_text("url", "https://example.com")
            .add_part("logo", Part::bytes(png_bytes(8, 8)).file_name("logo.bmp").mime_type("image/bmp"));

        let response = server.post("/").multipart(form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let page = server.get("/").add_cookie(response.cookie(flash::FLASH_COOKIE)).await;
        assert!(page.text().contains("Unsupported image format. Use PNG or JPG."));
    }
}
