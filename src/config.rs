use std::env;
use std::path::PathBuf;

/// Largest logo window allowed, relative to the QR image side. Past this the
/// level-H error correction can no longer recover the hidden modules.
const MAX_LOGO_RATIO: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Request body cap, enforced before any handler reads the upload.
    pub max_upload_bytes: usize,
    /// Pixels per QR module.
    pub box_size: u32,
    /// Quiet border width in modules.
    pub border: u32,
    /// Side of the white center window relative to the shorter image side.
    pub logo_ratio: f64,
    /// Decoded logos with more pixels than this are rejected.
    pub max_logo_pixels: u64,
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
            box_size: 10,
            border: 4,
            logo_ratio: 0.22,
            max_logo_pixels: 25_000_000,
            cors_allowed_origins: Vec::new(),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source, falling
    /// back to the defaults for anything unset.
    pub fn from_vars<F>(var: F) -> Result<Self, Box<dyn std::error::Error>>
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();

        let server_host = var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = match var("SERVER_PORT") {
            Some(port) => port.trim().parse()?,
            None => defaults.server_port,
        };
        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(bytes) => bytes.trim().parse()?,
            None => defaults.max_upload_bytes,
        };
        let box_size = match var("QR_BOX_SIZE") {
            Some(size) => size.trim().parse()?,
            None => defaults.box_size,
        };
        let border = match var("QR_BORDER") {
            Some(border) => border.trim().parse()?,
            None => defaults.border,
        };
        let logo_ratio = match var("LOGO_RATIO") {
            Some(ratio) => ratio.trim().parse()?,
            None => defaults.logo_ratio,
        };
        let max_logo_pixels = match var("MAX_LOGO_PIXELS") {
            Some(pixels) => pixels.trim().parse()?,
            None => defaults.max_logo_pixels,
        };
        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|origins| Self::parse_origins(&origins))
            .unwrap_or_default();
        let static_dir = var("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir);

        let config = Config {
            server_host,
            server_port,
            max_upload_bytes,
            box_size,
            border,
            logo_ratio,
            max_logo_pixels,
            cors_allowed_origins,
            static_dir,
        };
        config.validate()?;

        Ok(config)
    }

    fn parse_origins(origins: &str) -> Vec<String> {
        origins
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than zero".into());
        }
        if !(1..=100).contains(&self.box_size) {
            return Err("QR_BOX_SIZE must be between 1 and 100".into());
        }
        if self.border > 64 {
            return Err("QR_BORDER must be at most 64".into());
        }
        if !(self.logo_ratio > 0.0 && self.logo_ratio <= MAX_LOGO_RATIO) {
            return Err(format!("LOGO_RATIO must be in (0, {}]", MAX_LOGO_RATIO).into());
        }
        if self.max_logo_pixels == 0 {
            return Err("MAX_LOGO_PIXELS must be greater than zero".into());
        }

        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
