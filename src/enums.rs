use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── LogoFormat ──────────────────────────────────────────────────────

/// Image formats accepted for the center logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogoFormat {
    Png,
    Jpeg,
}

impl LogoFormat {
    /// Canonical MIME type.
    pub fn as_mime(&self) -> &'static str {
        match self {
            LogoFormat::Png => "image/png",
            LogoFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn all() -> &'static [LogoFormat] {
        &[LogoFormat::Png, LogoFormat::Jpeg]
    }
}

impl fmt::Display for LogoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Parses a declared MIME type. Parameters such as `; charset=...` are ignored.
impl FromStr for LogoFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim();

        match essence.to_lowercase().as_str() {
            "image/png" => Ok(LogoFormat::Png),
            "image/jpeg" | "image/jpg" => Ok(LogoFormat::Jpeg),
            _ => Err(AppError::UnsupportedFormat(s.to_string())),
        }
    }
}
