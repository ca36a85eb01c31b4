use std::io::Cursor;

use axum::body::Bytes;
use image::{
    imageops::{ self, FilterType },
    DynamicImage,
    ImageDecoder,
    ImageFormat,
    ImageReader,
    Rgba,
    RgbaImage,
};
use qrcode::{ types::QrError, Color, EcLevel, QrCode };

use crate::config::Config;
use crate::enums::LogoFormat;
use crate::error::{ AppError, Result, EMPTY_URL_MESSAGE };

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// An uploaded logo as received from the client.
#[derive(Debug, Clone)]
pub struct LogoUpload {
    pub file_name: String,
    /// MIME type declared by the client, not sniffed.
    pub content_type: String,
    pub data: Bytes,
}

impl LogoUpload {
    pub fn format(&self) -> Result<LogoFormat> {
        self.content_type.parse()
    }
}

/// A validated generation request: trimmed, non-empty url and, if present,
/// a logo whose declared type is accepted.
#[derive(Debug, Clone)]
pub struct QrRequest {
    pub url: String,
    pub logo: Option<LogoUpload>,
}

impl QrRequest {
    pub fn new(url: &str, logo: Option<LogoUpload>) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput(EMPTY_URL_MESSAGE.to_string()));
        }

        if let Some(logo) = &logo {
            logo.format()?;
        }

        Ok(Self {
            url: url.to_string(),
            logo,
        })
    }
}

pub struct QrService {
    box_size: u32,
    border: u32,
    logo_ratio: f64,
    max_logo_pixels: u64,
}

impl QrService {
    pub fn new(config: &Config) -> Self {
        Self {
            box_size: config.box_size,
            border: config.border,
            logo_ratio: config.logo_ratio,
            max_logo_pixels: config.max_logo_pixels,
        }
    }

    pub fn generate(&self, request: &QrRequest) -> Result<Vec<u8>> {
        self.compose(&request.url, request.logo.as_ref())
    }

    /// Renders `url` as a level-H QR code with a white center window and
    /// the optional logo blended into it. Returns PNG bytes.
    pub fn compose(&self, url: &str, logo: Option<&LogoUpload>) -> Result<Vec<u8>> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidInput(EMPTY_URL_MESSAGE.to_string()));
        }

        let logo = logo.map(|logo| self.decode_logo(logo)).transpose()?;

        let mut canvas = self.render_matrix(url)?;
        let window = CenterWindow::for_canvas(canvas.width(), canvas.height(), self.logo_ratio);
        window.clear(&mut canvas);

        if let Some(logo) = logo {
            window.paste(&mut canvas, &logo);
        }

        tracing::debug!(
            "Rendered {}x{} QR code for {} byte payload",
            canvas.width(),
            canvas.height(),
            url.len()
        );

        let mut buffer = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::Generation(e.to_string()))?;

        Ok(buffer)
    }

    fn render_matrix(&self, data: &str) -> Result<RgbaImage> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H).map_err(
            |e| match e {
                QrError::DataTooLong =>
                    AppError::InvalidInput("The link is too long to fit in a QR code.".to_string()),
                other => AppError::Generation(other.to_string()),
            }
        )?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let (box_size, border) = (self.box_size, self.border);
        let side = (modules + 2 * border) * box_size;

        Ok(
            RgbaImage::from_fn(side, side, |x, y| {
                let (mx, my) = (x / box_size, y / box_size);
                let in_matrix =
                    (border..border + modules).contains(&mx) &&
                    (border..border + modules).contains(&my);
                if !in_matrix {
                    return LIGHT;
                }

                let index = ((my - border) * modules + (mx - border)) as usize;
                match colors[index] {
                    Color::Dark => DARK,
                    Color::Light => LIGHT,
                }
            })
        )
    }

    /// Validates the declared type, then decodes with the format sniffed
    /// from the bytes.
    fn decode_logo(&self, logo: &LogoUpload) -> Result<RgbaImage> {
        let declared = logo.format()?;

        let decoder = ImageReader::new(Cursor::new(logo.data.as_ref()))
            .with_guessed_format()
            .map_err(|e| AppError::ImageDecode(e.to_string()))?
            .into_decoder()
            .map_err(|e| AppError::ImageDecode(e.to_string()))?;

        let (width, height) = decoder.dimensions();
        if u64::from(width) * u64::from(height) > self.max_logo_pixels {
            return Err(
                AppError::ImageDecode(
                    format!(
                        "{}x{} logo exceeds the {} pixel limit",
                        width,
                        height,
                        self.max_logo_pixels
                    )
                )
            );
        }

        let image = DynamicImage::from_decoder(decoder).map_err(|e|
            AppError::ImageDecode(e.to_string())
        )?;

        tracing::debug!(
            "Decoded logo '{}' ({}, {}x{})",
            logo.file_name,
            declared,
            width,
            height
        );

        Ok(image.to_rgba8())
    }
}

/// Square backdrop at the center of the code, reserved for the logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CenterWindow {
    x: u32,
    y: u32,
    side: u32,
}

impl CenterWindow {
    fn for_canvas(width: u32, height: u32, ratio: f64) -> Self {
        let side = ((width.min(height) as f64) * ratio) as u32;

        Self {
            x: (width - side) / 2,
            y: (height - side) / 2,
            side,
        }
    }

    /// Paints the window opaque white. The far edge is inclusive.
    fn clear(&self, canvas: &mut RgbaImage) {
        if canvas.width() == 0 || canvas.height() == 0 {
            return;
        }

        let x_end = (self.x + self.side).min(canvas.width() - 1);
        let y_end = (self.y + self.side).min(canvas.height() - 1);

        for y in self.y..=y_end {
            for x in self.x..=x_end {
                canvas.put_pixel(x, y, LIGHT);
            }
        }
    }

    /// Shrinks `logo` to fit the window and alpha-blends it at the center.
    fn paste(&self, canvas: &mut RgbaImage, logo: &RgbaImage) {
        if self.side == 0 {
            return;
        }

        let (width, height) = fit_within(logo.width(), logo.height(), self.side);
        let logo = if (width, height) == logo.dimensions() {
            logo.clone()
        } else {
            imageops::resize(logo, width, height, FilterType::Lanczos3)
        };

        let x = self.x + (self.side - width) / 2;
        let y = self.y + (self.side - height) / 2;
        imageops::overlay(canvas, &logo, i64::from(x), i64::from(y));
    }
}

/// Largest size not exceeding `max_side` on either axis with the same aspect
/// ratio. Never enlarges.
fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let max_side = max_side.max(1);
    if width <= max_side && height <= max_side {
        return (width, height);
    }

    let scale = (max_side as f64 / width as f64).min(max_side as f64 / height as f64);
    let width = ((width as f64 * scale).round() as u32).clamp(1, max_side);
    let height = ((height as f64 * scale).round() as u32).clamp(1, max_side);

    (width, height)
}
