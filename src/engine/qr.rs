//! QR code generation.
//!
//! The `qrcode` crate computes the module matrix at its default (medium)
//! error-correction level; this module paints it onto a fixed-size RGBA
//! canvas with a quiet zone and encodes PNG. Rendering is a pure function of
//! `(text, dark, light, size, margin)`, so identical parameters give
//! bit-identical output.

use super::encode::encode_png;
use crate::error::{EngineError, ToolError, ValidationError};
use image::{DynamicImage, Rgba, RgbaImage};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_DARK: &str = "#000000";
pub const DEFAULT_LIGHT: &str = "#ffffff";

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>, ValidationError> {
    let invalid = || ValidationError::InvalidColor(value.to_string());
    let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
    Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, alpha]))
}

/// Everything that determines a QR raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrRequest {
    pub text: String,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
}

impl QrRequest {
    /// Validate text and colour strings.
    pub fn parse(text: &str, dark: &str, light: &str) -> Result<Self, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyField("QR content"));
        }
        Ok(Self {
            text: text.to_string(),
            dark: parse_hex_color(dark)?,
            light: parse_hex_color(light)?,
        })
    }
}

/// Encode `text` and paint it onto a `size`×`size` canvas with a
/// `margin`-module quiet zone.
pub fn render_qr(req: &QrRequest, size: u32, margin: u32) -> Result<RgbaImage, EngineError> {
    let code = QrCode::new(req.text.as_bytes()).map_err(|e| match e {
        QrError::DataTooLong => EngineError::EncodingCapacityExceeded,
        other => EngineError::EngineInternalFailure(format!("QR encoding failed: {other}")),
    })?;
    let width = code.width() as u32;
    let colors = code.to_colors();
    let modules = width + 2 * margin;

    let img = RgbaImage::from_fn(size, size, |px, py| {
        // nearest module for this pixel, shifted by the quiet zone
        let mx = (px as u64 * modules as u64 / size as u64) as u32;
        let my = (py as u64 * modules as u64 / size as u64) as u32;
        let dark = mx >= margin
            && my >= margin
            && mx - margin < width
            && my - margin < width
            && colors[((my - margin) * width + (mx - margin)) as usize] == Color::Dark;
        if dark {
            req.dark
        } else {
            req.light
        }
    });
    debug!("QR: {} modules → {}px", width, size);
    Ok(img)
}

/// Encode straight to PNG bytes.
pub fn render_qr_png(req: &QrRequest, size: u32, margin: u32) -> Result<Vec<u8>, EngineError> {
    let img = render_qr(req, size, margin)?;
    encode_png(&DynamicImage::ImageRgba8(img))
}

/// Live QR generator: re-encodes whenever the parameters change and reuses
/// the previous raster when they don't.
#[derive(Debug)]
pub struct QrSession {
    size: u32,
    margin: u32,
    last: Option<(QrRequest, Arc<[u8]>)>,
    encodes: usize,
}

impl QrSession {
    pub fn new(size: u32, margin: u32) -> Self {
        Self {
            size,
            margin,
            last: None,
            encodes: 0,
        }
    }

    /// PNG for `req`.
    pub fn update(&mut self, req: &QrRequest) -> Result<Arc<[u8]>, ToolError> {
        if let Some((prev, png)) = &self.last {
            if prev == req {
                return Ok(png.clone());
            }
        }
        self.encodes += 1;
        match render_qr_png(req, self.size, self.margin) {
            Ok(png) => {
                let png: Arc<[u8]> = png.into();
                self.last = Some((req.clone(), png.clone()));
                Ok(png)
            }
            Err(e) => {
                self.last = None;
                Err(e.into())
            }
        }
    }

    /// Number of real encodes performed so far.
    pub fn encode_count(&self) -> usize {
        self.encodes
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
