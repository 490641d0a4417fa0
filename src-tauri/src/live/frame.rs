//! Captured camera frames and their JPEG encoding.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use serde::Deserialize;

use crate::error::PostureProError;
use crate::overlay::SurfaceSize;

/// Capture size used before the camera reports its native resolution.
pub const DEFAULT_CAPTURE_SIZE: (u32, u32) = (640, 480);

/// JPEG quality for frames sent to the analysis service.
pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone)]
pub enum FramePixels {
    /// Raw pixels still to be encoded
    Rgba(RgbaImage),
    /// Already JPEG-encoded by the capturing surface
    Jpeg(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: FramePixels,
}

impl CapturedFrame {
    /// Frame from a source that hands over raw pixels, such as a native
    /// capture backend or the session tests. The webview sends JPEG instead.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: FramePixels::Rgba(image),
        }
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        SurfaceSize::new(self.width, self.height)
    }

    /// JPEG bytes ready for upload, encoding raw pixels if needed.
    pub fn into_jpeg(self) -> Result<Vec<u8>, PostureProError> {
        match self.pixels {
            FramePixels::Jpeg(bytes) if bytes.is_empty() => {
                Err(PostureProError::Frame("Captured frame is empty".to_string()))
            }
            FramePixels::Jpeg(bytes) => Ok(bytes),
            FramePixels::Rgba(image) => encode_jpeg(image, JPEG_QUALITY),
        }
    }
}

/// Native resolution if known, else [`DEFAULT_CAPTURE_SIZE`].
pub fn capture_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        DEFAULT_CAPTURE_SIZE
    } else {
        (width, height)
    }
}

/// Encode RGBA pixels as JPEG. Alpha is dropped.
pub fn encode_jpeg(image: RgbaImage, quality: u8) -> Result<Vec<u8>, PostureProError> {
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| PostureProError::Frame(format!("Failed to encode frame to JPEG: {}", e)))?;
    Ok(buffer.into_inner())
}

/// A frame (or capture failure) posted back by the webview.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSubmission {
    pub request_id: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Base64 JPEG produced by the canvas
    #[serde(default)]
    pub jpeg_base64: Option<String>,
    /// Set when the webview could not capture
    #[serde(default)]
    pub error: Option<String>,
}

impl FrameSubmission {
    pub fn into_frame(self) -> Result<CapturedFrame, PostureProError> {
        if let Some(err) = self.error {
            return Err(PostureProError::Frame(err));
        }
        let encoded = self
            .jpeg_base64
            .ok_or_else(|| PostureProError::Frame("Frame submission has no image".to_string()))?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PostureProError::Frame(format!("Invalid frame encoding: {}", e)))?;

        let (width, height) = capture_size(self.width, self.height);
        Ok(CapturedFrame {
            width,
            height,
            pixels: FramePixels::Jpeg(bytes),
        })
    }
}
