//! Image acquisition from a camera-like device or a file on disk.
//!
//! A [`CaptureSource`] hands out a [`CaptureSession`] that exclusively owns
//! the opened device. The session stops the device exactly once, whether it
//! ends through [`CaptureSession::capture`], [`CaptureSession::cancel`] or a
//! plain drop.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};
use smartbin_core::{EncodedImage, WasteSample};

use crate::error::CaptureError;

/// JPEG quality used for camera frames.
pub const JPEG_QUALITY: u8 = 80;

/// One frame handed out by a device.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Packed 8-bit RGB pixels, row-major.
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Already-encoded image bytes (file picker, MJPEG cameras).
    Encoded(EncodedImage),
}

/// An opened capture device.
pub trait FrameDevice: Send {
    /// Grab the current frame.
    fn grab_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Stop streaming and release the device.
    fn stop(&mut self);
}

/// Opens a [`FrameDevice`], e.g. the rear camera.
#[async_trait]
pub trait DeviceOpener: Send + Sync {
    async fn open(&self) -> Result<Box<dyn FrameDevice>, CaptureError>;
}

/// Something a deposit can take its image from.
#[async_trait]
pub trait CaptureSource: Send {
    async fn start(&mut self) -> Result<CaptureSession, CaptureError>;
}

/// Exclusive use of an opened device for one capture.
pub struct CaptureSession {
    device: Option<Box<dyn FrameDevice>>,
    jpeg_quality: u8,
}

impl CaptureSession {
    pub fn new(device: Box<dyn FrameDevice>, jpeg_quality: u8) -> Self {
        Self {
            device: Some(device),
            jpeg_quality,
        }
    }

    /// Grab one frame, release the device, and encode the frame.
    pub async fn capture(mut self) -> Result<WasteSample, CaptureError> {
        let frame = match self.device.as_mut() {
            Some(device) => device.grab_frame(),
            None => Err(CaptureError::DeviceAccess("device already released".to_string())),
        };
        self.release();

        let image = match frame? {
            Frame::Encoded(image) => image,
            Frame::Rgb {
                width,
                height,
                pixels,
            } => {
                let quality = self.jpeg_quality;
                tokio::task::spawn_blocking(move || encode_jpeg(width, height, pixels, quality))
                    .await
                    .map_err(|e| CaptureError::Encode(format!("task join error: {}", e)))??
            }
        };
        if image.is_empty() {
            return Err(CaptureError::Encode("captured image is empty".to_string()));
        }
        tracing::debug!(mime = image.mime_type(), size = image.len(), "captured image");
        Ok(WasteSample::new(image))
    }

    /// Give the device back without capturing.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.stop();
            tracing::debug!("capture device released");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encode packed RGB pixels as JPEG.
pub fn encode_jpeg(
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    quality: u8,
) -> Result<EncodedImage, CaptureError> {
    let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, pixels).ok_or_else(|| {
        CaptureError::Encode(format!(
            "pixel buffer does not match {}x{} RGB frame",
            width, height
        ))
    })?;
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .encode_image(&img)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(EncodedImage::jpeg(jpeg))
}

/// Camera capture through a [`DeviceOpener`].
pub struct CameraCapture<D> {
    opener: D,
    jpeg_quality: u8,
}

impl<D: DeviceOpener> CameraCapture<D> {
    pub fn new(opener: D) -> Self {
        Self {
            opener,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

#[async_trait]
impl<D: DeviceOpener> CaptureSource for CameraCapture<D> {
    async fn start(&mut self) -> Result<CaptureSession, CaptureError> {
        let device = self.opener.open().await.map_err(|e| {
            tracing::warn!(error = %e, "could not open capture device");
            e
        })?;
        Ok(CaptureSession::new(device, self.jpeg_quality))
    }
}

/// Capture from an image file, as picked by the user.
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    async fn start(&mut self) -> Result<CaptureSession, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let mime = sniff_mime(&bytes, &self.path).ok_or_else(|| {
            CaptureError::Encode(format!(
                "{} is not a JPEG, PNG, WebP or GIF image",
                self.path.display()
            ))
        })?;
        let image = EncodedImage::new(bytes, mime);
        Ok(CaptureSession::new(Box::new(StillImage(Some(image))), JPEG_QUALITY))
    }
}

/// A device that yields one pre-encoded image.
struct StillImage(Option<EncodedImage>);

impl FrameDevice for StillImage {
    fn grab_frame(&mut self) -> Result<Frame, CaptureError> {
        self.0
            .take()
            .map(Frame::Encoded)
            .ok_or_else(|| CaptureError::DeviceAccess("image already taken".to_string()))
    }

    fn stop(&mut self) {
        self.0 = None;
    }
}

/// MIME type from magic bytes, then from the file extension.
pub fn sniff_mime(bytes: &[u8], path: &Path) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_magic_bytes_over_extension() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(sniff_mime(&png, Path::new("photo.jpg")), Some("image/png"));
        let webp = *b"RIFF\0\0\0\0WEBPVP8 ";
        assert_eq!(sniff_mime(&webp, Path::new("x")), Some("image/webp"));
    }

    #[test]
    fn sniff_falls_back_to_extension() {
        assert_eq!(sniff_mime(b"??", Path::new("a.JPEG")), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"??", Path::new("a.txt")), None);
        assert_eq!(sniff_mime(b"??", Path::new("noext")), None);
    }

    #[test]
    fn encode_jpeg_produces_jpeg_magic() {
        let pixels = vec![128u8; 4 * 4 * 3];
        let image = encode_jpeg(4, 4, pixels, JPEG_QUALITY).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(image.bytes().starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn encode_jpeg_rejects_short_buffer() {
        let err = encode_jpeg(4, 4, vec![0u8; 5], JPEG_QUALITY).unwrap_err();
        assert!(matches!(err, CaptureError::Encode(_)));
    }
}
