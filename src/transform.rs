//! Turning image pixels a quarter turn so they suit their page.

use futures::channel::oneshot;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use std::sync::Arc;
use thiserror::Error;

/// JPEG quality used when re-encoding rotated images (0.9 on a 0-1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Why an image could not be rotated
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("could not decode image for rotation")]
    Decode(#[source] image::ImageError),

    #[error("could not re-encode rotated image")]
    Encode(#[source] image::ImageError),

    #[error("could not start a rotation worker")]
    Spawn(#[source] std::io::Error),

    /// The worker went away without producing a result
    #[error("rotation was interrupted")]
    Interrupted,
}

/// Something that can rotate encoded image data 90° clockwise, returning new
/// encoded data whose width and height are swapped.
pub trait Rotator: Send + Sync {
    fn rotate90(&self, data: &[u8]) -> Result<Vec<u8>, TransformError>;
}

impl<F> Rotator for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, TransformError> + Send + Sync,
{
    fn rotate90(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        self(data)
    }
}

/// Decodes any supported format, rotates, and writes the result as a JPEG.
/// Transparency is flattened away.
#[derive(Debug, Copy, Clone)]
pub struct JpegRotator {
    quality: u8,
}

impl Default for JpegRotator {
    fn default() -> Self {
        JpegRotator {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl JpegRotator {
    /// `quality` is clamped to 1..=100
    pub fn new(quality: u8) -> JpegRotator {
        JpegRotator {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Rotator for JpegRotator {
    fn rotate90(&self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        let source = image::load_from_memory(data).map_err(TransformError::Decode)?;
        let rotated = source.rotate90().to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(
                rotated.as_raw(),
                rotated.width(),
                rotated.height(),
                ColorType::Rgb8,
            )
            .map_err(TransformError::Encode)?;
        Ok(out)
    }
}

/// Run `rotator` over `data` on its own thread, resolving once it finishes.
pub(crate) async fn rotate_detached(
    rotator: Arc<dyn Rotator>,
    data: Arc<[u8]>,
) -> Result<Vec<u8>, TransformError> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("rotate90".into())
        .spawn(move || {
            // the receiver only goes away if the generation was dropped
            let _ = tx.send(rotator.rotate90(&data));
        })
        .map_err(TransformError::Spawn)?;

    rx.await.unwrap_or(Err(TransformError::Interrupted))
}
