use image::ImageFormat;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Reasons an image can be refused when it is added to a working set
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The data is not in any image format we recognise
    #[error("{name} is not an image")]
    InvalidFileKind {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The data looks like an image but could not be decoded
    #[error("{name} could not be read as an image")]
    UnreadableImage {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// Width or height is zero
    #[error("{name} has no pixels ({width}x{height})")]
    EmptyImage {
        name: String,
        width: u32,
        height: u32,
    },

    #[error("an image with id {0} is already in the working set")]
    DuplicateId(ImageId),
}

/// Identifies an image within a working set. Ids are never reused while the
/// image they name is still present.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An image staged for a document. Records are immutable: the pixel data is
/// shared, and a rotated copy is always a new buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    id: ImageId,
    natural_width: u32,
    natural_height: u32,
    pixel_data: Arc<[u8]>,
    display_name: String,
}

impl ImageRecord {
    /// Create a record from already-known dimensions. The data is not decoded.
    pub fn new<S: ToString, D: Into<Arc<[u8]>>>(
        id: ImageId,
        display_name: S,
        natural_width: u32,
        natural_height: u32,
        pixel_data: D,
    ) -> Result<ImageRecord, IntakeError> {
        let display_name = display_name.to_string();
        if natural_width == 0 || natural_height == 0 {
            return Err(IntakeError::EmptyImage {
                name: display_name,
                width: natural_width,
                height: natural_height,
            });
        }

        Ok(ImageRecord {
            id,
            natural_width,
            natural_height,
            pixel_data: pixel_data.into(),
            display_name,
        })
    }

    /// Create a record from encoded image bytes, reading the dimensions from
    /// the image header.
    pub fn from_bytes<S: ToString>(
        id: ImageId,
        display_name: S,
        data: Vec<u8>,
    ) -> Result<ImageRecord, IntakeError> {
        let name = display_name.to_string();
        let format = image::guess_format(&data).map_err(|source| IntakeError::InvalidFileKind {
            name: name.clone(),
            source,
        })?;

        let (width, height) = decode_dimensions(&data, format).map_err(|source| {
            IntakeError::UnreadableImage {
                name: name.clone(),
                source,
            }
        })?;

        ImageRecord::new(id, name, width, height, data)
    }

    /// Read an image file from disk. The display name is the file name.
    pub fn from_path<P: AsRef<Path>>(id: ImageId, path: P) -> Result<ImageRecord, IntakeError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let data = std::fs::read(path)?;
        ImageRecord::from_bytes(id, name, data)
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn natural_width(&self) -> u32 {
        self.natural_width
    }

    pub fn natural_height(&self) -> u32 {
        self.natural_height
    }

    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.natural_width, self.natural_height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.natural_width as f64 / self.natural_height as f64
    }

    pub fn pixel_data(&self) -> &Arc<[u8]> {
        &self.pixel_data
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

fn decode_dimensions(data: &[u8], format: ImageFormat) -> image::ImageResult<(u32, u32)> {
    image::io::Reader::with_format(Cursor::new(data), format).into_dimensions()
}
