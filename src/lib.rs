//! Lay out a working set of images as a document, one image per page.
//!
//! Each image is fitted inside its page's margins without stretching or
//! enlarging it. Pages can be forced portrait or landscape, or follow each
//! image's own shape; an image whose shape disagrees with its page is turned a
//! quarter turn so it fills the page better.
//!
//! ```
//! use image_pages::{write_pdf, JpegRotator, LayoutSettings, OrientationMode, Session};
//! use std::sync::Arc;
//! # use std::io::Cursor;
//! # fn png(width: u32, height: u32) -> Vec<u8> {
//! #     let img = image::RgbImage::new(width, height);
//! #     let mut out = Vec::new();
//! #     image::DynamicImage::ImageRgb8(img)
//! #         .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
//! #         .unwrap();
//! #     out
//! # }
//!
//! let mut session = Session::new(LayoutSettings {
//!     orientation_mode: OrientationMode::Auto,
//!     ..LayoutSettings::default()
//! });
//! session.add_bytes("wide.png", png(300, 100)).expect("is an image");
//! session.add_bytes("tall.png", png(100, 300)).expect("is an image");
//!
//! let pages = futures::executor::block_on(session.generate(Arc::new(JpegRotator::default())))
//!     .expect("has images");
//! assert_eq!(pages.len(), 2);
//!
//! let mut pdf = Vec::new();
//! write_pdf(&pages, session.settings(), None, &mut pdf).expect("can write pdf");
//! ```

mod assemble;
pub use assemble::*;

mod document;
pub use document::*;

mod error;
pub use error::*;

mod image;
pub use self::image::*;

mod info;
pub use info::*;

/// Fitting images inside the printable area of a page
pub mod layout;

/// Per-image orientation decisions
pub mod orientation;
pub use orientation::{OrientationDecision, OrientationMode};

pub mod pagesize;
pub use pagesize::{PageOrientation, PageSizeName};

pub(crate) mod refs;

mod session;
pub use session::*;

mod settings;
pub use settings::*;

mod transform;
pub use transform::*;

mod units;
pub use units::*;
