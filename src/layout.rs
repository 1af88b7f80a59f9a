//! Fitting an image into the printable area of its page.
//!
//! The image is scaled uniformly so it fits inside the page minus its margins,
//! and is never enlarged past its natural size (1 pixel = 1 point at scale 1.0).
//! When the image is going to be rotated onto the page, the fit is computed on
//! its transposed dimensions.
//!
//! # Example
//!
//! ```
//! use image_pages::layout::compute_display_size;
//! use image_pages::orientation::{resolve_orientation, OrientationMode};
//! use image_pages::pagesize::PageSizeName;
//! use image_pages::Pt;
//!
//! let decision = resolve_orientation(2000, 1000, OrientationMode::Portrait);
//! let size = compute_display_size(2000, 1000, decision, PageSizeName::A4, Pt(20.0));
//! assert!((size.width.0 - 401.0).abs() < 1e-3);
//! assert!((size.height.0 - 802.0).abs() < 1e-3);
//! ```

use crate::orientation::OrientationDecision;
use crate::pagesize::{effective_dimensions, PageOrientation, PageSizeName};
use crate::units::Pt;

/// The printable area is never allowed to shrink below this many points in
/// either direction, however large the margins are.
pub const MIN_AVAILABLE_EXTENT: f64 = 1.0;

/// The size an image is drawn at on its page
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DisplaySize {
    pub width: Pt,
    pub height: Pt,
    /// Points per pixel; never more than 1.0
    pub scale: f64,
}

/// The (width, height) of the page area inside the margins.
pub fn available_area(
    page_size: PageSizeName,
    orientation: PageOrientation,
    margin: Pt,
) -> (f64, f64) {
    let (page_width, page_height) = effective_dimensions(page_size, orientation);
    let margin = margin.to_f64().max(0.0);
    (
        (page_width.to_f64() - 2.0 * margin).max(MIN_AVAILABLE_EXTENT),
        (page_height.to_f64() - 2.0 * margin).max(MIN_AVAILABLE_EXTENT),
    )
}

/// Compute how large an image of `width` x `height` pixels is drawn on its page.
pub fn compute_display_size(
    width: u32,
    height: u32,
    decision: OrientationDecision,
    page_size: PageSizeName,
    margin: Pt,
) -> DisplaySize {
    let (available_width, available_height) =
        available_area(page_size, decision.resolved_orientation, margin);

    let (fit_width, fit_height) = if decision.rotation_needed {
        (height as f64, width as f64)
    } else {
        (width as f64, height as f64)
    };

    let scale = (available_width / fit_width)
        .min(available_height / fit_height)
        .min(1.0);

    DisplaySize {
        width: Pt::from_f64(fit_width * scale),
        height: Pt::from_f64(fit_height * scale),
        scale,
    }
}
