//! Named page sizes and their effective dimensions.
//!
//! All sizes are stored in portrait orientation (width, height) where width < height.
//! Use [`effective_dimensions`] or the [`Orient`] trait to get the landscape form.
//!
//! # Example
//!
//! ```
//! use image_pages::pagesize::{effective_dimensions, PageOrientation, PageSizeName};
//! use image_pages::Pt;
//!
//! let (w, h) = effective_dimensions(PageSizeName::A4, PageOrientation::Landscape);
//! assert_eq!((w, h), (Pt(842.0), Pt(595.0)));
//!
//! // unknown names resolve to A4
//! assert_eq!(PageSizeName::from_name("Tabloid"), PageSizeName::A4);
//! ```

use crate::units::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page dimensions as (width, height) in points.
pub type PageSize = (Pt, Pt);

pub const A3: PageSize = (Pt(842.0), Pt(1191.0));
pub const A4: PageSize = (Pt(595.0), Pt(842.0));
pub const A5: PageSize = (Pt(420.0), Pt(595.0));
pub const LETTER: PageSize = (Pt(612.0), Pt(792.0));
pub const LEGAL: PageSize = (Pt(612.0), Pt(1008.0));

/// The page sizes a document can be laid out on
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageSizeName {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PageSizeName {
    pub fn all() -> &'static [PageSizeName] {
        &[
            PageSizeName::A4,
            PageSizeName::A3,
            PageSizeName::A5,
            PageSizeName::Letter,
            PageSizeName::Legal,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            PageSizeName::A4 => "A4",
            PageSizeName::A3 => "A3",
            PageSizeName::A5 => "A5",
            PageSizeName::Letter => "Letter",
            PageSizeName::Legal => "Legal",
        }
    }

    /// Look up a size by name, ignoring case. Anything unrecognised is A4.
    pub fn from_name(name: &str) -> PageSizeName {
        let name = name.trim();
        PageSizeName::all()
            .iter()
            .copied()
            .find(|size| size.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    /// The canonical (portrait) size
    pub fn size(self) -> PageSize {
        match self {
            PageSizeName::A4 => A4,
            PageSizeName::A3 => A3,
            PageSizeName::A5 => A5,
            PageSizeName::Letter => LETTER,
            PageSizeName::Legal => LEGAL,
        }
    }
}

impl fmt::Display for PageSizeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for PageSizeName {
    fn from(name: String) -> Self {
        PageSizeName::from_name(&name)
    }
}

impl From<PageSizeName> for String {
    fn from(size: PageSizeName) -> Self {
        size.name().to_string()
    }
}

/// Which way up a page is
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl fmt::Display for PageOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageOrientation::Portrait => f.write_str("portrait"),
            PageOrientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// Convert page sizes between portrait and landscape orientations.
pub trait Orient {
    /// Returns the size in portrait orientation (width ≤ height).
    fn portrait(self) -> Self;
    /// Returns the size in landscape orientation (width ≥ height).
    fn landscape(self) -> Self;
    /// Returns the size in the given orientation
    fn oriented(self, orientation: PageOrientation) -> Self;
}

impl Orient for PageSize {
    fn portrait(self) -> Self {
        if self.0 <= self.1 {
            self
        } else {
            (self.1, self.0)
        }
    }

    fn landscape(self) -> Self {
        if self.0 >= self.1 {
            self
        } else {
            (self.1, self.0)
        }
    }

    fn oriented(self, orientation: PageOrientation) -> Self {
        match orientation {
            PageOrientation::Portrait => self.portrait(),
            PageOrientation::Landscape => self.landscape(),
        }
    }
}

/// The (width, height) of a named page size when laid out in `orientation`.
pub fn effective_dimensions(size: PageSizeName, orientation: PageOrientation) -> PageSize {
    size.size().oriented(orientation)
}
