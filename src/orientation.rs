//! Deciding which way up each page goes, and whether its image has to be
//! turned to suit it.

use crate::image::{ImageId, ImageRecord};
use crate::pagesize::PageOrientation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// In [`OrientationMode::Auto`], images whose width / height ratio is strictly
/// greater than this get a landscape page. This is a policy value rather than a
/// derived one: anything between 1.0 and this threshold is close enough to
/// square that it stays portrait.
pub const AUTO_LANDSCAPE_THRESHOLD: f64 = 1.2;

/// How page orientation is chosen for a document
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Every page is portrait
    #[default]
    Portrait,
    /// Every page is landscape
    Landscape,
    /// Each page follows the shape of its own image
    Auto,
}

impl OrientationMode {
    /// The orientation every page gets, or `None` in auto mode
    pub fn fixed(self) -> Option<PageOrientation> {
        match self {
            OrientationMode::Portrait => Some(PageOrientation::Portrait),
            OrientationMode::Landscape => Some(PageOrientation::Landscape),
            OrientationMode::Auto => None,
        }
    }
}

/// The orientation chosen for one image's page
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OrientationDecision {
    pub resolved_orientation: PageOrientation,
    /// The image is wide on a portrait page or tall on a landscape one, so it
    /// gets turned 90° before placement
    pub rotation_needed: bool,
}

impl OrientationDecision {
    /// The same page orientation, with the image placed as-is
    pub fn without_rotation(self) -> OrientationDecision {
        OrientationDecision {
            rotation_needed: false,
            ..self
        }
    }
}

/// Whether an image with the given aspect ratio disagrees with a page orientation.
///
/// Note the boundary: a square image counts as tall, so it is never rotated onto a
/// portrait page but always is onto a landscape one.
pub fn is_rotation_needed(aspect_ratio: f64, orientation: PageOrientation) -> bool {
    match orientation {
        PageOrientation::Portrait => aspect_ratio > 1.0,
        PageOrientation::Landscape => aspect_ratio <= 1.0,
    }
}

/// Decide the page orientation for an image of `width` x `height` pixels.
pub fn resolve_orientation(width: u32, height: u32, mode: OrientationMode) -> OrientationDecision {
    let aspect_ratio = width as f64 / height as f64;

    let resolved_orientation = mode.fixed().unwrap_or_else(|| {
        if aspect_ratio > AUTO_LANDSCAPE_THRESHOLD {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        }
    });

    OrientationDecision {
        resolved_orientation,
        rotation_needed: is_rotation_needed(aspect_ratio, resolved_orientation),
    }
}

/// Remembers auto-mode decisions per image. Owned by whatever owns the working
/// set, which is responsible for invalidating entries when images go away or the
/// orientation mode changes.
#[derive(Debug, Default, Clone)]
pub struct DecisionCache {
    entries: HashMap<ImageId, OrientationDecision>,
}

impl DecisionCache {
    pub fn new() -> DecisionCache {
        DecisionCache::default()
    }

    /// Decide the orientation for `image`. Auto-mode results are cached by id;
    /// explicit modes are cheap and never cached.
    pub fn resolve(&mut self, image: &ImageRecord, mode: OrientationMode) -> OrientationDecision {
        if mode != OrientationMode::Auto {
            return resolve_orientation(image.natural_width(), image.natural_height(), mode);
        }

        *self.entries.entry(image.id()).or_insert_with(|| {
            let decision =
                resolve_orientation(image.natural_width(), image.natural_height(), mode);
            debug!(
                id = %image.id(),
                orientation = %decision.resolved_orientation,
                rotate = decision.rotation_needed,
                "auto orientation resolved"
            );
            decision
        })
    }

    pub fn get(&self, id: ImageId) -> Option<OrientationDecision> {
        self.entries.get(&id).copied()
    }

    /// Forget the decision for one image
    pub fn invalidate(&mut self, id: ImageId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
