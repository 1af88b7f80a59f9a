use crate::orientation::OrientationMode;
use crate::pagesize::PageSizeName;
use crate::units::Pt;
use serde::{Deserialize, Serialize};

/// Margin applied on every side of the page unless configured otherwise
pub const DEFAULT_MARGIN: Pt = Pt(20.0);

/// Page settings for one document. Settings are fixed for the duration of a
/// generation; changing them on a [Session](crate::Session) affects the next one.
///
/// Settings can be loaded from JSON; missing fields take their defaults and
/// unknown page size names become A4:
///
/// ```
/// use image_pages::{LayoutSettings, OrientationMode, PageSizeName, Pt};
///
/// let settings = LayoutSettings::from_json(r#"{ "orientation_mode": "auto", "margin": 36 }"#)
///     .expect("valid settings");
/// assert_eq!(settings.page_size, PageSizeName::A4);
/// assert_eq!(settings.orientation_mode, OrientationMode::Auto);
/// assert_eq!(settings.margin, Pt(36.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub page_size: PageSizeName,
    pub orientation_mode: OrientationMode,
    /// Applied equally to all four sides
    pub margin: Pt,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            page_size: PageSizeName::A4,
            orientation_mode: OrientationMode::Portrait,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl LayoutSettings {
    pub fn new(page_size: PageSizeName, orientation_mode: OrientationMode, margin: Pt) -> Self {
        LayoutSettings {
            page_size,
            orientation_mode,
            margin,
        }
        .normalized()
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<LayoutSettings, serde_json::Error> {
        serde_json::from_str::<LayoutSettings>(json).map(LayoutSettings::normalized)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Negative or non-finite margins become zero
    pub fn normalized(self) -> LayoutSettings {
        let margin = if self.margin.0.is_finite() {
            Pt(self.margin.0.max(0.0))
        } else {
            Pt(0.0)
        };
        LayoutSettings { margin, ..self }
    }
}
