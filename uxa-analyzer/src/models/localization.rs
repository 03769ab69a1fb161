//! Localized problem regions
//!
//! Coordinates arrive on a 0-1000 normalized scale as `[y_min, x_min, y_max, x_max]`,
//! independent of the screenshot's pixel size.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Extent of the normalized coordinate space
pub const NORMALIZED_EXTENT: f64 = 1000.0;

/// Wire key holding the element list
pub const ELEMENTS_KEY: &str = "element_coordinates";

/// Normalized bounding box; always satisfies `x_min < x_max` and `y_min < y_max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    y_min: f64,
    x_min: f64,
    y_max: f64,
    x_max: f64,
}

impl BoundingBox {
    /// Build a box, returning None unless every value is finite and the ordering holds
    pub fn new(y_min: f64, x_min: f64, y_max: f64, x_max: f64) -> Option<Self> {
        let finite = [y_min, x_min, y_max, x_max].iter().all(|v| v.is_finite());
        if !finite || x_min >= x_max || y_min >= y_max {
            return None;
        }
        Some(Self {
            y_min,
            x_min,
            y_max,
            x_max,
        })
    }

    /// Build a box from wire values after clamping each to [0, 1000]
    pub fn clamped(y_min: f64, x_min: f64, y_max: f64, x_max: f64) -> Option<Self> {
        let c = |v: f64| v.clamp(0.0, NORMALIZED_EXTENT);
        Self::new(c(y_min), c(x_min), c(y_max), c(x_max))
    }

    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Wire order `[y_min, x_min, y_max, x_max]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.y_min, self.x_min, self.y_max, self.x_max]
    }

    /// Map onto a `width` x `height` pixel grid
    ///
    /// Each edge is scaled (`px = norm * dim / 1000`), floored and clamped to
    /// `[0, dim - 1]`. Returns None when the pixel box collapses.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<PixelBox> {
        if width == 0 || height == 0 {
            return None;
        }
        let scale = |norm: f64, dim: u32| -> u32 {
            let px = (norm * f64::from(dim) / NORMALIZED_EXTENT).floor();
            px.clamp(0.0, f64::from(dim - 1)) as u32
        };

        let pixel = PixelBox {
            x1: scale(self.x_min, width),
            y1: scale(self.y_min, height),
            x2: scale(self.x_max, width),
            y2: scale(self.y_max, height),
        };

        if pixel.x1 >= pixel.x2 || pixel.y1 >= pixel.y2 {
            None
        } else {
            Some(pixel)
        }
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [y_min, x_min, y_max, x_max] = <[f64; 4]>::deserialize(deserializer)?;
        BoundingBox::new(y_min, x_min, y_max, x_max)
            .ok_or_else(|| D::Error::custom("bounding box requires x_min < x_max and y_min < y_max"))
    }
}

/// Pixel-space box (`x1 < x2`, `y1 < y2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Center point in pixel coordinates
    pub fn center(&self) -> (f64, f64) {
        (
            (f64::from(self.x1) + f64::from(self.x2)) / 2.0,
            (f64::from(self.y1) + f64::from(self.y2)) / 2.0,
        )
    }
}

/// A problem area mapped onto the screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedElement {
    /// Problem area id this element refers to
    pub id: String,

    /// Short element description
    #[serde(rename = "element", default)]
    pub label: String,

    /// Region, or None when the service could not place the element
    #[serde(rename = "coordinates")]
    pub bounding_box: Option<BoundingBox>,

    /// Localization confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Parsed localization payload as persisted to `localization_parsed.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizationDocument {
    pub element_coordinates: Vec<LocalizedElement>,
}
