use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::SessionError;
use crate::model::ids::ZoneId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ZoneError {
    #[error("zone name cannot be empty")]
    EmptyName,

    #[error("invalid zone color: {0}")]
    InvalidColor(String),
}

//
// ─── RECTANGLE ─────────────────────────────────────────────────────────────────
//

/// Axis-aligned rectangle in frame-pixel coordinates. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Builds a rectangle from a top-left origin plus width and height.
    #[must_use]
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// True when a min bound exceeds its max bound, or any bound is NaN.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.x_min <= self.x_max && self.y_min <= self.y_max)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

//
// ─── COLOR ─────────────────────────────────────────────────────────────────────
//

/// Display color of a zone, stored as RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel order expected by BGR renderers.
    #[must_use]
    pub fn to_bgr(self) -> (u8, u8, u8) {
        (self.b, self.g, self.r)
    }
}

impl FromStr for Rgb {
    type Err = ZoneError;

    /// Parses `#RRGGBB` (leading `#` optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ZoneError::InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ZoneError::InvalidColor(s.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

//
// ─── ZONE ──────────────────────────────────────────────────────────────────────
//

/// Named rectangular region of the camera frame representing a physical location.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    id: ZoneId,
    name: String,
    rect: Rect,
    color: Rgb,
}

impl Zone {
    /// Creates a zone.
    ///
    /// Rectangle ordering is checked when the zone enters a `ZoneIndex`, not here.
    ///
    /// # Errors
    ///
    /// Returns `ZoneError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: ZoneId,
        name: impl Into<String>,
        rect: Rect,
        color: Rgb,
    ) -> Result<Self, ZoneError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ZoneError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            rect,
            color,
        })
    }

    #[must_use]
    pub fn id(&self) -> ZoneId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[must_use]
    pub fn color(&self) -> Rgb {
        self.color
    }
}

//
// ─── ZONE INDEX ────────────────────────────────────────────────────────────────
//

/// Immutable per-session lookup from zone id to zone.
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    zones: HashMap<ZoneId, Zone>,
}

impl ZoneIndex {
    /// Builds the index, rejecting degenerate rectangles.
    ///
    /// When the same id appears twice the later zone wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidZoneGeometry` for the first zone whose
    /// rectangle has `min > max` on either axis.
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Result<Self, SessionError> {
        let mut map = HashMap::new();
        for zone in zones {
            if zone.rect.is_degenerate() {
                return Err(SessionError::InvalidZoneGeometry { zone: zone.id });
            }
            map.insert(zone.id, zone);
        }
        Ok(Self { zones: map })
    }

    #[must_use]
    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    #[must_use]
    pub fn contains_zone(&self, id: ZoneId) -> bool {
        self.zones.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones ordered by id.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self.zones.values().collect();
        zones.sort_by_key(|z| z.id);
        zones
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
