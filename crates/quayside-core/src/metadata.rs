//! Structured per-panorama metadata.
//!
//! Survey metadata arrives as one row of a table: column names mapped to
//! string cells. The fields the library relies on are parsed into named
//! fields; every other column is kept in [`PanoramaMetadata::extra`] as a
//! [`MetadataValue`], with the scalar type inferred the way a YAML scalar
//! would be (`"12"` is an integer, `"yes"` a boolean, `""` null).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PanoramaError;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Empty cell or an explicit null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Anything else, kept verbatim.
    Text(String),
}

impl MetadataValue {
    /// Infer the scalar type of a raw cell.
    ///
    /// Cells are read as YAML scalars with `serde_yaml`. On top of that
    /// the YAML 1.1 forms survey tables still use are honoured: `yes`/`no`
    /// and `on`/`off` are booleans, `_` may group digits, and an exponent
    /// without a decimal point (`1e3`) is text. Collections, tags and
    /// anything that fails to parse are kept verbatim as text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Self::Null;
        }
        if let Some(b) = legacy_bool(s) {
            return Self::Bool(b);
        }
        let numeric = s.trim_start_matches(['+', '-']).starts_with(|c: char| c.is_ascii_digit());
        if numeric && s.contains('_') {
            let grouped = Self::from_yaml(&s.replace('_', ""));
            if matches!(grouped, Self::Int(_) | Self::Float(_)) {
                return grouped;
            }
        }
        Self::from_yaml(s)
    }

    fn from_yaml(s: &str) -> Self {
        match serde_yaml::from_str::<serde_yaml::Value>(s) {
            Ok(serde_yaml::Value::Null) => Self::Null,
            Ok(serde_yaml::Value::Bool(b)) => Self::Bool(b),
            Ok(serde_yaml::Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if n.is_f64() && s.contains(['e', 'E']) && !s.contains('.') {
                    Self::Text(s.to_owned())
                } else {
                    n.as_f64().map_or_else(|| Self::Text(s.to_owned()), Self::Float)
                }
            }
            Ok(serde_yaml::Value::String(text)) => Self::Text(text),
            _ => Self::Text(s.to_owned()),
        }
    }

    /// Numeric value, if this is an integer or a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text value, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for [`MetadataValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn legacy_bool(s: &str) -> Option<bool> {
    if ["yes", "on"].iter().any(|w| s.eq_ignore_ascii_case(w)) {
        Some(true)
    } else if ["no", "off"].iter().any(|w| s.eq_ignore_ascii_case(w)) {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Metadata attached to one panorama.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaMetadata {
    /// Forward-viewing direction of the camera in degrees.
    pub heading: f64,
    /// What the panorama shows, e.g. a quay wall or a fence.
    pub surface_type: Option<String>,
    /// Latitude of the capture position.
    pub lat: Option<f64>,
    /// Longitude of the capture position.
    pub lng: Option<f64>,
    /// Every other column.
    pub extra: BTreeMap<String, MetadataValue>,
}

impl PanoramaMetadata {
    /// Column holding the heading.
    pub const HEADING: &'static str = "heading";
    /// Column holding the surface type.
    pub const SURFACE_TYPE: &'static str = "surface_type";
    /// Column holding the latitude.
    pub const LAT: &'static str = "lat";
    /// Column holding the longitude.
    pub const LNG: &'static str = "lng";

    /// Metadata with only a heading.
    #[must_use]
    pub fn new(heading: f64) -> Self {
        Self {
            heading,
            surface_type: None,
            lat: None,
            lng: None,
            extra: BTreeMap::new(),
        }
    }

    /// Parse a table row given as `(column, cell)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::MissingHeading`] if there is no non-empty
    /// `heading` column and [`PanoramaError::InvalidHeading`] if it is not
    /// a finite number.
    pub fn from_record<I, K, V>(fields: I) -> Result<Self, PanoramaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut heading = None;
        let mut surface_type = None;
        let mut lat = None;
        let mut lng = None;
        let mut extra = BTreeMap::new();

        for (key, raw) in fields {
            let key = key.as_ref();
            let raw = raw.as_ref();
            let value = MetadataValue::parse(raw);
            match key {
                Self::HEADING => {
                    if !value.is_null() {
                        heading = Some(
                            value
                                .as_f64()
                                .filter(|h| h.is_finite())
                                .ok_or_else(|| PanoramaError::InvalidHeading(raw.to_owned()))?,
                        );
                    }
                }
                Self::SURFACE_TYPE => {
                    surface_type = (!value.is_null()).then(|| value.to_string());
                }
                Self::LAT => lat = value.as_f64(),
                Self::LNG => lng = value.as_f64(),
                _ => {
                    extra.insert(key.to_owned(), value);
                }
            }
        }

        Ok(Self {
            heading: heading.ok_or(PanoramaError::MissingHeading)?,
            surface_type,
            lat,
            lng,
            extra,
        })
    }

    /// Look up a value by column name, covering the named fields too.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        match key {
            Self::HEADING => Some(MetadataValue::Float(self.heading)),
            Self::SURFACE_TYPE => self.surface_type.clone().map(MetadataValue::Text),
            Self::LAT => self.lat.map(MetadataValue::Float),
            Self::LNG => self.lng.map(MetadataValue::Float),
            _ => self.extra.get(key).cloned(),
        }
    }
}
