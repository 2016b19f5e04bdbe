use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Upper bound on photos attached to a single record.
pub const MAX_PHOTOS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgaeType {
    Sample,
    Sighting,
    Undefined,
}

impl AlgaeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgaeType::Sample => "Sample",
            AlgaeType::Sighting => "Sighting",
            AlgaeType::Undefined => "Undefined",
        }
    }
}

impl FromStr for AlgaeType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sample" => Ok(AlgaeType::Sample),
            "Sighting" => Ok(AlgaeType::Sighting),
            "Undefined" => Ok(AlgaeType::Undefined),
            _ => Err(UnknownVariant::new("type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgaeSize {
    Fist,
    #[serde(rename = "Shoe Box")]
    ShoeBox,
    #[serde(rename = "Coffee Table")]
    CoffeeTable,
    Car,
    Bus,
    Playground,
    #[serde(rename = "Sports Field")]
    SportsField,
    Other,
}

impl AlgaeSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgaeSize::Fist => "Fist",
            AlgaeSize::ShoeBox => "Shoe Box",
            AlgaeSize::CoffeeTable => "Coffee Table",
            AlgaeSize::Car => "Car",
            AlgaeSize::Bus => "Bus",
            AlgaeSize::Playground => "Playground",
            AlgaeSize::SportsField => "Sports Field",
            AlgaeSize::Other => "Other",
        }
    }
}

impl FromStr for AlgaeSize {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fist" => Ok(AlgaeSize::Fist),
            "Shoe Box" => Ok(AlgaeSize::ShoeBox),
            "Coffee Table" => Ok(AlgaeSize::CoffeeTable),
            "Car" => Ok(AlgaeSize::Car),
            "Bus" => Ok(AlgaeSize::Bus),
            "Playground" => Ok(AlgaeSize::Playground),
            "Sports Field" => Ok(AlgaeSize::SportsField),
            "Other" => Ok(AlgaeSize::Other),
            _ => Err(UnknownVariant::new("size", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgaeColor {
    Other,
    Red,
    Pink,
    Grey,
    Green,
    Orange,
    Yellow,
}

impl AlgaeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgaeColor::Other => "Other",
            AlgaeColor::Red => "Red",
            AlgaeColor::Pink => "Pink",
            AlgaeColor::Grey => "Grey",
            AlgaeColor::Green => "Green",
            AlgaeColor::Orange => "Orange",
            AlgaeColor::Yellow => "Yellow",
        }
    }
}

impl FromStr for AlgaeColor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Other" => Ok(AlgaeColor::Other),
            "Red" => Ok(AlgaeColor::Red),
            "Pink" => Ok(AlgaeColor::Pink),
            "Grey" => Ok(AlgaeColor::Grey),
            "Green" => Ok(AlgaeColor::Green),
            "Orange" => Ok(AlgaeColor::Orange),
            "Yellow" => Ok(AlgaeColor::Yellow),
            _ => Err(UnknownVariant::new("color", s)),
        }
    }
}

/// A stored column value that matches none of an enum's variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} '{value}'")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoEntry {
    /// Blob key for server-issued photos, a device-local path for cached ones
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Pixel count (width * height) for uploaded photos, client-provided otherwise
    #[serde(default)]
    pub size: Option<u64>,
}

/// Record as submitted by a client. Any `id` in the body is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(rename = "type")]
    pub record_type: AlgaeType,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub date: String,
    pub longitude: f64,
    pub latitude: f64,
    pub size: AlgaeSize,
    pub color: AlgaeColor,
    pub tube_id: Option<String>,
    pub location_description: Option<String>,
    pub notes: Option<String>,
    pub photos: Option<Vec<PhotoEntry>>,
}

impl NewRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.date.trim().is_empty() {
            return Err("date must not be empty".to_string());
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err("latitude and longitude must be finite numbers".to_string());
        }
        if let Some(photos) = &self.photos {
            if photos.len() > MAX_PHOTOS {
                return Err(format!(
                    "a record holds at most {} photos, got {}",
                    MAX_PHOTOS,
                    photos.len()
                ));
            }
        }
        Ok(())
    }

    /// Photos worth persisting.
    ///
    /// Entries cached on the device before upload carry no `size`. When none of
    /// the entries has one, the whole list is placeholder metadata and is dropped;
    /// the real photos arrive later through the photo upload endpoint.
    pub fn uploaded_photos(&self) -> Vec<PhotoEntry> {
        match &self.photos {
            Some(photos) if photos.iter().any(|photo| photo.size.is_some()) => photos.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    #[serde(rename = "type")]
    pub record_type: AlgaeType,
    pub name: Option<String>,
    pub organization: Option<String>,
    pub date: String,
    pub longitude: f64,
    pub latitude: f64,
    pub size: AlgaeSize,
    pub color: AlgaeColor,
    pub tube_id: Option<String>,
    pub location_description: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<PhotoEntry>,
}

impl Record {
    pub fn from_new(id: i64, record: NewRecord, photos: Vec<PhotoEntry>) -> Self {
        Record {
            id,
            record_type: record.record_type,
            name: record.name,
            organization: record.organization,
            date: record.date,
            longitude: record.longitude,
            latitude: record.latitude,
            size: record.size,
            color: record.color,
            tube_id: record.tube_id,
            location_description: record.location_description,
            notes: record.notes,
            photos,
        }
    }
}
