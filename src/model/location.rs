use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIRMED;
use crate::constants::DEATHS;
use crate::constants::RECOVERED;
use crate::AggregationError;
use crate::KeyCodec;
use crate::Result;

/// Reading category tracked per location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Confirmed,
    Deaths,
    Recovered,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Confirmed, Category::Deaths, Category::Recovered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Confirmed => CONFIRMED,
            Category::Deaths => DEATHS,
            Category::Recovered => RECOVERED,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AggregationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            CONFIRMED => Ok(Category::Confirmed),
            DEATHS => Ok(Category::Deaths),
            RECOVERED => Ok(Category::Recovered),
            other => Err(AggregationError::InvalidRecord(format!("unknown category {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: String,
    pub long: String,
}

impl Coordinates {
    pub fn new(
        lat: impl Into<String>,
        long: impl Into<String>,
    ) -> Self {
        Self {
            lat: lat.into(),
            long: long.into(),
        }
    }

    pub fn location_key(&self) -> String {
        KeyCodec::location_key(&self.lat, &self.long)
    }
}

/// Opaque record identifier produced by [`KeyCodec::encode`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub(crate) fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    /// Wrap an id received from the outside. It is not decoded here; decode
    /// errors surface where the id is interpreted.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> std::result::Result<(String, String), crate::DecodeError> {
        KeyCodec::decode(&self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One location as produced by the upstream bulk feed, before it is bound
/// to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub country: String,
    pub country_code: String,
    #[serde(default)]
    pub province: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub history: BTreeMap<String, i64>,
    pub latest: i64,
}

/// A reading for one `(coordinates, category)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    country: String,
    country_code: String,
    province: String,
    coordinates: Coordinates,
    category: Category,
    history: BTreeMap<String, i64>,
    latest: i64,
}

impl LocationRecord {
    pub fn new(
        raw: RawLocation,
        category: Category,
    ) -> Result<Self> {
        if raw.country.trim().is_empty() {
            return Err(AggregationError::InvalidRecord("country must not be empty".into()).into());
        }
        if raw.country.contains('/') {
            return Err(AggregationError::InvalidRecord(format!("country {:?} must not contain '/'", raw.country)).into());
        }
        if raw.coordinates.lat.parse::<f64>().is_err() || raw.coordinates.long.parse::<f64>().is_err() {
            return Err(AggregationError::InvalidRecord(format!(
                "coordinates ({}, {}) are not numeric",
                raw.coordinates.lat, raw.coordinates.long
            ))
            .into());
        }
        if raw.latest < 0 {
            return Err(
                AggregationError::InvalidRecord(format!("latest must not be negative, got {}", raw.latest)).into(),
            );
        }

        Ok(Self {
            country: raw.country,
            country_code: raw.country_code,
            province: raw.province,
            coordinates: raw.coordinates,
            category,
            history: raw.history,
            latest: raw.latest,
        })
    }

    pub fn record_id(&self) -> RecordId {
        KeyCodec::encode(&self.coordinates.location_key(), self.category.as_str())
    }

    /// Same record with a newer cumulative value appended to its history.
    pub fn with_reading(
        &self,
        date: impl Into<String>,
        latest: i64,
    ) -> Self {
        let mut next = self.clone();
        next.history.insert(date.into(), latest);
        next.latest = latest;
        next
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn history(&self) -> &BTreeMap<String, i64> {
        &self.history
    }

    pub fn latest(&self) -> i64 {
        self.latest
    }
}
