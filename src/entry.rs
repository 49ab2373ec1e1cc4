// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index entries.
//!
//! An [`Entry`] is the atomic unit of the range index: the inclusive start
//! of a numeric range plus the data that covers it. The range's upper bound
//! is implicit (one below the next entry's start), so a sorted entry
//! sequence partitions the whole key space.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Numeric range key (an IPv4 address as an integer, for example).
pub type RangeKey = u64;

/// Wire form of a record: the nine-column tuple of the source data.
type RecordTuple = (String, String, String, String, String, f64, f64, String, String);

/// Geolocation attributes for one range.
///
/// Serialized as a fixed nine-element array
/// `[country, code, region, city, postal, lat, lon, metro, area]`.
///
/// # Example
///
/// ```
/// use geo_range_index::GeoRecord;
///
/// let record = GeoRecord::new("Andorra", "AD", 42.5, 1.5);
/// assert_eq!(
///     serde_json::to_string(&record).unwrap(),
///     r#"["Andorra","AD","","","",42.5,1.5,"",""]"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RecordTuple", from = "RecordTuple")]
pub struct GeoRecord {
    /// Resolved country display name
    pub country: String,
    /// ISO 3166 alpha-2 code
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metro_code: String,
    pub area_code: String,
}

impl GeoRecord {
    /// Country-level record with empty sub-national fields.
    pub fn new(
        country: impl Into<String>,
        country_code: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            country: country.into(),
            country_code: country_code.into(),
            region: String::new(),
            city: String::new(),
            postal_code: String::new(),
            latitude,
            longitude,
            metro_code: String::new(),
            area_code: String::new(),
        }
    }
}

impl From<GeoRecord> for RecordTuple {
    fn from(r: GeoRecord) -> Self {
        (
            r.country,
            r.country_code,
            r.region,
            r.city,
            r.postal_code,
            r.latitude,
            r.longitude,
            r.metro_code,
            r.area_code,
        )
    }
}

impl From<RecordTuple> for GeoRecord {
    fn from(t: RecordTuple) -> Self {
        Self {
            country: t.0,
            country_code: t.1,
            region: t.2,
            city: t.3,
            postal_code: t.4,
            latitude: t.5,
            longitude: t.6,
            metro_code: t.7,
            area_code: t.8,
        }
    }
}

/// What covers a range: a record, or nothing.
///
/// `NoData` is written as the number `0` so gaps in the key space cost a
/// single byte in the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeData {
    NoData,
    Record(GeoRecord),
}

impl RangeData {
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    #[must_use]
    pub fn record(&self) -> Option<&GeoRecord> {
        match self {
            Self::NoData => None,
            Self::Record(record) => Some(record),
        }
    }
}

impl From<GeoRecord> for RangeData {
    fn from(record: GeoRecord) -> Self {
        Self::Record(record)
    }
}

impl Serialize for RangeData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NoData => serializer.serialize_u8(0),
            Self::Record(record) => record.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RangeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Sentinel(u64),
            Record(GeoRecord),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Sentinel(0) => Ok(Self::NoData),
            Repr::Sentinel(other) => Err(D::Error::custom(format!(
                "invalid no-data sentinel {other}, expected 0"
            ))),
            Repr::Record(record) => Ok(Self::Record(record)),
        }
    }
}

/// One range of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Inclusive lower bound of the range
    pub start: RangeKey,
    pub data: RangeData,
}

impl Entry {
    pub fn new(start: RangeKey, data: impl Into<RangeData>) -> Self {
        Self { start, data: data.into() }
    }

    /// Entry marking a range with no record.
    #[must_use]
    pub fn no_data(start: RangeKey) -> Self {
        Self { start, data: RangeData::NoData }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn andorra() -> GeoRecord {
        GeoRecord::new("Andorra", "AD", 42.5, 1.5)
    }

    #[test]
    fn test_no_data_serializes_as_zero() {
        let entry = Entry::no_data(1);
        assert_eq!(serde_json::to_string(&entry).unwrap(), r#"{"start":1,"data":0}"#);
    }

    #[test]
    fn test_record_serializes_as_tuple() {
        let entry = Entry::new(16777216, andorra());
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"start":16777216,"data":["Andorra","AD","","","",42.5,1.5,"",""]}"#
        );
    }

    #[test]
    fn test_deserialize_both_variants() {
        let no_data: Entry = serde_json::from_str(r#"{"start":1,"data":0}"#).unwrap();
        assert_eq!(no_data, Entry::no_data(1));

        let record: Entry = serde_json::from_str(
            r#"{"start":16777216,"data":["Andorra","AD","","","",42.5,1.5,"",""]}"#,
        )
        .unwrap();
        assert_eq!(record.data.record(), Some(&andorra()));
    }

    #[test]
    fn test_nonzero_sentinel_rejected() {
        let result: Result<Entry, _> = serde_json::from_str(r#"{"start":1,"data":7}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_coordinates_keep_numeric_form() {
        let record = GeoRecord::new("Antigua and Barbuda", "AG", 17.05, -61.8);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("17.05"));
        assert!(json.contains("-61.8"));

        let back: GeoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.latitude, 17.05);
        assert_eq!(back.longitude, -61.8);
    }

    #[test]
    fn test_range_data_accessors() {
        assert!(RangeData::NoData.is_no_data());
        assert!(RangeData::NoData.record().is_none());

        let data = RangeData::from(andorra());
        assert!(!data.is_no_data());
        assert_eq!(data.record().unwrap().country_code, "AD");
    }
}
