// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record normalizer: joins IP blocks to their locations and produces the
//! sorted [`Entry`] sequence the folder consumes.
//!
//! Gaps between blocks become explicit `NoData` entries so every key maps
//! to exactly one entry:
//!
//! ```text
//! blocks:   [16777216..=16777471]→1  [16777472..=16778239]→2
//! entries:  1→NoData  16777216→loc1  16777472→loc2
//! ```
//!
//! Tokenizing the source CSV files happens upstream; this module works on
//! rows that already carry numbers.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::entry::{Entry, GeoRecord, RangeData, RangeKey};

/// Location identifier from the location table.
pub type LocationId = u32;

/// First key a gap sentinel can start at.
const FIRST_KEY: RangeKey = 1;

/// Words kept lower-case inside country names ("Antigua and Barbuda").
const CONNECTIVES: &[&str] = &["and", "of", "the"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Block [{start}..={end}] ends before it starts")]
    InvertedBlock { start: RangeKey, end: RangeKey },
    #[error("Block starting at {start} overlaps previous block ending at {previous_end}")]
    OverlappingBlocks { start: RangeKey, previous_end: RangeKey },
}

/// Country code to display name.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    names: HashMap<String, String>,
}

impl CountryTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a country, normalizing the casing of its name.
    pub fn insert(&mut self, code: impl Into<String>, name: &str) {
        self.names.insert(code.into(), normalize_country_name(name));
    }

    #[must_use]
    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<C: Into<String>, N: AsRef<str>> FromIterator<(C, N)> for CountryTable {
    fn from_iter<I: IntoIterator<Item = (C, N)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (code, name) in iter {
            table.insert(code, name.as_ref());
        }
        table
    }
}

/// Lower-case connective words after the first word.
///
/// `"Antigua And Barbuda"` → `"Antigua and Barbuda"`
#[must_use]
pub fn normalize_country_name(name: &str) -> String {
    name.split(' ')
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && CONNECTIVES.contains(&lower.as_str()) {
                lower
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One row of the location table, numbers already parsed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationRow {
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metro_code: String,
    pub area_code: String,
}

impl LocationRow {
    /// Resolve the country name and build the record. Unknown codes keep
    /// the code as the name.
    #[must_use]
    pub fn into_record(self, countries: &CountryTable) -> GeoRecord {
        let country = countries
            .name(&self.country_code)
            .map_or_else(|| self.country_code.clone(), str::to_string);
        GeoRecord {
            country,
            country_code: self.country_code,
            region: self.region,
            city: self.city,
            postal_code: self.postal_code,
            latitude: self.latitude,
            longitude: self.longitude,
            metro_code: self.metro_code,
            area_code: self.area_code,
        }
    }
}

/// An inclusive IP range mapped to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpBlock {
    pub start: RangeKey,
    pub end: RangeKey,
    pub location: LocationId,
}

impl IpBlock {
    #[must_use]
    pub fn new(start: RangeKey, end: RangeKey, location: LocationId) -> Self {
        Self { start, end, location }
    }
}

/// Turns blocks into the entry sequence, resolving each block's location.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    locations: HashMap<LocationId, GeoRecord>,
}

impl Normalizer {
    #[must_use]
    pub fn new(locations: HashMap<LocationId, GeoRecord>) -> Self {
        Self { locations }
    }

    /// Build from raw location rows, resolving country names.
    pub fn from_rows(
        rows: impl IntoIterator<Item = (LocationId, LocationRow)>,
        countries: &CountryTable,
    ) -> Self {
        let locations = rows
            .into_iter()
            .map(|(id, row)| (id, row.into_record(countries)))
            .collect();
        Self { locations }
    }

    #[must_use]
    pub fn location(&self, id: LocationId) -> Option<&GeoRecord> {
        self.locations.get(&id)
    }

    /// Sort `blocks` and emit one entry per block plus a `NoData` entry for
    /// every gap before a block. Nothing is emitted after the last block.
    pub fn normalize(&self, mut blocks: Vec<IpBlock>) -> Result<Vec<Entry>, NormalizeError> {
        blocks.sort_by_key(|block| block.start);

        let mut entries = Vec::with_capacity(blocks.len() + 1);
        let mut next_free = FIRST_KEY;
        let mut previous_end: Option<RangeKey> = None;
        let mut unresolved = 0usize;

        for block in blocks {
            if block.end < block.start {
                return Err(NormalizeError::InvertedBlock { start: block.start, end: block.end });
            }
            if let Some(previous_end) = previous_end {
                if block.start <= previous_end {
                    return Err(NormalizeError::OverlappingBlocks { start: block.start, previous_end });
                }
            }

            if block.start > next_free {
                entries.push(Entry::no_data(next_free));
            }

            let data = match self.locations.get(&block.location) {
                Some(record) => RangeData::Record(record.clone()),
                None => {
                    unresolved += 1;
                    warn!(location = block.location, start = block.start, "Block references unknown location");
                    RangeData::NoData
                }
            };
            entries.push(Entry { start: block.start, data });

            previous_end = Some(block.end);
            next_free = block.end.saturating_add(1);
        }

        debug!(entries = entries.len(), unresolved, "Blocks normalized");
        Ok(entries)
    }
}
