//! Aggregations offered by the catalog and their results.

use crate::search::item_time_range;
use chrono::{Datelike, TimeZone, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use terra_stac_core::{Error, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    TotalCount,
    CollectionFrequency,
    DatetimeFrequency,
}

impl AggregationKind {
    pub const ALL: [AggregationKind; 3] = [
        AggregationKind::TotalCount,
        AggregationKind::CollectionFrequency,
        AggregationKind::DatetimeFrequency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggregationKind::TotalCount => "total_count",
            AggregationKind::CollectionFrequency => "collection_frequency",
            AggregationKind::DatetimeFrequency => "datetime_frequency",
        }
    }

    pub fn data_type(&self) -> &'static str {
        match self {
            AggregationKind::TotalCount => "integer",
            _ => "frequency_distribution",
        }
    }

    /// Entry of the aggregation listing
    pub fn descriptor(&self) -> AggregationDescriptor {
        AggregationDescriptor {
            name: self.name(),
            data_type: self.data_type(),
            frequency_distribution_data_type: match self {
                AggregationKind::TotalCount => None,
                AggregationKind::CollectionFrequency => Some("string"),
                AggregationKind::DatetimeFrequency => Some("datetime"),
            },
        }
    }

    /// Compute this aggregation over a set of matching items
    pub fn compute<'a>(&self, items: impl IntoIterator<Item = &'a Item>) -> Aggregation {
        match self {
            AggregationKind::TotalCount => Aggregation {
                name: self.name().to_string(),
                data_type: self.data_type().to_string(),
                value: Some(items.into_iter().count() as u64),
                buckets: None,
            },
            AggregationKind::CollectionFrequency => self.frequency(
                items
                    .into_iter()
                    .filter_map(|item| item.collection_id().map(str::to_string)),
            ),
            AggregationKind::DatetimeFrequency => self.frequency(items.into_iter().filter_map(
                |item| {
                    let (start, _) = item_time_range(item)?;
                    let month = Utc
                        .with_ymd_and_hms(start.year(), start.month(), 1, 0, 0, 0)
                        .single()?;
                    Some(month.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
                },
            )),
        }
    }

    fn frequency(&self, keys: impl Iterator<Item = String>) -> Aggregation {
        let mut counts: IndexMap<String, u64> = IndexMap::new();
        for key in keys {
            *counts.entry(key).or_default() += 1;
        }
        counts.sort_keys();
        Aggregation {
            name: self.name().to_string(),
            data_type: self.data_type().to_string(),
            value: None,
            buckets: Some(
                counts
                    .into_iter()
                    .map(|(key, frequency)| Bucket {
                        key,
                        data_type: self.data_type().to_string(),
                        frequency,
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::bad_request(format!("aggregation '{s}' is not supported")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationDescriptor {
    pub name: &'static str,
    pub data_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_distribution_data_type: Option<&'static str>,
}

/// Result of one aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub name: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<Bucket>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub data_type: String,
    pub frequency: u64,
}
