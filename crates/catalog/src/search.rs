//! Search parameters as received from clients and their normalized form.

use crate::aggregation::AggregationKind;
use crate::store::ItemQuery;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use terra_stac_core::{Error, Item, Result};

pub const DEFAULT_ITEM_LIMIT: usize = 10;
pub const MAX_ITEM_LIMIT: usize = 10_000;

/// 2D bounding box `[west, south, east, north]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BBox {
    /// Accepts 2D boxes and 3D boxes (`[w, s, zmin, e, n, zmax]`)
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let bbox = match *values {
            [west, south, east, north] => Self {
                west,
                south,
                east,
                north,
            },
            [west, south, _, east, north, _] => Self {
                west,
                south,
                east,
                north,
            },
            _ => {
                return Err(Error::bad_request(format!(
                    "bbox must have 4 or 6 coordinates, got {}",
                    values.len()
                )))
            }
        };
        if bbox.south > bbox.north {
            return Err(Error::bad_request("bbox south edge lies above its north edge"));
        }
        Ok(bbox)
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    /// Bounding box declared by an item, if any
    pub fn of_item(item: &Item) -> Option<Self> {
        let values: Vec<f64> = item
            .fields
            .get("bbox")?
            .as_array()?
            .iter()
            .map(Value::as_f64)
            .collect::<Option<_>>()?;
        Self::from_slice(&values).ok()
    }
}

/// Closed datetime interval; open ends are `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatetimeInterval {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DatetimeInterval {
    /// Parse an RFC 3339 instant or a `start/end` interval where either end
    /// may be `..` or empty.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        match value.split_once('/') {
            Some((start, end)) => {
                let interval = Self {
                    start: parse_bound(start)?,
                    end: parse_bound(end)?,
                };
                if interval.start.is_none() && interval.end.is_none() {
                    return Err(Error::bad_request("datetime interval cannot be open on both ends"));
                }
                if let (Some(start), Some(end)) = (interval.start, interval.end) {
                    if start > end {
                        return Err(Error::bad_request("datetime interval ends before it starts"));
                    }
                }
                Ok(interval)
            }
            None => {
                let instant = parse_instant(value)?;
                Ok(Self {
                    start: Some(instant),
                    end: Some(instant),
                })
            }
        }
    }

    /// Whether the range `[start, end]` overlaps this interval
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| end >= s) && self.end.map_or(true, |e| start <= e)
    }
}

fn parse_bound(value: &str) -> Result<Option<DateTime<Utc>>> {
    match value.trim() {
        "" | ".." => Ok(None),
        other => parse_instant(other).map(Some),
    }
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::bad_request(format!("invalid datetime '{value}': {e}")))
}

/// Temporal extent of an item: `properties.datetime`, or the
/// `start_datetime`/`end_datetime` pair
pub fn item_time_range(item: &Item) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let properties = item.fields.get("properties")?;
    let field = |name: &str| {
        properties
            .get(name)
            .and_then(Value::as_str)
            .and_then(|v| parse_instant(v).ok())
    };
    match field("datetime") {
        Some(instant) => Some((instant, instant)),
        None => Some((field("start_datetime")?, field("end_datetime")?)),
    }
}

/// Item search as submitted through `GET` parameters or a `POST` body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub collections: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub bbox: Option<Vec<f64>>,
    pub datetime: Option<String>,
    pub limit: Option<usize>,
    pub token: Option<String>,
}

impl SearchRequest {
    /// Build a request from decoded query parameters. List values are comma
    /// separated; unknown parameters are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut request = Self::default();
        for (key, value) in pairs {
            request.apply_pair(key, value)?;
        }
        Ok(request)
    }

    fn apply_pair(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "collections" => self.collections = Some(split_list(value)),
            "ids" => self.ids = Some(split_list(value)),
            "bbox" => {
                let coords = split_list(value)
                    .iter()
                    .map(|v| v.parse::<f64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::bad_request(format!("invalid bbox '{value}': {e}")))?;
                self.bbox = Some(coords);
            }
            "datetime" => self.datetime = Some(value.to_string()),
            "limit" => {
                let limit = value
                    .parse()
                    .map_err(|e| Error::bad_request(format!("invalid limit '{value}': {e}")))?;
                self.limit = Some(limit);
            }
            "token" => self.token = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }

    /// Whether the caller restricted the search to named collections
    pub fn is_scoped(&self) -> bool {
        self.collections.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Validate and normalize into a store query
    pub fn into_query(self) -> Result<ItemQuery> {
        let limit = match self.limit {
            None => DEFAULT_ITEM_LIMIT,
            Some(0) => return Err(Error::bad_request("limit must be positive")),
            Some(limit) => limit.min(MAX_ITEM_LIMIT),
        };
        Ok(ItemQuery {
            collections: self.collections.filter(|c| !c.is_empty()),
            ids: self.ids.filter(|ids| !ids.is_empty()),
            bbox: self.bbox.as_deref().map(BBox::from_slice).transpose()?,
            datetime: self
                .datetime
                .as_deref()
                .map(DatetimeInterval::parse)
                .transpose()?,
            limit,
            token: self.token,
        })
    }
}

/// Aggregation request: a search plus the aggregations to compute
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregateRequest {
    #[serde(flatten)]
    pub search: SearchRequest,
    pub aggregations: Option<Vec<String>>,
}

impl AggregateRequest {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut request = Self::default();
        for (key, value) in pairs {
            if key == "aggregations" {
                request.aggregations = Some(split_list(value));
            } else {
                request.search.apply_pair(key, value)?;
            }
        }
        Ok(request)
    }

    /// Requested aggregations; `total_count` when none are named
    pub fn kinds(&self) -> Result<Vec<AggregationKind>> {
        match &self.aggregations {
            Some(names) if !names.is_empty() => names.iter().map(|n| n.parse()).collect(),
            _ => Ok(vec![AggregationKind::TotalCount]),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_parameters() {
        let request = SearchRequest::from_pairs([
            ("collections", "a,b"),
            ("bbox", "1,2,3,4"),
            ("limit", "5"),
            ("unknown", "x"),
        ])
        .unwrap();
        assert!(request.is_scoped());
        let query = request.into_query().unwrap();
        assert_eq!(query.collections, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(query.limit, 5);
        assert_eq!(query.bbox.unwrap().east, 3.0);
    }

    #[test]
    fn test_empty_collections_are_unscoped() {
        let request: SearchRequest = serde_json::from_value(json!({"collections": []})).unwrap();
        assert!(!request.is_scoped());
        assert_eq!(request.into_query().unwrap().collections, None);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SearchRequest::from_pairs([("limit", "many")]).is_err());
        assert!(SearchRequest::from_pairs([("bbox", "1,x")]).is_err());
        let request = SearchRequest {
            bbox: Some(vec![1.0, 2.0, 3.0]),
            ..Default::default()
        };
        assert!(request.into_query().is_err());
        let request = SearchRequest {
            limit: Some(0),
            ..Default::default()
        };
        assert!(request.into_query().is_err());
    }

    #[test]
    fn test_limit_is_capped() {
        let request = SearchRequest {
            limit: Some(1_000_000),
            ..Default::default()
        };
        assert_eq!(request.into_query().unwrap().limit, MAX_ITEM_LIMIT);
    }

    #[test]
    fn test_datetime_interval() {
        let interval = DatetimeInterval::parse("2020-01-01T00:00:00Z/..").unwrap();
        assert!(interval.start.is_some());
        assert!(interval.end.is_none());

        let instant = DatetimeInterval::parse("2020-01-01T00:00:00Z").unwrap();
        assert_eq!(instant.start, instant.end);

        assert!(DatetimeInterval::parse("../..").is_err());
        assert!(DatetimeInterval::parse("2021-01-01T00:00:00Z/2020-01-01T00:00:00Z").is_err());
        assert!(DatetimeInterval::parse("yesterday").is_err());
    }

    #[test]
    fn test_item_time_range_and_bbox() {
        let item: Item = serde_json::from_value(json!({
            "id": "i1",
            "bbox": [0.0, 0.0, 1.0, 1.0],
            "properties": {
                "start_datetime": "2020-01-01T00:00:00Z",
                "end_datetime": "2020-02-01T00:00:00Z"
            }
        }))
        .unwrap();
        let (start, end) = item_time_range(&item).unwrap();
        assert!(start < end);

        let interval = DatetimeInterval::parse("2020-01-15T00:00:00Z/..").unwrap();
        assert!(interval.overlaps(start, end));

        let bbox = BBox::of_item(&item).unwrap();
        assert!(bbox.intersects(&BBox::from_slice(&[0.5, 0.5, 2.0, 2.0]).unwrap()));
        assert!(!bbox.intersects(&BBox::from_slice(&[5.0, 5.0, 6.0, 6.0]).unwrap()));
    }

    #[test]
    fn test_aggregate_request() {
        let request =
            AggregateRequest::from_pairs([("aggregations", "total_count,collection_frequency")])
                .unwrap();
        assert_eq!(
            request.kinds().unwrap(),
            vec![AggregationKind::TotalCount, AggregationKind::CollectionFrequency]
        );
        assert_eq!(
            AggregateRequest::default().kinds().unwrap(),
            vec![AggregationKind::TotalCount]
        );

        let request: AggregateRequest = serde_json::from_value(json!({
            "collections": ["c1"],
            "aggregations": ["unknown"]
        }))
        .unwrap();
        assert!(request.search.is_scoped());
        assert!(request.kinds().is_err());
    }
}
