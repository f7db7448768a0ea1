//! Dataset parsing.
//!
//! Rides come as a JSON array of `{name, date, length}` objects, sorted by
//! date. Dates may be plain days, naive timestamps, RFC 3339 timestamps or
//! epoch milliseconds; every form is truncated to its calendar day.
//!
//! The yearly count series is a CSV document with a `year` and a `count`
//! column, in any order.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{OptionExt, RideMapError, Result};
use crate::{DailyCount, RideRecord};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Deserialize)]
struct RawRide {
    name: Option<String>,
    date: Option<Value>,
    length: Option<f64>,
}

/// Calendar day of a ride timestamp.
///
/// Offsets are honored: `2016-04-10T23:30:00-05:00` is April 10th.
pub fn parse_ride_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn date_from_value(value: &Value, index: usize) -> Result<NaiveDate> {
    let parsed = match value {
        Value::String(s) => parse_ride_date(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RideMapError::data_load(format!("record {} has unparsable date {}", index, value))
    })
}

/// Parse a ride list from JSON text.
pub fn parse_rides_json(json: &str) -> Result<Vec<RideRecord>> {
    let raw: Vec<RawRide> = serde_json::from_str(json)?;

    let rides = raw
        .into_iter()
        .enumerate()
        .map(|(i, ride)| {
            let name = ride.name.ok_or_missing_field("name", i)?;
            let date = ride.date.ok_or_missing_field("date", i)?;
            let length = ride.length.ok_or_missing_field("length", i)?;
            if !length.is_finite() {
                return Err(RideMapError::data_load(format!(
                    "record {} ('{}') has non-finite length",
                    i, name
                )));
            }
            Ok(RideRecord {
                name,
                date: date_from_value(&date, i)?,
                length,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("[Loader] Parsed {} rides", rides.len());
    Ok(rides)
}

/// Read and parse a ride list file.
pub fn load_rides(path: impl AsRef<Path>) -> Result<Vec<RideRecord>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        RideMapError::data_load(format!("cannot read {}: {}", path.display(), e))
    })?;
    let rides = parse_rides_json(&json)?;
    info!("[Loader] Loaded {} rides from {}", rides.len(), path.display());
    Ok(rides)
}

#[derive(Debug, Deserialize)]
struct CountRow {
    year: i32,
    count: String,
}

fn parse_count(raw: &str) -> Option<u64> {
    // Thousands separators, as in "1,200"
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits
        .parse::<f64>()
        .ok()
        .filter(|c| c.is_finite() && *c >= 0.0)
        .map(|c| c.round() as u64)
}

/// Parse the yearly count CSV. Blank lines are skipped and header names are
/// matched case-insensitively.
pub fn parse_daily_counts(text: &str) -> Result<Vec<DailyCount>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: csv::StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    if headers.is_empty() {
        return Err(RideMapError::data_load("count series is empty"));
    }
    for name in ["year", "count"] {
        if !headers.iter().any(|h| h == name) {
            return Err(RideMapError::data_load(format!(
                "count series has no '{}' column",
                name
            )));
        }
    }
    reader.set_headers(headers.clone());

    let mut counts = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let row: CountRow = record.deserialize(Some(&headers))?;
        let count = parse_count(&row.count).ok_or_else(|| {
            RideMapError::data_load(format!("line {}: bad count '{}'", line, row.count))
        })?;
        counts.push(DailyCount {
            year: row.year,
            count,
        });
    }

    debug!("[Loader] Parsed {} yearly counts", counts.len());
    Ok(counts)
}

/// Read and parse a yearly count CSV file.
pub fn load_daily_counts(path: impl AsRef<Path>) -> Result<Vec<DailyCount>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        RideMapError::data_load(format!("cannot read {}: {}", path.display(), e))
    })?;
    let counts = parse_daily_counts(&text)?;
    info!("[Loader] Loaded {} yearly counts from {}", counts.len(), path.display());
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_rides() {
        let json = r#"[
            {"name": "a", "date": "2016-04-10", "length": 12.5},
            {"name": "b", "date": "2016-04-11T18:45:00", "length": 3},
            {"name": "c", "date": "2016-04-12T23:30:00-05:00", "length": 8.25}
        ]"#;
        let rides = parse_rides_json(json).unwrap();

        assert_eq!(rides.len(), 3);
        assert_eq!(rides[0], RideRecord::new("a", ymd(2016, 4, 10), 12.5));
        assert_eq!(rides[1].date, ymd(2016, 4, 11));
        assert_eq!(rides[1].length, 3.0);
        // Truncated in its own offset, not UTC
        assert_eq!(rides[2].date, ymd(2016, 4, 12));
    }

    #[test]
    fn test_epoch_millis_date() {
        // 2016-04-10T12:00:00Z
        let rides = parse_rides_json(r#"[{"name": "a", "date": 1460289600000, "length": 1}]"#)
            .unwrap();
        assert_eq!(rides[0].date, ymd(2016, 4, 10));
    }

    #[test]
    fn test_missing_field() {
        let err = parse_rides_json(r#"[{"name": "a", "length": 1}]"#).unwrap_err();
        match err {
            RideMapError::DataLoad { message } => assert!(message.contains("'date'")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            parse_rides_json("{not json"),
            Err(RideMapError::DataLoad { .. })
        ));
        assert!(matches!(
            parse_rides_json(r#"[{"name": "a", "date": "yesterday", "length": 1}]"#),
            Err(RideMapError::DataLoad { .. })
        ));
        assert!(matches!(
            parse_rides_json(r#"[{"name": "a", "date": true, "length": 1}]"#),
            Err(RideMapError::DataLoad { .. })
        ));
    }

    #[test]
    fn test_load_rides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rides.json");
        std::fs::write(&path, r#"[{"name": "a", "date": "2016-04-10", "length": 1}]"#).unwrap();

        assert_eq!(load_rides(&path).unwrap().len(), 1);
        assert!(matches!(
            load_rides(dir.path().join("missing.json")),
            Err(RideMapError::DataLoad { .. })
        ));
    }

    #[test]
    fn test_parse_daily_counts() {
        let csv = "count,year\n12,1880\n\n40,1900\n75.0,1910\n";
        let counts = parse_daily_counts(csv).unwrap();
        assert_eq!(
            counts,
            vec![
                DailyCount { year: 1880, count: 12 },
                DailyCount { year: 1900, count: 40 },
                DailyCount { year: 1910, count: 75 },
            ]
        );
    }

    #[test]
    fn test_parse_quoted_daily_counts() {
        let csv = "\"Year\",\"Count\"\n\"1900\",\"40\"\n1910,\"1,200\"\n";
        let counts = parse_daily_counts(csv).unwrap();
        assert_eq!(
            counts,
            vec![
                DailyCount { year: 1900, count: 40 },
                DailyCount { year: 1910, count: 1200 },
            ]
        );
    }

    #[test]
    fn test_daily_counts_errors() {
        assert!(parse_daily_counts("").is_err());
        assert!(parse_daily_counts("year,total\n1900,3").is_err());
        assert!(parse_daily_counts("year,count\nnineteen,3").is_err());
        assert!(parse_daily_counts("year,count\n1900").is_err());
        assert!(parse_daily_counts("year,count\n1900,-4").is_err());
        assert!(matches!(
            parse_daily_counts("year,count\n1900,\"4\",7"),
            Err(RideMapError::DataLoad { .. })
        ));
    }

    #[test]
    fn test_load_daily_counts_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"year,count\n2001,5\n").unwrap();
        let counts = load_daily_counts(file.path()).unwrap();
        assert_eq!(counts, vec![DailyCount { year: 2001, count: 5 }]);
    }
}
