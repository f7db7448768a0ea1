//! # Ride Dataset Index
//!
//! Buckets rides per calendar day. Bucket `i` covers the `i`-th day after the
//! first ride; every day up to the last ride has a bucket, rides or not, so
//! the chart can draw one bar per day and the slider can map any pixel to a
//! bucket without gap checks.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use log::{debug, warn};
use serde::Serialize;

use crate::error::{RideMapError, Result};
use crate::{DailyCount, RideRecord};

/// Longest accepted span between the first and the last ride, in days.
pub const MAX_SPAN_DAYS: i64 = 36_600;

/// All rides of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// Sum of the lengths of the rides of this day
    pub total_length: f64,
    /// Ride names in input order
    pub ride_names: Vec<String>,
}

impl DayBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_length: 0.0,
            ride_names: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ride_names.is_empty()
    }
}

/// Day-bucketed index over a date-sorted ride list. Read-only once built.
#[derive(Debug, Clone)]
pub struct RideIndex {
    start_date: NaiveDate,
    buckets: Vec<DayBucket>,
    records: Vec<RideRecord>,
}

impl RideIndex {
    /// Build the index from rides sorted ascending by date.
    ///
    /// Fails on an empty list (no start date), on out-of-order records and
    /// when the rides span more than [`MAX_SPAN_DAYS`].
    pub fn from_records(records: Vec<RideRecord>) -> Result<Self> {
        let start_date = records
            .first()
            .map(|r| r.date)
            .ok_or_else(|| RideMapError::data_load("dataset contains no rides"))?;

        let mut slots: Vec<Option<DayBucket>> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());

        for (i, ride) in records.iter().enumerate() {
            let offset = (ride.date - start_date).num_days();
            if offset < 0 {
                return Err(RideMapError::data_load(format!(
                    "ride '{}' (record {}) dated {} precedes first ride {}; input must be sorted by date",
                    ride.name, i, ride.date, start_date
                )));
            }
            if offset > MAX_SPAN_DAYS {
                return Err(RideMapError::data_load(format!(
                    "ride '{}' (record {}) dated {} is {} days after first ride {}; at most {} days are indexed",
                    ride.name, i, ride.date, offset, start_date, MAX_SPAN_DAYS
                )));
            }
            if !seen.insert(ride.name.as_str()) {
                warn!("[RideIndex] Duplicate ride name '{}' at record {}", ride.name, i);
            }

            let offset = offset as usize;
            if slots.len() <= offset {
                slots.resize(offset + 1, None);
            }
            let bucket = slots[offset].get_or_insert_with(|| DayBucket::empty(ride.date));
            bucket.total_length += ride.length;
            bucket.ride_names.push(ride.name.clone());
        }

        // Backfill days without rides
        let buckets: Vec<DayBucket> = slots
            .into_iter()
            .enumerate()
            .map(|(offset, slot)| {
                slot.unwrap_or_else(|| DayBucket::empty(day_after(start_date, offset)))
            })
            .collect();

        debug!(
            "[RideIndex] Indexed {} rides into {} days starting {}",
            records.len(),
            buckets.len(),
            start_date
        );

        Ok(Self {
            start_date,
            buckets,
            records,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Day of the last bucket.
    pub fn end_date(&self) -> NaiveDate {
        self.buckets
            .last()
            .map(|b| b.date)
            .unwrap_or(self.start_date)
    }

    /// Number of day buckets (last offset + 1).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false: an index cannot be built from an empty dataset.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn buckets(&self) -> &[DayBucket] {
        &self.buckets
    }

    pub fn bucket(&self, offset: usize) -> Option<&DayBucket> {
        self.buckets.get(offset)
    }

    /// Rides in input (date) order.
    pub fn records(&self) -> &[RideRecord] {
        &self.records
    }

    /// Number of midnights between the first ride day and `date`.
    /// Negative before the first ride, past `len()` after the last one.
    pub fn offset_of(&self, date: NaiveDate) -> i64 {
        (date - self.start_date).num_days()
    }

    /// Date of the bucket at `offset`, extrapolated past either end.
    pub fn date_at(&self, offset: i64) -> NaiveDate {
        if offset >= 0 {
            day_after(self.start_date, offset as usize)
        } else {
            self.start_date
                .checked_sub_days(Days::new(offset.unsigned_abs()))
                .unwrap_or(NaiveDate::MIN)
        }
    }

    /// Names of all rides between `start` and `end`, both days inclusive.
    ///
    /// Days outside the index contribute nothing. `start > end` is an
    /// `EmptyRange` error; callers treat it as an empty selection.
    pub fn rides_between(&self, start: NaiveDate, end: NaiveDate) -> Result<HashSet<String>> {
        if start > end {
            return Err(RideMapError::EmptyRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let last = self.buckets.len() as i64 - 1;
        let lo = self.offset_of(start).max(0);
        let hi = self.offset_of(end).min(last);

        let mut names = HashSet::new();
        if lo > hi {
            return Ok(names);
        }
        for bucket in &self.buckets[lo as usize..=hi as usize] {
            names.extend(bucket.ride_names.iter().cloned());
        }
        Ok(names)
    }

    /// Longest single-day total, used for the chart's y extent.
    pub fn max_total_length(&self) -> f64 {
        self.buckets
            .iter()
            .map(|b| b.total_length)
            .fold(0.0, f64::max)
    }

    pub fn total_length(&self) -> f64 {
        self.buckets.iter().map(|b| b.total_length).sum()
    }
}

/// Yearly count series shown by the year-domain chart, sorted by year.
#[derive(Debug, Clone, Default)]
pub struct CountSeries {
    samples: Vec<DailyCount>,
}

impl CountSeries {
    pub fn new(mut samples: Vec<DailyCount>) -> Self {
        samples.sort_by_key(|s| s.year);
        Self { samples }
    }

    pub fn samples(&self) -> &[DailyCount] {
        &self.samples
    }

    /// First and last year, if any.
    pub fn extent(&self) -> Option<(i32, i32)> {
        Some((self.samples.first()?.year, self.samples.last()?.year))
    }

    pub fn max_count(&self) -> u64 {
        self.samples.iter().map(|s| s.count).max().unwrap_or(0)
    }

    /// Sample closest to `year`; on a tie the earlier sample wins.
    pub fn nearest(&self, year: f64) -> Option<&DailyCount> {
        let i = self.samples.partition_point(|s| (s.year as f64) < year);
        match (i.checked_sub(1).and_then(|j| self.samples.get(j)), self.samples.get(i)) {
            (Some(before), Some(after)) => {
                if year - before.year as f64 > after.year as f64 - year {
                    Some(after)
                } else {
                    Some(before)
                }
            }
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }
    }
}

fn day_after(date: NaiveDate, days: usize) -> NaiveDate {
    date.checked_add_days(Days::new(days as u64))
        .unwrap_or(NaiveDate::MAX)
}
