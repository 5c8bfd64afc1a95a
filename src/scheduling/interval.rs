//! Time intervals for scheduled jobs and the date ranges detection runs over.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::error::{SchedulingError, SchedulingResult};
use crate::domain::{Assignment, AssignmentStatus, Installation};

/// Duration assumed for installations without an explicit one
pub const DEFAULT_JOB_MINUTES: i32 = 120;

/// Half-open interval `[start, end)` occupied by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl JobInterval {
    pub fn new(date: NaiveDate, time: NaiveTime, duration_minutes: i32) -> Option<Self> {
        if duration_minutes <= 0 {
            return None;
        }
        let start = date.and_time(time);
        Some(Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        })
    }

    /// Interval for an installation, or `None` when it cannot be placed
    pub fn from_installation(installation: &Installation) -> Option<Self> {
        Self::new(
            installation.scheduled_date?,
            installation.scheduled_time?,
            installation.duration_minutes.unwrap_or(DEFAULT_JOB_MINUTES),
        )
    }

    /// Strict overlap: jobs sharing only a boundary do not overlap
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Time of day the job ends, clamped to the last minute of its start date
    pub fn end_time_same_day(&self) -> NaiveTime {
        if self.end.date() > self.start.date() {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
        } else {
            self.end.time()
        }
    }
}

/// Inclusive calendar range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Reject reversed ranges and ranges longer than `max_days`
    pub fn validate(&self, max_days: i64) -> SchedulingResult<()> {
        if self.end_date < self.start_date {
            return Err(SchedulingError::validation(format!(
                "date range end {} is before start {}",
                self.end_date, self.start_date
            )));
        }
        let span = self.days();
        if span > max_days {
            return Err(SchedulingError::validation(format!(
                "date range spans {} days, maximum is {}",
                span, max_days
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Interval of an assignment that is live on the calendar inside `range`.
///
/// Returns `None` for declined assignments, finished or cancelled installations,
/// dates outside the range and records missing a date, a time or a positive duration.
pub fn place(assignment: &Assignment, range: &DateRange) -> Option<JobInterval> {
    if assignment.status == AssignmentStatus::Declined
        || !assignment.installation.status.is_schedulable()
    {
        return None;
    }
    let interval = JobInterval::from_installation(&assignment.installation)?;
    range.contains(interval.start.date()).then_some(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn at(hour: u32, minute: u32, duration: i32) -> JobInterval {
        JobInterval::new(date(), NaiveTime::from_hms_opt(hour, minute, 0).unwrap(), duration)
            .unwrap()
    }

    #[test]
    fn test_back_to_back_jobs_do_not_overlap() {
        let first = at(9, 0, 60);
        let second = at(10, 0, 60);
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn test_partial_overlap() {
        assert!(at(9, 0, 60).overlaps(&at(9, 30, 60)));
    }

    #[test]
    fn test_containment_overlaps() {
        assert!(at(8, 0, 240).overlaps(&at(9, 0, 30)));
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(JobInterval::new(date(), time, 0).is_none());
        assert!(JobInterval::new(date(), time, -15).is_none());
    }

    #[test]
    fn test_end_time_clamped_at_midnight() {
        let late = at(23, 0, 120);
        assert_eq!(late.end_time_same_day(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        assert_eq!(late.minutes(), 120);
    }

    #[test]
    fn test_date_range_validation() {
        let start = date();
        let end = start + Duration::days(6);
        assert!(DateRange::new(start, end).validate(31).is_ok());
        assert!(DateRange::new(start, start).validate(1).is_ok());
        assert!(matches!(
            DateRange::new(end, start).validate(31),
            Err(SchedulingError::Validation(_))
        ));
        assert!(DateRange::new(start, end).validate(3).is_err());
        assert_eq!(DateRange::new(start, end).days(), 7);
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            a_start in 0u32..1380,
            a_len in 1i32..600,
            b_start in 0u32..1380,
            b_len in 1i32..600,
        ) {
            let a = at(a_start / 60, a_start % 60, a_len);
            let b = at(b_start / 60, b_start % 60, b_len);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn prop_adjacent_intervals_never_overlap(start in 0u32..600, len in 1i32..300) {
            let a = at(start / 60, start % 60, len);
            let b = JobInterval { start: a.end, end: a.end + Duration::minutes(30) };
            prop_assert!(!a.overlaps(&b));
        }
    }
}
