//! Catering date rules.
//!
//! Orders need at least one day of lead time: the earliest selectable date
//! is tomorrow, and the form preselects the day after tomorrow.

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

use crate::error::Alert;

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// The chosen date is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("scheduled date {date} is before the earliest allowed date {earliest}")]
    TooEarly {
        date: NaiveDate,
        earliest: NaiveDate,
    },
}

impl ScheduleError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::TooEarly { earliest, .. } => Alert::new(
                "Tanggal Tidak Valid",
                format!(
                    "Tanggal catering paling cepat {}",
                    format_long_date(*earliest)
                ),
            ),
        }
    }
}

/// Today on the device clock.
#[must_use]
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

/// First date a customer may pick.
#[must_use]
pub fn earliest_schedule_date(today: NaiveDate) -> NaiveDate {
    add_days(today, 1)
}

/// Date preselected in the checkout form.
#[must_use]
pub fn default_schedule_date(today: NaiveDate) -> NaiveDate {
    add_days(today, 2)
}

/// Accept `date` if it is on or after [`earliest_schedule_date`].
///
/// # Errors
///
/// Returns `ScheduleError::TooEarly` for today or any past date.
pub fn validate_schedule_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ScheduleError> {
    let earliest = earliest_schedule_date(today);
    if date < earliest {
        return Err(ScheduleError::TooEarly { date, earliest });
    }
    Ok(date)
}

/// `14 Maret 2025`.
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    let month = MONTHS_ID
        .get(date.month0() as usize)
        .copied()
        .unwrap_or_default();
    format!("{:02} {month} {}", date.day(), date.year())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window() {
        let today = date(2025, 12, 30);
        assert_eq!(earliest_schedule_date(today), date(2025, 12, 31));
        assert_eq!(default_schedule_date(today), date(2026, 1, 1));
    }

    #[test]
    fn test_validate() {
        let today = date(2025, 3, 10);
        assert!(validate_schedule_date(date(2025, 3, 11), today).is_ok());
        assert!(validate_schedule_date(date(2025, 4, 1), today).is_ok());
        assert_eq!(
            validate_schedule_date(today, today),
            Err(ScheduleError::TooEarly {
                date: today,
                earliest: date(2025, 3, 11)
            })
        );
    }

    #[test]
    fn test_format_long_date() {
        assert_eq!(format_long_date(date(2025, 3, 4)), "04 Maret 2025");
        assert_eq!(format_long_date(date(2024, 12, 25)), "25 Desember 2024");
    }

    #[test]
    fn test_too_early_alert_mentions_earliest_date() {
        let err = validate_schedule_date(date(2025, 3, 10), date(2025, 3, 10)).unwrap_err();
        assert!(err.alert().message.contains("11 Maret 2025"));
    }
}
