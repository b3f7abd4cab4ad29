/// Correlation and aggregation over a loaded dataset.
///
/// Submodules:
/// - `geo`: great-circle distance.
/// - `proximity`: which stations are near which events.
/// - `displacement`: averaged curves and per-event displacement vs distance.
/// - `attenuation`: power-law fit of displacement against distance.
///
/// Everything here is recomputed per request from the immutable dataset;
/// nothing is cached between calls.

pub mod attenuation;
pub mod displacement;
pub mod geo;
pub mod proximity;

use chrono::{NaiveDate, TimeDelta};

/// `date` moved by `days`, clamped to the representable calendar.
pub(crate) fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_days_saturates_instead_of_overflowing() {
        let origin = NaiveDate::from_ymd_opt(2021, 3, 5).unwrap();
        assert_eq!(shift_days(origin, -4), NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(shift_days(origin, 1_000_000_000), NaiveDate::MAX);
        assert_eq!(shift_days(origin, -1_000_000_000), NaiveDate::MIN);
        assert_eq!(shift_days(origin, i64::MIN), NaiveDate::MIN);
    }
}
