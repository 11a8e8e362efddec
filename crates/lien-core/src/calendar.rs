//! Calendar arithmetic used by the rule engine.
//!
//! Statutory deadlines are expressed in calendar months ("the 15th day of the
//! second month following...") and in plain days. Month arithmetic works on an
//! absolute month index so year roll-over is exact, and a day-of-month that
//! does not exist in the target month is clamped to that month's last day.
//!
//! Every function returns `None` instead of panicking when the result would
//! fall outside chrono's representable range.

use chrono::{Datelike, Days, NaiveDate};

/// Number of days in `month` (1-based) of `year`, leap years included.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
  match month {
    1 | 3 | 5 | 7 | 8 | 10 | 12 => Some(31),
    4 | 6 | 9 | 11 => Some(30),
    2 if is_leap_year(year) => Some(29),
    2 => Some(28),
    _ => None,
  }
}

pub fn is_leap_year(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Shift a `(year, month)` pair forward by `months`, wrapping the year.
fn shift_month(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
  let index = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(months);
  let year = i32::try_from(index.div_euclid(12)).ok()?;
  let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
  Some((year, month))
}

/// Add whole calendar months, preserving the day of month unless the target
/// month is shorter, in which case the result is that month's last day.
///
/// `2024-01-31 + 1 month = 2024-02-29`, `2023-01-31 + 1 month = 2023-02-28`.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
  let (year, month) = shift_month(date.year(), date.month(), months)?;
  let day = date.day().min(days_in_month(year, month)?);
  NaiveDate::from_ymd_opt(year, month, day)
}

/// The given `day` of the month that is `months_after` months past the month
/// containing `date`. The trigger's own day of month is irrelevant.
///
/// `day_of_month_after(2024-12-15, 2, 15) = 2025-02-15`. A `day` past the end
/// of the target month clamps to its last day; `day == 0` is rejected.
pub fn day_of_month_after(
  date: NaiveDate,
  months_after: u32,
  day: u32,
) -> Option<NaiveDate> {
  if day == 0 {
    return None;
  }
  let (year, month) = shift_month(date.year(), date.month(), months_after)?;
  let day = day.min(days_in_month(year, month)?);
  NaiveDate::from_ymd_opt(year, month, day)
}

/// Add a fixed number of calendar days.
pub fn add_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
  date.checked_add_days(Days::new(u64::from(days)))
}

/// Signed whole days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
  to.signed_duration_since(from).num_days()
}
