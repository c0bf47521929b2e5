//! Due dates for recurring bills.
//!
//! Occurrence `n` of a schedule is `start + n * period`, always computed from
//! the anchor date. Month-based periods clamp to the last day of short months
//! without drifting: a bill anchored on Jan 31 falls on Feb 29, then Mar 31.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Days(u64),
    Months(u32),
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    fn period(self) -> Period {
        match self {
            Frequency::Daily => Period::Days(1),
            Frequency::Weekly => Period::Days(7),
            Frequency::Biweekly => Period::Days(14),
            Frequency::Monthly => Period::Months(1),
            Frequency::Quarterly => Period::Months(3),
            Frequency::Yearly => Period::Months(12),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFrequency(pub String);

impl fmt::Display for UnknownFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown frequency '{}'", self.0)
    }
}

impl std::error::Error for UnknownFrequency {}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFrequency(s.to_string()))
    }
}

/// One due date of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub next_due_date: NaiveDate,
    pub occurrence: u32,
}

/// Date of occurrence `n`, or `None` past the end of the calendar.
pub fn nth_occurrence(start: NaiveDate, frequency: Frequency, n: u32) -> Option<NaiveDate> {
    match frequency.period() {
        Period::Days(days) => start.checked_add_days(Days::new(days.checked_mul(u64::from(n))?)),
        Period::Months(months) => start.checked_add_months(Months::new(months.checked_mul(n)?)),
    }
}

/// First occurrence on or after `reference`.
pub fn next_due(start: NaiveDate, frequency: Frequency, reference: NaiveDate) -> Option<Occurrence> {
    if start >= reference {
        return Some(Occurrence {
            next_due_date: start,
            occurrence: 0,
        });
    }

    let mut n = match frequency.period() {
        Period::Days(days) => {
            let elapsed = u64::try_from((reference - start).num_days()).ok()?;
            u32::try_from(elapsed.div_ceil(days)).ok()?
        }
        // Lower bound from the month distance; clamping can only push a date
        // earlier, so walk forward from here.
        Period::Months(months) => {
            let distance = (reference.year() - start.year()) * 12 + reference.month() as i32
                - start.month() as i32;
            u32::try_from(distance).ok()? / months
        }
    };

    loop {
        let date = nth_occurrence(start, frequency, n)?;
        if date >= reference {
            return Some(Occurrence {
                next_due_date: date,
                occurrence: n,
            });
        }
        n = n.checked_add(1)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn due(start: &str, frequency: Frequency, reference: &str) -> (String, u32) {
        let o = next_due(date(start), frequency, date(reference)).unwrap();
        (o.next_due_date.to_string(), o.occurrence)
    }

    #[test]
    fn test_start_in_future_is_occurrence_zero() {
        assert_eq!(due("2026-11-01", Frequency::Monthly, "2026-10-16"), ("2026-11-01".into(), 0));
        assert_eq!(due("2026-10-16", Frequency::Weekly, "2026-10-16"), ("2026-10-16".into(), 0));
    }

    #[test]
    fn test_day_based_periods() {
        assert_eq!(due("2026-10-01", Frequency::Daily, "2026-10-16"), ("2026-10-16".into(), 15));
        assert_eq!(due("2026-10-01", Frequency::Weekly, "2026-10-16"), ("2026-10-22".into(), 3));
        assert_eq!(due("2026-10-01", Frequency::Biweekly, "2026-10-15"), ("2026-10-15".into(), 1));
        assert_eq!(due("2026-10-01", Frequency::Biweekly, "2026-10-16"), ("2026-10-29".into(), 2));
    }

    #[test]
    fn test_month_end_clamps_without_drift() {
        assert_eq!(due("2024-01-31", Frequency::Monthly, "2024-02-10"), ("2024-02-29".into(), 1));
        assert_eq!(due("2024-01-31", Frequency::Monthly, "2024-03-01"), ("2024-03-31".into(), 2));
        assert_eq!(due("2025-01-31", Frequency::Monthly, "2025-02-10"), ("2025-02-28".into(), 1));
    }

    #[test]
    fn test_quarterly_and_yearly() {
        assert_eq!(due("2026-01-15", Frequency::Quarterly, "2026-10-16"), ("2027-01-15".into(), 4));
        assert_eq!(due("2026-01-15", Frequency::Quarterly, "2026-10-15"), ("2026-10-15".into(), 3));
        assert_eq!(due("2024-02-29", Frequency::Yearly, "2025-01-01"), ("2025-02-28".into(), 1));
        assert_eq!(due("2024-02-29", Frequency::Yearly, "2027-06-01"), ("2028-02-29".into(), 4));
    }

    #[test]
    fn test_same_day_later_in_month_moves_on() {
        assert_eq!(due("2026-03-20", Frequency::Monthly, "2026-10-21"), ("2026-11-20".into(), 8));
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("biweekly".parse::<Frequency>().unwrap(), Frequency::Biweekly);
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert!("Monthly".parse::<Frequency>().is_err());
    }
}
