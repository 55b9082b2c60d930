use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Calendar date in exchange local time (Moscow), used as the history cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDay(Date);

impl TradingDay {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.len() != 10 {
            return Err(ValidationError::InvalidTradingDay {
                value: input.to_owned(),
            });
        }

        Date::parse(trimmed, DATE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTradingDay {
                value: input.to_owned(),
            })
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTradingDay {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = time::Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    pub fn previous(self) -> Option<Self> {
        self.0.previous_day().map(Self)
    }

    /// Inclusive number of calendar days from `self` to `end`; zero when `end` is earlier.
    pub fn days_until(self, end: Self) -> usize {
        let span = (end.0 - self.0).whole_days();
        if span < 0 {
            0
        } else {
            span as usize + 1
        }
    }

    /// Iterates every calendar day in `[self, end]`.
    pub fn through(self, end: Self) -> DayRange {
        DayRange::new(self, end)
    }

    pub fn format(self) -> String {
        self.to_string()
    }
}

impl Display for TradingDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for TradingDay {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for TradingDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TradingDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive day-by-day iterator over a calendar range.
#[derive(Debug, Clone)]
pub struct DayRange {
    next: Option<TradingDay>,
    end: TradingDay,
}

impl DayRange {
    pub fn new(start: TradingDay, end: TradingDay) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }
}

impl Iterator for DayRange {
    type Item = TradingDay;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current < self.end {
            current.next()
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.next.map_or(0, |day| day.days_until(self.end));
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DayRange {}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> TradingDay {
        TradingDay::parse(value).expect("valid day")
    }

    #[test]
    fn formats_with_zero_padding() {
        let parsed = day("2023-01-02");
        assert_eq!(parsed.format(), "2023-01-02");
        assert_eq!(parsed, TradingDay::from_ymd(2023, 1, 2).expect("valid"));
    }

    #[test]
    fn exposes_the_calendar_date() {
        let date = day("2023-01-07").into_inner();
        assert_eq!(date.weekday(), time::Weekday::Saturday);
        assert_eq!(TradingDay::from_date(date), day("2023-01-07"));
    }

    #[test]
    fn rejects_malformed_dates() {
        for raw in ["2023-1-2", "2023-02-30", "02.01.2023", "", "2023-01-02T00:00:00"] {
            let err = TradingDay::parse(raw).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidTradingDay { .. }), "{raw}");
        }
    }

    #[test]
    fn counts_days_inclusively() {
        assert_eq!(day("2023-01-02").days_until(day("2023-01-06")), 5);
        assert_eq!(day("2023-01-02").days_until(day("2023-01-02")), 1);
        assert_eq!(day("2023-01-06").days_until(day("2023-01-02")), 0);
    }

    #[test]
    fn iterates_across_month_and_leap_boundaries() {
        let days: Vec<String> = day("2024-02-28")
            .through(day("2024-03-01"))
            .map(TradingDay::format)
            .collect();
        assert_eq!(days, vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
    }

    #[test]
    fn empty_range_when_end_precedes_start() {
        assert_eq!(day("2023-01-05").through(day("2023-01-04")).count(), 0);
    }

    #[test]
    fn steps_to_neighbours() {
        let d = day("2023-01-01");
        assert_eq!(d.previous().map(TradingDay::format).as_deref(), Some("2022-12-31"));
        assert_eq!(d.next().map(TradingDay::format).as_deref(), Some("2023-01-02"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&day("2023-01-03")).expect("serialize");
        assert_eq!(json, "\"2023-01-03\"");
        let back: TradingDay = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, day("2023-01-03"));
    }
}
