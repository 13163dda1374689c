use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::{PassengerRecord, RefusalRecord};

const LABEL_PATTERN: &str = r"(?i)^\s*(?:(?P<year>\d{4})\s*[-/ ]?\s*H?(?P<half>[12])|H(?P<half_first>[12])\s*[-/ ]?\s*(?P<year_last>\d{4}))\s*$";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Half {
    H1,
    H2,
}

impl Half {
    pub fn number(self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
        }
    }

    pub fn month_range(self) -> (u32, u32) {
        match self {
            Self::H1 => (1, 6),
            Self::H2 => (7, 12),
        }
    }
}

/// A half-year bucket. Ordered chronologically.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Semester {
    pub year: i32,
    pub half: Half,
}

impl Semester {
    pub fn new(year: i32, half: Half) -> Self {
        Self { year, half }
    }

    /// `None` for months outside 1..=12.
    pub fn from_month(year: i32, month: u32) -> Option<Self> {
        match month {
            1..=6 => Some(Self::new(year, Half::H1)),
            7..=12 => Some(Self::new(year, Half::H2)),
            _ => None,
        }
    }

    pub fn contains(self, year: i32, month: u32) -> bool {
        let (start, end) = self.half.month_range();
        year == self.year && (start..=end).contains(&month)
    }

    pub fn label(self) -> String {
        format!("{} H{}", self.year, self.half.number())
    }

    pub fn next(self) -> Self {
        match self.half {
            Half::H1 => Self::new(self.year, Half::H2),
            Half::H2 => Self::new(self.year + 1, Half::H1),
        }
    }

    pub fn start_date(self) -> Option<NaiveDate> {
        let (start, _) = self.half.month_range();
        NaiveDate::from_ymd_opt(self.year, start, 1)
    }

    pub fn end_date(self) -> Option<NaiveDate> {
        match self.half {
            Half::H1 => NaiveDate::from_ymd_opt(self.year, 6, 30),
            Half::H2 => NaiveDate::from_ymd_opt(self.year, 12, 31),
        }
    }

    /// Accepts `2024 H1`, `2024-H1`, `2024/1` and `H1 2024`.
    pub fn parse(label: &str) -> Result<Self> {
        let pattern = Regex::new(LABEL_PATTERN).context("failed to compile semester regex")?;
        let captures = pattern.captures(label).with_context(|| {
            format!("unrecognised semester label: {label} (expected e.g. \"2024 H1\")")
        })?;

        let year = captures
            .name("year")
            .or_else(|| captures.name("year_last"))
            .map(|m| m.as_str())
            .context("missing year capture")?
            .parse::<i32>()
            .with_context(|| format!("invalid year in semester label: {label}"))?;
        let half = match captures
            .name("half")
            .or_else(|| captures.name("half_first"))
            .map(|m| m.as_str())
        {
            Some("1") => Half::H1,
            Some("2") => Half::H2,
            _ => bail!("invalid half in semester label: {label}"),
        };

        Ok(Self::new(year, half))
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} H{}", self.year, self.half.number())
    }
}

#[derive(Serialize, Deserialize)]
struct SemesterRepr {
    year: i32,
    half: u8,
    #[serde(default)]
    label: String,
}

impl Serialize for Semester {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SemesterRepr {
            year: self.year,
            half: self.half.number(),
            label: self.label(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Semester {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = SemesterRepr::deserialize(deserializer)?;
        let half = match repr.half {
            1 => Half::H1,
            2 => Half::H2,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "semester half must be 1 or 2, got {other}"
                )));
            }
        };
        Ok(Self::new(repr.year, half))
    }
}

pub fn filter_refusals(records: &[RefusalRecord], semester: Semester) -> Vec<RefusalRecord> {
    records
        .iter()
        .filter(|record| semester.contains(record.year, record.month))
        .cloned()
        .collect()
}

pub fn filter_passengers(records: &[PassengerRecord], semester: Semester) -> Vec<PassengerRecord> {
    records
        .iter()
        .filter(|record| semester.contains(record.year, record.month))
        .cloned()
        .collect()
}

/// Union of semesters present on either side, ascending.
pub fn available_semesters(
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
) -> Vec<Semester> {
    let refusal_side = refusals
        .iter()
        .filter_map(|record| Semester::from_month(record.year, record.month));
    let passenger_side = passengers
        .iter()
        .filter_map(|record| Semester::from_month(record.year, record.month));

    refusal_side
        .chain(passenger_side)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn june_is_first_half_and_july_second() {
        assert_eq!(Semester::from_month(2024, 6), Some(Semester::new(2024, Half::H1)));
        assert_eq!(Semester::from_month(2024, 7), Some(Semester::new(2024, Half::H2)));
        assert_eq!(Semester::from_month(2024, 1), Some(Semester::new(2024, Half::H1)));
        assert_eq!(Semester::from_month(2024, 12), Some(Semester::new(2024, Half::H2)));
    }

    #[test]
    fn out_of_range_months_belong_to_no_semester() {
        assert_eq!(Semester::from_month(2024, 0), None);
        assert_eq!(Semester::from_month(2024, 13), None);

        let records = vec![
            RefusalRecord::new("LX", "IST", 2024, 13, "A1"),
            RefusalRecord::new("LX", "IST", 2024, 0, "A1"),
        ];
        assert!(filter_refusals(&records, Semester::new(2024, Half::H1)).is_empty());
        assert!(filter_refusals(&records, Semester::new(2024, Half::H2)).is_empty());
        assert!(available_semesters(&records, &[]).is_empty());
    }

    #[test]
    fn filter_respects_year_and_half_bounds() {
        let records = vec![
            RefusalRecord::new("LX", "IST", 2024, 6, "A1"),
            RefusalRecord::new("LX", "IST", 2024, 7, "A1"),
            RefusalRecord::new("LX", "IST", 2023, 3, "A1"),
        ];

        let first = filter_refusals(&records, Semester::new(2024, Half::H1));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].month, 6);

        let second = filter_refusals(&records, Semester::new(2024, Half::H2));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].month, 7);

        assert!(filter_refusals(&records, Semester::new(2025, Half::H1)).is_empty());
    }

    #[test]
    fn available_semesters_is_sorted_union_of_both_sides() {
        let refusals = vec![
            RefusalRecord::new("LX", "IST", 2024, 8, "A1"),
            RefusalRecord::new("LX", "IST", 2023, 2, "A1"),
        ];
        let passengers = vec![
            PassengerRecord::new("LX", "IST", 100, 2024, 2),
            PassengerRecord::new("LX", "IST", 100, 2024, 9),
        ];

        let semesters = available_semesters(&refusals, &passengers);
        assert_eq!(
            semesters,
            vec![
                Semester::new(2023, Half::H1),
                Semester::new(2024, Half::H1),
                Semester::new(2024, Half::H2),
            ]
        );
    }

    #[test]
    fn parse_accepts_common_label_forms() {
        let expected = Semester::new(2024, Half::H2);
        for label in ["2024 H2", "2024-H2", "2024/2", "h2 2024", " 2024h2 ", "H2-2024"] {
            assert_eq!(Semester::parse(label).expect(label), expected, "{label}");
        }
        assert!(Semester::parse("2024 H3").is_err());
        assert!(Semester::parse("spring").is_err());
    }

    #[test]
    fn next_rolls_over_year_boundary() {
        assert_eq!(
            Semester::new(2023, Half::H2).next(),
            Semester::new(2024, Half::H1)
        );
        assert_eq!(
            Semester::new(2024, Half::H1).next(),
            Semester::new(2024, Half::H2)
        );
    }

    #[test]
    fn serde_carries_label_and_rejects_bad_half() {
        let semester = Semester::new(2024, Half::H1);
        let value = serde_json::to_value(semester).expect("serialize semester");
        assert_eq!(value["label"], "2024 H1");
        assert_eq!(value["half"], 1);

        let back: Semester = serde_json::from_value(value).expect("deserialize semester");
        assert_eq!(back, semester);

        let bad = serde_json::json!({"year": 2024, "half": 3});
        assert!(serde_json::from_value::<Semester>(bad).is_err());
    }

    #[test]
    fn date_range_matches_half() {
        let semester = Semester::new(2024, Half::H2);
        assert_eq!(semester.start_date(), NaiveDate::from_ymd_opt(2024, 7, 1));
        assert_eq!(semester.end_date(), NaiveDate::from_ymd_opt(2024, 12, 31));
    }
}
