use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A day (or inclusive span of days) on which no classes are held.
///
/// The serialized shape matches the reference holiday files:
/// `{"date": "2025-01-26", "event": "Republic Day"}` for a single day and
/// `{"date_start": "...", "date_end": "...", "event": "..."}` for a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Holiday {
    Range {
        #[serde(rename = "date_start")]
        start: NaiveDate,
        #[serde(rename = "date_end")]
        end: NaiveDate,
        #[serde(rename = "event", default)]
        label: String,
    },
    Single {
        date: NaiveDate,
        #[serde(rename = "event", default)]
        label: String,
    },
}

impl Holiday {
    pub fn single(date: NaiveDate, label: impl Into<String>) -> Self {
        Holiday::Single {
            date,
            label: label.into(),
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        Holiday::Range {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Holiday::Single { label, .. } | Holiday::Range { label, .. } => label,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        match self {
            Holiday::Single { date, .. } => *date,
            Holiday::Range { start, .. } => *start,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        match self {
            Holiday::Single { date, .. } => *date,
            Holiday::Range { end, .. } => *end,
        }
    }

    /// A span whose start is after its end covers no days.
    pub fn is_well_formed(&self) -> bool {
        self.first_day() <= self.last_day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            Holiday::Single { date: day, .. } => *day == date,
            Holiday::Range { start, end, .. } => *start <= date && date <= *end,
        }
    }
}

impl fmt::Display for Holiday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holiday::Single { date, label } => write!(f, "{date}: {label}"),
            Holiday::Range { start, end, label } => write!(f, "{start} to {end}: {label}"),
        }
    }
}

/// Who owns a holiday entry. Only student-added entries may be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidaySource {
    Official,
    Student,
}

/// Borrowed view over the official and student-added holiday lists.
///
/// Both lists take part in every exclusion test; the split only exists so
/// callers can tell which entries a student is allowed to delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct HolidaySet<'a> {
    official: &'a [Holiday],
    student: &'a [Holiday],
}

impl<'a> HolidaySet<'a> {
    pub fn new(official: &'a [Holiday], student: &'a [Holiday]) -> Self {
        Self { official, student }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        is_holiday(date, self.official, self.student)
    }

    /// Official entries first, then student entries in insertion order.
    pub fn iter(self) -> impl Iterator<Item = (HolidaySource, &'a Holiday)> {
        let official = self.official.iter().map(|h| (HolidaySource::Official, h));
        let student = self.student.iter().map(|h| (HolidaySource::Student, h));
        official.chain(student)
    }

    pub fn is_empty(&self) -> bool {
        self.official.is_empty() && self.student.is_empty()
    }
}

pub fn is_holiday(date: NaiveDate, official: &[Holiday], student: &[Holiday]) -> bool {
    official
        .iter()
        .chain(student.iter())
        .any(|holiday| holiday.contains(date))
}

/// Dates the student has already decided to skip. Kept sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsenceSet {
    dates: BTreeSet<NaiveDate>,
}

impl AbsenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the date was already declared.
    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.dates.remove(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    /// Declared dates inside `[from, to]`; empty when `from > to`.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        let upper = if from <= to { to } else { from };
        self.dates
            .range(from..=upper)
            .copied()
            .filter(move |date| *date <= to)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<NaiveDate> for AbsenceSet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

pub fn is_absent(date: NaiveDate, absences: &AbsenceSet) -> bool {
    absences.contains(date)
}

/// Semester window. Construction does not validate ordering; see
/// [`crate::validation::validate_date_range`].
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

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        days_in_range(self.start_date, self.end_date)
    }
}

/// Every calendar day in `[from, to]`. Yields nothing when `from > to`.
pub fn days_in_range(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |day| *day <= to)
}

/// Weekday index with Sunday as 0, the numbering used by timetable files.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_sunday() as usize
}

pub fn weekday_from_index(index: usize) -> Option<Weekday> {
    const BY_INDEX: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];
    BY_INDEX.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn range_holiday_is_inclusive_on_both_ends() {
        let holiday = Holiday::range(d(2025, 10, 20), d(2025, 10, 24), "Diwali break");
        assert!(holiday.contains(d(2025, 10, 20)));
        assert!(holiday.contains(d(2025, 10, 24)));
        assert!(!holiday.contains(d(2025, 10, 25)));
        assert!(!holiday.contains(d(2025, 10, 19)));
    }

    #[test]
    fn days_in_range_is_empty_when_reversed() {
        assert_eq!(days_in_range(d(2025, 1, 10), d(2025, 1, 9)).count(), 0);
        assert_eq!(days_in_range(d(2025, 1, 10), d(2025, 1, 10)).count(), 1);
    }

    #[test]
    fn between_handles_reversed_bounds() {
        let absences: AbsenceSet = [d(2025, 3, 3), d(2025, 3, 5)].into_iter().collect();
        assert_eq!(absences.between(d(2025, 3, 6), d(2025, 3, 1)).count(), 0);
        assert_eq!(absences.between(d(2025, 3, 1), d(2025, 3, 4)).count(), 1);
    }

    #[test]
    fn weekday_index_starts_on_sunday() {
        // 2025-01-05 is a Sunday
        assert_eq!(weekday_index(d(2025, 1, 5)), 0);
        assert_eq!(weekday_index(d(2025, 1, 6)), 1);
        assert_eq!(weekday_from_index(6), Some(Weekday::Sat));
        assert_eq!(weekday_from_index(7), None);
    }
}
