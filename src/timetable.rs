use crate::calendar::{weekday_from_index, weekday_index};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimetableError {
    #[error("weekday key '{0}' is not an index between 0 (Sunday) and 6 (Saturday)")]
    InvalidWeekdayKey(String),
    #[error("section {section} lists subject code {code} more than once")]
    DuplicateCode { section: String, code: String },
    #[error("section {section} has a subject with an empty code")]
    EmptyCode { section: String },
}

/// Weekly class counts, indexed by weekday with Sunday as 0.
///
/// Serialized as the sparse map used by timetable files, e.g.
/// `{"1": 2, "3": 1}`; weekdays without a key hold no classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, u32>",
    into = "BTreeMap<String, u32>"
)]
pub struct ClassesPerWeekday {
    counts: [u32; 7],
}

impl ClassesPerWeekday {
    pub fn new(counts: [u32; 7]) -> Self {
        Self { counts }
    }

    /// Builds a schedule from `(weekday index, count)` pairs. Indexes above 6
    /// are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, u32)>,
    {
        let mut counts = [0; 7];
        for (idx, count) in pairs {
            if let Some(slot) = counts.get_mut(idx) {
                *slot = count;
            }
        }
        Self { counts }
    }

    pub fn get(&self, weekday_index: usize) -> u32 {
        self.counts.get(weekday_index).copied().unwrap_or(0)
    }

    pub fn on(&self, date: NaiveDate) -> u32 {
        self.get(weekday_index(date))
    }

    /// Saturates rather than wrapping on absurd reference counts.
    pub fn per_week(&self) -> u32 {
        self.counts
            .iter()
            .fold(0u32, |total, count| total.saturating_add(*count))
    }
}

impl TryFrom<BTreeMap<String, u32>> for ClassesPerWeekday {
    type Error = TimetableError;

    fn try_from(value: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        let mut counts = [0; 7];
        for (key, count) in value {
            let idx = key
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| weekday_from_index(*idx).is_some())
                .ok_or_else(|| TimetableError::InvalidWeekdayKey(key.clone()))?;
            counts[idx] = count;
        }
        Ok(Self { counts })
    }
}

impl From<ClassesPerWeekday> for BTreeMap<String, u32> {
    fn from(value: ClassesPerWeekday) -> Self {
        value
            .counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(idx, count)| (idx.to_string(), *count))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "subject")]
    pub name: String,
    pub code: String,
    #[serde(rename = "classesPerDay", default)]
    pub classes_per_weekday: ClassesPerWeekday,
}

impl Subject {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        classes_per_weekday: ClassesPerWeekday,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            classes_per_weekday,
        }
    }

    pub fn classes_on(&self, date: NaiveDate) -> u32 {
        self.classes_per_weekday.on(date)
    }
}

/// One line of the weekly overview shown when a section is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub subject: String,
    pub code: String,
    pub classes_per_week: u32,
}

/// Section identifier to its subjects, in the order the reference data lists
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timetable {
    sections: BTreeMap<String, Vec<Subject>>,
}

impl Timetable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_section(&mut self, section: impl Into<String>, subjects: Vec<Subject>) {
        self.sections.insert(section.into(), subjects);
    }

    pub fn section(&self, section: &str) -> Option<&[Subject]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn summary(&self, section: &str) -> Option<Vec<SectionSummary>> {
        let subjects = self.section(section)?;
        Some(
            subjects
                .iter()
                .map(|subject| SectionSummary {
                    subject: subject.name.clone(),
                    code: subject.code.clone(),
                    classes_per_week: subject.classes_per_weekday.per_week(),
                })
                .collect(),
        )
    }

    /// Subject codes must be present and unique inside each section.
    pub fn validate(&self) -> Result<(), TimetableError> {
        for (section, subjects) in &self.sections {
            let mut seen = HashSet::with_capacity(subjects.len());
            for subject in subjects {
                if subject.code.trim().is_empty() {
                    return Err(TimetableError::EmptyCode {
                        section: section.clone(),
                    });
                }
                if !seen.insert(subject.code.as_str()) {
                    return Err(TimetableError::DuplicateCode {
                        section: section.clone(),
                        code: subject.code.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
