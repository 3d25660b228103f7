use crate::calendar::{AbsenceSet, Holiday, HolidaySet};
use crate::validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DESIRED_ATTENDANCE: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreferenceError {
    #[error("holiday ends on {end}, before it starts on {start}")]
    InvalidHolidayRange { start: NaiveDate, end: NaiveDate },
    #[error("no student holiday at index {index} ({len} added)")]
    HolidayIndexOutOfRange { index: usize, len: usize },
    #[error("desired attendance {0} must be a number between 0 and 100")]
    InvalidTarget(f64),
}

fn default_desired_attendance() -> f64 {
    DEFAULT_DESIRED_ATTENDANCE
}

/// Everything a student keeps between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPreferences {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_desired_attendance")]
    pub desired_attendance: f64,
    #[serde(default)]
    pub absent_dates: AbsenceSet,
    #[serde(default)]
    pub student_holidays: Vec<Holiday>,
}

impl Default for StudentPreferences {
    fn default() -> Self {
        Self {
            section: None,
            desired_attendance: DEFAULT_DESIRED_ATTENDANCE,
            absent_dates: AbsenceSet::new(),
            student_holidays: Vec::new(),
        }
    }
}

impl StudentPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_section(&mut self, section: impl Into<String>) {
        self.section = Some(section.into());
    }

    pub fn set_desired_attendance(&mut self, percent: f64) -> Result<(), PreferenceError> {
        validation::validate_percentage(percent)
            .map_err(|_| PreferenceError::InvalidTarget(percent))?;
        self.desired_attendance = percent;
        Ok(())
    }

    pub fn add_holiday(&mut self, holiday: Holiday) -> Result<(), PreferenceError> {
        if !holiday.is_well_formed() {
            return Err(PreferenceError::InvalidHolidayRange {
                start: holiday.first_day(),
                end: holiday.last_day(),
            });
        }
        self.student_holidays.push(holiday);
        Ok(())
    }

    /// Removes a student-added holiday by its position in
    /// [`Self::student_holidays`]. Official holidays live elsewhere and can
    /// never be removed through preferences.
    pub fn remove_holiday(&mut self, index: usize) -> Result<Holiday, PreferenceError> {
        if index >= self.student_holidays.len() {
            return Err(PreferenceError::HolidayIndexOutOfRange {
                index,
                len: self.student_holidays.len(),
            });
        }
        Ok(self.student_holidays.remove(index))
    }

    /// Returns `false` if the date was already declared.
    pub fn add_absence(&mut self, date: NaiveDate) -> bool {
        self.absent_dates.insert(date)
    }

    pub fn remove_absence(&mut self, date: NaiveDate) -> bool {
        self.absent_dates.remove(date)
    }

    /// Absence dates in ascending order.
    pub fn absences_sorted(&self) -> Vec<NaiveDate> {
        self.absent_dates.iter().collect()
    }

    /// Checks what deserialization alone cannot: the target bounds and that
    /// every student holiday ends on or after its start.
    pub fn validate(&self) -> Result<(), PreferenceError> {
        validation::validate_percentage(self.desired_attendance)
            .map_err(|_| PreferenceError::InvalidTarget(self.desired_attendance))?;
        match self
            .student_holidays
            .iter()
            .find(|holiday| !holiday.is_well_formed())
        {
            Some(bad) => Err(PreferenceError::InvalidHolidayRange {
                start: bad.first_day(),
                end: bad.last_day(),
            }),
            None => Ok(()),
        }
    }

    pub fn holiday_set<'a>(&'a self, official: &'a [Holiday]) -> HolidaySet<'a> {
        HolidaySet::new(official, &self.student_holidays)
    }
}
