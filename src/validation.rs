use crate::calculations::projection::AttendanceInput;
use crate::calendar::DateRange;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("end date {end} must be after start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("desired attendance {0} must be a number between 0 and 100")]
    InvalidPercentage(f64),
    #[error("invalid attendance for {code}: {reason}")]
    InvalidAttendanceInput { code: String, reason: String },
    #[error("no timetable data for section {0}")]
    UnknownSection(String),
    #[error("section {0} has no subjects")]
    EmptySection(String),
}

impl ProjectionError {
    fn attendance(code: &str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidAttendanceInput {
            code: code.to_string(),
            reason: reason.into(),
        }
    }
}

pub fn validate_date_range(range: &DateRange) -> Result<(), ProjectionError> {
    if range.start_date >= range.end_date {
        return Err(ProjectionError::InvalidDateRange {
            start: range.start_date,
            end: range.end_date,
        });
    }
    Ok(())
}

pub fn validate_percentage(percent: f64) -> Result<(), ProjectionError> {
    if !percent.is_finite() || percent < 0.0 || percent > 100.0 {
        return Err(ProjectionError::InvalidPercentage(percent));
    }
    Ok(())
}

pub fn validate_attendance_input(
    code: &str,
    input: &AttendanceInput,
) -> Result<(), ProjectionError> {
    match *input {
        AttendanceInput::Counts { attended, held } => {
            if attended < 0 || held < 0 {
                return Err(ProjectionError::attendance(
                    code,
                    format!("counts must not be negative (attended {attended}, held {held})"),
                ));
            }
            if attended > held {
                return Err(ProjectionError::attendance(
                    code,
                    format!("attended {attended} is more than held {held}"),
                ));
            }
        }
        AttendanceInput::Percent { percent } => {
            if !percent.is_finite() || percent < 0.0 || percent > 100.0 {
                return Err(ProjectionError::attendance(
                    code,
                    format!("current attendance {percent} must be between 0 and 100"),
                ));
            }
        }
    }
    Ok(())
}
