use crate::calculations::{AbsencePolicy, AttendanceInput, ClassCounter, SubjectProjection};
use crate::calendar::{AbsenceSet, DateRange, HolidaySet};
use crate::timetable::Timetable;
use crate::validation::{self, ProjectionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Projected position for one subject, rebuilt on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub subject_name: String,
    pub subject_code: String,
    pub total_classes: i64,
    pub classes_held_so_far: i64,
    pub classes_attended: i64,
    pub classes_left: i64,
    pub bunkable_classes: i64,
    pub must_attend: i64,
    pub projected_attendance_percent: f64,
}

impl ProjectionRecord {
    pub fn status(&self, desired_percent: f64) -> AttendanceStatus {
        AttendanceStatus::classify(self.projected_attendance_percent, desired_percent)
    }
}

/// Where a projected percentage lands relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    OnTrack,
    Warning,
    AtRisk,
}

impl AttendanceStatus {
    /// Points below target that still count as a warning rather than a risk.
    pub const WARNING_MARGIN: f64 = 5.0;

    pub fn classify(projected_percent: f64, desired_percent: f64) -> Self {
        if projected_percent >= desired_percent {
            AttendanceStatus::OnTrack
        } else if projected_percent >= desired_percent - Self::WARNING_MARGIN {
            AttendanceStatus::Warning
        } else {
            AttendanceStatus::AtRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::OnTrack => "on_track",
            AttendanceStatus::Warning => "warning",
            AttendanceStatus::AtRisk => "at_risk",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the student fills in for one projection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub section: String,
    pub semester: DateRange,
    pub today: NaiveDate,
    pub desired_percent: f64,
    /// Keyed by subject code.
    #[serde(default)]
    pub attendance: BTreeMap<String, AttendanceInput>,
    #[serde(default)]
    pub absence_policy: AbsencePolicy,
}

impl ProjectionRequest {
    pub fn new(
        section: impl Into<String>,
        semester: DateRange,
        today: NaiveDate,
        desired_percent: f64,
    ) -> Self {
        Self {
            section: section.into(),
            semester,
            today,
            desired_percent,
            attendance: BTreeMap::new(),
            absence_policy: AbsencePolicy::default(),
        }
    }

    pub fn with_attendance(mut self, code: impl Into<String>, input: AttendanceInput) -> Self {
        self.attendance.insert(code.into(), input);
        self
    }

    pub fn with_absence_policy(mut self, policy: AbsencePolicy) -> Self {
        self.absence_policy = policy;
        self
    }
}

/// Read-only view over the reference data and the student's own calendar.
///
/// Holds no state of its own; every [`Projector::project`] call recomputes
/// from the borrowed inputs.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'a> {
    timetable: &'a Timetable,
    holidays: HolidaySet<'a>,
    absences: &'a AbsenceSet,
}

impl<'a> Projector<'a> {
    pub fn new(
        timetable: &'a Timetable,
        holidays: HolidaySet<'a>,
        absences: &'a AbsenceSet,
    ) -> Self {
        Self {
            timetable,
            holidays,
            absences,
        }
    }

    /// Validates the whole request, then projects every subject of the
    /// section in timetable order. Either every record is returned or none.
    pub fn project(
        &self,
        request: &ProjectionRequest,
    ) -> Result<Vec<ProjectionRecord>, ProjectionError> {
        self.validate(request)?;

        let subjects = self
            .timetable
            .section(&request.section)
            .ok_or_else(|| ProjectionError::UnknownSection(request.section.clone()))?;

        let counter = ClassCounter::new(self.holidays, self.absences, request.absence_policy);
        let projection = SubjectProjection::new(
            &counter,
            request.semester,
            request.today,
            request.desired_percent,
        );

        let mut records = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let input = request.attendance.get(&subject.code).ok_or_else(|| {
                ProjectionError::InvalidAttendanceInput {
                    code: subject.code.clone(),
                    reason: "no attendance entered".into(),
                }
            })?;
            if let Some(record) = projection.execute(subject, input)? {
                records.push(record);
            }
        }

        info!(
            section = %request.section,
            subjects = subjects.len(),
            projected = records.len(),
            "projection complete"
        );
        Ok(records)
    }

    fn validate(&self, request: &ProjectionRequest) -> Result<(), ProjectionError> {
        validation::validate_date_range(&request.semester)?;
        validation::validate_percentage(request.desired_percent)?;

        let subjects = self
            .timetable
            .section(&request.section)
            .ok_or_else(|| ProjectionError::UnknownSection(request.section.clone()))?;
        if subjects.is_empty() {
            return Err(ProjectionError::EmptySection(request.section.clone()));
        }

        for subject in subjects {
            match request.attendance.get(&subject.code) {
                Some(input) => validation::validate_attendance_input(&subject.code, input)?,
                None => {
                    return Err(ProjectionError::InvalidAttendanceInput {
                        code: subject.code.clone(),
                        reason: "no attendance entered".into(),
                    });
                }
            }
        }

        for code in request.attendance.keys() {
            if !subjects.iter().any(|subject| &subject.code == code) {
                warn!(section = %request.section, %code, "ignoring attendance for subject outside section");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub subject_count: usize,
    pub total_bunkable: i64,
    pub total_must_attend: i64,
    pub on_track_count: usize,
    pub warning_count: usize,
    pub at_risk_count: usize,
}

impl ProjectionSummary {
    pub fn from_records(records: &[ProjectionRecord], desired_percent: f64) -> Self {
        let mut summary = Self {
            subject_count: records.len(),
            total_bunkable: 0,
            total_must_attend: 0,
            on_track_count: 0,
            warning_count: 0,
            at_risk_count: 0,
        };
        for record in records {
            summary.total_bunkable += record.bunkable_classes;
            summary.total_must_attend += record.must_attend;
            match record.status(desired_percent) {
                AttendanceStatus::OnTrack => summary.on_track_count += 1,
                AttendanceStatus::Warning => summary.warning_count += 1,
                AttendanceStatus::AtRisk => summary.at_risk_count += 1,
            }
        }
        summary
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("subjects={}", self.subject_count));
        parts.push(format!("can_bunk={}", self.total_bunkable));
        parts.push(format!("must_attend={}", self.total_must_attend));
        if self.warning_count > 0 {
            parts.push(format!("warning={}", self.warning_count));
        }
        if self.at_risk_count > 0 {
            parts.push(format!("at_risk={}", self.at_risk_count));
        }
        parts.join(", ")
    }
}
