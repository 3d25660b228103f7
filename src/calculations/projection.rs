use super::accumulator::ClassCounter;
use crate::calendar::DateRange;
use crate::projector::ProjectionRecord;
use crate::timetable::Subject;
use crate::validation::{self, ProjectionError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the student knows about their attendance so far for one subject.
///
/// `Counts` takes the held/attended figures as entered. `Percent` derives
/// both from the calendar: held is counted from the timetable and attended is
/// `round(percent / 100 * held)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttendanceInput {
    Counts { attended: i64, held: i64 },
    Percent { percent: f64 },
}

impl AttendanceInput {
    pub fn counts(attended: i64, held: i64) -> Self {
        AttendanceInput::Counts { attended, held }
    }

    pub fn percent(percent: f64) -> Self {
        AttendanceInput::Percent { percent }
    }
}

/// Minimum attended classes out of `total` to reach `desired_percent`.
///
/// Always rounds up: a target is met at or above the threshold, never by
/// rounding down.
pub fn classes_needed(desired_percent: f64, total: i64) -> i64 {
    let exact = desired_percent * total as f64 / 100.0;
    exact.ceil().max(0.0) as i64
}

pub struct SubjectProjection<'a> {
    counter: &'a ClassCounter<'a>,
    semester: DateRange,
    today: NaiveDate,
    desired_percent: f64,
}

impl<'a> SubjectProjection<'a> {
    pub fn new(
        counter: &'a ClassCounter<'a>,
        semester: DateRange,
        today: NaiveDate,
        desired_percent: f64,
    ) -> Self {
        Self {
            counter,
            semester,
            today,
            desired_percent,
        }
    }

    /// Projects one subject. `Ok(None)` means the subject has no classes in
    /// the semester and is left out of the results.
    pub fn execute(
        &self,
        subject: &Subject,
        input: &AttendanceInput,
    ) -> Result<Option<ProjectionRecord>, ProjectionError> {
        validation::validate_attendance_input(&subject.code, input)?;

        let start = self.semester.start_date;
        let end = self.semester.end_date;

        // Calendar classes strictly after today; today itself counts as held.
        let classes_left = match self.today.succ_opt() {
            Some(tomorrow) => self.counter.count_classes(subject, tomorrow.max(start), end),
            None => 0,
        };

        let (classes_held_so_far, classes_attended) = match *input {
            AttendanceInput::Counts { attended, held } => (held, attended),
            AttendanceInput::Percent { percent } => {
                let held = self
                    .counter
                    .count_classes(subject, start, self.today.min(end));
                let attended = (percent / 100.0 * held as f64).round() as i64;
                (held, attended.clamp(0, held))
            }
        };

        let total_classes = classes_held_so_far.checked_add(classes_left).ok_or_else(|| {
            ProjectionError::InvalidAttendanceInput {
                code: subject.code.clone(),
                reason: format!("held {classes_held_so_far} is too large"),
            }
        })?;
        if total_classes == 0 {
            debug!(code = %subject.code, "no scheduled classes in range, skipping");
            return Ok(None);
        }

        let classes_needed = classes_needed(self.desired_percent, total_classes);
        let attendance_gap = classes_needed - classes_attended;
        let scheduled_absences =
            self.counter
                .count_scheduled_absences(subject, self.today.max(start), end);

        let (bunkable_classes, must_attend) = if attendance_gap <= 0 {
            // Target already secured by classes attended so far.
            (classes_left, 0)
        } else {
            let must_attend =
                (attendance_gap.min(classes_left) + scheduled_absences).min(classes_left);
            (classes_left - must_attend, must_attend)
        };

        let projected_attended = classes_attended + (classes_left - bunkable_classes);
        let projected_attendance_percent = projected_attended as f64 / total_classes as f64 * 100.0;

        debug!(
            code = %subject.code,
            total_classes,
            classes_held_so_far,
            classes_attended,
            classes_needed,
            scheduled_absences,
            bunkable_classes,
            must_attend,
            "projected subject"
        );

        Ok(Some(ProjectionRecord {
            subject_name: subject.name.clone(),
            subject_code: subject.code.clone(),
            total_classes,
            classes_held_so_far,
            classes_attended,
            classes_left,
            bunkable_classes,
            must_attend,
            projected_attendance_percent,
        }))
    }
}
