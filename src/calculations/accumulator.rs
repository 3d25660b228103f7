use crate::calendar::{AbsenceSet, HolidaySet, days_in_range};
use crate::timetable::Subject;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a declared absence is charged against a subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsencePolicy {
    /// One per absent day on which the subject meets.
    #[default]
    PerDay,
    /// Every class slot the subject has on the absent day.
    PerClassSlot,
}

impl AbsencePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbsencePolicy::PerDay => "per_day",
            AbsencePolicy::PerClassSlot => "per_class_slot",
        }
    }
}

impl fmt::Display for AbsencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbsencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_day" | "day" => Ok(AbsencePolicy::PerDay),
            "per_class_slot" | "slot" | "per_slot" => Ok(AbsencePolicy::PerClassSlot),
            other => Err(format!("unknown absence policy '{other}'")),
        }
    }
}

/// Counts classes over inclusive date windows, skipping holidays.
pub struct ClassCounter<'a> {
    holidays: HolidaySet<'a>,
    absences: &'a AbsenceSet,
    policy: AbsencePolicy,
}

impl<'a> ClassCounter<'a> {
    pub fn new(holidays: HolidaySet<'a>, absences: &'a AbsenceSet, policy: AbsencePolicy) -> Self {
        Self {
            holidays,
            absences,
            policy,
        }
    }

    /// Sum of the subject's weekday counts over non-holiday days in
    /// `[from, to]`. Zero when `from > to`.
    pub fn count_classes(&self, subject: &Subject, from: NaiveDate, to: NaiveDate) -> i64 {
        days_in_range(from, to)
            .filter(|day| !self.holidays.contains(*day))
            .map(|day| i64::from(subject.classes_on(day)))
            .sum()
    }

    /// Declared absences in `[from, to]` that fall on a non-holiday day when
    /// the subject meets, weighted by the configured policy.
    pub fn count_scheduled_absences(
        &self,
        subject: &Subject,
        from: NaiveDate,
        to: NaiveDate,
    ) -> i64 {
        self.absences
            .between(from, to)
            .filter(|day| !self.holidays.contains(*day))
            .map(|day| {
                let slots = subject.classes_on(day);
                match (self.policy, slots) {
                    (_, 0) => 0,
                    (AbsencePolicy::PerDay, _) => 1,
                    (AbsencePolicy::PerClassSlot, slots) => i64::from(slots),
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Holiday;
    use crate::timetable::ClassesPerWeekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn lab() -> Subject {
        // Two slots on Monday, one on Wednesday
        Subject::new("Chemistry Lab", "CH151", ClassesPerWeekday::from_pairs([(1, 2), (3, 1)]))
    }

    #[test]
    fn counts_skip_holidays() {
        let official = vec![Holiday::single(d(2025, 1, 8), "Founders Day")];
        let absences = AbsenceSet::new();
        let counter = ClassCounter::new(
            HolidaySet::new(&official, &[]),
            &absences,
            AbsencePolicy::PerDay,
        );
        // 2025-01-06 Mon .. 2025-01-12 Sun, Wednesday off
        assert_eq!(counter.count_classes(&lab(), d(2025, 1, 6), d(2025, 1, 12)), 2);
    }

    #[test]
    fn reversed_window_counts_nothing() {
        let absences: AbsenceSet = [d(2025, 1, 6)].into_iter().collect();
        let counter = ClassCounter::new(HolidaySet::default(), &absences, AbsencePolicy::PerDay);
        assert_eq!(counter.count_classes(&lab(), d(2025, 1, 12), d(2025, 1, 6)), 0);
        assert_eq!(
            counter.count_scheduled_absences(&lab(), d(2025, 1, 12), d(2025, 1, 6)),
            0
        );
    }

    #[test]
    fn absence_policy_controls_weighting() {
        // Monday (2 slots), Tuesday (none), Wednesday (1 slot)
        let absences: AbsenceSet = [d(2025, 1, 6), d(2025, 1, 7), d(2025, 1, 8)]
            .into_iter()
            .collect();
        let per_day = ClassCounter::new(HolidaySet::default(), &absences, AbsencePolicy::PerDay);
        let per_slot =
            ClassCounter::new(HolidaySet::default(), &absences, AbsencePolicy::PerClassSlot);
        assert_eq!(
            per_day.count_scheduled_absences(&lab(), d(2025, 1, 1), d(2025, 1, 31)),
            2
        );
        assert_eq!(
            per_slot.count_scheduled_absences(&lab(), d(2025, 1, 1), d(2025, 1, 31)),
            3
        );
    }

    #[test]
    fn absence_on_holiday_is_not_charged() {
        let student = vec![Holiday::range(d(2025, 1, 6), d(2025, 1, 8), "Trip")];
        let absences: AbsenceSet = [d(2025, 1, 6)].into_iter().collect();
        let counter = ClassCounter::new(
            HolidaySet::new(&[], &student),
            &absences,
            AbsencePolicy::PerDay,
        );
        assert_eq!(
            counter.count_scheduled_absences(&lab(), d(2025, 1, 1), d(2025, 1, 31)),
            0
        );
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("per_class_slot".parse::<AbsencePolicy>(), Ok(AbsencePolicy::PerClassSlot));
        assert_eq!(" Day ".parse::<AbsencePolicy>(), Ok(AbsencePolicy::PerDay));
        assert!("weekly".parse::<AbsencePolicy>().is_err());
    }
}
