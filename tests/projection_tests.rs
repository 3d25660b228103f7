use bunk_planner::{
    AbsencePolicy, AbsenceSet, AttendanceInput, AttendanceStatus, ClassesPerWeekday, DateRange,
    Holiday, HolidaySet, ProjectionError, ProjectionRecord, ProjectionRequest, Projector, Subject,
    Timetable,
};
use chrono::NaiveDate;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday 2025-01-06 through Sunday 2025-01-19.
fn two_weeks() -> DateRange {
    DateRange::new(d(2025, 1, 6), d(2025, 1, 19))
}

fn mon_to_thu() -> ClassesPerWeekday {
    ClassesPerWeekday::from_pairs([(1, 1), (2, 1), (3, 1), (4, 1)])
}

fn sample_timetable() -> Timetable {
    let mut timetable = Timetable::new();
    timetable.insert_section(
        "CSE-A",
        vec![Subject::new("Operating Systems", "CS301", mon_to_thu())],
    );
    timetable.insert_section(
        "CSE-B",
        vec![
            Subject::new("Operating Systems", "CS301", mon_to_thu()),
            Subject::new("Seminar", "CS399", ClassesPerWeekday::default()),
            Subject::new(
                "Chemistry Lab",
                "CH151",
                ClassesPerWeekday::from_pairs([(1, 4)]),
            ),
        ],
    );
    timetable.insert_section("EMPTY", Vec::new());
    timetable
}

fn request(attended: i64, held: i64, desired: f64) -> ProjectionRequest {
    ProjectionRequest::new("CSE-A", two_weeks(), d(2025, 1, 12), desired)
        .with_attendance("CS301", AttendanceInput::counts(attended, held))
}

fn project_with(
    timetable: &Timetable,
    official: &[Holiday],
    student: &[Holiday],
    absences: &AbsenceSet,
    request: &ProjectionRequest,
) -> Result<Vec<ProjectionRecord>, ProjectionError> {
    Projector::new(timetable, HolidaySet::new(official, student), absences).project(request)
}

fn project_one(request: &ProjectionRequest) -> ProjectionRecord {
    let timetable = sample_timetable();
    let absences = AbsenceSet::new();
    let mut records = project_with(&timetable, &[], &[], &absences, request).unwrap();
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn exactly_on_target_leaves_two_classes_to_skip() {
    let record = project_one(&request(4, 4, 75.0));
    assert_eq!(record.subject_name, "Operating Systems");
    assert_eq!(record.classes_held_so_far, 4);
    assert_eq!(record.classes_left, 4);
    assert_eq!(record.total_classes, 8);
    assert_eq!(record.must_attend, 2);
    assert_eq!(record.bunkable_classes, 2);
    assert!((record.projected_attendance_percent - 75.0).abs() < 1e-9);
    assert_eq!(record.status(75.0), AttendanceStatus::OnTrack);
}

#[test]
fn surplus_lets_every_remaining_class_be_skipped() {
    let record = project_one(&request(4, 4, 50.0));
    assert_eq!(record.must_attend, 0);
    assert_eq!(record.bunkable_classes, 4);
    assert!((record.projected_attendance_percent - 50.0).abs() < 1e-9);
}

#[test]
fn unreachable_target_requires_every_class_and_is_at_risk() {
    let record = project_one(&request(0, 4, 75.0));
    assert_eq!(record.must_attend, 4);
    assert_eq!(record.bunkable_classes, 0);
    assert!((record.projected_attendance_percent - 50.0).abs() < 1e-9);
    assert_eq!(record.status(75.0), AttendanceStatus::AtRisk);
}

#[test]
fn desired_extremes() {
    let zero = project_one(&request(1, 4, 0.0));
    assert_eq!(zero.bunkable_classes, 4);
    assert_eq!(zero.must_attend, 0);

    let full = project_one(&request(4, 4, 100.0));
    assert_eq!(full.bunkable_classes, 0);
    assert_eq!(full.must_attend, 4);
    assert!((full.projected_attendance_percent - 100.0).abs() < 1e-9);
}

#[test]
fn full_target_when_already_behind_requires_every_class() {
    let record = project_one(&request(1, 4, 100.0));
    assert_eq!(record.must_attend, record.classes_left);
    assert_eq!(record.bunkable_classes, 0);
    assert!((record.projected_attendance_percent - 62.5).abs() < 1e-9);
}

#[test]
fn target_just_above_a_boundary_rounds_up() {
    // 50.00001% of 8 is a hair above 4, so five classes are needed
    let record = project_one(&request(4, 4, 50.00001));
    assert_eq!(record.must_attend, 1);
    assert_eq!(record.bunkable_classes, 3);
    assert!(record.projected_attendance_percent >= 50.00001);
    assert_eq!(record.status(50.00001), AttendanceStatus::OnTrack);
}

#[test]
fn oversized_held_count_is_rejected() {
    let timetable = sample_timetable();
    let absences = AbsenceSet::new();
    let req = request(0, i64::MAX, 75.0);
    match project_with(&timetable, &[], &[], &absences, &req) {
        Err(ProjectionError::InvalidAttendanceInput { code, .. }) => assert_eq!(code, "CS301"),
        other => panic!("expected oversized held to be rejected, got {other:?}"),
    }
}

#[test]
fn remaining_classes_always_split_between_bunk_and_attend() {
    for desired in [0.0, 33.3, 50.0, 66.7, 75.0, 90.0, 100.0] {
        for held in 0..=4 {
            for attended in 0..=held {
                let record = project_one(&request(attended, held, desired));
                assert_eq!(
                    record.bunkable_classes + record.must_attend,
                    record.classes_left,
                    "desired={desired} attended={attended} held={held}"
                );
                assert!(record.bunkable_classes >= 0);
                assert!(record.must_attend >= 0);
                assert!(0 <= record.classes_attended);
                assert!(record.classes_attended <= record.classes_held_so_far);
                assert!(record.classes_held_so_far <= record.total_classes);
                if desired == 0.0 {
                    assert_eq!(record.must_attend, 0);
                }
                if desired == 100.0 && record.classes_attended < record.total_classes {
                    assert_eq!(record.must_attend, record.classes_left);
                    assert_eq!(record.bunkable_classes, 0);
                }
                assert!(record.projected_attendance_percent >= 0.0);
                assert!(record.projected_attendance_percent <= 100.0 + 1e-9);
            }
        }
    }
}

#[test]
fn percent_mode_derives_held_from_calendar() {
    let req = ProjectionRequest::new("CSE-A", two_weeks(), d(2025, 1, 12), 75.0)
        .with_attendance("CS301", AttendanceInput::percent(50.0));
    let record = project_one(&req);
    assert_eq!(record.classes_held_so_far, 4);
    assert_eq!(record.classes_attended, 2);
    assert_eq!(record.must_attend, 4);
    assert_eq!(record.bunkable_classes, 0);
    assert!((record.projected_attendance_percent - 75.0).abs() < 1e-9);
}

#[test]
fn today_before_semester_counts_every_class_as_left() {
    let req = ProjectionRequest::new("CSE-A", two_weeks(), d(2025, 1, 1), 75.0)
        .with_attendance("CS301", AttendanceInput::counts(0, 0));
    let record = project_one(&req);
    assert_eq!(record.classes_left, 8);
    assert_eq!(record.must_attend, 6);
    assert_eq!(record.bunkable_classes, 2);
}

#[test]
fn today_after_semester_has_nothing_left() {
    let req = ProjectionRequest::new("CSE-A", two_weeks(), d(2025, 2, 1), 75.0)
        .with_attendance("CS301", AttendanceInput::counts(6, 8));
    let record = project_one(&req);
    assert_eq!(record.classes_left, 0);
    assert_eq!(record.bunkable_classes, 0);
    assert_eq!(record.must_attend, 0);
    assert!((record.projected_attendance_percent - 75.0).abs() < 1e-9);
}

#[test]
fn planned_absence_reduces_bunkable_budget() {
    let timetable = sample_timetable();
    let absences: AbsenceSet = [d(2025, 1, 14)].into_iter().collect();
    let records = project_with(&timetable, &[], &[], &absences, &request(4, 4, 75.0)).unwrap();
    assert_eq!(records[0].must_attend, 3);
    assert_eq!(records[0].bunkable_classes, 1);
    assert!((records[0].projected_attendance_percent - 87.5).abs() < 1e-9);
}

#[test]
fn absence_on_a_day_without_classes_is_ignored() {
    let timetable = sample_timetable();
    let absences: AbsenceSet = [d(2025, 1, 17)].into_iter().collect();
    let records = project_with(&timetable, &[], &[], &absences, &request(4, 4, 75.0)).unwrap();
    assert_eq!(records[0].must_attend, 2);
    assert_eq!(records[0].bunkable_classes, 2);
}

#[test]
fn holiday_removes_classes_and_shadows_absence() {
    let timetable = sample_timetable();
    let official = vec![Holiday::single(d(2025, 1, 14), "Pongal")];
    let absences: AbsenceSet = [d(2025, 1, 14)].into_iter().collect();
    let records = project_with(&timetable, &official, &[], &absences, &request(4, 4, 75.0)).unwrap();
    let record = &records[0];
    assert_eq!(record.classes_left, 3);
    assert_eq!(record.total_classes, 7);
    assert_eq!(record.must_attend, 2);
    assert_eq!(record.bunkable_classes, 1);
    assert!((record.projected_attendance_percent - 6.0 / 7.0 * 100.0).abs() < 1e-9);
}

#[test]
fn holiday_on_class_free_day_changes_nothing() {
    let timetable = sample_timetable();
    let student = vec![Holiday::range(d(2025, 1, 18), d(2025, 1, 19), "Weekend trip")];
    let absences = AbsenceSet::new();
    let with_holiday =
        project_with(&timetable, &[], &student, &absences, &request(4, 4, 75.0)).unwrap();
    let without = project_with(&timetable, &[], &[], &absences, &request(4, 4, 75.0)).unwrap();
    assert_eq!(with_holiday, without);
}

#[test]
fn class_slot_policy_charges_every_missed_slot() {
    let timetable = sample_timetable();
    let absences: AbsenceSet = [d(2025, 1, 13)].into_iter().collect();
    let base = ProjectionRequest::new("CSE-B", two_weeks(), d(2025, 1, 12), 50.0)
        .with_attendance("CS301", AttendanceInput::counts(4, 4))
        .with_attendance("CS399", AttendanceInput::counts(0, 0))
        .with_attendance("CH151", AttendanceInput::counts(2, 4));

    let per_day = project_with(&timetable, &[], &[], &absences, &base).unwrap();
    let lab = per_day.iter().find(|r| r.subject_code == "CH151").unwrap();
    assert_eq!(lab.must_attend, 3);
    assert_eq!(lab.bunkable_classes, 1);

    let per_slot_request = base.with_absence_policy(AbsencePolicy::PerClassSlot);
    let per_slot = project_with(&timetable, &[], &[], &absences, &per_slot_request).unwrap();
    let lab = per_slot.iter().find(|r| r.subject_code == "CH151").unwrap();
    assert_eq!(lab.must_attend, 4);
    assert_eq!(lab.bunkable_classes, 0);
}

#[test]
fn subjects_without_classes_are_left_out_in_timetable_order() {
    let timetable = sample_timetable();
    let absences = AbsenceSet::new();
    let req = ProjectionRequest::new("CSE-B", two_weeks(), d(2025, 1, 12), 75.0)
        .with_attendance("CH151", AttendanceInput::counts(4, 4))
        .with_attendance("CS399", AttendanceInput::counts(0, 0))
        .with_attendance("CS301", AttendanceInput::counts(3, 4));
    let records = project_with(&timetable, &[], &[], &absences, &req).unwrap();
    let codes: Vec<&str> = records.iter().map(|r| r.subject_code.as_str()).collect();
    assert_eq!(codes, vec!["CS301", "CH151"]);
}

#[test]
fn repeated_projection_is_identical() {
    let timetable = sample_timetable();
    let absences: AbsenceSet = [d(2025, 1, 15)].into_iter().collect();
    let req = request(3, 4, 80.0);
    let first = project_with(&timetable, &[], &[], &absences, &req).unwrap();
    let second = project_with(&timetable, &[], &[], &absences, &req).unwrap();
    assert_eq!(first, second);
}

#[test]
fn attendance_for_foreign_codes_is_ignored() {
    let req = request(4, 4, 75.0).with_attendance("XX999", AttendanceInput::counts(1, 1));
    let record = project_one(&req);
    assert_eq!(record.subject_code, "CS301");
}

#[test]
fn invalid_requests_are_rejected_before_projecting() {
    let timetable = sample_timetable();
    let absences = AbsenceSet::new();
    let run = |req: &ProjectionRequest| project_with(&timetable, &[], &[], &absences, req);

    let mut reversed = request(4, 4, 75.0);
    reversed.semester = DateRange::new(d(2025, 1, 19), d(2025, 1, 6));
    assert!(matches!(
        run(&reversed),
        Err(ProjectionError::InvalidDateRange { .. })
    ));

    let mut same_day = request(4, 4, 75.0);
    same_day.semester = DateRange::new(d(2025, 1, 6), d(2025, 1, 6));
    assert!(matches!(
        run(&same_day),
        Err(ProjectionError::InvalidDateRange { .. })
    ));

    assert_eq!(
        run(&request(4, 4, 120.0)),
        Err(ProjectionError::InvalidPercentage(120.0))
    );
    assert!(matches!(
        run(&request(5, 4, 75.0)),
        Err(ProjectionError::InvalidAttendanceInput { .. })
    ));
    assert!(matches!(
        run(&request(-1, 4, 75.0)),
        Err(ProjectionError::InvalidAttendanceInput { .. })
    ));

    let mut unknown = request(4, 4, 75.0);
    unknown.section = "MECH-Z".into();
    assert_eq!(
        run(&unknown),
        Err(ProjectionError::UnknownSection("MECH-Z".into()))
    );

    let mut empty = request(4, 4, 75.0);
    empty.section = "EMPTY".into();
    assert_eq!(run(&empty), Err(ProjectionError::EmptySection("EMPTY".into())));
}

#[test]
fn missing_input_for_any_subject_fails_the_whole_batch() {
    let timetable = sample_timetable();
    let absences = AbsenceSet::new();
    let req = ProjectionRequest::new("CSE-B", two_weeks(), d(2025, 1, 12), 75.0)
        .with_attendance("CS301", AttendanceInput::counts(4, 4))
        .with_attendance("CS399", AttendanceInput::counts(0, 0));
    match project_with(&timetable, &[], &[], &absences, &req) {
        Err(ProjectionError::InvalidAttendanceInput { code, .. }) => assert_eq!(code, "CH151"),
        other => panic!("expected missing CH151 input, got {other:?}"),
    }
}

#[test]
fn request_deserializes_from_form_json() {
    let json = r#"{
        "section": "CSE-A",
        "semester": {"start_date": "2025-01-06", "end_date": "2025-01-19"},
        "today": "2025-01-12",
        "desired_percent": 75,
        "attendance": {"CS301": {"attended": 4, "held": 4}}
    }"#;
    let req: ProjectionRequest = serde_json::from_str(json).unwrap();
    assert_eq!(req.absence_policy, AbsencePolicy::PerDay);
    let record = project_one(&req);
    assert_eq!(record.bunkable_classes, 2);
}
