use crate::calendar::{HolidaySet, HolidaySource};
use crate::projector::ProjectionRecord;
use crate::timetable::SectionSummary;
use polars::prelude::PlSmallStr;
use polars::prelude::*;

pub fn projection_dataframe(
    records: &[ProjectionRecord],
    desired_percent: f64,
) -> PolarsResult<DataFrame> {
    let subject: Vec<String> = records
        .iter()
        .map(|r| format!("{} ({})", r.subject_name, r.subject_code))
        .collect();
    let total: Vec<i64> = records.iter().map(|r| r.total_classes).collect();
    let held: Vec<i64> = records.iter().map(|r| r.classes_held_so_far).collect();
    let attended: Vec<i64> = records.iter().map(|r| r.classes_attended).collect();
    let left: Vec<i64> = records.iter().map(|r| r.classes_left).collect();
    let bunk: Vec<i64> = records.iter().map(|r| r.bunkable_classes).collect();
    let must: Vec<i64> = records.iter().map(|r| r.must_attend).collect();
    let projected: Vec<f64> = records
        .iter()
        .map(|r| r.projected_attendance_percent)
        .collect();
    let status: Vec<&str> = records
        .iter()
        .map(|r| r.status(desired_percent).as_str())
        .collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("subject"), subject).into_column(),
        Series::new(PlSmallStr::from_static("total"), total).into_column(),
        Series::new(PlSmallStr::from_static("held"), held).into_column(),
        Series::new(PlSmallStr::from_static("attended"), attended).into_column(),
        Series::new(PlSmallStr::from_static("left"), left).into_column(),
        Series::new(PlSmallStr::from_static("can_bunk"), bunk).into_column(),
        Series::new(PlSmallStr::from_static("must_attend"), must).into_column(),
        Series::new(PlSmallStr::from_static("projected_pct"), projected).into_column(),
        Series::new(PlSmallStr::from_static("status"), status).into_column(),
    ])
}

pub fn timetable_dataframe(summary: &[SectionSummary]) -> PolarsResult<DataFrame> {
    let subject: Vec<&str> = summary.iter().map(|s| s.subject.as_str()).collect();
    let code: Vec<&str> = summary.iter().map(|s| s.code.as_str()).collect();
    let per_week: Vec<u32> = summary.iter().map(|s| s.classes_per_week).collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("subject"), subject).into_column(),
        Series::new(PlSmallStr::from_static("code"), code).into_column(),
        Series::new(PlSmallStr::from_static("classes_per_week"), per_week).into_column(),
    ])
}

/// Student entries carry their index so they can be deleted by it.
pub fn holidays_dataframe(holidays: HolidaySet<'_>) -> PolarsResult<DataFrame> {
    let mut index: Vec<Option<u32>> = Vec::new();
    let mut source: Vec<&str> = Vec::new();
    let mut dates: Vec<String> = Vec::new();
    let mut label: Vec<&str> = Vec::new();
    let mut student_idx = 0u32;

    for (origin, holiday) in holidays.iter() {
        match origin {
            HolidaySource::Official => {
                index.push(None);
                source.push("official");
            }
            HolidaySource::Student => {
                index.push(Some(student_idx));
                source.push("student");
                student_idx += 1;
            }
        }
        if holiday.first_day() == holiday.last_day() {
            dates.push(holiday.first_day().to_string());
        } else {
            dates.push(format!("{} to {}", holiday.first_day(), holiday.last_day()));
        }
        label.push(holiday.label());
    }

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("index"), index).into_column(),
        Series::new(PlSmallStr::from_static("source"), source).into_column(),
        Series::new(PlSmallStr::from_static("dates"), dates).into_column(),
        Series::new(PlSmallStr::from_static("event"), label).into_column(),
    ])
}

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::Float64(v) => format!("{v:.1}"),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

/// Boxed plain-text table for terminal output.
pub fn render_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| {
                col.get(row_idx)
                    .map(|av| cell_text(&av))
                    .unwrap_or_default()
            })
            .collect();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            let pad = widths[ci].saturating_sub(value.chars().count());
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Holiday;
    use chrono::NaiveDate;

    fn record() -> ProjectionRecord {
        ProjectionRecord {
            subject_name: "Databases".into(),
            subject_code: "CS305".into(),
            total_classes: 8,
            classes_held_so_far: 4,
            classes_attended: 4,
            classes_left: 4,
            bunkable_classes: 2,
            must_attend: 2,
            projected_attendance_percent: 75.0,
        }
    }

    #[test]
    fn projection_frame_has_one_row_per_record() {
        let df = projection_dataframe(&[record()], 75.0).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 9);
        let bunk = df.column("can_bunk").unwrap().i64().unwrap().get(0);
        assert_eq!(bunk, Some(2));
    }

    #[test]
    fn rendered_table_aligns_cells() {
        let df = projection_dataframe(&[record()], 75.0).unwrap();
        let text = render_text_table(&df);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("can_bunk"));
        assert!(lines[3].contains("Databases (CS305)"));
        assert!(lines[3].contains("75.0"));
        assert!(lines[3].contains("on_track"));
        let width = lines[0].len();
        assert!(lines.iter().all(|line| line.len() == width));
    }

    #[test]
    fn holiday_frame_indexes_only_student_entries() {
        let day = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        let official = vec![Holiday::single(day, "Independence Day")];
        let student = vec![Holiday::range(day, day.succ_opt().unwrap(), "Trip")];
        let df = holidays_dataframe(HolidaySet::new(&official, &student)).unwrap();
        let index = df.column("index").unwrap().u32().unwrap();
        assert_eq!(index.get(0), None);
        assert_eq!(index.get(1), Some(0));
    }
}
