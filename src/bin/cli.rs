use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use bunk_planner::report::{
    holidays_dataframe, projection_dataframe, render_text_table, timetable_dataframe,
};
use bunk_planner::{
    AbsencePolicy, AppConfig, AttendanceInput, DateRange, Holiday, ProjectionRequest,
    ProjectionSummary, Projector, StudentPreferences, Timetable, export_projection_to_csv,
    load_holidays_from_json, load_preferences_from_json, load_timetable_from_json,
    save_preferences_to_json,
};
use chrono::{Local, Months, NaiveDate};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bunk-planner",
    version,
    about = "Work out how many classes you can skip and still hit your attendance target"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Timetable JSON (overrides the configured path).
    #[arg(long, value_name = "PATH")]
    timetable: Option<PathBuf>,

    /// Official holidays JSON (overrides the configured path).
    #[arg(long, value_name = "PATH")]
    holidays: Option<PathBuf>,

    /// Preferences JSON loaded on start.
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,

    /// Pin "today" instead of using the system date.
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,
}

struct Session {
    timetable: Timetable,
    official_holidays: Vec<Holiday>,
    preferences: StudentPreferences,
    semester: DateRange,
    today: NaiveDate,
    policy: AbsencePolicy,
    attendance: BTreeMap<String, AttendanceInput>,
}

enum Flow {
    Continue,
    Quit,
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  sections                           List sections in the timetable\n  section <name>                     Select a section and show its timetable\n  timetable                          Show the selected section's timetable\n  target <pct>                       Set desired attendance (0-100)\n  range <start> <end>                Set semester dates (YYYY-MM-DD)\n  today <YYYY-MM-DD>                 Override today's date\n  policy <per_day|per_class_slot>    How planned absences are charged\n  attend <code> <attended> <held>    Enter attendance counts for a subject\n  percent <code> <pct>               Enter current attendance percentage\n  holidays                           List official and personal holidays\n  holiday add <date> [label...]      Add a personal holiday\n  holiday range <start> <end> [label...]\n                                     Add a personal holiday span\n  holiday del <index>                Delete a personal holiday\n  absences                           List planned absences\n  absent add <date>                  Plan an absence\n  absent del <date>                  Remove a planned absence\n  status                             Show the current inputs\n  compute                            Project every subject\n  export <csv_path>                  Write the projection to CSV\n  save <path>                        Save preferences to JSON\n  load <path>                        Load preferences from JSON\n  quit|exit                          Exit"
    );
}

impl Session {
    fn selected_section(&self) -> Option<&str> {
        self.preferences.section.as_deref()
    }

    fn print_timetable(&self, section: &str) {
        match self.timetable.summary(section) {
            Some(summary) => match timetable_dataframe(&summary) {
                Ok(df) => println!("{}", render_text_table(&df)),
                Err(e) => println!("Error: {}", e),
            },
            None => println!("No timetable data available for section {section}."),
        }
    }

    fn print_holidays(&self) {
        let holidays = self.preferences.holiday_set(&self.official_holidays);
        if holidays.is_empty() {
            println!("No holidays added yet.");
            return;
        }
        match holidays_dataframe(holidays) {
            Ok(df) => println!("{}", render_text_table(&df)),
            Err(e) => println!("Error: {}", e),
        }
    }

    fn print_absences(&self) {
        let dates = self.preferences.absences_sorted();
        if dates.is_empty() {
            println!("No leave dates added yet.");
            return;
        }
        for date in dates {
            println!("  {date}");
        }
    }

    fn print_status(&self) {
        println!(
            "Section            : {}",
            self.selected_section().unwrap_or("(none)")
        );
        println!("Desired attendance : {}%", self.preferences.desired_attendance);
        println!(
            "Semester           : {} to {}",
            self.semester.start_date, self.semester.end_date
        );
        println!("Today              : {}", self.today);
        println!("Absence policy     : {}", self.policy);
        println!("Subjects entered   : {}", self.attendance.len());
        println!("Planned absences   : {}", self.preferences.absent_dates.len());
    }

    fn request(&self) -> Option<ProjectionRequest> {
        let section = self.selected_section()?;
        let mut request = ProjectionRequest::new(
            section,
            self.semester,
            self.today,
            self.preferences.desired_attendance,
        )
        .with_absence_policy(self.policy);
        request.attendance = self.attendance.clone();
        Some(request)
    }

    fn compute(&self) -> Option<Vec<bunk_planner::ProjectionRecord>> {
        let Some(request) = self.request() else {
            println!("Please select a section first.");
            return None;
        };
        let projector = Projector::new(
            &self.timetable,
            self.preferences.holiday_set(&self.official_holidays),
            &self.preferences.absent_dates,
        );
        match projector.project(&request) {
            Ok(records) => Some(records),
            Err(e) => {
                println!("Error: {}", e);
                None
            }
        }
    }

    fn handle(&mut self, input: &str) -> Flow {
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => return Flow::Quit,
            "sections" => {
                if self.timetable.is_empty() {
                    println!("No timetable loaded.");
                }
                for name in self.timetable.section_names() {
                    println!("  {name}");
                }
            }
            "section" => match parts.next() {
                Some(name) => {
                    if self.timetable.section(name).is_none() {
                        println!("No timetable data available for section {name}.");
                    } else {
                        self.preferences.set_section(name);
                        self.attendance.clear();
                        println!("Section set to {name}.");
                        self.print_timetable(name);
                    }
                }
                None => println!("Usage: section <name>"),
            },
            "timetable" => match self.selected_section() {
                Some(section) => self.print_timetable(section),
                None => println!("Please select a section first."),
            },
            "target" => match parts.next().map(str::parse::<f64>) {
                Some(Ok(pct)) => match self.preferences.set_desired_attendance(pct) {
                    Ok(()) => println!("Desired attendance set to {pct}%."),
                    Err(e) => println!("Error: {}", e),
                },
                Some(Err(_)) => println!("Invalid percentage"),
                None => println!("Usage: target <pct>"),
            },
            "range" => match (parts.next().and_then(parse_date), parts.next().and_then(parse_date)) {
                (Some(start), Some(end)) => {
                    if start >= end {
                        println!("End date must be after start date.");
                    } else {
                        self.semester = DateRange::new(start, end);
                        println!("Semester set to {start} to {end}.");
                    }
                }
                _ => println!("Usage: range <YYYY-MM-DD> <YYYY-MM-DD>"),
            },
            "today" => match parts.next().and_then(parse_date) {
                Some(date) => {
                    self.today = date;
                    println!("Today set to {date}.");
                }
                None => println!("Usage: today <YYYY-MM-DD>"),
            },
            "policy" => match parts.next().map(str::parse::<AbsencePolicy>) {
                Some(Ok(policy)) => {
                    self.policy = policy;
                    println!("Absence policy set to {policy}.");
                }
                Some(Err(e)) => println!("Error: {}", e),
                None => println!("Usage: policy <per_day|per_class_slot>"),
            },
            "attend" => {
                let code = parts.next();
                let attended = parts.next().map(str::parse::<i64>);
                let held = parts.next().map(str::parse::<i64>);
                match (code, attended, held) {
                    (Some(code), Some(Ok(attended)), Some(Ok(held))) => {
                        self.attendance
                            .insert(code.to_string(), AttendanceInput::counts(attended, held));
                        println!("Attendance for {code} set to {attended}/{held}.");
                    }
                    _ => println!("Usage: attend <code> <attended> <held>"),
                }
            }
            "percent" => {
                let code = parts.next();
                let pct = parts.next().map(str::parse::<f64>);
                match (code, pct) {
                    (Some(code), Some(Ok(pct))) => {
                        self.attendance
                            .insert(code.to_string(), AttendanceInput::percent(pct));
                        println!("Attendance for {code} set to {pct}%.");
                    }
                    _ => println!("Usage: percent <code> <pct>"),
                }
            }
            "holidays" => self.print_holidays(),
            "holiday" => {
                let sub = parts.next();
                match sub {
                    Some("add") => match parts.next().and_then(parse_date) {
                        Some(date) => {
                            let label = parts.collect::<Vec<_>>().join(" ");
                            match self.preferences.add_holiday(Holiday::single(date, label)) {
                                Ok(()) => println!("Holiday added."),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        None => println!("Usage: holiday add <YYYY-MM-DD> [label...]"),
                    },
                    Some("range") => {
                        match (parts.next().and_then(parse_date), parts.next().and_then(parse_date)) {
                            (Some(start), Some(end)) => {
                                let label = parts.collect::<Vec<_>>().join(" ");
                                match self
                                    .preferences
                                    .add_holiday(Holiday::range(start, end, label))
                                {
                                    Ok(()) => println!("Holiday added."),
                                    Err(e) => println!("Error: {}", e),
                                }
                            }
                            _ => println!("Usage: holiday range <start> <end> [label...]"),
                        }
                    }
                    Some("del") => match parts.next().map(str::parse::<usize>) {
                        Some(Ok(index)) => match self.preferences.remove_holiday(index) {
                            Ok(removed) => println!("Deleted holiday {removed}."),
                            Err(e) => println!("Error: {}", e),
                        },
                        _ => println!("Usage: holiday del <index>"),
                    },
                    _ => println!("Usage: holiday <add|range|del> ..."),
                }
            }
            "absences" => self.print_absences(),
            "absent" => {
                let sub = parts.next();
                let date = parts.next().and_then(parse_date);
                match (sub, date) {
                    (Some("add"), Some(date)) => {
                        if self.preferences.add_absence(date) {
                            println!("Absence on {date} added.");
                        } else {
                            println!("{date} is already a planned absence.");
                        }
                    }
                    (Some("del"), Some(date)) => {
                        if self.preferences.remove_absence(date) {
                            println!("Absence on {date} removed.");
                        } else {
                            println!("{date} is not a planned absence.");
                        }
                    }
                    _ => println!("Usage: absent <add|del> <YYYY-MM-DD>"),
                }
            }
            "status" => self.print_status(),
            "compute" => {
                if let Some(records) = self.compute() {
                    let desired = self.preferences.desired_attendance;
                    let summary = ProjectionSummary::from_records(&records, desired);
                    if records.is_empty() {
                        println!("No data to display. No subject has classes in this range.");
                    } else {
                        match projection_dataframe(&records, desired) {
                            Ok(df) => println!(
                                "Based on your desired attendance of {desired}% ({})\n{}",
                                summary.to_cli_summary(),
                                render_text_table(&df)
                            ),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                }
            }
            "export" => match parts.next() {
                Some(path) => {
                    if let Some(records) = self.compute() {
                        match export_projection_to_csv(
                            &records,
                            self.preferences.desired_attendance,
                            path,
                        ) {
                            Ok(()) => println!("Projection exported to {path}."),
                            Err(e) => println!("Error exporting projection: {}", e),
                        }
                    }
                }
                None => println!("Usage: export <csv_path>"),
            },
            "save" => match parts.next() {
                Some(path) => match save_preferences_to_json(&self.preferences, path) {
                    Ok(()) => println!("Preferences saved to {path}."),
                    Err(e) => println!("Error saving preferences: {}", e),
                },
                None => println!("Usage: save <path>"),
            },
            "load" => match parts.next() {
                Some(path) => match load_preferences_from_json(path) {
                    Ok(preferences) => {
                        self.preferences = preferences;
                        self.attendance.clear();
                        println!("Preferences loaded from {path}.");
                    }
                    Err(e) => println!("Error loading preferences: {}", e),
                },
                None => println!("Usage: load <path>"),
            },
            other => println!("Unknown command '{other}'. Type 'help' for commands."),
        }
        Flow::Continue
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    let timetable_path = cli.timetable.unwrap_or(config.timetable_path);
    let timetable = match load_timetable_from_json(&timetable_path) {
        Ok(timetable) => timetable,
        Err(e) => {
            warn!(path = %timetable_path.display(), error = %e, "starting without a timetable");
            Timetable::new()
        }
    };
    let official_holidays = match cli.holidays.or(config.holidays_path) {
        Some(path) => load_holidays_from_json(&path)?,
        None => Vec::new(),
    };
    let mut preferences = match &cli.prefs {
        Some(path) if path.exists() => load_preferences_from_json(path)?,
        _ => StudentPreferences::default(),
    };
    if cli.prefs.is_none() {
        preferences.desired_attendance = config.default_target;
    }

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let semester = DateRange::new(
        today.checked_sub_months(Months::new(2)).unwrap_or(today),
        today.checked_add_months(Months::new(4)).unwrap_or(today),
    );

    let mut session = Session {
        timetable,
        official_holidays,
        preferences,
        semester,
        today,
        policy: config.absence_policy,
        attendance: BTreeMap::new(),
    };

    println!("Bunk Planner (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Flow::Quit = session.handle(input) {
            break;
        }
    }
    Ok(())
}
