#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::Arc;

    use bunk_planner::http_api::{self, AppState, ReferenceData};
    use bunk_planner::{
        AppConfig, MemoryPreferenceStore, PreferenceStore, load_holidays_from_json,
        load_timetable_from_json,
    };
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    let config_path = std::env::var("BUNK_PLANNER_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr: SocketAddr = config.http_addr.parse()?;
    let timetable = load_timetable_from_json(&config.timetable_path)?;
    let official_holidays = match &config.holidays_path {
        Some(path) => load_holidays_from_json(path)?,
        None => Vec::new(),
    };
    if timetable.is_empty() {
        tracing::warn!(path = %config.timetable_path.display(), "timetable has no sections");
    }
    info!(
        sections = timetable.section_names().count(),
        holidays = official_holidays.len(),
        "reference data loaded"
    );

    let store: Arc<dyn PreferenceStore + Send + Sync> = match &config.database_path {
        #[cfg(feature = "sqlite")]
        Some(path) => Arc::new(bunk_planner::SqlitePreferenceStore::new(path)?),
        #[cfg(not(feature = "sqlite"))]
        Some(path) => Arc::new(bunk_planner::JsonFilePreferenceStore::new(path)?),
        None => Arc::new(MemoryPreferenceStore::new()),
    };

    let state = AppState::new(
        ReferenceData {
            timetable,
            official_holidays,
        },
        store,
    )
    .with_absence_policy(config.absence_policy);

    println!("bunk-planner HTTP API listening on http://{addr}");
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
