use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::{
    AbsencePolicy, AbsenceSet, AttendanceInput, DateRange, Holiday, HolidaySet,
    PersistenceError, PreferenceError, PreferenceStore, ProjectionError, ProjectionRecord,
    ProjectionRequest, ProjectionSummary, Projector, SectionSummary, StudentPreferences,
    Timetable,
};

/// Reference data loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub timetable: Timetable,
    pub official_holidays: Vec<Holiday>,
}

#[derive(Clone)]
pub struct AppState {
    reference: Arc<ReferenceData>,
    store: Arc<dyn PreferenceStore + Send + Sync>,
    default_policy: AbsencePolicy,
    // Serializes read-modify-write cycles on stored preferences.
    update_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(reference: ReferenceData, store: Arc<dyn PreferenceStore + Send + Sync>) -> Self {
        Self {
            reference: Arc::new(reference),
            store,
            default_policy: AbsencePolicy::default(),
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_absence_policy(mut self, policy: AbsencePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    fn update_preferences<F>(&self, user_id: &str, mutator: F) -> Result<StudentPreferences, ApiError>
    where
        F: FnOnce(&mut StudentPreferences) -> Result<(), ApiError>,
    {
        let _guard = self.update_lock.lock();
        let mut preferences = self.store.load_preferences(user_id)?.unwrap_or_default();
        mutator(&mut preferences)?;
        self.store.save_preferences(user_id, &preferences)?;
        Ok(preferences)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ProjectionError> for ApiError {
    fn from(value: ProjectionError) -> Self {
        match value {
            ProjectionError::UnknownSection(_) => ApiError::NotFound(value.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<PreferenceError> for ApiError {
    fn from(value: PreferenceError) -> Self {
        match value {
            PreferenceError::HolidayIndexOutOfRange { .. } => ApiError::NotFound(value.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::InvalidData(message) => ApiError::Invalid(message),
            other => {
                error!(error = %other, "preference store failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AbsencePayload {
    date: NaiveDate,
}

/// Projection for a stored user; anything omitted falls back to the saved
/// preferences (section, target) or to today's date.
#[derive(Debug, Deserialize)]
struct UserProjectionPayload {
    semester: DateRange,
    #[serde(default)]
    today: Option<NaiveDate>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    desired_percent: Option<f64>,
    #[serde(default)]
    attendance: BTreeMap<String, AttendanceInput>,
    #[serde(default)]
    absence_policy: Option<AbsencePolicy>,
}

/// Stateless projection: the caller supplies its own calendar entries.
#[derive(Debug, Deserialize)]
struct AdHocProjectionPayload {
    #[serde(flatten)]
    request: ProjectionRequest,
    #[serde(default)]
    student_holidays: Vec<Holiday>,
    #[serde(default)]
    absent_dates: AbsenceSet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectionResponse {
    pub desired_percent: f64,
    pub records: Vec<ProjectionRecord>,
    pub summary: ProjectionSummary,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sections", get(list_sections))
        .route("/sections/:section", get(get_section))
        .route("/holidays", get(list_official_holidays))
        .route("/projection", post(project_ad_hoc))
        .route(
            "/users/:user_id/preferences",
            get(get_preferences)
                .put(put_preferences)
                .delete(delete_preferences),
        )
        .route("/users/:user_id/holidays", post(add_holiday))
        .route("/users/:user_id/holidays/:index", delete(remove_holiday))
        .route("/users/:user_id/absences", post(add_absence))
        .route("/users/:user_id/absences/:date", delete(remove_absence))
        .route("/users/:user_id/projection", post(project_for_user))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_sections(State(state): State<AppState>) -> Json<Vec<String>> {
    let names = state
        .reference
        .timetable
        .section_names()
        .map(str::to_string)
        .collect();
    Json(names)
}

async fn get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<Vec<SectionSummary>>, ApiError> {
    state
        .reference
        .timetable
        .summary(&section)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no timetable data for section {section}")))
}

async fn list_official_holidays(State(state): State<AppState>) -> Json<Vec<Holiday>> {
    Json(state.reference.official_holidays.clone())
}

async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StudentPreferences>, ApiError> {
    match state.store.load_preferences(&user_id)? {
        Some(preferences) => Ok(Json(preferences)),
        None => Err(ApiError::not_found(format!(
            "no preferences stored for {user_id}"
        ))),
    }
}

async fn put_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(incoming): Json<StudentPreferences>,
) -> Result<Json<StudentPreferences>, ApiError> {
    let updated = state.update_preferences(&user_id, |preferences| {
        let mut next = StudentPreferences {
            section: incoming.section.clone(),
            absent_dates: incoming.absent_dates.clone(),
            ..StudentPreferences::default()
        };
        next.set_desired_attendance(incoming.desired_attendance)?;
        for holiday in &incoming.student_holidays {
            next.add_holiday(holiday.clone())?;
        }
        *preferences = next;
        Ok(())
    })?;
    Ok(Json(updated))
}

async fn delete_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = {
        let _guard = state.update_lock.lock();
        state.store.delete_preferences(&user_id)?
    };
    if !removed {
        return Err(ApiError::not_found(format!(
            "no preferences stored for {user_id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn add_holiday(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(holiday): Json<Holiday>,
) -> Result<(StatusCode, Json<StudentPreferences>), ApiError> {
    let updated = state.update_preferences(&user_id, |preferences| {
        preferences.add_holiday(holiday)?;
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(updated)))
}

async fn remove_holiday(
    State(state): State<AppState>,
    Path((user_id, index)): Path<(String, usize)>,
) -> Result<Json<StudentPreferences>, ApiError> {
    let updated = state.update_preferences(&user_id, |preferences| {
        preferences.remove_holiday(index)?;
        Ok(())
    })?;
    Ok(Json(updated))
}

async fn add_absence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<AbsencePayload>,
) -> Result<(StatusCode, Json<StudentPreferences>), ApiError> {
    let mut added = false;
    let updated = state.update_preferences(&user_id, |preferences| {
        added = preferences.add_absence(payload.date);
        Ok(())
    })?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(updated)))
}

async fn remove_absence(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(String, NaiveDate)>,
) -> Result<Json<StudentPreferences>, ApiError> {
    let updated = state.update_preferences(&user_id, |preferences| {
        if preferences.remove_absence(date) {
            Ok(())
        } else {
            Err(ApiError::not_found(format!("{date} is not a declared absence")))
        }
    })?;
    Ok(Json(updated))
}

async fn project_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UserProjectionPayload>,
) -> Result<Json<ProjectionResponse>, ApiError> {
    let preferences = state
        .store
        .load_preferences(&user_id)?
        .unwrap_or_default();

    let section = payload
        .section
        .or_else(|| preferences.section.clone())
        .ok_or_else(|| ApiError::invalid("no section selected"))?;
    let desired_percent = payload
        .desired_percent
        .unwrap_or(preferences.desired_attendance);

    let request = ProjectionRequest {
        section,
        semester: payload.semester,
        today: payload.today.unwrap_or_else(|| Local::now().date_naive()),
        desired_percent,
        attendance: payload.attendance,
        absence_policy: payload.absence_policy.unwrap_or(state.default_policy),
    };

    let reference = &state.reference;
    let projector = Projector::new(
        &reference.timetable,
        preferences.holiday_set(&reference.official_holidays),
        &preferences.absent_dates,
    );
    let records = projector.project(&request)?;
    Ok(Json(respond(desired_percent, records)))
}

async fn project_ad_hoc(
    State(state): State<AppState>,
    Json(payload): Json<AdHocProjectionPayload>,
) -> Result<Json<ProjectionResponse>, ApiError> {
    let reference = &state.reference;
    let projector = Projector::new(
        &reference.timetable,
        HolidaySet::new(&reference.official_holidays, &payload.student_holidays),
        &payload.absent_dates,
    );
    let records = projector.project(&payload.request)?;
    Ok(Json(respond(payload.request.desired_percent, records)))
}

fn respond(desired_percent: f64, records: Vec<ProjectionRecord>) -> ProjectionResponse {
    let summary = ProjectionSummary::from_records(&records, desired_percent);
    ProjectionResponse {
        desired_percent,
        records,
        summary,
    }
}
