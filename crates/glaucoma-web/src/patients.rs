//! 患者管理路由

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use glaucoma_core::utils::require_non_blank;
use glaucoma_core::{GlaucomaError, Patient, Result};
use glaucoma_database::NewPatient;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::extract::{ApiJson, ApiPath};
use crate::report::render_patient_report;
use crate::state::AppState;

const MAX_AGE: i32 = 150;

/// 创建/更新患者请求体，请求中的 id 会被忽略
#[derive(Debug, Deserialize)]
pub struct PatientRequest {
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub medical_history: Option<String>,
    pub risk_factors: Option<String>,
    pub mrn: Option<String>,
}

impl PatientRequest {
    fn validate(&self) -> Result<()> {
        require_non_blank("full_name", &self.full_name)?;
        require_non_blank("gender", &self.gender)?;
        if !(0..=MAX_AGE).contains(&self.age) {
            return Err(GlaucomaError::Validation(format!(
                "age must be between 0 and {}",
                MAX_AGE
            )));
        }
        Ok(())
    }
}

impl From<PatientRequest> for NewPatient {
    fn from(request: PatientRequest) -> Self {
        Self {
            full_name: request.full_name,
            age: request.age,
            gender: request.gender,
            medical_history: request.medical_history,
            risk_factors: request.risk_factors,
            mrn: request.mrn,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/patients", get(list_patients).post(create_patient))
        .route("/api/patients/ping", get(ping))
        .route("/api/patients/:id", get(get_patient).put(update_patient))
        .route("/api/patients/:id/report", get(patient_report))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "msg": "patients router ok" }))
}

pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PatientRequest>,
) -> Result<(StatusCode, Json<Patient>)> {
    request.validate()?;
    let patient = state.queries().create_patient(&request.into()).await?;
    info!("Created patient {}", patient.id);
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list_patients(State(state): State<AppState>) -> Result<Json<Vec<Patient>>> {
    Ok(Json(state.queries().list_patients().await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Patient>> {
    state
        .queries()
        .get_patient_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(patient_not_found)
}

pub async fn update_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<PatientRequest>,
) -> Result<Json<Patient>> {
    request.validate()?;
    let Some(patient) = state.queries().update_patient(id, &request.into()).await? else {
        warn!("Update requested for missing patient {}", id);
        return Err(patient_not_found());
    };
    info!("Updated patient {}", id);
    Ok(Json(patient))
}

/// 下载患者 PDF 报告
pub async fn patient_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response> {
    let patient = state
        .queries()
        .get_patient_by_id(id)
        .await?
        .ok_or_else(patient_not_found)?;

    let generated_at = chrono::Utc::now();
    let pdf = tokio::task::spawn_blocking(move || render_patient_report(&patient, generated_at))
        .await
        .map_err(|e| GlaucomaError::Report(format!("report task failed: {}", e)))??;

    let disposition = format!("attachment; filename=\"patient_{}_report.pdf\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

fn patient_not_found() -> GlaucomaError {
    GlaucomaError::NotFound("Patient not found".to_string())
}
