//! 支持工单路由

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use glaucoma_core::utils::require_non_blank;
use glaucoma_core::{GlaucomaError, Result, SupportTicket, TicketStatus};
use glaucoma_database::NewSupportTicket;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

const DEFAULT_PRIORITY: &str = "MEDIUM";

/// 工单提交请求
#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub name: String,
    pub email: String,
    #[serde(rename = "issueType", alias = "issue_type")]
    pub issue_type: String,
    pub message: String,
}

impl TicketRequest {
    fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)?;
        require_non_blank("email", &self.email)?;
        require_non_blank("issueType", &self.issue_type)?;
        require_non_blank("message", &self.message)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketCreated {
    pub msg: String,
    pub ticket_id: i64,
}

/// 前端看板使用的工单视图
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketView {
    pub id: i64,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub patient_name: String,
    pub doctor_name: Option<String>,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupportTicket> for TicketView {
    fn from(ticket: SupportTicket) -> Self {
        Self {
            id: ticket.id,
            subject: format!("[{}] {}", ticket.issue_type, ticket.name),
            description: ticket.message,
            status: ticket.status,
            patient_name: ticket.name,
            doctor_name: None,
            priority: DEFAULT_PRIORITY.to_string(),
            created_at: ticket.created_at,
            updated_at: ticket.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/support-tickets", get(list_tickets).post(create_ticket))
        .route("/api/support-tickets/ping", get(ping))
        .route("/api/support-tickets/:id", patch(update_status))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "msg": "support tickets router ok" }))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TicketRequest>,
) -> Result<Json<TicketCreated>> {
    request.validate()?;
    let ticket_id = state
        .queries()
        .create_ticket(&NewSupportTicket {
            name: request.name,
            email: request.email,
            issue_type: request.issue_type,
            message: request.message,
        })
        .await?;

    info!("Support ticket {} submitted", ticket_id);
    Ok(Json(TicketCreated {
        msg: "Ticket submitted successfully".to_string(),
        ticket_id,
    }))
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<TicketView>>> {
    let tickets = state.queries().list_tickets().await?;
    Ok(Json(tickets.into_iter().map(TicketView::from).collect()))
}

/// 更新工单状态
///
/// 状态不落库，只校验取值和工单是否存在。
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<serde_json::Value>> {
    let status: TicketStatus = update.status.parse()?;

    if state.queries().get_ticket_by_id(id).await?.is_none() {
        return Err(GlaucomaError::NotFound("Ticket not found".to_string()));
    }

    info!("Ticket {} status set to {} (not persisted)", id, status);
    Ok(Json(json!({
        "id": id,
        "status": status,
        "detail": "Status updated (demo only, not stored in DB)."
    })))
}
