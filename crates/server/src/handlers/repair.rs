//! Visibility repair endpoints.

use crate::auth::require_auth;
use crate::error::ApiResult;
use crate::handlers::common::{format_opt_time, format_time};
use crate::repair::{DEFAULT_REPORT_LIMIT, DriftReport, RepairTrigger, drift_report, run_repair};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, Request, State};
use bazaar_core::token::TokenScope;
use bazaar_metadata::models::RepairRunRow;
use serde::{Deserialize, Serialize};

/// Maximum rows returned by report and history endpoints.
const MAX_LIMIT: u32 = 1000;

/// Limit query for report and history endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    fn resolve(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_REPORT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Repair run response.
#[derive(Debug, Serialize)]
pub struct RepairRunResponse {
    pub run_id: String,
    pub trigger: String,
    pub activated: i64,
    pub deactivated: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub triggered_by: Option<String>,
    pub error: Option<String>,
}

impl RepairRunResponse {
    fn from_row(row: RepairRunRow) -> ApiResult<Self> {
        Ok(Self {
            run_id: row.run_id.to_string(),
            started_at: format_time(row.started_at, "started_at")?,
            finished_at: format_opt_time(row.finished_at, "finished_at")?,
            triggered_by: row.triggered_by.map(|id| id.to_string()),
            trigger: row.trigger_kind,
            activated: row.activated,
            deactivated: row.deactivated,
            error: row.error,
        })
    }
}

/// Manual repair response.
#[derive(Debug, Serialize)]
pub struct RunRepairResponse {
    pub success: bool,
    pub message: String,
    pub run: RepairRunResponse,
}

/// POST /v1/admin/repair - Run both sweeps now.
pub async fn trigger_repair(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<RunRepairResponse>> {
    let auth = require_auth(&req)?;
    auth.require_scope(TokenScope::PlatformAdmin)?;

    let run = run_repair(&state, RepairTrigger::Manual, Some(auth.reviewer_id())).await?;
    let message = format!(
        "Activated {} and deactivated {} products",
        run.activated, run.deactivated
    );

    Ok(Json(RunRepairResponse {
        success: true,
        message,
        run: RepairRunResponse::from_row(run)?,
    }))
}

/// GET /v1/admin/repair/report - Dry-run drift report.
pub async fn get_drift_report(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
    req: Request,
) -> ApiResult<Json<DriftReport>> {
    require_auth(&req)?.require_scope(TokenScope::ApprovalAdmin)?;
    Ok(Json(drift_report(&state, query.resolve()).await?))
}

/// GET /v1/admin/repair/runs - Most recent runs first.
pub async fn list_repair_runs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
    req: Request,
) -> ApiResult<Json<Vec<RepairRunResponse>>> {
    require_auth(&req)?.require_scope(TokenScope::PlatformAdmin)?;

    let runs = state.metadata.list_repair_runs(query.resolve()).await?;
    let response = runs
        .into_iter()
        .map(RepairRunResponse::from_row)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(response))
}
