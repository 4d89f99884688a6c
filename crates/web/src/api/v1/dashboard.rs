use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Local, NaiveDate};
use model::{
    bowser::Bowser,
    view::{AlertView, DashboardStats, MaintenanceView},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use water_supply::joins::Index;

use super::query_params;
use crate::{
    common::{schema_no_example, JsonResult, VecResponse},
    OperationsStore, WebState,
};

const DEFAULT_SERVICE_HORIZON_DAYS: i64 = 14;

/// Merged into the v1 router, which supplies the state.
pub(crate) fn routes() -> Router<WebState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/stats/schema", get(schema_no_example::<StatsDto>))
        .route("/maintenance", get(get_maintenance))
        .route("/maintenance/due", get(get_due_for_service))
        .route("/alerts", get(get_alerts))
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct StatsDto {
    #[serde(flatten)]
    stats: DashboardStats,
    /// When the collections were last replaced, if ever.
    loaded_at: Option<DateTime<Local>>,
}

async fn get_stats(State(operations): State<Arc<OperationsStore>>) -> Json<StatsDto> {
    let collections = operations.snapshot().await;
    Json(StatsDto {
        stats: Index::new(&collections).stats(),
        loaded_at: operations.loaded_at().await,
    })
}

#[derive(Deserialize)]
struct ScheduleQuery {
    /// Reference day for overdue jobs, today unless given.
    today: Option<NaiveDate>,
    days: Option<i64>,
}

fn today(params: &ScheduleQuery) -> NaiveDate {
    params
        .today
        .unwrap_or_else(|| Local::now().date_naive())
}

async fn get_maintenance(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ScheduleQuery>, QueryRejection>,
) -> JsonResult<VecResponse<MaintenanceView>> {
    let params = query_params(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let schedule = Index::new(&collections).maintenance_schedule(today(&params));
    Ok(VecResponse::non_paginated(schedule).json())
}

async fn get_due_for_service(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ScheduleQuery>, QueryRejection>,
) -> JsonResult<VecResponse<Bowser>> {
    let params = query_params(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let due = Index::new(&collections)
        .bowsers_due_for_service(
            today(&params),
            params.days.unwrap_or(DEFAULT_SERVICE_HORIZON_DAYS),
        )
        .into_iter()
        .cloned()
        .collect();
    Ok(VecResponse::non_paginated(due).json())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertsQuery {
    #[serde(default)]
    high_priority: bool,
}

async fn get_alerts(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<AlertsQuery>, QueryRejection>,
) -> JsonResult<VecResponse<AlertView>> {
    let params = query_params(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let index = Index::new(&collections);
    let alerts = if params.high_priority {
        index.high_priority_alerts()
    } else {
        index.alerts()
    };
    Ok(VecResponse::non_paginated(alerts).json())
}
