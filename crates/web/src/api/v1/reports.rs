use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use model::{location::ServiceTier, view::ReportSummary};
use serde::Deserialize;
use water_supply::{joins::Index, reports::DEFAULT_REPORT_DAYS};

use super::query_params;
use crate::{
    common::{route_not_found, schema_no_example, JsonResult, RouteErrorResponse, METHOD_FILTER_ALL},
    OperationsStore, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(get_report))
        .route("/schema", get(schema_no_example::<ReportSummary>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Deserialize)]
struct ReportQuery {
    today: Option<NaiveDate>,
    days: Option<i64>,
    /// Only list locations of this tier.
    tier: Option<String>,
}

async fn get_report(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ReportQuery>, QueryRejection>,
) -> JsonResult<ReportSummary> {
    let params = query_params(params, &original_uri)?;
    let tier = match params.tier.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(tier) => Some(tier.parse::<ServiceTier>().map_err(|why| {
            RouteErrorResponse::bad_request(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })?),
    };
    let today = params.today.unwrap_or_else(|| Local::now().date_naive());
    let days = params.days.unwrap_or(DEFAULT_REPORT_DAYS);

    let collections = operations.snapshot().await;
    Ok(Json(Index::new(&collections).report(today, days, tier)))
}
