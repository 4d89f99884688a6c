use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::Method,
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use chrono::Local;
use model::{
    finance::{Invoice, InvoiceStatus, Month},
    view::FinanceOverview,
};
use serde::Deserialize;
use water_supply::{
    export,
    finance::{self, InvoiceFilter},
};

use super::{csv_response, query_params};
use crate::{
    common::{
        route_not_found, schema_no_example, JsonResult, RouteErrorResponse, RouteResult,
        VecResponse, METHOD_FILTER_ALL,
    },
    FinanceStore, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(get_overview))
        .route("/schema", get(schema_no_example::<FinanceOverview>))
        .route("/invoices", get(get_invoices))
        .route("/invoices/export.csv", get(export_invoices))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Deserialize)]
struct OverviewQuery {
    /// `YYYY-MM`, the current month unless given.
    month: Option<String>,
}

async fn get_overview(
    original_uri: OriginalUri,
    State(store): State<Arc<FinanceStore>>,
    params: Result<Query<OverviewQuery>, QueryRejection>,
) -> JsonResult<FinanceOverview> {
    let params = query_params(params, &original_uri)?;
    let month = match params.month.as_deref().map(str::trim) {
        None | Some("") => Month::of(Local::now().date_naive()),
        Some(month) => month.parse::<Month>().map_err(|why| {
            RouteErrorResponse::bad_request(why.to_string())
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })?,
    };
    let collections = store.snapshot().await;
    Ok(Json(finance::overview(&collections, month)))
}

#[derive(Deserialize)]
struct InvoicesQuery {
    status: Option<String>,
    search: Option<String>,
}

impl From<InvoicesQuery> for InvoiceFilter {
    fn from(params: InvoicesQuery) -> Self {
        Self {
            status: params
                .status
                .filter(|status| !status.trim().is_empty())
                .map(|status| InvoiceStatus::from(status.trim().to_lowercase())),
            search: params.search.filter(|search| !search.trim().is_empty()),
        }
    }
}

async fn filtered_invoices(store: &FinanceStore, params: InvoicesQuery) -> Vec<Invoice> {
    let collections = store.snapshot().await;
    InvoiceFilter::from(params)
        .apply(&collections.invoices)
        .into_iter()
        .cloned()
        .collect()
}

async fn get_invoices(
    original_uri: OriginalUri,
    State(store): State<Arc<FinanceStore>>,
    params: Result<Query<InvoicesQuery>, QueryRejection>,
) -> JsonResult<VecResponse<Invoice>> {
    let params = query_params(params, &original_uri)?;
    let invoices = filtered_invoices(&store, params).await;
    Ok(VecResponse::non_paginated(invoices).json())
}

async fn export_invoices(
    original_uri: OriginalUri,
    State(store): State<Arc<FinanceStore>>,
    params: Result<Query<InvoicesQuery>, QueryRejection>,
) -> RouteResult<impl IntoResponse> {
    let params = query_params(params, &original_uri)?;
    let invoices = filtered_invoices(&store, params).await;
    csv_response("invoices.csv", export::invoices_csv(&invoices), &original_uri)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::testing::*;

    fn ids(body: &Value) -> Vec<Value> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|invoice| invoice["id"].clone())
            .collect()
    }

    #[tokio::test]
    async fn monthly_overview() {
        let state = demo_state().await;
        let (status, body) = get_json(routes(state.clone()), "/?month=2025-04").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], "2025-04");
        assert_eq!(body["revenue"], 4200.0);
        assert_eq!(body["outstanding"], 2750.0);
        assert_eq!(body["partnerBalance"], -450.0);
        assert_eq!(
            body["invoiceCounts"],
            json!({"overdue": 1, "paid": 1, "pending": 1})
        );
        assert_eq!(body["transactionCount"], 1);

        let (status, body) = get_json(routes(state), "/?month=2025-13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("2025-13"));
    }

    #[tokio::test]
    async fn invoice_list() {
        let state = demo_state().await;
        let (_, body) = get_json(routes(state.clone()), "/invoices").await;
        assert_eq!(body["totalItems"], 3);

        let (_, body) = get_json(routes(state.clone()), "/invoices?search=council").await;
        assert_eq!(ids(&body), [json!("I1"), json!("I3")]);

        let (_, body) = get_json(routes(state), "/invoices?status=Overdue&search=").await;
        assert_eq!(ids(&body), [json!("I3")]);
    }

    #[tokio::test]
    async fn invoice_export() {
        let (status, body) =
            send(routes(demo_state().await), "GET", "/invoices/export.csv?status=paid").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.lines().collect::<Vec<_>>(),
            [
                "invoice_number,client,amount,status,issue_date,due_date",
                "INV-2025-001,Westminster Council,2400.0,paid,2025-04-02,2025-05-02",
            ]
        );
    }
}
