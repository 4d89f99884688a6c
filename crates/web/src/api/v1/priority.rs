use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Router,
};
use chrono::{Local, Timelike};
use model::view::{AllocationView, PriorityView, SupplyWarning};
use serde::Deserialize;
use water_supply::{joins::Index, priority::Conditions};

use super::query_params;
use crate::{
    common::{
        route_not_found, schema_no_example, JsonResult, RouteErrorResponse, RouteResult,
        VecResponse, METHOD_FILTER_ALL,
    },
    OperationsStore, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(get_priorities))
        .route("/schema", get(schema_no_example::<PriorityView>))
        .route("/allocation", get(get_allocation))
        .route("/supply", get(get_supply_warnings))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionsQuery {
    /// Local hour `0..24`, the current hour unless given.
    hour: Option<u32>,
    #[serde(default)]
    extreme_weather: bool,
}

fn conditions(
    params: Result<Query<ConditionsQuery>, QueryRejection>,
    original_uri: &OriginalUri,
) -> RouteResult<Conditions> {
    let params = query_params(params, original_uri)?;
    let hour = params.hour.unwrap_or_else(|| Local::now().hour());
    if hour > 23 {
        return Err(RouteErrorResponse::bad_request("hour must be between 0 and 23.")
            .with_method(&Method::GET)
            .with_uri(original_uri.path()));
    }
    Ok(Conditions {
        hour,
        extreme_weather: params.extreme_weather,
    })
}

async fn get_priorities(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ConditionsQuery>, QueryRejection>,
) -> JsonResult<VecResponse<PriorityView>> {
    let conditions = conditions(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let ranked = Index::new(&collections).priorities(&conditions);
    Ok(VecResponse::non_paginated(ranked).json())
}

async fn get_allocation(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ConditionsQuery>, QueryRejection>,
) -> JsonResult<VecResponse<AllocationView>> {
    let conditions = conditions(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let allocation = Index::new(&collections).allocation(&conditions);
    Ok(VecResponse::non_paginated(allocation).json())
}

async fn get_supply_warnings(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<ConditionsQuery>, QueryRejection>,
) -> JsonResult<VecResponse<SupplyWarning>> {
    let conditions = conditions(params, &original_uri)?;
    let collections = operations.snapshot().await;
    let warnings = Index::new(&collections).supply_warnings(&conditions);
    Ok(VecResponse::non_paginated(warnings).json())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::testing::*;

    fn field(body: &Value, name: &str) -> Vec<Value> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item[name].clone())
            .collect()
    }

    #[tokio::test]
    async fn ranked_by_urgency() {
        let (status, body) = get_json(routes(demo_state().await), "/?hour=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            field(&body, "locationId"),
            [json!("LOC002"), json!("LOC003"), json!("LOC004"), json!("LOC001")]
        );
        assert_eq!(body["data"][0]["tier"], "healthcare");
        assert_eq!(body["data"][1]["supplyPercent"], 15);
    }

    #[tokio::test]
    async fn free_bowsers_are_allocated() {
        let (_, body) = get_json(routes(demo_state().await), "/allocation?hour=12").await;
        assert_eq!(body["totalItems"], 1);
        assert_eq!(body["data"][0]["locationId"], "LOC004");
        assert_eq!(body["data"][0]["bowserIds"], json!(["BWR004"]));
        assert_eq!(body["data"][0]["requiredCapacity"], 4500.0);
    }

    #[tokio::test]
    async fn low_supply_is_reported() {
        let state = demo_state().await;
        let (_, body) = get_json(routes(state.clone()), "/supply?hour=12").await;
        assert_eq!(field(&body, "deploymentId"), [json!("D3")]);
        assert_eq!(body["data"][0]["minutesToEmpty"], 225);
        assert_eq!(body["data"][0]["needsRefill"], false);

        let (_, body) =
            get_json(routes(state), "/supply?hour=7&extremeWeather=true").await;
        assert_eq!(body["data"][0]["needsRefill"], true);
    }

    #[tokio::test]
    async fn hour_is_validated() {
        let state = demo_state().await;
        for uri in ["/?hour=24", "/allocation?hour=-1", "/supply?hour=noon"] {
            let (status, body) = get_json(routes(state.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["message"].is_string(), "{uri}");
        }
    }
}
