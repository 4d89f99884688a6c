use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, on, post},
    Json, Router,
};
use model::{view::SiteView, WithDistance};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo::Coordinates;
use water_supply::{joins::Index, store::Refresh};

use crate::{
    common::{
        route_not_found, schema_no_example, JsonResult, RouteErrorResponse, RouteResult,
        METHOD_FILTER_ALL,
    },
    OperationsStore, WebState,
};

mod dashboard;
mod deployments;
mod finance;
mod priority;
mod reports;
mod sites;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/nearby", get(nearby))
        .route("/nearby/schema", get(schema_no_example::<NearbyDto>))
        .route("/refresh", post(refresh))
        .nest_service("/sites", sites::routes(state.clone()))
        .nest_service("/deployments", deployments::routes(state.clone()))
        .nest_service("/finance", finance::routes(state.clone()))
        .nest_service("/priorities", priority::routes(state.clone()))
        .nest_service("/reports", reports::routes(state.clone()))
        .merge(dashboard::routes())
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Unwraps query parameters, answering malformed ones with a json 400.
pub(crate) fn query_params<T>(
    params: Result<Query<T>, QueryRejection>,
    uri: &OriginalUri,
) -> RouteResult<T> {
    params.map(|Query(params)| params).map_err(|rejection| {
        RouteErrorResponse::bad_request(rejection.body_text())
            .with_method(&Method::GET)
            .with_uri(uri.path())
    })
}

pub(crate) fn csv_response(
    filename: &str,
    csv: Result<String, csv::Error>,
    uri: &OriginalUri,
) -> RouteResult<impl IntoResponse> {
    let csv = csv.map_err(|why| {
        RouteErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_method(&Method::GET)
            .with_uri(uri.path())
            .with_message("Could not write the csv export.")
            .with_detailed_information(why.to_string())
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    ))
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct NearbyDto {
    radius: f64,
    latitude: f64,
    longitude: f64,
    sites: Vec<WithDistance<SiteView>>,
}

#[derive(Deserialize)]
struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
}

async fn nearby(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    State(default_radius): State<f64>,
    params: Result<Query<NearbyQuery>, QueryRejection>,
) -> JsonResult<NearbyDto> {
    let params = query_params(params, &original_uri)?;
    let invalid = |message: &str| {
        RouteErrorResponse::bad_request(message)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let center = Coordinates::checked(params.latitude, params.longitude)
        .ok_or_else(|| invalid("latitude and longitude must be valid wgs84 coordinates."))?;
    let radius = params.radius.unwrap_or(default_radius);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(invalid("radius must be a positive number of kilometres."));
    }

    let collections = operations.snapshot().await;
    let sites = Index::new(&collections).nearby(center, radius);
    Ok(Json(NearbyDto {
        radius,
        latitude: params.latitude,
        longitude: params.longitude,
        sites,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshDto {
    operations: Refresh,
    finance: Refresh,
}

async fn refresh(State(state): State<WebState>) -> Json<RefreshDto> {
    let (operations, finance) =
        futures::join!(state.operations.refresh(), state.finance.refresh());
    Json(RefreshDto {
        operations,
        finance,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use water_supply::{backend::SharedBackend, config::ClientConfig, memory::MemoryBackend};

    use super::*;
    use crate::api::testing::*;

    #[tokio::test]
    async fn nearby_sites_nearest_first() {
        let state = demo_state().await;
        let (status, body) = get_json(
            routes(state),
            "/nearby?latitude=51.5014&longitude=-0.1419&radius=1.5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["radius"], 1.5);
        let ids: Vec<_> = body["sites"]
            .as_array()
            .unwrap()
            .iter()
            .map(|site| site["id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, ["LOC001", "LOC003"]);
        assert_eq!(body["sites"][0]["distanceKm"], 0.0);
        assert_eq!(body["sites"][0]["status"], "available");
    }

    #[tokio::test]
    async fn nearby_uses_the_configured_radius() {
        let state = demo_state().await;
        let (status, body) =
            get_json(routes(state), "/nearby?latitude=51.5014&longitude=-0.1419").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["radius"], 10.0);
        assert_eq!(body["sites"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn nearby_rejects_bad_input() {
        let state = demo_state().await;
        for uri in [
            "/nearby?latitude=91&longitude=0",
            "/nearby?latitude=51.5&longitude=-0.1&radius=-2",
            "/nearby?latitude=north&longitude=-0.1",
            "/nearby?longitude=-0.1",
        ] {
            let (status, body) = get_json(routes(state.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["message"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn refresh_reports_failures() {
        let backend = Arc::new(water_supply::demo::backend());
        backend
            .fail(
                "/alerts",
                water_supply::RequestError::Api {
                    message: "maintenance window".to_owned(),
                },
            )
            .await;
        let shared: SharedBackend = backend;
        let state = WebState::new(shared, &ClientConfig::default());

        let (status, body) = send(routes(state.clone()), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["operations"]["outcome"], "completed");
        assert_eq!(body["operations"]["failures"][0]["collection"], "alerts");
        assert_eq!(body["finance"]["failures"].as_array().unwrap().len(), 0);

        let snapshot = state.operations.snapshot().await;
        assert_eq!(snapshot.locations.len(), 5);
        assert!(snapshot.alerts.is_empty());
    }

    #[tokio::test]
    async fn overlapping_refresh_is_skipped() {
        let backend = Arc::new(MemoryBackend::default());
        backend.delay("/locations", Duration::from_millis(100)).await;
        let shared: SharedBackend = backend;
        let state = WebState::new(shared, &ClientConfig::default());

        let slow = tokio::spawn(send(routes(state.clone()), "POST", "/refresh"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (_, body) = send(routes(state), "POST", "/refresh").await;
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["operations"]["outcome"], "skipped");

        let (_, body) = slow.await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["operations"]["outcome"], "completed");
    }
}
