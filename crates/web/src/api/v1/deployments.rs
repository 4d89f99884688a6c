use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use model::view::DeploymentView;
use utility::id::Id;
use water_supply::{export, joins::Index};

use super::csv_response;
use crate::{
    common::{
        route_not_found, schema_no_example, JsonResult, RouteErrorResponse, RouteResult,
        VecResponse, METHOD_FILTER_ALL,
    },
    OperationsStore, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema_no_example::<DeploymentView>))
        .route("/export.csv", get(export_deployments))
        .route("/:id", get(get_deployment))
        .route("/", get(get_deployments))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_deployments(
    State(operations): State<Arc<OperationsStore>>,
) -> Json<VecResponse<DeploymentView>> {
    let collections = operations.snapshot().await;
    VecResponse::non_paginated(Index::new(&collections).deployment_views()).json()
}

async fn get_deployment(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(operations): State<Arc<OperationsStore>>,
) -> JsonResult<DeploymentView> {
    let collections = operations.snapshot().await;
    Index::new(&collections)
        .deployment_view_of(&Id::from(id))
        .map(Json)
        .ok_or_else(|| {
            RouteErrorResponse::not_found(&Method::GET, original_uri.path())
                .with_message("There is no deployment with this id, or its bowser or location is missing.")
        })
}

async fn export_deployments(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
) -> RouteResult<impl IntoResponse> {
    let collections = operations.snapshot().await;
    let views = Index::new(&collections).deployment_views();
    csv_response("deployments.csv", export::deployments_csv(&views), &original_uri)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::api::testing::*;

    #[tokio::test]
    async fn deployment_table() {
        let (status, body) = get_json(routes(demo_state().await), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], 4);

        let low = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|view| view["id"] == "D3")
            .unwrap();
        assert_eq!(low["siteStatus"], "refilling");
        assert_eq!(low["supplyPercent"], 15);
        assert_eq!(low["locationName"], "Westminster City Hall");
    }

    #[tokio::test]
    async fn single_deployment() {
        let state = demo_state().await;
        let (status, body) = get_json(routes(state.clone()), "/D1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bowserNumber"], "B-002");
        assert_eq!(body["siteStatus"], "available");

        let (status, _) = get_json(routes(state), "/D404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn csv_export() {
        let (status, body) = send(routes(demo_state().await), "GET", "/export.csv").await;
        assert_eq!(status, StatusCode::OK);
        let mut lines = body.lines();
        assert_eq!(
            lines.next(),
            Some("id,status,site_status,location,address,postcode,bowser,supply_percent,start_date,end_date")
        );
        assert_eq!(lines.count(), 4);
    }
}
