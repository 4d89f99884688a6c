use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Json, Router,
};
use model::{status::SiteStatus, view::SiteView};
use serde::Deserialize;
use utility::id::Id;
use water_supply::joins::{Index, SiteFilter};

use super::query_params;
use crate::{
    common::{
        route_not_found, schema_no_example, JsonResult, RouteErrorResponse, VecResponse,
        METHOD_FILTER_ALL,
    },
    OperationsStore, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema_no_example::<SiteView>))
        .route("/:id", get(get_site))
        .route("/", get(get_sites))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Deserialize)]
struct SitesQuery {
    status: Option<String>,
    /// Postcode area prefix, e.g. `SW1`.
    area: Option<String>,
}

async fn get_sites(
    original_uri: OriginalUri,
    State(operations): State<Arc<OperationsStore>>,
    params: Result<Query<SitesQuery>, QueryRejection>,
) -> JsonResult<VecResponse<SiteView>> {
    let params = query_params(params, &original_uri)?;
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|status| !status.is_empty())
        .map(str::parse::<SiteStatus>)
        .transpose()
        .map_err(|why| {
            RouteErrorResponse::bad_request(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })?;
    let filter = SiteFilter {
        status,
        area: params.area.filter(|area| !area.trim().is_empty()),
    };

    let collections = operations.snapshot().await;
    let sites = Index::new(&collections).filter_sites(&filter);
    Ok(VecResponse::non_paginated(sites).json())
}

async fn get_site(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(operations): State<Arc<OperationsStore>>,
) -> JsonResult<SiteView> {
    let collections = operations.snapshot().await;
    Index::new(&collections)
        .site(&Id::from(id))
        .map(Json)
        .ok_or_else(|| {
            RouteErrorResponse::not_found(&Method::GET, original_uri.path())
                .with_message("There is no location with this id.")
        })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use super::*;
    use crate::api::testing::*;

    fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|site| site["id"].as_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn every_site_with_derived_status() {
        let (status, body) = get_json(routes(demo_state().await), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], 5);
        let statuses: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|site| site["status"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(
            statuses,
            ["available", "scheduled", "refilling", "inactive", "inactive"]
        );
    }

    #[tokio::test]
    async fn filters_by_status_and_area() {
        let state = demo_state().await;
        let (_, body) = get_json(routes(state.clone()), "/?status=refilling").await;
        assert_eq!(ids(&body), ["LOC003"]);

        let (_, body) = get_json(routes(state.clone()), "/?area=sw1a").await;
        assert_eq!(ids(&body), ["LOC001"]);

        let (_, body) = get_json(routes(state.clone()), "/?status=inactive&area=SE1").await;
        assert_eq!(ids(&body), ["LOC004", "LOC005"]);

        let (status, body) = get_json(routes(state), "/?status=flooded").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("flooded"));
    }

    #[tokio::test]
    async fn single_site() {
        let state = demo_state().await;
        let (status, body) = get_json(routes(state.clone()), "/LOC001").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Riverside Community Center");
        assert_eq!(body["postcode"], "SW1A 1AA");
        assert_eq!(body["status"], "available");
        assert_eq!(body["supplyPercent"], 93);
        assert_eq!(body["bowserNumber"], "B-002");
        assert_eq!(body["coordinates"]["lat"], 51.5014);

        let (status, body) = get_json(routes(state), "/LOC404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUri"], "/LOC404");
    }

    #[tokio::test]
    async fn schema() {
        let (status, body) = get_json(routes(demo_state().await), "/schema").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "SiteView");
    }
}
