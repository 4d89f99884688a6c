use axum::{
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use serde_json::json;

pub mod v1;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest_service("/v1", v1::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn ping() -> impl IntoResponse {
    Json(json!({
        "message": "pong!"
    }))
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::{testing::*, *};

    #[tokio::test]
    async fn ping_pong() {
        let (status, body) = get_json(routes(demo_state().await), "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "pong!"}));
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404s() {
        let (status, body) = get_json(routes(demo_state().await), "/v2/sites").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["httpMethod"], "GET");
        assert_eq!(body["message"], "Not Found");

        let (status, body) = get_json(routes(demo_state().await), "/v1/nothing-here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["requestedUri"], "/v1/nothing-here");
    }
}
