use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mpk_viewer_core::map::SharedLayerStore;
use mpk_viewer_core::{BaseLayer, LiveMapHandle, ViewerError};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct ViewerState {
    pub layers: SharedLayerStore,
    pub map: LiveMapHandle,
}

pub fn create_router(state: ViewerState) -> Router {
    Router::new()
        .route("/layers", get(layers))
        .route("/panel", get(panel))
        .route("/lines/{line}/select", post(select_line))
        .route("/reset", post(reset))
        .route("/groups/{index}/toggle", post(toggle_group))
        .route("/base/{layer}", post(set_base_layer))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

fn accepted(result: Result<(), ViewerError>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn layers(State(state): State<ViewerState>) -> Response {
    let collection = state.layers.lock().to_geojson();
    Json(collection).into_response()
}

async fn panel(State(state): State<ViewerState>) -> Response {
    Json(state.map.panel()).into_response()
}

async fn select_line(State(state): State<ViewerState>, Path(line): Path<String>) -> Response {
    accepted(state.map.select_line(line).await)
}

async fn reset(State(state): State<ViewerState>) -> Response {
    accepted(state.map.reset().await)
}

async fn toggle_group(State(state): State<ViewerState>, Path(index): Path<usize>) -> Response {
    accepted(state.map.toggle_group(index).await)
}

async fn set_base_layer(State(state): State<ViewerState>, Path(layer): Path<String>) -> Response {
    match layer.parse::<BaseLayer>() {
        Ok(BaseLayer::Satellite) => accepted(state.map.show_satellite().await),
        Ok(BaseLayer::Street) => accepted(state.map.show_street().await),
        Ok(BaseLayer::Dark) | Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("unknown base mode {layer:?}, expected street or satellite") })),
        )
            .into_response(),
    }
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mpk_viewer_core::transit::StaticTransitProvider;
    use mpk_viewer_core::transit::api_types::{
        Direction, LineSummary, RouteDetail, RouteResponse, Stop, VehicleKind, VehicleRecord,
    };
    use mpk_viewer_core::{InitialView, LiveMap, PanelSnapshot, RoutePanel, ViewerConfig};
    use serde_json::Value;

    use super::*;

    fn start() -> ViewerState {
        let provider = StaticTransitProvider::from_data(
            vec![LineSummary { line: "4".into(), kind: VehicleKind::Tram }],
            vec![(
                "4".into(),
                RouteResponse::Detail(RouteDetail {
                    line: "4".into(),
                    directions: vec![Direction {
                        direction_name: "A→B".into(),
                        stops: vec![Stop::at("A", 51.0, 17.0), Stop::at("B", 51.1, 17.1)],
                    }],
                }),
            )],
        );
        provider.set_vehicles(vec![VehicleRecord {
            id: None,
            lat: 51.1,
            lon: 17.03,
            line: "4".into(),
            kind: VehicleKind::Tram,
        }]);

        let layers = SharedLayerStore::new(InitialView::default().layer_store());
        let (live, map) = LiveMap::new(layers.clone(), Arc::new(provider), &ViewerConfig::default()).unwrap();
        tokio::spawn(live.with_clock(|| 12).run());
        ViewerState { layers, map }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for(state: &ViewerState, predicate: impl Fn(&PanelSnapshot) -> bool) {
        let mut panel = state.map.subscribe();
        tokio::time::timeout(Duration::from_secs(3600), async {
            while !predicate(&panel.borrow_and_update()) {
                panel.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_line_draws_route() {
        let state = start();
        wait_for(&state, |p| p.vehicles_drawn == 1).await;

        let response = select_line(State(state.clone()), Path("4".into())).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for(&state, |p| matches!(p.route, RoutePanel::Rendered { .. })).await;

        let layers = body_json(layers(State(state.clone())).await).await;
        let kinds: Vec<_> = layers["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["kind"].as_str().unwrap().to_string())
            .collect();
        assert!(kinds.contains(&"polyline".to_string()));
        assert_eq!(kinds.iter().filter(|k| *k == "tile_layer").count(), 1);
        assert_eq!(layers["viewport"]["kind"], "bounds");

        let panel = body_json(panel(State(state)).await).await;
        assert_eq!(panel["route"]["state"], "rendered");
        assert_eq!(panel["route"]["groups"][0]["label"], "A→B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_base_layer_modes() {
        let state = start();
        wait_for(&state, |p| p.base_layer == Some(BaseLayer::Street)).await;

        let response = set_base_layer(State(state.clone()), Path("satellite".into())).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for(&state, |p| p.base_layer == Some(BaseLayer::Satellite)).await;

        let response = set_base_layer(State(state.clone()), Path("dark".into())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
