use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use profile_cutter::input::JsonRows;
use profile_cutter::plan_sources;
use profile_cutter::types::{DEFAULT_BLADE_WIDTH, OptimizationResult, PlannerConfig, StockUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    /// Rows with length and quantity keys; malformed rows are skipped
    #[serde(default)]
    pieces: Option<Vec<Value>>,
    #[serde(default)]
    stock: Option<Vec<Value>>,
    #[serde(default = "default_kerf")]
    kerf: u32,
    #[serde(default)]
    max_iterations: Option<usize>,
}

fn default_kerf() -> u32 {
    DEFAULT_BLADE_WIDTH
}

#[derive(Serialize)]
struct OptimizeResponse {
    #[serde(flatten)]
    result: OptimizationResult,
    plan_count: usize,
    complete: bool,
    waste_percent: f64,
    stock_usage: Vec<StockUsage>,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let config = PlannerConfig {
        blade_width: req.kerf,
        max_iterations: req.max_iterations,
    };
    let result = plan_sources(
        req.pieces.as_deref().map(JsonRows),
        req.stock.as_deref().map(JsonRows),
        config,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "rejected optimize request");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let response = OptimizeResponse {
        plan_count: result.plan_count(),
        complete: result.is_complete(),
        waste_percent: result.waste_percent(),
        stock_usage: result.stock_usage(),
        result,
    };

    Ok(Json(response))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn serve() -> std::io::Result<()> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Listening on {addr}");
    axum::serve(listener, app()).await
}

fn main() -> std::io::Result<()> {
    // Disabled unless SENTRY_DSN is set
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> OptimizeRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_optimize_returns_plans() {
        let req = request(json!({
            "pieces": [{"Length": 1000, "Quantity": 3}, {"Length": 2000, "Quantity": 1}],
            "stock": [{"Length": 5000, "Quantity": 1}],
        }));
        let Json(resp) = optimize(Json(req)).await.unwrap();
        assert_eq!(resp.plan_count, 1);
        assert!(!resp.complete);
        assert_eq!(resp.result.total_waste, 1000);
        assert_eq!(resp.result.unassigned_pieces[0].remaining, 1);
        assert_eq!(resp.stock_usage[0].used, 1);
    }

    #[tokio::test]
    async fn test_optimize_skips_bad_rows() {
        let req = request(json!({
            "pieces": [{"length": "500", "quantity": 2}, {"length": "n/a", "quantity": 1}],
            "stock": [{"length": 1004, "quantity": 1}],
            "kerf": 4,
        }));
        let Json(resp) = optimize(Json(req)).await.unwrap();
        assert!(resp.complete);
        assert_eq!(resp.result.total_waste, 4);
        assert_eq!(resp.result.skipped.len(), 1);

        let body = serde_json::to_value(&resp).unwrap();
        assert_eq!(body["plans"][0]["residual_waste"], 0);
        assert_eq!(body["skipped"][0]["reason"]["type"], "unparsable");
    }

    #[tokio::test]
    async fn test_optimize_missing_stock_is_bad_request() {
        let req = request(json!({
            "pieces": [{"length": 500, "quantity": 2}],
        }));
        let (status, message) = optimize(Json(req)).await.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("stock"));
    }
}
