use std::time::Instant;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use truck_packer::error::PackError;
use truck_packer::score::ScoreStrategy;
use truck_packer::solver::{PackerConfig, Solver, best_run};
use truck_packer::types::{Bin, Placement, Rect, Solution};

#[derive(Deserialize, Serialize)]
struct PackRequest {
    items: Vec<Rect>,
    bins: Vec<Bin>,
    #[serde(flatten)]
    config: PackerConfig,
}

#[derive(Serialize)]
struct PackResponse {
    strategy: ScoreStrategy,
    bins_opened: usize,
    total_cost: u64,
    waste_percent: f64,
    elapsed_ms: f64,
    placements: Vec<Placement>,
    solution: Solution,
}

#[derive(Serialize)]
struct StrategyResponse {
    strategy: ScoreStrategy,
    elapsed_ms: f64,
    total_cost: Option<u64>,
    bins_opened: Option<usize>,
    error: Option<String>,
}

#[derive(Serialize)]
struct CompareResponse {
    runs: Vec<StrategyResponse>,
    failures: usize,
    best: Option<ScoreStrategy>,
}

type ApiError = (StatusCode, String);

fn into_solver(req: PackRequest) -> Result<Solver, ApiError> {
    if req.items.iter().any(|r| r.w == 0 || r.h == 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            "item dimensions must be non-zero".to_string(),
        ));
    }
    if req.bins.iter().any(|b| b.w == 0 || b.h == 0 || b.cost == 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            "bin dimensions and cost must be non-zero".to_string(),
        ));
    }
    Ok(Solver::new(req.items, req.bins, req.config))
}

fn pack_error(e: PackError) -> ApiError {
    tracing::warn!(item = ?e.item(), error = %e, "packing failed");
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

async fn pack(Json(req): Json<PackRequest>) -> Result<Json<PackResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /pack"
    );

    let solver = into_solver(req)?;
    let strategy = solver.config().strategy;
    let (outcome, elapsed) = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let outcome = solver.solve();
        (outcome, start.elapsed())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let solution = outcome.map_err(pack_error)?;
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

    Ok(Json(PackResponse {
        strategy,
        bins_opened: solution.bins_opened(),
        total_cost: solution.total_cost,
        waste_percent: solution.total_waste_percent(),
        elapsed_ms,
        placements: solution.item_placements(),
        solution,
    }))
}

async fn compare(Json(req): Json<PackRequest>) -> Result<Json<CompareResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /compare"
    );

    let solver = into_solver(req)?;
    let runs = tokio::task::spawn_blocking(move || solver.compare())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let best = best_run(&runs).map(|r| r.strategy);
    let runs: Vec<StrategyResponse> = runs
        .into_iter()
        .map(|run| {
            let elapsed_ms = run.elapsed.as_secs_f64() * 1000.0;
            match run.outcome {
                Ok(sol) => StrategyResponse {
                    strategy: run.strategy,
                    elapsed_ms,
                    total_cost: Some(sol.total_cost),
                    bins_opened: Some(sol.bins_opened()),
                    error: None,
                },
                Err(e) => StrategyResponse {
                    strategy: run.strategy,
                    elapsed_ms,
                    total_cost: None,
                    bins_opened: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();
    let failures = runs.iter().filter(|r| r.error.is_some()).count();

    Ok(Json(CompareResponse {
        runs,
        failures,
        best,
    }))
}

fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve());
}

async fn serve() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/pack", post(pack))
        .route("/compare", post(compare))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<Rect>, bins: Vec<Bin>) -> PackRequest {
        PackRequest {
            items,
            bins,
            config: PackerConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_pack_route() {
        let req = request(
            vec![Rect::new(4, 4), Rect::new(6, 6)],
            vec![Bin::new(10, 10, 50)],
        );
        let Json(resp) = pack(Json(req)).await.unwrap();
        assert_eq!(resp.bins_opened, 1);
        assert_eq!(resp.total_cost, 50);
        assert_eq!(resp.placements.len(), 2);
    }

    #[tokio::test]
    async fn test_pack_route_reports_infeasible_item() {
        let req = request(vec![Rect::new(6, 3)], vec![Bin::new(5, 5, 10)]);
        let (status, msg) = pack(Json(req)).await.err().unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(msg.contains("item 0"), "{msg}");
    }

    #[tokio::test]
    async fn test_compare_route() {
        let req = request(vec![Rect::new(5, 5)], vec![Bin::new(10, 10, 9)]);
        let Json(resp) = compare(Json(req)).await.unwrap();
        assert_eq!(resp.runs.len(), ScoreStrategy::ALL.len());
        assert_eq!(resp.failures, 0);
        assert_eq!(resp.best, Some(ScoreStrategy::BestAreaFit));
    }
}
