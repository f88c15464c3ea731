use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use strip_cutter::render;
use strip_cutter::kit::MAX_SPLIT_ROWS;
use strip_cutter::types::deserialize_u32_from_number;
use strip_cutter::{CutPositions, Error, Instruction, Kit, Placement, Rect, Solver, SolverConfig};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct SolveRequest {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    width: u32,
    details: Vec<DetailRequest>,
    #[serde(default)]
    cut_positions: CutPositions,
    #[serde(default)]
    horizontal_area_bound: bool,
    #[serde(default)]
    time_limit_ms: Option<u64>,
}

#[derive(Deserialize, Serialize)]
struct DetailRequest {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    height: u32,
    #[serde(default = "default_qty", deserialize_with = "deserialize_u32_from_number")]
    qty: u32,
}

fn default_qty() -> u32 {
    1
}

#[derive(Serialize)]
struct SolveResponse {
    /// `None` when no packing exists at the requested width.
    height: Option<u64>,
    feasible: bool,
    explored: u64,
    placements: Vec<Placement>,
    plan: Option<Instruction>,
    report: Option<String>,
}

/// Expands the request into a kit, rejecting oversized ones before allocating any details.
fn build_kit(details: &[DetailRequest]) -> Result<Kit, Error> {
    if let Some(d) = details.iter().find(|d| d.width == 0 || d.height == 0) {
        return Err(Error::InvalidDimensions {
            width: d.width,
            height: d.height,
        });
    }
    // Each detail adds at least one row to the split table.
    let total: u64 = details.iter().map(|d| d.qty as u64).sum();
    if total > MAX_SPLIT_ROWS {
        return Err(Error::KitTooLarge {
            rows: total,
            limit: MAX_SPLIT_ROWS,
        });
    }

    let items: Vec<Rect> = details
        .iter()
        .flat_map(|d| Rect::new(d.width, d.height).repeat(d.qty as usize))
        .collect();
    Kit::new(&items)
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        Error::EmptyKit
        | Error::InvalidDimensions { .. }
        | Error::KitTooLarge { .. }
        | Error::InvalidWidth => StatusCode::BAD_REQUEST,
    }
}

async fn solve(Json(req): Json<SolveRequest>) -> Result<Json<SolveResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /solve"
    );

    if req.width == 0 {
        return Err((StatusCode::BAD_REQUEST, Error::InvalidWidth.to_string()));
    }

    if req.details.iter().any(|d| d.qty == 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            "detail quantity must be non-zero".to_string(),
        ));
    }

    let config = SolverConfig {
        cut_positions: req.cut_positions,
        horizontal_area_bound: req.horizontal_area_bound,
        time_limit_ms: req.time_limit_ms,
    };
    let width = req.width;
    let details = req.details;

    // Building the split table and the search are both CPU-bound; keep them off the async workers.
    let solution = tokio::task::spawn_blocking(move || {
        let kit = build_kit(&details)?;
        Solver::new(&kit, config).solve(width)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (error_status(&e), e.to_string()))?;

    tracing::info!(
        width,
        height = solution.height,
        explored = solution.explored,
        "solved"
    );

    let response = SolveResponse {
        height: solution.is_feasible().then_some(solution.height),
        feasible: solution.is_feasible(),
        explored: solution.explored,
        placements: solution
            .plan
            .as_ref()
            .map(|p| p.placements())
            .unwrap_or_default(),
        report: solution.plan.as_ref().map(render::report),
        plan: solution.plan,
    };

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

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
        .route("/solve", post(solve))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
