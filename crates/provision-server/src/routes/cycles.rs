use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use provision_core::runtime::{run_cycle, CycleRequest};
use tracing::{error, info};

use crate::error::AppError;
use crate::state::{AppState, CycleRecord};

fn parse_request(body: &Bytes) -> Result<CycleRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CycleRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("invalid request body: {e}")))
}

/// POST /api/cycles: schedule one cycle in the background.
///
/// Responds as soon as the cycle is scheduled; progress is visible through
/// `GET /api/cycles`. Only one cycle runs at a time.
pub async fn start_cycle(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let request = parse_request(&body)?;
    let settings = request.resolve(&app.config)?;
    let delay_seconds = settings.delay.as_secs_f64();
    let cap = settings.max_total_iterations;

    let Some(id) = app.cycles().try_begin(cap, delay_seconds) else {
        return Err(AppError::conflict("a cycle is already running"));
    };
    info!(cycle = %id, ?cap, delay_seconds, "cycle scheduled");

    let task_app = app.clone();
    let cycle_id = id.clone();
    tokio::spawn(async move {
        let worker = task_app.clone();
        let joined = tokio::task::spawn_blocking(move || {
            run_cycle(&worker.root, &worker.config, &worker.db, settings)
        })
        .await;
        let result = match joined {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => {
                error!(cycle = %cycle_id, error = %e, "cycle failed");
                Err(e.to_string())
            }
            Err(e) => {
                error!(cycle = %cycle_id, error = %e, "cycle task panicked");
                Err(format!("cycle task panicked: {e}"))
            }
        };
        task_app.cycles().finish(&cycle_id, result);
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "scheduled",
            "id": id,
            "max_total_iterations": cap,
            "delay_seconds": delay_seconds,
        })),
    ))
}

/// GET /api/cycles: recent cycles, newest first.
pub async fn list_cycles(State(app): State<AppState>) -> Json<Vec<CycleRecord>> {
    Json(app.cycles().list())
}

/// GET /api/cycles/{id}
pub async fn get_cycle(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CycleRecord>, AppError> {
    app.cycles()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("cycle not found: {id}")))
}
