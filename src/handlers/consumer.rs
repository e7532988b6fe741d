// GET /consumer/status, PUT /consumer/start, PUT /consumer/stop handlers

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{error, info};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

use crate::gate::{GateError, RuntimeGate};
use crate::models::{AppStatusResponse, ErrorResponse};

pub async fn status_handler(gate: Arc<RuntimeGate>) -> Result<Response, Infallible> {
    Ok(status_reply(&gate).await)
}

pub async fn start_handler(gate: Arc<RuntimeGate>) -> Result<Response, Infallible> {
    info!(key = %gate.key(), "PUT /consumer/start");
    match gate.start().await {
        Ok(()) => Ok(status_reply(&gate).await),
        Err(e) => Ok(error_reply("start", e)),
    }
}

pub async fn stop_handler(gate: Arc<RuntimeGate>) -> Result<Response, Infallible> {
    info!(key = %gate.key(), "PUT /consumer/stop");
    match gate.stop().await {
        Ok(()) => Ok(status_reply(&gate).await),
        Err(e) => Ok(error_reply("stop", e)),
    }
}

async fn status_reply(gate: &RuntimeGate) -> Response {
    let status = gate.app_status().await;
    warp::reply::json(&AppStatusResponse::new(status)).into_response()
}

fn error_reply(operation: &str, err: GateError) -> Response {
    error!(operation, error = %err, "failed to switch consumer");
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(err.to_string())),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}
