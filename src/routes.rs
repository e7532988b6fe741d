// Route definitions for the admin API

use std::convert::Infallible;
use std::sync::Arc;

use warp::Filter;

use crate::gate::RuntimeGate;
use crate::handlers;

pub fn configure_routes(
    gate: Arc<RuntimeGate>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // GET /ping
    let ping = warp::path("ping")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::ping_handler);

    // GET /consumer/status
    let status = warp::path("consumer")
        .and(warp::path("status"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_gate(gate.clone()))
        .and_then(handlers::status_handler);

    // PUT /consumer/start
    let start = warp::path("consumer")
        .and(warp::path("start"))
        .and(warp::path::end())
        .and(warp::put())
        .and(with_gate(gate.clone()))
        .and_then(handlers::start_handler);

    // PUT /consumer/stop
    let stop = warp::path("consumer")
        .and(warp::path("stop"))
        .and(warp::path::end())
        .and(warp::put())
        .and(with_gate(gate))
        .and_then(handlers::stop_handler);

    ping.or(status).or(start).or(stop)
}

fn with_gate(
    gate: Arc<RuntimeGate>,
) -> impl Filter<Extract = (Arc<RuntimeGate>,), Error = Infallible> + Clone {
    warp::any().map(move || gate.clone())
}
