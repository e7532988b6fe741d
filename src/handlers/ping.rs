// GET /ping handler

use std::convert::Infallible;

pub async fn ping_handler() -> Result<impl warp::Reply, Infallible> {
    Ok("pong")
}
