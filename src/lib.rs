// Admin HTTP server modules
pub mod handlers;
pub mod models;
pub mod routes;

// Process setup
pub mod config;
pub mod logging;
pub mod telemetry;

// Queue consumption
pub mod consumer;
pub mod forwarder;
pub mod queue;

// Distributed start/stop switch
pub mod gate;
pub mod kvs;
