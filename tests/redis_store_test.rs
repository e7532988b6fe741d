mod common;

use std::sync::Arc;

use queue_pusher::gate::{AppStatus, RuntimeGate};
use queue_pusher::kvs::{KeyValueStore, KvsError, RedisStore};
use testcontainers::clients::Cli;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_store_get_and_save() {
    let docker = Cli::default();
    let container = docker.run(common::create_redis_container());
    let host_port = container.get_host_port_ipv4(common::REDIS_PORT);
    let url = common::build_redis_url("127.0.0.1", host_port);

    let store = RedisStore::connect(&url).await.unwrap();

    assert_eq!(store.get("absent").await.unwrap(), None);

    store.save("key", "one").await.unwrap();
    store.save("key", "two").await.unwrap();
    assert_eq!(store.get("key").await.unwrap().as_deref(), Some("two"));

    let err = store.save("", "value").await.unwrap_err();
    assert!(matches!(err, KvsError::MissingKey));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_gate_over_redis() {
    let docker = Cli::default();
    let container = docker.run(common::create_redis_container());
    let host_port = container.get_host_port_ipv4(common::REDIS_PORT);
    let url = common::build_redis_url("127.0.0.1", host_port);

    // Two connections stand in for two consumer instances
    let first = RuntimeGate::new("orders", Arc::new(RedisStore::connect(&url).await.unwrap()));
    let second = RuntimeGate::new("orders", Arc::new(RedisStore::connect(&url).await.unwrap()));

    assert_eq!(second.app_status().await, AppStatus::Started);
    first.stop().await.unwrap();
    assert_eq!(second.app_status().await, AppStatus::Stopped);
    second.start().await.unwrap();
    assert_eq!(first.app_status().await, AppStatus::Started);

    let store = RedisStore::connect(&url).await.unwrap();
    assert_eq!(
        store.get("consumers:orders:v1").await.unwrap().as_deref(),
        Some(r#"{"status":"started"}"#)
    );
}
