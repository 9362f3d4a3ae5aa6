//! Tests for the object-storage output writer
//!
//! Network-free coverage: construction, configuration failures, the
//! not-connected error path, and the connect/close lifecycle against a
//! static-credential client that is never asked to perform a request.

use std::time::Duration;

use spanline::config::ObjectStorageConfig;
use spanline::message::{Message, Part};
use spanline::output::{ObjectStorage, OutputError};

fn test_config() -> ObjectStorageConfig {
    ObjectStorageConfig {
        bucket: "test-bucket".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
        access_key: Some("test-access".to_string()),
        secret_key: Some("test-secret".to_string()),
        ..ObjectStorageConfig::default()
    }
}

#[tokio::test]
async fn test_write_before_connect_returns_not_connected() {
    let writer = ObjectStorage::new(test_config()).expect("create writer");
    let msg: Message = vec![Part::new("payload")].into_iter().collect();

    let err = writer.write(&msg).await.unwrap_err();
    assert!(matches!(err, OutputError::NotConnected));
}

#[test]
fn test_new_rejects_empty_bucket() {
    let config = ObjectStorageConfig::default();
    assert!(ObjectStorage::new(config).is_err());
}

#[test]
fn test_new_rejects_bad_timeout() {
    let config = ObjectStorageConfig {
        timeout: "soon".to_string(),
        ..test_config()
    };
    let err = ObjectStorage::new(config).unwrap_err();
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn test_new_rejects_bad_endpoint() {
    let config = ObjectStorageConfig {
        endpoint: Some("localhost:9000".to_string()),
        ..test_config()
    };
    assert!(ObjectStorage::new(config).is_err());
}

#[tokio::test]
async fn test_connect_and_close_lifecycle() {
    let mut writer = ObjectStorage::new(test_config()).expect("create writer");
    assert!(!writer.is_connected());

    writer.connect().await.expect("connect");
    assert!(writer.is_connected());

    // Reconnecting an already-connected writer is a no-op.
    writer.connect().await.expect("reconnect");
    assert!(writer.is_connected());

    writer.close_async();
    assert!(!writer.is_connected());
    writer
        .wait_for_close(Duration::from_millis(100))
        .await
        .expect("wait for close");

    // The writer stays unusable after close until reconnected.
    let msg: Message = vec![Part::new("payload")].into_iter().collect();
    assert!(matches!(
        writer.write(&msg).await.unwrap_err(),
        OutputError::NotConnected
    ));
}
