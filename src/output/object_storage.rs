//! Object-storage output writer
//!
//! Uploads every part of a message as one object. The destination key is an
//! interpolated string resolved per part, part metadata travels as object
//! metadata, and each upload is bounded by the configured timeout. The writer
//! does not participate in span propagation beyond reading the current span
//! to stamp a `traceparent` entry onto the uploaded object's metadata.

use std::collections::HashMap;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{parse_duration, ConfigError, ObjectStorageConfig};
use crate::message::Message;
use crate::output::interpolation::InterpolatedString;

/// Object-storage writer errors.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The writer was used before a successful [`ObjectStorage::connect`].
    /// Callers must retry after connecting.
    #[error("not connected to target output")]
    NotConnected,

    #[error("upload timed out after {0:?}")]
    TimedOut(Duration),

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Writer uploading message parts as objects to a bucket.
#[derive(Debug)]
pub struct ObjectStorage {
    conf: ObjectStorageConfig,
    path: InterpolatedString,
    client: Option<Client>,
    timeout: Duration,
}

impl ObjectStorage {
    /// Create a writer from configuration. Fails on a malformed timeout
    /// duration string or missing bucket.
    pub fn new(conf: ObjectStorageConfig) -> Result<Self, ConfigError> {
        conf.validate()?;
        if conf.bucket.is_empty() {
            return Err(ConfigError::Validation(
                "output bucket must not be empty".to_string(),
            ));
        }
        let timeout = parse_duration(&conf.timeout).map_err(|reason| {
            ConfigError::InvalidDuration {
                field: "timeout",
                value: conf.timeout.clone(),
                reason,
            }
        })?;
        let path = InterpolatedString::parse(&conf.path);
        Ok(Self {
            conf,
            path,
            client: None,
            timeout,
        })
    }

    /// Whether [`ObjectStorage::connect`] has succeeded.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Establish the connection to the target bucket. Reconnecting an
    /// already-connected writer is a no-op.
    pub async fn connect(&mut self) -> Result<(), OutputError> {
        if self.client.is_some() {
            return Ok(());
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if !self.conf.region.is_empty() {
            loader = loader.region(Region::new(self.conf.region.clone()));
        }
        if let (Some(access), Some(secret)) = (&self.conf.access_key, &self.conf.secret_key) {
            loader = loader
                .credentials_provider(Credentials::new(access, secret, None, None, "spanline"));
        }
        let shared = loader.load().await;

        let client = match self.conf.endpoint {
            Some(ref endpoint) => {
                let config = aws_sdk_s3::config::Builder::from(&shared)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(&shared),
        };

        self.client = Some(client);
        info!(bucket = %self.conf.bucket, "uploading message parts as objects");
        Ok(())
    }

    /// Upload each part of the message as one object under its interpolated
    /// key. Returns [`OutputError::NotConnected`] before a successful
    /// connect. The first failing upload aborts the write.
    pub async fn write(&self, msg: &Message) -> Result<(), OutputError> {
        let client = self.client.as_ref().ok_or(OutputError::NotConnected)?;

        for (i, part) in msg.iter().enumerate() {
            let key = self.path.render(msg, i);

            let mut metadata: HashMap<String, String> = part.metadata().clone();
            if let Some(span) = part.span() {
                if span.context().is_valid() {
                    metadata.insert("traceparent".to_string(), span.context().to_traceparent());
                }
            }

            let request = client
                .put_object()
                .bucket(&self.conf.bucket)
                .key(&key)
                .content_type(&self.conf.content_type)
                .set_metadata(Some(metadata))
                .body(ByteStream::from(part.data().clone()));

            match tokio::time::timeout(self.timeout, request.send()).await {
                Ok(Ok(_)) => {
                    debug!(bucket = %self.conf.bucket, key = %key, "uploaded message part");
                }
                Ok(Err(err)) => return Err(OutputError::Upload(err.to_string())),
                Err(_) => return Err(OutputError::TimedOut(self.timeout)),
            }
        }
        Ok(())
    }

    /// Begin releasing resources used by the writer. The client teardown is
    /// synchronous and cheap, so this returns immediately.
    pub fn close_async(&mut self) {
        self.client = None;
    }

    /// Block until the writer is closed or `timeout` passes.
    pub async fn wait_for_close(&self, _timeout: Duration) -> Result<(), OutputError> {
        // close_async tears the client down inline, so there is nothing left
        // to wait for.
        Ok(())
    }
}
