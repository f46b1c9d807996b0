// Copyright 2026 DGW Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! S3-compatible object store backed by the AWS SDK.
//!
//! Repositories map to buckets and document ids to object keys. Upload
//! bodies are forwarded to the SDK as a live `http_body::Body`, so large
//! payloads are never buffered here; the SDK splits them into parts as it
//! sees fit. No operation is retried — failures surface to the caller.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, SdkBody};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use sync_wrapper::SyncWrapper;
use tokio_util::io::ReaderStream;

use crate::error::StorageError;
use crate::store::{BodyStream, ObjectStore};
use crate::types::ObjectInfo;

/// Connection settings for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Custom endpoint URL (MinIO, on-prem gateways). `None` means AWS.
    pub endpoint: Option<String>,
    /// Region name.
    pub region: String,
    /// Static access key id. When unset, the default credential chain is
    /// used together with `secret_access_key`.
    pub access_key_id: Option<String>,
    /// Static secret access key.
    pub secret_access_key: Option<String>,
    /// Path-style addressing, required by most non-AWS endpoints.
    pub force_path_style: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
        }
    }
}

impl S3Settings {
    /// Validates the settings before a client is built from them.
    pub fn validate(&self) -> Result<(), String> {
        if self.region.is_empty() {
            return Err("s3 region must not be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("s3 endpoint must start with http:// or https://".to_string());
            }
        }
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) => Err("s3 secret key is required when access key is set".to_string()),
            (None, Some(_)) => Err("s3 access key is required when secret key is set".to_string()),
            _ => Ok(()),
        }
    }
}

// Adapts our boxed byte stream to the `http_body::Body` shape the SDK
// accepts. `SdkBody::from_body_1_x` wants `Sync`, which a boxed stream is
// not; `SyncWrapper` provides it since the body is only polled from one
// task at a time.
struct UploadBody {
    inner: SyncWrapper<BodyStream>,
}

impl http_body::Body for UploadBody {
    type Data = Bytes;
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        let stream = self.get_mut().inner.get_mut();
        match stream.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(http_body::Frame::data(chunk)))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(Box::new(err)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Production [`ObjectStore`] implementation on top of `aws-sdk-s3`.
pub struct S3DocumentStore {
    client: Client,
}

impl S3DocumentStore {
    /// Builds a store from connection settings.
    pub async fn new(settings: S3Settings) -> Result<Self, StorageError> {
        settings
            .validate()
            .map_err(StorageError::Backend)?;

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .force_path_style(settings.force_path_style);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            builder = builder.credentials_provider(credentials);
        } else {
            let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(settings.region.clone()))
                .load()
                .await;
            if let Some(provider) = sdk_config.credentials_provider() {
                builder = builder.credentials_provider(provider.clone());
            }
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    /// Wraps an existing client, mainly for wiring in tests.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn backend_error<E>(err: E) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::Backend(format!("{}", DisplayErrorContext(&err)))
}

fn to_chrono(ts: Option<&aws_smithy_types::DateTime>) -> DateTime<Utc> {
    ts.and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}

#[async_trait]
impl ObjectStore for S3DocumentStore {
    async fn put_object(
        &self,
        repository: &str,
        key: &str,
        body: BodyStream,
        tags: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let body = ByteStream::new(SdkBody::from_body_1_x(UploadBody {
            inner: SyncWrapper::new(body),
        }));

        self.client
            .put_object()
            .bucket(repository)
            .key(key)
            .body(body)
            .set_metadata(Some(tags.clone()))
            .send()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn get_object(
        &self,
        repository: &str,
        key: &str,
    ) -> Result<(ObjectInfo, BodyStream), StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(repository)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    StorageError::ObjectNotFound {
                        key: key.to_string(),
                    }
                } else {
                    backend_error(err)
                }
            })?;

        let info = ObjectInfo {
            key: key.to_string(),
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            last_modified: to_chrono(resp.last_modified()),
            content_type: resp
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            etag: resp.e_tag().unwrap_or_default().to_string(),
            metadata: resp.metadata().cloned().unwrap_or_default(),
        };

        let body: BodyStream = ReaderStream::new(resp.body.into_async_read())
            .map(|chunk| chunk.map_err(StorageError::Io))
            .boxed();

        Ok((info, body))
    }

    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectInfo, StorageError> {
        let resp = self
            .client
            .head_object()
            .bucket(repository)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    StorageError::ObjectNotFound {
                        key: key.to_string(),
                    }
                } else {
                    backend_error(err)
                }
            })?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            last_modified: to_chrono(resp.last_modified()),
            content_type: resp
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            etag: resp.e_tag().unwrap_or_default().to_string(),
            metadata: resp.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn delete_object(&self, repository: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(repository)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn list_objects(&self, repository: &str) -> Result<Vec<String>, StorageError> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(repository)
            .send()
            .await
            .map_err(backend_error)?;

        Ok(resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = S3Settings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.force_path_style);
    }

    #[test]
    fn test_settings_rejects_lone_access_key() {
        let settings = S3Settings {
            access_key_id: Some("AK".to_string()),
            ..S3Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_rejects_bad_endpoint() {
        let settings = S3Settings {
            endpoint: Some("minio:9000".to_string()),
            ..S3Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_timestamp_conversion() {
        let ts = aws_smithy_types::DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(Some(&ts));
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(to_chrono(None), DateTime::<Utc>::default());
    }
}
