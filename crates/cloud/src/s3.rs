//! Amazon S3 backend.
//!
//! Every upload first makes sure the bucket and the project marker exist, then
//! writes the object with server-side encryption. Objects are addressed by
//! their virtual-hosted URL `https://{bucket}.s3.amazonaws.com/{key}`.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, ServerSideEncryption};
use aws_sdk_s3::Client;
use aws_smithy_types::byte_stream::ByteStream;

use crate::error::StorageError;
use crate::naming::{extract_key_from_url, new_object_key, normalize_bucket_name, project_marker_key};
use crate::store::ObjectStore;

/// Region that rejects an explicit `LocationConstraint` on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Static keys. When absent the default AWS credential chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

pub struct S3Store {
    client: Client,
    bucket: String,
    region: String,
}

fn sdk_error<E>(err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::S3(DisplayErrorContext(&err).to_string())
}

impl S3Store {
    /// Build a client from `settings`. No request is made until first use.
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let (Some(key), Some(secret)) = (&settings.access_key_id, &settings.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                "intake-config",
            ));
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            bucket: normalize_bucket_name(&settings.bucket),
            region: settings.region.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL of `key`, with each path segment percent-encoded.
    pub fn object_url(&self, key: &str) -> String {
        let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, encoded.join("/"))
    }

    /// Create the bucket if S3 reports it missing.
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let err = match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };

        let missing = err
            .as_service_error()
            .is_some_and(|e| e.is_not_found() || e.code() == Some("NoSuchBucket"));
        if !missing {
            return Err(sdk_error(err));
        }

        let mut create = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            create = create.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        create.send().await.map_err(sdk_error)?;
        tracing::info!(bucket = %self.bucket, region = %self.region, "Created S3 bucket");
        Ok(())
    }

    /// Write the `{project}/.keep` marker if the project has no objects yet.
    async fn ensure_project_folder(&self, project: &str) -> Result<(), StorageError> {
        let listing = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(format!("{project}/"))
            .max_keys(1)
            .send()
            .await
            .map_err(sdk_error)?;

        if listing.key_count().unwrap_or(0) == 0 {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(project_marker_key(project))
                .body(ByteStream::from_static(b""))
                .send()
                .await
                .map_err(sdk_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn upload(
        &self,
        project: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.ensure_bucket().await?;
        self.ensure_project_folder(project).await?;

        let key = new_object_key(project, file_name);
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::info!(bucket = %self.bucket, key = %key, size, "Uploaded object to S3");
        Ok(self.object_url(&key))
    }

    async fn download(&self, object_url: &str) -> Result<Vec<u8>, StorageError> {
        let key = extract_key_from_url(object_url)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_no_such_key() => StorageError::NotFound(key.clone()),
                _ => sdk_error(err),
            })?;
        let data = output.body.collect().await.map_err(sdk_error)?;
        Ok(data.into_bytes().to_vec())
    }

    async fn presigned_url(
        &self,
        object_url: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let key = extract_key_from_url(object_url)?;
        let presigning = PresigningConfig::expires_in(expires_in).map_err(sdk_error)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition("inline")
            .response_content_type("application/pdf")
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(bucket: &str) -> S3Store {
        S3Store::connect(&S3Settings {
            bucket: bucket.into(),
            region: "ap-south-1".into(),
            access_key_id: Some("AKIDEXAMPLE".into()),
            secret_access_key: Some("secret".into()),
        })
        .await
    }

    #[tokio::test]
    async fn bucket_name_is_normalised_on_connect() {
        assert_eq!(store("HSM_Faxes").await.bucket(), "hsm-faxes");
    }

    #[tokio::test]
    async fn object_url_encodes_segments() {
        let s3 = store("faxes").await;
        assert_eq!(
            s3.object_url("acme/acme-20250101-000000/My Fax.pdf"),
            "https://faxes.s3.amazonaws.com/acme/acme-20250101-000000/My%20Fax.pdf"
        );
    }

    #[tokio::test]
    async fn presigned_url_is_signed_locally() {
        let s3 = store("faxes").await;
        let url = s3
            .presigned_url(
                "https://faxes.s3.amazonaws.com/acme/acme-1/fax.pdf",
                Duration::from_secs(600),
            )
            .await
            .unwrap();
        assert!(url.contains("acme/acme-1/fax.pdf"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("response-content-type=application%2Fpdf"));
    }
}
