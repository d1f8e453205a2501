use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::BlobStoreError;

/// Three freshly re-encoded JPEG buffers, one per preset of spec §4.3, in
/// upload order (thumbnail, FHD, 4K). Deliberately untyped w.r.t.
/// `hof-infra-image`'s own buffer struct — the blob store doesn't need to
/// know how these bytes were produced.
pub struct ImageBytes {
    pub thumbnail: Vec<u8>,
    pub fhd: Vec<u8>,
    pub four_k: Vec<u8>,
}

/// Blob names assigned to one uploaded triple, matching the field order of
/// [`hof_domain_models::BlobNames`].
pub struct UploadedNames {
    pub thumbnail: String,
    pub fhd: String,
    pub four_k: String,
}

/// C2: upload/download/delete of image blobs with tags, over an
/// S3-compatible object store.
#[derive(Clone)]
pub struct BlobStoreGateway {
    client: Client,
    container: String,
    cdn_base: String,
}

impl BlobStoreGateway {
    pub fn new(client: Client, container: impl Into<String>, cdn_base: impl Into<String>) -> Self {
        Self {
            client,
            container: container.into(),
            cdn_base: cdn_base.into(),
        }
    }

    /// Uploads the three image variants, each tagged with `creatorId` and
    /// `screenshotId`, and content-typed `image/jpeg` (spec §4.2).
    #[instrument(skip(self, buffers))]
    pub async fn upload_images(
        &self,
        creator_id: Uuid,
        screenshot_id: &str,
        names: &UploadedNames,
        buffers: ImageBytes,
    ) -> Result<(), BlobStoreError> {
        let tagging = format!("creatorId={creator_id}&screenshotId={screenshot_id}");

        self.put_object(&names.thumbnail, buffers.thumbnail, &tagging).await?;
        self.put_object(&names.fhd, buffers.fhd, &tagging).await?;
        self.put_object(&names.four_k, buffers.four_k, &tagging).await?;
        Ok(())
    }

    async fn put_object(&self, name: &str, bytes: Vec<u8>, tagging: &str) -> Result<(), BlobStoreError> {
        self.client
            .put_object()
            .bucket(&self.container)
            .key(name)
            .content_type("image/jpeg")
            .tagging(tagging)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| BlobStoreError::Upload {
                name: name.to_string(),
                source: Box::new(err),
            })?;
        Ok(())
    }

    /// Removes all three blob variants. A `DeleteObject` call against a
    /// missing key succeeds under the S3 API (delete is idempotent), which
    /// is what gives us the "tolerates already-missing blobs" behaviour of
    /// spec §4.2 without any special-casing here.
    #[instrument(skip(self))]
    pub async fn delete_images(&self, names: &UploadedNames) -> Result<(), BlobStoreError> {
        for name in [&names.thumbnail, &names.fhd, &names.four_k] {
            self.delete_object(name).await?;
        }
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), BlobStoreError> {
        self.client
            .delete_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|err| BlobStoreError::Delete {
                name: name.to_string(),
                source: Box::new(err),
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn download_to_buffer(&self, name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.container)
            .key(name)
            .send()
            .await
            .map_err(|err| BlobStoreError::Download {
                name: name.to_string(),
                source: Box::new(err),
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| BlobStoreError::Download {
                name: name.to_string(),
                source: Box::new(err),
            })?;
        Ok(bytes.into_bytes().to_vec())
    }

    #[instrument(skip(self))]
    pub async fn download_to_file(&self, name: &str, path: &std::path::Path) -> Result<(), BlobStoreError> {
        let bytes = self.download_to_buffer(name).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// `{cdnBase}/{container}/{name}` (spec §4.2).
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{name}",
            self.cdn_base.trim_end_matches('/'),
            self.container.trim_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_joins_cdn_container_and_name() {
        let gateway = BlobStoreGateway::new(
            Client::from_conf(
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(aws_sdk_s3::config::Region::new("auto"))
                    .credentials_provider(aws_sdk_s3::config::Credentials::new(
                        "key", "secret", None, None, "test",
                    ))
                    .build(),
            ),
            "screenshots",
            "https://cdn.example.com/",
        );
        assert_eq!(
            gateway.public_url("a/b/c.jpg"),
            "https://cdn.example.com/screenshots/a/b/c.jpg"
        );
    }
}
