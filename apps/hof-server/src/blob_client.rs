//! Builds the S3-compatible client behind C2 from [`hof_config::BlobConfig`].
//!
//! The blob store is deployment-agnostic (AWS S3, a self-hosted MinIO, a
//! Cloudflare R2 bucket, ...), so `BLOB_CONNECTION_URL` is taken as a full
//! endpoint URL, optionally carrying `key:secret` userinfo the way every
//! S3-compatible provider's own connection-string examples show it. When
//! userinfo is present we build static credentials from it and force
//! path-style addressing, since that's what non-AWS endpoints need; an
//! AWS URL with no userinfo instead falls back to the ambient credential
//! chain (env vars, instance profile, ...) via `aws-config`.

use anyhow::{bail, Context, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use url::Url;

pub async fn build_client(connection_url: &str) -> Result<Client> {
    let parsed = Url::parse(connection_url)
        .with_context(|| format!("BLOB_CONNECTION_URL is not a valid URL: {connection_url}"))?;

    if parsed.username().is_empty() {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        return Ok(Client::new(&shared));
    }

    let access_key = parsed.username().to_string();
    let secret_key = parsed
        .password()
        .context("BLOB_CONNECTION_URL has a username but no password")?
        .to_string();

    let mut endpoint = parsed.clone();
    let _ = endpoint.set_username("");
    let _ = endpoint.set_password(None);

    if endpoint.host_str().is_none() {
        bail!("BLOB_CONNECTION_URL is missing a host: {connection_url}");
    }

    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("auto"))
        .endpoint_url(endpoint.as_str())
        .credentials_provider(Credentials::new(access_key, secret_key, None, None, "blob-config"))
        .force_path_style(true)
        .build();

    Ok(Client::from_conf(config))
}
