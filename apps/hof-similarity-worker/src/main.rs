//! Entry point for the similarity sidecar process (spec §4.9). Spawned
//! once by the main server process and kept alive for the process
//! lifetime; reads framed `Request`s from stdin, runs one inference batch
//! per request, and writes the framed `Response` back on stdout.

use std::path::PathBuf;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use hof_infra_similarity_transport::{frame, Request, Response, ResponsePayload};
use hof_similarity_worker::InferenceEngine;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
struct Args {
    /// Path to the feature-vector model (spec §6 `SIMILARITY_MODEL_PATH`).
    #[arg(long, env = "SIMILARITY_MODEL_PATH")]
    model_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = match std::env::var("ENV").as_deref() {
        Ok("production") => hof_telemetry::LogFormat::Production,
        _ => hof_telemetry::LogFormat::Development,
    };
    hof_telemetry::init("hof_similarity_worker", format);

    let args = Args::parse();
    info!(model_path = %args.model_path.display(), "loading feature-vector model");

    let model_path = args.model_path.clone();
    let mut engine = tokio::task::spawn_blocking(move || InferenceEngine::load(&model_path))
        .await??;

    info!("similarity worker ready, waiting for requests on stdin");

    let mut reader = frame::reader(tokio::io::stdin());
    let mut writer = frame::writer(tokio::io::stdout());

    while let Some(frame) = reader.next().await {
        let bytes = match frame {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(error = %err, "failed to read request frame, shutting down");
                break;
            }
        };

        let request: Request = match frame::decode(bytes) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "received a malformed request frame, ignoring");
                continue;
            }
        };

        let payload = match engine.embed_batch(&request.images_data) {
            Ok(vectors) => ResponsePayload::Ok(vectors),
            Err(err) => ResponsePayload::Err(err.to_string()),
        };

        let response = Response { id: request.id, payload };
        let encoded = match frame::encode(&response) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(error = %err, "failed to encode response frame, shutting down");
                break;
            }
        };

        if writer.send(encoded).await.is_err() {
            error!("failed to write response frame, shutting down");
            break;
        }
    }

    info!("similarity worker exiting");
    Ok(())
}
