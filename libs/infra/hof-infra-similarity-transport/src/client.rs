use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{error, instrument};

use crate::errors::TransportError;
use crate::frame::{self, decode, encode};
use crate::protocol::{Request, Response, ResponsePayload};

/// Default client-side wait for one inference round trip (spec §4.9): a
/// timed-out caller fails, but the worker keeps running and its eventual
/// answer is silently discarded by [`PendingTable::take`] finding no
/// waiting sender.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// The main process's half of the sidecar IPC channel of spec §4.9: owns
/// the worker child process, multiplexes concurrent callers over one FIFO
/// stdio pipe pair by correlation id, and fails loudly if the worker exits
/// before a requested shutdown.
pub struct WorkerChannel {
    child: Mutex<Child>,
    write_tx: tokio::sync::mpsc::UnboundedSender<bytes::Bytes>,
    pending: PendingTable,
    next_id: AtomicU64,
    shutdown_requested: Arc<AtomicBool>,
}

impl WorkerChannel {
    /// Spawns `program` with `args`, wiring its stdin/stdout as the framed
    /// channel. The process is kept alive for the returned value's
    /// lifetime; dropping it (or calling [`Self::shutdown`]) tears it down.
    #[instrument(skip(args))]
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, TransportError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let shutdown_requested = Arc::new(AtomicBool::new(false));

        let (write_tx, mut write_rx) = tokio::sync::mpsc::unbounded_channel::<bytes::Bytes>();
        tokio::spawn(async move {
            let mut writer = frame::writer(stdin);
            while let Some(bytes) = write_rx.recv().await {
                if writer.send(bytes).await.is_err() {
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_shutdown = shutdown_requested.clone();
        tokio::spawn(async move {
            let mut reader = frame::reader(stdout);
            while let Some(Ok(bytes)) = reader.next().await {
                let response: Response = match decode(bytes) {
                    Ok(response) => response,
                    Err(err) => {
                        error!(error = %err, "malformed frame from similarity worker");
                        continue;
                    }
                };
                if let Some(sender) = reader_pending.lock().await.remove(&response.id) {
                    let _ = sender.send(response);
                }
            }

            if !reader_shutdown.load(Ordering::SeqCst) {
                error!("similarity worker process exited unexpectedly");
            }
            // Any request still waiting will time out; there is nothing left
            // to reply to it with.
        });

        Ok(Self {
            child: Mutex::new(child),
            write_tx,
            pending,
            next_id: AtomicU64::new(0),
            shutdown_requested,
        })
    }

    /// Sends one inference batch and waits up to [`REQUEST_TIMEOUT`] for a
    /// reply correlated by id.
    #[instrument(skip(self, images_data))]
    pub async fn request(&self, images_data: Vec<Vec<u8>>) -> Result<Vec<Vec<f32>>, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = encode(&Request { id, images_data })?;
        self.write_tx.send(frame).map_err(|_| TransportError::Closed)?;

        match timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(response)) => match response.payload {
                ResponsePayload::Ok(vectors) => Ok(vectors),
                ResponsePayload::Err(message) => Err(TransportError::WorkerError(message)),
            },
            Ok(Err(_)) => Err(TransportError::WorkerExited),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(TransportError::Timeout(REQUEST_TIMEOUT))
            }
        }
    }

    /// Marks the channel as intentionally shutting down (so the reader task
    /// doesn't log the subsequent exit as a failure) and kills the worker.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        let _ = self.child.lock().await.start_kill();
    }
}
