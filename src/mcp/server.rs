//! MCP Stdio Server
//!
//! Implements the stdio transport for MCP: reads newline-delimited JSON-RPC
//! messages from stdin and writes responses to stdout. Each request runs as its
//! own task, so a slow tool call never blocks the next line; a single writer
//! task owns the output stream so responses are never interleaved.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::mcp::cancellation::CancellationManager;
use crate::mcp::error::McpError;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, McpRequest};

const OUTBOUND_QUEUE: usize = 64;

pub struct McpStdioServer<S> {
    service: S,
    cancellations: Arc<CancellationManager>,
    shutdown: CancellationToken,
}

impl<S> McpStdioServer<S>
where
    S: Service<McpRequest, Response = JsonRpcResponse, Error = McpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    pub fn new(service: S) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            service,
            cancellations: Arc::new(CancellationManager::new(shutdown.clone())),
            shutdown,
        }
    }

    /// Token that stops the read loop and cancels in-flight requests
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run on the process's stdin and stdout until EOF or shutdown
    pub async fn run(self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    ///
    /// Returns once the input is exhausted and every in-flight response has
    /// been written.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("Starting MCP stdio server");

        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOUND_QUEUE);
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut lines = reader.lines();
        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("MCP stdio server shutting down (cancelled)");
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                info!("MCP stdio server shutting down (EOF received)");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            debug!(line = %line, "Received input line");
            self.dispatch_line(&line, &tx).await;
        }

        drop(tx);
        writer_task.await.map_err(|e| Error::internal(format!("writer task failed: {}", e)))?
    }

    async fn dispatch_line(&self, line: &str, tx: &mpsc::Sender<JsonRpcResponse>) {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to parse JSON-RPC request");
                let error = McpError::ParseError(e.to_string());
                let _ = tx.send(JsonRpcResponse::failure(None, error.to_json_rpc_error())).await;
                return;
            }
        };

        if request.method == "notifications/cancelled" {
            self.cancellations.handle_notification(&request.params);
            return;
        }

        let Some(id) = request.id.clone().filter(|_| !request.is_notification()) else {
            // Other notifications still reach the service but never get a reply
            let service = self.service.clone();
            tokio::spawn(async move {
                if let Err(e) = service.oneshot(McpRequest::new(request)).await {
                    debug!(error = %e, "Notification handling failed");
                }
            });
            return;
        };

        let in_flight = self.cancellations.register(id.clone());
        let cancellations = self.cancellations.clone();
        let service = self.service.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let request = McpRequest::with_cancellation(request, in_flight.token.clone());
            let response = match service.oneshot(request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(request_id = %id, error = %e, "Request failed");
                    JsonRpcResponse::failure(Some(id.clone()), e.to_json_rpc_error())
                }
            };
            cancellations.complete(&in_flight);

            if tx.send(response).await.is_err() {
                warn!(request_id = %id, "Response dropped: writer closed");
            }
        });
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        debug!(response = %json, "Writing response");

        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
