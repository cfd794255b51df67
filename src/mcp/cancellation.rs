//! In-flight request cancellation
//!
//! Every request with an id gets a [`CancellationToken`] that is a child of the
//! server's shutdown token. `notifications/cancelled` cancels one request;
//! shutdown cancels them all.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mcp::protocol::{CancelledParams, JsonRpcId};

/// One registered request: its token and the dispatch it belongs to
#[derive(Debug, Clone)]
pub struct InFlight {
    pub request_id: JsonRpcId,
    pub token: CancellationToken,
    dispatch: u64,
}

pub struct CancellationManager {
    shutdown: CancellationToken,
    tokens: DashMap<JsonRpcId, InFlight>,
    next_dispatch: AtomicU64,
}

impl CancellationManager {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown, tokens: DashMap::new(), next_dispatch: AtomicU64::new(0) }
    }

    /// Register an in-flight request.
    ///
    /// A client reusing an id that is still in flight replaces the old entry;
    /// the old request keeps its token but can no longer be cancelled by id.
    pub fn register(&self, request_id: JsonRpcId) -> InFlight {
        let in_flight = InFlight {
            request_id: request_id.clone(),
            token: self.shutdown.child_token(),
            dispatch: self.next_dispatch.fetch_add(1, Ordering::Relaxed),
        };
        if self.tokens.insert(request_id.clone(), in_flight.clone()).is_some() {
            debug!(request_id = %request_id, "Request id reused while in flight");
        }
        in_flight
    }

    /// Cancel a request by id. Returns false when nothing was in flight.
    pub fn cancel(&self, request_id: &JsonRpcId) -> bool {
        match self.tokens.get(request_id) {
            Some(entry) => {
                entry.token.cancel();
                debug!(request_id = %request_id, "Cancelled request");
                true
            }
            None => {
                debug!(request_id = %request_id, "No in-flight request to cancel");
                false
            }
        }
    }

    /// Handle the params of a `notifications/cancelled` message
    pub fn handle_notification(&self, params: &serde_json::Value) -> bool {
        match serde_json::from_value::<CancelledParams>(params.clone()) {
            Ok(params) => {
                debug!(request_id = %params.request_id, reason = ?params.reason, "Cancellation requested");
                self.cancel(&params.request_id)
            }
            Err(e) => {
                debug!(error = %e, "Ignoring malformed cancellation notification");
                false
            }
        }
    }

    /// Forget a finished request, unless its id has since been reused
    pub fn complete(&self, in_flight: &InFlight) {
        self.tokens.remove_if(&in_flight.request_id, |_, entry| entry.dispatch == in_flight.dispatch);
    }

    pub fn active_count(&self) -> usize {
        self.tokens.len()
    }

    /// Cancel every in-flight request
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }
}

impl Default for CancellationManager {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
