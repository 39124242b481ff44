//! Request dispatch for the console.
//!
//! Every network call runs as its own tokio task and reports back through a
//! single completion channel owned by the [`Console`](crate::Console), which
//! applies completions one at a time. Completions carry enough tagging
//! (list sequence number, panel generation) for the receiver to discard the
//! ones that no longer apply.

use crate::api::InstanceApi;
use range_common::{ContainerLogs, InstancePage, InstanceQuery, StatsSnapshot};
use range_sdk::GatewayError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Identifies the panel instance a telemetry request was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanelTicket {
    pub row: String,
    pub generation: u64,
}

/// Result of one dispatched request, tagged for the receiver.
#[derive(Debug)]
pub enum Completion {
    List {
        seq: u64,
        result: Result<InstancePage, GatewayError>,
    },
    Stats {
        ticket: PanelTicket,
        result: Result<StatsSnapshot, GatewayError>,
    },
    Logs {
        ticket: PanelTicket,
        tail: u32,
        result: Result<ContainerLogs, GatewayError>,
    },
}

/// Cancellation handle for one in-flight request.
///
/// Dropping the handle does not cancel; call [`RequestHandle::cancel`].
#[derive(Debug)]
pub struct RequestHandle {
    abort: AbortHandle,
}

impl RequestHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Spawns API calls and routes their results to the completion channel.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn InstanceApi>,
    tx: mpsc::UnboundedSender<Completion>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn InstanceApi>) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { api, tx }, rx)
    }

    pub fn list(&self, seq: u64, query: InstanceQuery) -> RequestHandle {
        debug!(seq, page = query.page, "Dispatching instance list");
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.list_instances(&query).await;
            Completion::List { seq, result }
        })
    }

    pub fn stats(&self, ticket: PanelTicket) -> RequestHandle {
        debug!(row = %ticket.row, generation = ticket.generation, "Dispatching stats");
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.instance_stats(&ticket.row).await;
            Completion::Stats { ticket, result }
        })
    }

    pub fn logs(&self, ticket: PanelTicket, tail: u32) -> RequestHandle {
        debug!(row = %ticket.row, generation = ticket.generation, tail, "Dispatching logs");
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.instance_logs(&ticket.row, tail).await;
            Completion::Logs { ticket, tail, result }
        })
    }

    fn spawn<F>(&self, request: F) -> RequestHandle
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            // The receiver only goes away with the console itself.
            let _ = tx.send(request.await);
        });
        RequestHandle {
            abort: task.abort_handle(),
        }
    }
}
