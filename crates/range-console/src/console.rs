use crate::api::InstanceApi;
use crate::dispatch::{Completion, Dispatcher};
use crate::panel::{TelemetryOutcome, TelemetryPanel};
use crate::registry::{InstanceRegistry, ListOutcome};
use crate::rows::RowExpansion;
use crate::ConsoleError;
use range_common::{InstanceQuery, InstanceStatus, DEFAULT_LOG_TAIL};
use range_sdk::{Access, SessionGuard};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A state change produced by applying one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    List {
        seq: u64,
        outcome: ListOutcome,
        /// Expanded rows that disappeared from the applied page.
        collapsed: Vec<String>,
    },
    Stats {
        row: String,
        outcome: TelemetryOutcome,
    },
    Logs {
        row: String,
        tail: u32,
        outcome: TelemetryOutcome,
    },
}

/// Instance listing with expandable telemetry rows.
///
/// All state is owned here and mutated only through `&mut self`; network
/// calls run on spawned tasks and come back as completions applied one at a
/// time by [`Console::apply`].
pub struct Console {
    dispatcher: Dispatcher,
    completions: mpsc::UnboundedReceiver<Completion>,
    registry: InstanceRegistry,
    rows: RowExpansion,
}

impl Console {
    /// Mounts the console with the default query and issues the first fetch.
    ///
    /// Must be called inside a tokio runtime. Without a session the guard
    /// redirects to login and no request is made.
    pub fn mount(api: Arc<dyn InstanceApi>, guard: &SessionGuard) -> Result<Self, ConsoleError> {
        Self::with_query(api, guard, InstanceQuery::default())
    }

    pub fn with_query(
        api: Arc<dyn InstanceApi>,
        guard: &SessionGuard,
        query: InstanceQuery,
    ) -> Result<Self, ConsoleError> {
        if guard.require_auth() != Access::Granted {
            warn!("Console mount refused, no session");
            return Err(ConsoleError::NotAuthenticated);
        }

        let registry = InstanceRegistry::new(query)?;
        let (dispatcher, completions) = Dispatcher::new(api);
        let mut console = Self {
            dispatcher,
            completions,
            registry,
            rows: RowExpansion::new(),
        };
        console.sync();
        info!("Console mounted");
        Ok(console)
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn rows(&self) -> &RowExpansion {
        &self.rows
    }

    pub fn panel(&self, row: &str) -> Option<&TelemetryPanel> {
        self.rows.panel(row)
    }

    /// Fetches the listing if the query changed since the last pass.
    pub fn sync(&mut self) -> Option<u64> {
        self.registry.sync(&self.dispatcher)
    }

    pub fn set_page(&mut self, page: u32) -> Result<Option<u64>, ConsoleError> {
        self.registry.set_page(page)?;
        Ok(self.sync())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<Option<u64>, ConsoleError> {
        self.registry.set_page_size(page_size)?;
        Ok(self.sync())
    }

    pub fn set_status(&mut self, status: Option<InstanceStatus>) -> Option<u64> {
        self.registry.set_status(status);
        self.sync()
    }

    pub fn set_challenge(&mut self, challenge: Option<String>) -> Option<u64> {
        self.registry.set_challenge(challenge);
        self.sync()
    }

    pub fn set_search(&mut self, search: Option<String>) -> Option<u64> {
        self.registry.set_search(search);
        self.sync()
    }

    pub fn reset_filters(&mut self) -> Option<u64> {
        self.registry.reset_filters();
        self.sync()
    }

    /// Re-fetches the current page even though the query is unchanged.
    pub fn refetch(&mut self) -> Option<u64> {
        self.registry.refetch();
        self.sync()
    }

    /// Expands a row of the current page. Returns false if it already was.
    pub fn expand(&mut self, row: &str) -> Result<bool, ConsoleError> {
        self.expand_with_tail(row, DEFAULT_LOG_TAIL)
    }

    pub fn expand_with_tail(&mut self, row: &str, tail: u32) -> Result<bool, ConsoleError> {
        let instance = self
            .registry
            .row(row)
            .cloned()
            .ok_or_else(|| ConsoleError::UnknownRow(row.to_string()))?;
        self.rows.expand(instance, &self.dispatcher, tail)
    }

    pub fn collapse(&mut self, row: &str) -> bool {
        self.rows.collapse(row)
    }

    pub fn toggle(&mut self, row: &str) -> Result<bool, ConsoleError> {
        if self.rows.collapse(row) {
            return Ok(false);
        }
        self.expand(row)
    }

    pub fn refresh_stats(&mut self, row: &str) -> Result<bool, ConsoleError> {
        let dispatcher = &self.dispatcher;
        let panel = self
            .rows
            .panel_mut(row)
            .ok_or_else(|| ConsoleError::NotExpanded(row.to_string()))?;
        Ok(panel.fetch_stats(dispatcher))
    }

    pub fn refresh_logs(&mut self, row: &str) -> Result<bool, ConsoleError> {
        let dispatcher = &self.dispatcher;
        self.rows
            .panel_mut(row)
            .ok_or_else(|| ConsoleError::NotExpanded(row.to_string()))?
            .refresh_logs(dispatcher)
    }

    pub fn set_log_tail(&mut self, row: &str, tail: u32) -> Result<bool, ConsoleError> {
        let dispatcher = &self.dispatcher;
        self.rows
            .panel_mut(row)
            .ok_or_else(|| ConsoleError::NotExpanded(row.to_string()))?
            .set_tail(dispatcher, tail)
    }

    /// True while the listing or any open panel awaits a response.
    pub fn is_busy(&self) -> bool {
        self.registry.is_loading() || self.rows.is_busy()
    }

    pub fn apply(&mut self, completion: Completion) -> Update {
        match completion {
            Completion::List { seq, result } => {
                let outcome = self.registry.apply(seq, result);
                let collapsed = if outcome == ListOutcome::Applied {
                    self.rows.retain_rows(self.registry.rows())
                } else {
                    Vec::new()
                };
                Update::List {
                    seq,
                    outcome,
                    collapsed,
                }
            }
            Completion::Stats { ticket, result } => {
                let outcome = self.rows.apply_stats(&ticket, result);
                Update::Stats {
                    row: ticket.row,
                    outcome,
                }
            }
            Completion::Logs { ticket, tail, result } => {
                let outcome = self.rows.apply_logs(&ticket, tail, result);
                Update::Logs {
                    row: ticket.row,
                    tail,
                    outcome,
                }
            }
        }
    }

    /// Waits for the next completion and applies it.
    pub async fn next_update(&mut self) -> Option<Update> {
        let completion = self.completions.recv().await?;
        Some(self.apply(completion))
    }

    /// Applies every completion that has already arrived.
    pub fn apply_ready(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(completion) = self.completions.try_recv() {
            updates.push(self.apply(completion));
        }
        updates
    }

    /// Applies completions until nothing is outstanding.
    pub async fn settle(&mut self) -> Vec<Update> {
        let mut updates = self.apply_ready();
        while self.is_busy() {
            match self.next_update().await {
                Some(update) => updates.push(update),
                None => break,
            }
        }
        updates
    }
}
