//! Per-row telemetry controller.
//!
//! A [`TelemetryPanel`] is bound to the [`Instance`] snapshot known when its
//! row was expanded. It keeps two independent slots, stats and logs, each with
//! its own in-flight count, data and error. Requests are not single-flighted;
//! every completion is applied in arrival order so the last one to complete
//! decides the state.

use crate::dispatch::{Dispatcher, PanelTicket, RequestHandle};
use crate::ConsoleError;
use range_common::{ContainerLogs, Instance, LogBundle, StatsSnapshot, DEFAULT_LOG_TAIL};
use range_sdk::GatewayError;
use tracing::{debug, warn};

pub const NOT_RUNNING: &str = "Instance is not running, no resource usage available";
pub const NO_CONTAINER: &str = "Container id unknown, logs unavailable";
pub const NO_LOGS: &str = "(no logs)";

/// What applying a telemetry completion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryOutcome {
    Applied,
    Failed,
    /// The panel it was issued for has been collapsed.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsView<'a> {
    /// Gate closed at bind time; nothing was or will be requested.
    NotRunning,
    Loading,
    Failed(&'a str),
    /// Latest snapshot, with the error of a later failed refresh if any.
    Ready {
        snapshot: &'a StatsSnapshot,
        error: Option<&'a str>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogsView<'a> {
    NoContainer,
    Loading,
    Ready { text: &'a str, error: Option<&'a str> },
}

#[derive(Debug, Default)]
struct StatsSlot {
    in_flight: usize,
    data: Option<StatsSnapshot>,
    error: Option<String>,
}

#[derive(Debug)]
struct LogsSlot {
    in_flight: usize,
    tail: u32,
    bundle: Option<LogBundle>,
    error: Option<String>,
}

#[derive(Debug)]
pub struct TelemetryPanel {
    ticket: PanelTicket,
    instance: Instance,
    stats: StatsSlot,
    logs: LogsSlot,
    handles: Vec<RequestHandle>,
}

impl TelemetryPanel {
    pub fn new(instance: Instance, generation: u64) -> Self {
        Self {
            ticket: PanelTicket {
                row: instance.id.clone(),
                generation,
            },
            instance,
            stats: StatsSlot::default(),
            logs: LogsSlot {
                in_flight: 0,
                tail: DEFAULT_LOG_TAIL,
                bundle: None,
                error: None,
            },
            handles: Vec::new(),
        }
    }

    pub fn ticket(&self) -> &PanelTicket {
        &self.ticket
    }

    pub fn generation(&self) -> u64 {
        self.ticket.generation
    }

    /// The instance snapshot this panel was bound to.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn tail(&self) -> u32 {
        self.logs.tail
    }

    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.stats.data.as_ref()
    }

    pub fn stats_error(&self) -> Option<&str> {
        self.stats.error.as_deref()
    }

    pub fn logs(&self) -> Option<&LogBundle> {
        self.logs.bundle.as_ref()
    }

    pub fn logs_error(&self) -> Option<&str> {
        self.logs.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.stats.in_flight > 0 || self.logs.in_flight > 0
    }

    /// Requests a stats snapshot. Returns whether a request was issued.
    ///
    /// The eligibility gate is checked against the bound instance on every
    /// call; a closed gate clears the data and issues nothing.
    pub fn fetch_stats(&mut self, dispatcher: &Dispatcher) -> bool {
        if !self.instance.stats_eligible() {
            debug!(row = %self.ticket.row, status = %self.instance.status, "Stats gate closed");
            self.stats.data = None;
            return false;
        }

        self.stats.in_flight += 1;
        self.stats.error = None;
        let handle = dispatcher.stats(self.ticket.clone());
        self.track(handle);
        true
    }

    /// Requests the last `tail` log lines. Returns whether a request was
    /// issued; nothing is sent when the instance has no container id.
    pub fn fetch_logs(&mut self, dispatcher: &Dispatcher, tail: u32) -> Result<bool, ConsoleError> {
        if tail == 0 {
            return Err(ConsoleError::InvalidTail(tail));
        }
        self.logs.tail = tail;
        if self.instance.container().is_none() {
            debug!(row = %self.ticket.row, "No container id, skipping logs");
            return Ok(false);
        }

        self.logs.in_flight += 1;
        self.logs.error = None;
        let handle = dispatcher.logs(self.ticket.clone(), tail);
        self.track(handle);
        Ok(true)
    }

    /// Re-requests logs with the current tail.
    pub fn refresh_logs(&mut self, dispatcher: &Dispatcher) -> Result<bool, ConsoleError> {
        self.fetch_logs(dispatcher, self.logs.tail)
    }

    /// Changes the tail selection and re-fetches immediately. Selecting the
    /// current tail again is a no-op.
    pub fn set_tail(&mut self, dispatcher: &Dispatcher, tail: u32) -> Result<bool, ConsoleError> {
        if tail == 0 {
            return Err(ConsoleError::InvalidTail(tail));
        }
        if tail == self.logs.tail {
            return Ok(false);
        }
        self.fetch_logs(dispatcher, tail)
    }

    pub fn apply_stats(&mut self, result: Result<StatsSnapshot, GatewayError>) -> TelemetryOutcome {
        self.stats.in_flight = self.stats.in_flight.saturating_sub(1);
        self.prune();

        match result {
            Ok(snapshot) => {
                self.stats.data = Some(snapshot);
                self.stats.error = None;
                TelemetryOutcome::Applied
            }
            Err(e) => {
                // Previous snapshot stays visible.
                warn!(row = %self.ticket.row, "Stats refresh failed: {}", e);
                self.stats.error = Some(e.user_message());
                TelemetryOutcome::Failed
            }
        }
    }

    pub fn apply_logs(&mut self, tail: u32, result: Result<ContainerLogs, GatewayError>) -> TelemetryOutcome {
        self.logs.in_flight = self.logs.in_flight.saturating_sub(1);
        self.prune();

        match result {
            Ok(logs) => {
                self.logs.bundle = Some(LogBundle::from_wire(logs, tail));
                self.logs.error = None;
                TelemetryOutcome::Applied
            }
            Err(e) => {
                warn!(row = %self.ticket.row, tail, "Log fetch failed: {}", e);
                self.logs.bundle = None;
                self.logs.error = Some(e.user_message());
                TelemetryOutcome::Failed
            }
        }
    }

    pub fn stats_view(&self) -> StatsView<'_> {
        if !self.instance.stats_eligible() {
            return StatsView::NotRunning;
        }
        match (&self.stats.data, &self.stats.error) {
            (Some(snapshot), error) => StatsView::Ready {
                snapshot,
                error: error.as_deref(),
            },
            (None, _) if self.stats.in_flight > 0 => StatsView::Loading,
            (None, Some(error)) => StatsView::Failed(error),
            (None, None) => StatsView::Empty,
        }
    }

    pub fn logs_view(&self) -> LogsView<'_> {
        if self.instance.container().is_none() {
            return LogsView::NoContainer;
        }
        if self.logs.in_flight > 0 && self.logs.bundle.is_none() && self.logs.error.is_none() {
            return LogsView::Loading;
        }
        let text = self
            .logs
            .bundle
            .as_ref()
            .map(|b| b.text.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_LOGS);
        LogsView::Ready {
            text,
            error: self.logs.error.as_deref(),
        }
    }

    /// Aborts every outstanding request of this panel.
    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.cancel();
        }
        self.stats.in_flight = 0;
        self.logs.in_flight = 0;
    }

    fn track(&mut self, handle: RequestHandle) {
        self.prune();
        self.handles.push(handle);
    }

    fn prune(&mut self) {
        self.handles.retain(|h| !h.is_finished());
    }
}

impl Drop for TelemetryPanel {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            debug!(row = %self.ticket.row, generation = self.ticket.generation, "Cancelling panel requests");
        }
        self.cancel_all();
    }
}
