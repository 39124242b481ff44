//! Row expansion arena.
//!
//! Expanded rows map to their [`TelemetryPanel`]. Every expansion draws a new
//! generation from a coordinator-wide counter, so a completion tagged with the
//! generation of a collapsed panel never matches the slot of a later one.

use crate::dispatch::{Dispatcher, PanelTicket};
use crate::panel::{TelemetryOutcome, TelemetryPanel};
use crate::ConsoleError;
use range_common::{ContainerLogs, Instance, StatsSnapshot};
use range_sdk::GatewayError;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RowExpansion {
    panels: HashMap<String, TelemetryPanel>,
    next_generation: u64,
}

impl RowExpansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, row: &str) -> bool {
        self.panels.contains_key(row)
    }

    pub fn expanded(&self) -> Vec<&str> {
        let mut rows: Vec<&str> = self.panels.keys().map(String::as_str).collect();
        rows.sort_unstable();
        rows
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panel(&self, row: &str) -> Option<&TelemetryPanel> {
        self.panels.get(row)
    }

    pub fn panel_mut(&mut self, row: &str) -> Option<&mut TelemetryPanel> {
        self.panels.get_mut(row)
    }

    /// Creates a panel bound to `instance` and runs its initial fetch with
    /// the given log tail. Returns false if the row was already expanded.
    pub fn expand(
        &mut self,
        instance: Instance,
        dispatcher: &Dispatcher,
        tail: u32,
    ) -> Result<bool, ConsoleError> {
        if tail == 0 {
            return Err(ConsoleError::InvalidTail(tail));
        }
        if self.panels.contains_key(&instance.id) {
            return Ok(false);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        debug!(row = %instance.id, generation, status = %instance.status, "Expanding row");

        let row = instance.id.clone();
        let mut panel = TelemetryPanel::new(instance, generation);
        panel.fetch_stats(dispatcher);
        panel.fetch_logs(dispatcher, tail)?;
        self.panels.insert(row, panel);
        Ok(true)
    }

    /// Disposes the panel of `row`, aborting its outstanding requests.
    pub fn collapse(&mut self, row: &str) -> bool {
        match self.panels.remove(row) {
            Some(panel) => {
                debug!(row, generation = panel.generation(), "Collapsing row");
                true
            }
            None => false,
        }
    }

    /// Collapses every expanded row not in `keep`. Returns the collapsed ids.
    pub fn retain_rows(&mut self, keep: &[Instance]) -> Vec<String> {
        let mut gone: Vec<String> = self
            .panels
            .keys()
            .filter(|row| !keep.iter().any(|i| &i.id == *row))
            .cloned()
            .collect();
        gone.sort_unstable();
        for row in &gone {
            self.collapse(row);
        }
        gone
    }

    pub fn apply_stats(
        &mut self,
        ticket: &PanelTicket,
        result: Result<StatsSnapshot, GatewayError>,
    ) -> TelemetryOutcome {
        match self.live(ticket) {
            Some(panel) => panel.apply_stats(result),
            None => TelemetryOutcome::Stale,
        }
    }

    pub fn apply_logs(
        &mut self,
        ticket: &PanelTicket,
        tail: u32,
        result: Result<ContainerLogs, GatewayError>,
    ) -> TelemetryOutcome {
        match self.live(ticket) {
            Some(panel) => panel.apply_logs(tail, result),
            None => TelemetryOutcome::Stale,
        }
    }

    /// Busy while any panel has requests outstanding.
    pub fn is_busy(&self) -> bool {
        self.panels.values().any(TelemetryPanel::is_loading)
    }

    fn live(&mut self, ticket: &PanelTicket) -> Option<&mut TelemetryPanel> {
        let panel = self
            .panels
            .get_mut(&ticket.row)
            .filter(|p| p.generation() == ticket.generation);
        if panel.is_none() {
            debug!(row = %ticket.row, generation = ticket.generation, "Dropping completion for disposed panel");
        }
        panel
    }
}
