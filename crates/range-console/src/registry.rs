//! Paginated, filterable view over the instance collection.
//!
//! The registry owns the query and the last applied page. Mutating the query
//! does not fetch by itself; [`InstanceRegistry::sync`] compares the current
//! (query, refresh key) pair with the one last dispatched and issues exactly
//! one request when they differ.
//!
//! Overlapping requests are neither de-duplicated nor cancelled. Each carries
//! a sequence number and a completion is applied only when its number is
//! higher than every number applied before it, so an older response that
//! arrives late cannot overwrite a newer one.

use crate::dispatch::Dispatcher;
use crate::ConsoleError;
use range_common::{Instance, InstancePage, InstanceQuery, InstanceStatus};
use range_sdk::GatewayError;
use tracing::{debug, warn};

/// What applying a list completion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Applied,
    Failed,
    /// Superseded by a response with a higher sequence number.
    Stale,
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    query: InstanceQuery,
    refresh_key: u64,
    last_pass: Option<(InstanceQuery, u64)>,
    latest_seq: u64,
    applied_seq: u64,
    rows: Vec<Instance>,
    total: u64,
    error: Option<String>,
}

impl InstanceRegistry {
    pub fn new(query: InstanceQuery) -> Result<Self, ConsoleError> {
        validate(&query)?;
        Ok(Self {
            query,
            ..Default::default()
        })
    }

    pub fn query(&self) -> &InstanceQuery {
        &self.query
    }

    pub fn rows(&self) -> &[Instance] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&Instance> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while the most recently dispatched request has not completed.
    pub fn is_loading(&self) -> bool {
        self.latest_seq > self.applied_seq
    }

    pub fn set_page(&mut self, page: u32) -> Result<(), ConsoleError> {
        if page == 0 {
            return Err(ConsoleError::InvalidQuery("page must be at least 1".to_string()));
        }
        self.query.page = page;
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), ConsoleError> {
        if page_size == 0 {
            return Err(ConsoleError::InvalidQuery("pageSize must be positive".to_string()));
        }
        if self.query.page_size != page_size {
            self.query.page = 1;
            self.query.page_size = page_size;
        }
        Ok(())
    }

    pub fn set_status(&mut self, status: Option<InstanceStatus>) {
        if self.query.status != status {
            self.query.page = 1;
            self.query.status = status;
        }
    }

    pub fn set_challenge(&mut self, challenge: Option<String>) {
        let challenge = challenge.filter(|c| !c.is_empty());
        if self.query.challenge != challenge {
            self.query.page = 1;
            self.query.challenge = challenge;
        }
    }

    pub fn set_search(&mut self, search: Option<String>) {
        let search = search.filter(|s| !s.trim().is_empty());
        if self.query.search != search {
            self.query.page = 1;
            self.query.search = search;
        }
    }

    /// Drops every filter and returns to the first page, keeping the page size.
    pub fn reset_filters(&mut self) {
        self.query = InstanceQuery {
            page_size: self.query.page_size,
            ..Default::default()
        };
    }

    /// Forces the next [`sync`](Self::sync) to fetch even if the query is
    /// unchanged.
    pub fn refetch(&mut self) {
        self.refresh_key += 1;
    }

    /// Dispatches a fetch when the query or refresh key changed since the
    /// last pass. Returns the sequence number of the request issued.
    pub fn sync(&mut self, dispatcher: &Dispatcher) -> Option<u64> {
        let pass = (self.query.clone(), self.refresh_key);
        if self.last_pass.as_ref() == Some(&pass) {
            return None;
        }

        self.latest_seq += 1;
        let seq = self.latest_seq;
        self.error = None;
        dispatcher.list(seq, self.query.clone());
        self.last_pass = Some(pass);
        Some(seq)
    }

    pub fn apply(&mut self, seq: u64, result: Result<InstancePage, GatewayError>) -> ListOutcome {
        if seq <= self.applied_seq {
            debug!(seq, applied = self.applied_seq, "Dropping out-of-order instance list");
            return ListOutcome::Stale;
        }
        self.applied_seq = seq;

        match result {
            Ok(page) => {
                debug!(seq, rows = page.list.len(), total = page.total, "Instance list applied");
                self.rows = page.list;
                self.total = page.total;
                self.error = None;
                ListOutcome::Applied
            }
            Err(e) => {
                warn!(seq, "Instance list failed: {}", e);
                self.error = Some(e.user_message());
                ListOutcome::Failed
            }
        }
    }
}

fn validate(query: &InstanceQuery) -> Result<(), ConsoleError> {
    if query.page == 0 {
        return Err(ConsoleError::InvalidQuery("page must be at least 1".to_string()));
    }
    if query.page_size == 0 {
        return Err(ConsoleError::InvalidQuery("pageSize must be positive".to_string()));
    }
    Ok(())
}
