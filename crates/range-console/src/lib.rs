//! # Cyber Range Admin Console
//!
//! Coordination layer behind the instance screen of the admin console: a
//! paginated, filterable instance registry and per-row telemetry panels that
//! fetch container stats and logs on demand.
//!
//! ```rust,no_run
//! use range_console::Console;
//! use range_sdk::{AdminClient, Router, Session, SessionGuard};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(Session::in_memory());
//! let guard = Arc::new(SessionGuard::new(session, Arc::new(Router::new("/admin/instances"))));
//! let client = Arc::new(AdminClient::new("http://localhost:8080/api", guard.clone())?);
//!
//! let mut console = Console::mount(client, &guard)?;
//! console.settle().await;
//! if let Some(first) = console.registry().rows().first().map(|r| r.id.clone()) {
//!     console.expand(&first)?;
//!     console.settle().await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Nothing here polls. Every fetch follows an explicit call, and requests are
//! never retried.

use thiserror::Error;

pub mod api;
pub mod console;
pub mod dispatch;
pub mod panel;
pub mod registry;
pub mod rows;

pub use api::InstanceApi;
pub use console::{Console, Update};
pub use dispatch::{Completion, Dispatcher, PanelTicket, RequestHandle};
pub use panel::{LogsView, StatsView, TelemetryOutcome, TelemetryPanel, NOT_RUNNING, NO_CONTAINER, NO_LOGS};
pub use registry::{InstanceRegistry, ListOutcome};
pub use rows::RowExpansion;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Not authenticated, redirected to login")]
    NotAuthenticated,
    #[error("Instance {0} is not on the current page")]
    UnknownRow(String),
    #[error("Instance {0} is not expanded")]
    NotExpanded(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Invalid log tail: {0}")]
    InvalidTail(u32),
}
