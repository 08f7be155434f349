//! # podrunner-core
//!
//! Runs one container workload on an external orchestrator and reports its result.
//!
//! A request flows through three pieces:
//!
//! - [`UnitClient`](client::UnitClient): the orchestrator-facing contract to create, inspect,
//!   read the output of, and delete a single named execution unit
//! - [`await_termination`](poller::await_termination): bounded, immediate-first polling until
//!   the unit's container has exited
//! - [`Gateway`](gateway::Gateway): sequences create, wait, fetch and a detached delete, and
//!   maps the outcome to an [`ExecutionResult`] or a classified [`Error`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use podrunner_core::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(client: Arc<dyn UnitClient>) -> podrunner_core::Result<ExecutionResult> {
//!     let namer = UnitNamer::try_new("podrunner").expect("valid prefix");
//!     let gateway = Gateway::new(client, namer, PollSettings::default());
//!
//!     let request = ExecutionRequest::new("alpine", "echo", vec!["hi".to_string()]);
//!     gateway.execute(request, &CancellationToken::new()).await
//! }
//! ```

pub mod client;
pub mod error;
pub mod gateway;
pub mod model;
pub mod naming;
pub mod poller;

pub use error::{Error, Operation, Result};
pub use model::{ExecutionRequest, ExecutionResult, UnitStatus};

/// Prelude to import all relevant types and functions
pub mod prelude {
    pub use super::client::UnitClient;
    pub use super::error::{Error, Operation};
    pub use super::gateway::Gateway;
    pub use super::model::{ExecutionRequest, ExecutionResult, UnitStatus};
    pub use super::naming::UnitNamer;
    pub use super::poller::{await_termination, PollSettings};
}
