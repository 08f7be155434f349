//! Contract for the orchestrator that owns execution units

use async_trait::async_trait;

use crate::{ExecutionRequest, Result, UnitStatus};

/// Client for a single named execution unit on an external orchestrator.
///
/// Every call is a network round trip to a stateful system; implementations must not
/// cache or batch them. Errors are reported through [`crate::Error`]:
///
/// - a unit that no longer exists is [`Error::NotFound`](crate::Error::NotFound)
/// - any other control-plane failure is [`Error::Orchestrator`](crate::Error::Orchestrator)
#[async_trait]
pub trait UnitClient: Send + Sync {
    /// Declare a new unit running `request` in a single container that is never restarted.
    async fn create(&self, name: &str, request: &ExecutionRequest) -> Result<()>;

    /// Current status of the unit's container.
    async fn inspect(&self, name: &str) -> Result<UnitStatus>;

    /// Complete captured output of the unit's container.
    async fn fetch_output(&self, name: &str) -> Result<String>;

    /// Request removal of the unit. Removing a unit that is already gone is an error.
    async fn delete(&self, name: &str) -> Result<()>;
}
