use std::{fmt, future::Future, sync::Arc};

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::{
    client::UnitClient,
    naming::UnitNamer,
    poller::{await_termination, PollSettings},
    Error, ExecutionRequest, ExecutionResult, Operation, Result,
};

/// Stages a single execution moves through, reported in structured logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Awaiting,
    OutputFetched,
    Responding,
    Deleting,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::Awaiting => "awaiting",
            Stage::OutputFetched => "output_fetched",
            Stage::Responding => "responding",
            Stage::Deleting => "deleting",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs one workload per call: create the unit, wait for it to terminate, read its output,
/// then remove it in the background.
pub struct Gateway<C: ?Sized> {
    client: Arc<C>,
    namer: UnitNamer,
    poll: PollSettings,
    deletions: TaskTracker,
}

impl<C: ?Sized> Clone for Gateway<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            namer: self.namer.clone(),
            poll: self.poll,
            deletions: self.deletions.clone(),
        }
    }
}

impl<C> Gateway<C>
where
    C: UnitClient + ?Sized + 'static,
{
    pub fn new(client: Arc<C>, namer: UnitNamer, poll: PollSettings) -> Self {
        Self {
            client,
            namer,
            poll,
            deletions: TaskTracker::new(),
        }
    }

    /// Tracker of the detached deletion tasks, to drain them before shutdown
    pub fn deletions(&self) -> &TaskTracker {
        &self.deletions
    }

    /// Execute `request` in a freshly named unit and return its exit code and output.
    ///
    /// Once the unit has been created it is always deleted afterwards, whether the
    /// execution succeeds, fails, is cancelled through `cancel`, or the returned future is
    /// dropped. Deletion runs as a detached task: it never delays the result and its
    /// failures are only logged.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        request.validate()?;
        let name = self.namer.next_name();
        self.execute_unit(name, request, cancel).await
    }

    #[instrument(name = "execution", skip_all, fields(unit = %name, image = %request.image))]
    async fn execute_unit(
        &self,
        name: String,
        request: ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        // create itself is not cancellable
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { name });
        }

        info!(command = %request.command, args = ?request.args, "Creating execution unit");
        let _cleanup = match self.create(name.clone(), request).await {
            Ok(cleanup) => cleanup,
            Err(e) => {
                error!(stage = %Stage::Failed, error = %e, "Failed to create execution unit");
                return Err(e);
            }
        };
        debug!(stage = %Stage::Created, "Execution unit created");

        let result = self.collect(&name, cancel).await;
        match &result {
            Ok(result) => {
                info!(stage = %Stage::Responding, exit_code = result.exit_code, "Execution finished")
            }
            Err(e @ Error::NotFound { .. }) => {
                error!(stage = %Stage::Failed, error = %e, "Execution unit disappeared while in use")
            }
            Err(e) => error!(stage = %Stage::Failed, kind = e.kind(), error = %e, "Execution failed"),
        }

        result
    }

    /// Create the unit in a tracked task that arms its deletion guard as soon as the
    /// create call succeeds.
    ///
    /// The task outlives this future, so a unit whose create was in flight when the
    /// execution got dropped is still deleted once the create completes.
    async fn create(
        &self,
        name: String,
        request: ExecutionRequest,
    ) -> Result<DetachedDeletion<C>> {
        let client = Arc::clone(&self.client);
        let tasks = self.deletions.clone();
        let unit = name.clone();

        let creation = self.deletions.spawn(
            async move {
                client.create(&unit, &request).await?;
                Ok::<_, Error>(DetachedDeletion {
                    client,
                    name: unit,
                    tasks,
                })
            }
            .in_current_span(),
        );

        match creation.await {
            Ok(created) => created,
            Err(e) => Err(Error::orchestrator(Operation::Create, name, e)),
        }
    }

    async fn collect(&self, name: &str, cancel: &CancellationToken) -> Result<ExecutionResult> {
        debug!(stage = %Stage::Awaiting, "Waiting for execution unit to terminate");
        let exit_code = await_termination(self.client.as_ref(), name, &self.poll, cancel).await?;

        let output = cancellable(name, cancel, self.client.fetch_output(name)).await?;
        debug!(stage = %Stage::OutputFetched, exit_code, bytes = output.len(), "Fetched execution output");

        Ok(ExecutionResult { exit_code, output })
    }
}

async fn cancellable<T>(
    name: &str,
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled { name: name.to_string() }),
        result = call => result,
    }
}

/// Schedules deletion of a created unit when dropped.
///
/// Dropping happens when the execution returns, when its future is abandoned, or when a
/// create task finishes after nobody is waiting for it anymore.
struct DetachedDeletion<C: UnitClient + ?Sized + 'static> {
    client: Arc<C>,
    name: String,
    tasks: TaskTracker,
}

impl<C: UnitClient + ?Sized + 'static> Drop for DetachedDeletion<C> {
    fn drop(&mut self) {
        let name = std::mem::take(&mut self.name);
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(unit = %name, error = %e, "No runtime available to delete execution unit");
                return;
            }
        };

        let client = Arc::clone(&self.client);
        let span = tracing::info_span!("deletion", unit = %name);
        self.tasks.spawn_on(
            async move {
                debug!(stage = %Stage::Deleting, "Deleting execution unit");
                match client.delete(&name).await {
                    Ok(()) => info!("Execution unit deleted"),
                    Err(e @ Error::NotFound { .. }) => {
                        warn!(error = %e, "Execution unit was already gone")
                    }
                    Err(e) => error!(error = %e, "Failed to delete execution unit"),
                }
            }
            .instrument(span),
            &handle,
        );
    }
}
