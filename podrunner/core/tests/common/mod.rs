#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use podrunner_core::{
    client::UnitClient, gateway::Gateway, naming::UnitNamer, poller::PollSettings, Error,
    ExecutionRequest, Operation, Result, UnitStatus,
};
use tokio::sync::Notify;

/// Recorded orchestrator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Inspect(String),
    FetchOutput(String),
    Delete(String),
}

impl Call {
    pub fn name(&self) -> &str {
        match self {
            Call::Create(name)
            | Call::Inspect(name)
            | Call::FetchOutput(name)
            | Call::Delete(name) => name,
        }
    }
}

/// Scripted reply for one orchestrator call
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    NotFound,
    Fail(&'static str),
}

impl<T> Reply<T> {
    fn into_result(self, operation: Operation, name: &str) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::NotFound => Err(Error::not_found(operation, name)),
            Reply::Fail(message) => Err(Error::orchestrator(operation, name, message)),
        }
    }
}

/// In-memory orchestrator that replays scripted replies and records every call.
///
/// Inspection replies are consumed in order; the last one repeats forever.
pub struct FakeClient {
    calls: Mutex<Vec<Call>>,
    create: Reply<()>,
    create_delay: Duration,
    statuses: Mutex<VecDeque<Reply<UnitStatus>>>,
    output: Reply<String>,
    output_delay: Duration,
    delete: Reply<()>,
    deleted: Notify,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            create: Reply::Ok(()),
            create_delay: Duration::ZERO,
            statuses: Mutex::new(VecDeque::from([Reply::Ok(UnitStatus::Terminated {
                exit_code: 0,
            })])),
            output: Reply::Ok(String::new()),
            output_delay: Duration::ZERO,
            delete: Reply::Ok(()),
            deleted: Notify::new(),
        }
    }

    pub fn with_create(mut self, reply: Reply<()>) -> Self {
        self.create = reply;
        self
    }

    /// Make create calls take `delay` after being recorded
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn with_statuses(self, replies: impl IntoIterator<Item = Reply<UnitStatus>>) -> Self {
        *self.statuses.lock().unwrap() = replies.into_iter().collect();
        self
    }

    pub fn with_output(mut self, reply: Reply<String>) -> Self {
        self.output = reply;
        self
    }

    /// Make output fetches take `delay` after being recorded
    pub fn with_output_delay(mut self, delay: Duration) -> Self {
        self.output_delay = delay;
        self
    }

    pub fn with_delete(mut self, reply: Reply<()>) -> Self {
        self.delete = reply;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Delete(_)))
            .collect()
    }

    /// Wait until a delete call has been made, returning false on timeout
    pub async fn wait_for_delete(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.deleted.notified())
            .await
            .is_ok()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UnitClient for FakeClient {
    async fn create(&self, name: &str, _request: &ExecutionRequest) -> Result<()> {
        self.record(Call::Create(name.to_string()));
        tokio::time::sleep(self.create_delay).await;
        self.create.clone().into_result(Operation::Create, name)
    }

    async fn inspect(&self, name: &str) -> Result<UnitStatus> {
        self.record(Call::Inspect(name.to_string()));
        let reply = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                statuses.front().cloned().expect("no status scripted")
            }
        };
        reply.into_result(Operation::Inspect, name)
    }

    async fn fetch_output(&self, name: &str) -> Result<String> {
        self.record(Call::FetchOutput(name.to_string()));
        tokio::time::sleep(self.output_delay).await;
        self.output.clone().into_result(Operation::FetchOutput, name)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.record(Call::Delete(name.to_string()));
        self.deleted.notify_one();
        self.delete.clone().into_result(Operation::Delete, name)
    }
}

pub fn gateway(client: Arc<FakeClient>) -> Gateway<FakeClient> {
    Gateway::new(
        client,
        UnitNamer::try_new("test").unwrap(),
        PollSettings::default(),
    )
}

pub fn echo_hi() -> ExecutionRequest {
    ExecutionRequest::new("alpine", "echo", vec!["hi".to_string()])
}
