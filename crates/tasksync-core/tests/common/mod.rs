#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tasksync_core::config::SyncSettings;
use tasksync_core::gateway::RemoteGateway;
use tasksync_core::models::{FieldChanges, StateKind, Task, TaskFields, TaskId, WorkflowState};
use tasksync_core::{Error, Result};
use tokio::sync::Notify;

/// Failure to inject into the next gateway call
#[derive(Debug, Clone)]
pub enum Failure {
    Network,
    Api(&'static str),
    /// Refused before reaching the API, e.g. a malformed request
    Invalid(&'static str),
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Self::Network => Error::Network("connection refused".to_string()),
            Self::Api(message) => Error::Api(message.to_string()),
            Self::Invalid(message) => Error::InvalidInput(message.to_string()),
        }
    }
}

/// In-memory stand-in for the remote API.
///
/// Lookups accept the canonical id or the team key, like Linear does. Every
/// accepted write moves `updated_at` forward by five minutes.
#[derive(Default)]
pub struct ScriptedGateway {
    remote: Mutex<Option<Task>>,
    states: Vec<WorkflowState>,
    fetch_failures: Mutex<VecDeque<Failure>>,
    update_failures: Mutex<VecDeque<Failure>>,
    write_gate: Mutex<Option<Arc<Notify>>>,
    updates: Mutex<Vec<FieldChanges>>,
    fetch_calls: AtomicUsize,
    update_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(task: Task) -> Arc<Self> {
        Arc::new(Self {
            remote: Mutex::new(Some(task)),
            states: team_states(),
            ..Self::default()
        })
    }

    pub fn remote(&self) -> Task {
        self.remote.lock().unwrap().clone().unwrap()
    }

    /// Simulate another client editing the task
    pub fn set_remote(&self, task: Task) {
        *self.remote.lock().unwrap() = Some(task);
    }

    pub fn fail_next_fetch(&self, failure: Failure) {
        self.fetch_failures.lock().unwrap().push_back(failure);
    }

    pub fn fail_next_update(&self, failure: Failure) {
        self.update_failures.lock().unwrap().push_back(failure);
    }

    /// Block writes until the returned handle is notified
    pub fn hold_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn updates(&self) -> Vec<FieldChanges> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self) {
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn write(&self, mutate: impl FnOnce(&mut Task)) -> Result<Task> {
        if let Some(failure) = self.update_failures.lock().unwrap().pop_front() {
            return Err(failure.into_error());
        }
        let mut remote = self.remote.lock().unwrap();
        let task = remote
            .as_mut()
            .ok_or_else(|| Error::Api("Entity not found".to_string()))?;
        mutate(task);
        task.updated_at += chrono::Duration::minutes(5);
        Ok(task.clone())
    }
}

impl RemoteGateway for ScriptedGateway {
    async fn fetch_task(&self, id: &TaskId) -> Result<Task> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.fetch_failures.lock().unwrap().pop_front() {
            return Err(failure.into_error());
        }
        self.remote
            .lock()
            .unwrap()
            .clone()
            .filter(|task| task.id == *id || task.identifier == id.as_str())
            .ok_or_else(|| Error::Api("Entity not found".to_string()))
    }

    async fn update_task(&self, _id: &TaskId, changes: &FieldChanges) -> Result<Task> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        self.updates.lock().unwrap().push(changes.clone());
        self.write(|task| {
            let mut fields = TaskFields::from(&*task);
            changes.apply_to(&mut fields);
            task.title = fields.title;
            task.description = fields.description;
            task.due_date = fields.due_date;
        })
    }

    async fn list_workflow_states(&self, _team_id: &str) -> Result<Vec<WorkflowState>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.states.clone())
    }

    async fn set_task_state(&self, _id: &TaskId, state_id: &str) -> Result<Task> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let state = self
            .states
            .iter()
            .find(|state| state.id == state_id)
            .cloned()
            .ok_or_else(|| Error::Api("Invalid state".to_string()))?;
        self.write(|task| task.state = state)
    }
}

pub fn team_states() -> Vec<WorkflowState> {
    vec![
        WorkflowState {
            id: "state-backlog".to_string(),
            name: "Backlog".to_string(),
            kind: StateKind::Backlog,
        },
        WorkflowState {
            id: "state-todo".to_string(),
            name: "Todo".to_string(),
            kind: StateKind::Unstarted,
        },
        WorkflowState {
            id: "state-doing".to_string(),
            name: "In Progress".to_string(),
            kind: StateKind::Started,
        },
        WorkflowState {
            id: "state-done".to_string(),
            name: "Done".to_string(),
            kind: StateKind::Completed,
        },
    ]
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

pub fn task_id() -> TaskId {
    TaskId::parse("ENG-12").unwrap()
}

/// The task from the worked example: "Write report", due 2024-01-01
pub fn sample_task() -> Task {
    Task {
        id: task_id(),
        identifier: "ENG-12".to_string(),
        team_id: "team-eng".to_string(),
        title: "Write report".to_string(),
        description: String::new(),
        due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        state: team_states()[1].clone(),
        updated_at: at(0, 0),
    }
}

/// The same task as the API returns it: UUID id, key in `identifier`
pub fn canonical_task() -> Task {
    Task {
        id: TaskId::parse("9c1f7e52-3a4b-4f0e-8d2a-6b5c4d3e2f10").unwrap(),
        ..sample_task()
    }
}

pub fn settings() -> SyncSettings {
    SyncSettings::default()
        .with_draft_debounce(Duration::from_millis(500))
        .with_request_timeout(Duration::from_secs(5))
}
