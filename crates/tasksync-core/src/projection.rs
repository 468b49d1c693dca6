//! Local task projection with two-phase optimistic updates.
//!
//! A mutation is applied to the projection immediately and tagged pending.
//! The remote answer then either confirms it (the server's task replaces the
//! entry) or reverts it (the prior entry comes back).

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::gateway::{RemoteGateway, WorkflowStateCache};
use crate::models::{Task, TaskId};

/// Handle for one tentative mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u64);

#[derive(Debug)]
struct PendingChange {
    task_id: TaskId,
    prior: Task,
}

/// Tasks as currently shown, including unconfirmed changes.
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: BTreeMap<TaskId, Task>,
    pending: HashMap<PendingId, PendingChange>,
    next_pending: u64,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a confirmed task
    pub fn upsert(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Look a task up by canonical id or by its team key (`ENG-123`).
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id).or_else(|| {
            self.tasks
                .values()
                .find(|task| task.identifier.eq_ignore_ascii_case(id.as_str()))
        })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.values().any(|change| change.task_id == *id)
    }

    /// Apply `mutation` now and remember how to undo it.
    ///
    /// Only one tentative change per task is allowed at a time.
    pub fn apply_tentative(
        &mut self,
        id: &TaskId,
        mutation: impl FnOnce(&mut Task),
    ) -> Result<PendingId> {
        if self.is_pending(id) {
            return Err(Error::SaveInFlight);
        }
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("task {id} is not on the board")))?;

        let prior = task.clone();
        mutation(task);

        let pending_id = PendingId(self.next_pending);
        self.next_pending += 1;
        self.pending.insert(
            pending_id,
            PendingChange {
                task_id: id.clone(),
                prior,
            },
        );
        Ok(pending_id)
    }

    /// The remote accepted the change; adopt its version of the task.
    pub fn confirm(&mut self, pending: PendingId, server_task: Task) {
        if self.pending.remove(&pending).is_some() {
            self.upsert(server_task);
        }
    }

    /// The remote rejected the change; restore what was there before.
    pub fn revert(&mut self, pending: PendingId) {
        if let Some(change) = self.pending.remove(&pending) {
            tracing::debug!("Reverting tentative change on {}", change.task_id);
            self.tasks.insert(change.task_id, change.prior);
        }
    }
}

/// Move a task to the team state called `state_name`, optimistically.
pub async fn move_task<G: RemoteGateway>(
    board: &mut TaskBoard,
    gateway: &G,
    states: &WorkflowStateCache,
    id: &TaskId,
    state_name: &str,
) -> Result<Task> {
    let (id, team_id) = board
        .find(id)
        .map(|task| (task.id.clone(), task.team_id.clone()))
        .ok_or_else(|| Error::InvalidInput(format!("task {id} is not on the board")))?;
    let target = states.find_by_name(gateway, &team_id, state_name).await?;

    let target_state = target.clone();
    let pending = board.apply_tentative(&id, move |task| task.state = target_state)?;

    match gateway.set_task_state(&id, &target.id).await {
        Ok(task) => {
            tracing::info!("Moved {} to {}", id, task.state.name);
            board.confirm(pending, task.clone());
            Ok(task)
        }
        Err(error) => {
            tracing::warn!("Failed to move {}: {}", id, error);
            board.revert(pending);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StateKind, WorkflowState};
    use chrono::{TimeZone, Utc};

    fn state(id: &str, name: &str, kind: StateKind) -> WorkflowState {
        WorkflowState {
            id: id.to_string(),
            name: name.to_string(),
            kind,
        }
    }

    fn task(key: &str) -> Task {
        Task {
            id: TaskId::parse(key).unwrap(),
            identifier: key.to_string(),
            team_id: "team-1".to_string(),
            title: "Write report".to_string(),
            description: String::new(),
            due_date: None,
            state: state("todo", "Todo", StateKind::Unstarted),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_tentative_then_confirm() {
        let mut board = TaskBoard::new();
        let id = TaskId::parse("ENG-1").unwrap();
        board.upsert(task("ENG-1"));

        let pending = board
            .apply_tentative(&id, |task| task.state = state("done", "Done", StateKind::Completed))
            .unwrap();
        assert!(board.is_pending(&id));
        assert_eq!(board.get(&id).unwrap().state.name, "Done");

        let mut server = task("ENG-1");
        server.state = state("done", "Done", StateKind::Completed);
        server.updated_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        board.confirm(pending, server.clone());

        assert!(!board.is_pending(&id));
        assert_eq!(board.get(&id), Some(&server));
    }

    #[test]
    fn test_tentative_then_revert() {
        let mut board = TaskBoard::new();
        let id = TaskId::parse("ENG-1").unwrap();
        board.upsert(task("ENG-1"));

        let pending = board
            .apply_tentative(&id, |task| task.title = "Changed".to_string())
            .unwrap();
        board.revert(pending);

        assert_eq!(board.get(&id), Some(&task("ENG-1")));
        assert!(!board.is_pending(&id));
    }

    #[test]
    fn test_one_pending_change_per_task() {
        let mut board = TaskBoard::new();
        let id = TaskId::parse("ENG-1").unwrap();
        board.upsert(task("ENG-1"));

        board.apply_tentative(&id, |_| {}).unwrap();
        assert!(matches!(
            board.apply_tentative(&id, |_| {}),
            Err(Error::SaveInFlight)
        ));
    }

    #[test]
    fn test_find_by_team_key() {
        let mut board = TaskBoard::new();
        let mut stored = task("ENG-1");
        stored.id = TaskId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        board.upsert(stored.clone());

        let key = TaskId::parse("eng-1").unwrap();
        assert_eq!(board.get(&key), None);
        assert_eq!(board.find(&key), Some(&stored));
        assert_eq!(board.find(&stored.id), Some(&stored));
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let mut board = TaskBoard::new();
        let id = TaskId::parse("ENG-9").unwrap();
        assert!(board.apply_tentative(&id, |_| {}).is_err());
    }
}
