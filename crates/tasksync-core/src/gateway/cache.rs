//! Per-team workflow state cache

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::RemoteGateway;
use crate::error::{Error, Result};
use crate::models::WorkflowState;

/// Workflow states by team id, loaded on first use.
///
/// Owned by whoever composes a gateway; nothing here is global.
#[derive(Debug, Default)]
pub struct WorkflowStateCache {
    teams: Mutex<HashMap<String, Vec<WorkflowState>>>,
}

impl WorkflowStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn teams(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<WorkflowState>>>> {
        self.teams
            .lock()
            .map_err(|_| Error::Storage("workflow state cache lock poisoned".to_string()))
    }

    /// Cached states for `team_id`, fetching them on a miss.
    pub async fn get_or_load<G: RemoteGateway>(
        &self,
        gateway: &G,
        team_id: &str,
    ) -> Result<Vec<WorkflowState>> {
        if let Some(states) = self.teams()?.get(team_id) {
            return Ok(states.clone());
        }

        let states = gateway.list_workflow_states(team_id).await?;
        tracing::debug!("Cached {} workflow states for team {}", states.len(), team_id);
        self.teams()?.insert(team_id.to_string(), states.clone());
        Ok(states)
    }

    /// Find a team state by name, case-insensitively.
    pub async fn find_by_name<G: RemoteGateway>(
        &self,
        gateway: &G,
        team_id: &str,
        name: &str,
    ) -> Result<WorkflowState> {
        let wanted = name.trim();
        self.get_or_load(gateway, team_id)
            .await?
            .into_iter()
            .find(|state| state.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("team has no workflow state named '{wanted}'")))
    }

    pub fn invalidate(&self, team_id: &str) {
        if let Ok(mut teams) = self.teams() {
            teams.remove(team_id);
        }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut teams) = self.teams() {
            teams.clear();
        }
    }

    pub fn is_cached(&self, team_id: &str) -> bool {
        self.teams()
            .map(|teams| teams.contains_key(team_id))
            .unwrap_or(false)
    }
}
