//! Edit session for a single task.
//!
//! Ties together the edit buffer, the baseline, draft persistence, the save
//! status and conflict handling. The handle is cheap to clone; all clones
//! share one state. The state lock is never held across a remote call, so
//! the only suspension points are the conflict-check read and the write.
//!
//! Every remote result is tagged with the epoch it was started in. `load`
//! and `close` bump the epoch, which makes late results stale: they are
//! dropped instead of being applied.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;

use crate::baseline::BaselineTracker;
use crate::config::SyncSettings;
use crate::conflict::{detect, Conflict, ConflictCheck, Resolution};
use crate::draft::DraftStore;
use crate::error::{Error, Result};
use crate::gateway::RemoteGateway;
use crate::models::{Baseline, FieldChanges, Task, TaskFields, TaskId};
use crate::status::{SaveStateMachine, SaveStatus};
use crate::store::KeyValueStore;

/// Result of loading a task into the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub task: Task,
    /// The edit buffer came from a local draft instead of the server
    pub restored_draft: bool,
    pub status: SaveStatus,
}

/// Result of a save or a conflict resolution.
///
/// Remote failures are reported here rather than as `Err`, so callers only
/// have to render the status and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the baseline; no remote call was made
    NoChanges,
    /// The remote accepted the write
    Saved(Task),
    /// The remote moved on; the user must pick a [`Resolution`]
    Conflict(Conflict),
    /// Local changes were dropped in favour of the remote version
    Adopted(Task),
    /// The conflict was dismissed
    Cancelled,
    /// Rejected locally before any remote call
    Rejected(String),
    /// The write failed; buffer, baseline and draft are untouched
    Failed(String),
}

#[derive(Debug, Default)]
struct SessionState {
    task_id: Option<TaskId>,
    task: Option<Task>,
    fields: TaskFields,
    baseline: BaselineTracker,
    machine: SaveStateMachine,
    conflict: Option<Conflict>,
    edit_generation: u64,
    epoch: u64,
    closed: bool,
}

impl SessionState {
    fn loaded_id(&self) -> Result<TaskId> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        self.task_id.clone().ok_or(Error::NotLoaded)
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.closed && self.epoch == epoch
    }

    fn is_dirty(&self) -> bool {
        self.baseline.is_dirty(&self.fields)
    }

    /// A remote result arrived for an older epoch. An open session must not
    /// stay in `Syncing` for a write nobody will settle.
    fn drop_stale_result(&mut self) {
        if !self.closed {
            let dirty = self.is_dirty();
            self.machine.on_save_abandoned(dirty);
        }
    }
}

/// What a save needs once the lock is released
struct SaveTicket {
    id: TaskId,
    changes: FieldChanges,
    baseline: Baseline,
    epoch: u64,
}

/// Shared handle to the editing state of one task.
pub struct EditSession<G, S> {
    state: Arc<Mutex<SessionState>>,
    gateway: Arc<G>,
    drafts: DraftStore<S>,
    debounce: Duration,
    request_timeout: Duration,
}

impl<G, S> Clone for EditSession<G, S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            gateway: Arc::clone(&self.gateway),
            drafts: self.drafts.clone(),
            debounce: self.debounce,
            request_timeout: self.request_timeout,
        }
    }
}

impl<G, S> EditSession<G, S>
where
    G: RemoteGateway + 'static,
    S: KeyValueStore + 'static,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>, settings: &SyncSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            gateway,
            drafts: DraftStore::new(store, settings.draft_key_prefix.clone()),
            debounce: settings.draft_debounce(),
            request_timeout: settings.request_timeout(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // The state stays consistent between statements, so a panic elsewhere
        // does not make it unusable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn guarded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))?
    }

    /// Load a task: restore a local draft if one exists, then take the
    /// baseline from the server.
    pub async fn load(&self, id: &TaskId) -> Result<LoadOutcome> {
        let draft = self.drafts.load_draft(id);

        let epoch = {
            let mut state = self.state();
            if state.closed {
                return Err(Error::SessionClosed);
            }
            if state.machine.is_syncing() {
                return Err(Error::SaveInFlight);
            }
            state.epoch += 1;
            state.edit_generation += 1;
            state.epoch
        };

        let remote = self.guarded(self.gateway.fetch_task(id)).await?;

        let mut state = self.state();
        if !state.is_current(epoch) {
            return Err(Error::SessionClosed);
        }
        if state.machine.is_syncing() {
            // A save started against the previous task while this fetch ran.
            return Err(Error::SaveInFlight);
        }

        state.baseline.set_baseline(&remote);
        let remote_fields = TaskFields::from(&remote);
        let restored_draft = match draft {
            Some(draft) if draft.fields != remote_fields => {
                tracing::info!("Restored unsynced draft for {} from {}", id, draft.saved_at);
                state.fields = draft.fields;
                true
            }
            Some(_) => {
                self.drafts.clear_draft(id);
                state.fields = remote_fields;
                false
            }
            None => {
                state.fields = remote_fields;
                false
            }
        };

        state.task_id = Some(id.clone());
        state.task = Some(remote.clone());
        state.conflict = None;
        state.machine.on_loaded(restored_draft);

        Ok(LoadOutcome {
            task: remote,
            restored_draft,
            status: state.machine.status(),
        })
    }

    /// Change the edit buffer and schedule a debounced draft write.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn edit(&self, change: impl FnOnce(&mut TaskFields)) -> Result<()> {
        let generation = {
            let mut state = self.state();
            state.loaded_id()?;
            change(&mut state.fields);
            let dirty = state.is_dirty();
            state.machine.on_edit(dirty);
            state.edit_generation += 1;
            state.edit_generation
        };

        let session = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(session.debounce).await;
            session.persist_draft_if_current(generation);
        });
        Ok(())
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        self.edit(|fields| fields.title = title)
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.edit(|fields| fields.description = description)
    }

    pub fn set_due_date(&self, due_date: Option<NaiveDate>) -> Result<()> {
        self.edit(|fields| fields.due_date = due_date)
    }

    fn persist_draft_if_current(&self, generation: u64) {
        let mut state = self.state();
        if state.closed || state.edit_generation != generation {
            return;
        }
        let Some(id) = state.task_id.clone() else {
            return;
        };

        if state.is_dirty() {
            if self.drafts.save_draft(&id, &state.fields) {
                state.machine.on_draft_persisted();
            }
        } else {
            self.drafts.clear_draft(&id);
        }
    }

    /// Write the draft right now, superseding any pending debounced write.
    ///
    /// Returns whether a draft was written.
    pub fn flush_draft(&self) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }
        let Some(id) = state.task_id.clone() else {
            return false;
        };
        state.edit_generation += 1;
        if !state.is_dirty() {
            return false;
        }

        let written = self.drafts.save_draft(&id, &state.fields);
        if written {
            state.machine.on_draft_persisted();
        }
        written
    }

    /// Save the edit buffer, checking the remote for concurrent edits first.
    pub async fn save(&self) -> Result<SaveOutcome> {
        self.save_inner(false).await
    }

    /// Save without the conflict check; used by "keep mine".
    pub async fn save_forced(&self) -> Result<SaveOutcome> {
        self.save_inner(true).await
    }

    async fn save_inner(&self, force: bool) -> Result<SaveOutcome> {
        let ticket = match self.begin_save()? {
            Ok(ticket) => ticket,
            Err(outcome) => return Ok(outcome),
        };

        if !force {
            match self.guarded(self.gateway.fetch_task(&ticket.id)).await {
                Ok(remote) => {
                    if detect(&ticket.baseline, &remote) == ConflictCheck::Drifted {
                        return self.finish_with_conflict(&ticket, remote);
                    }
                }
                Err(error) if error.is_transport() => {
                    tracing::warn!(
                        "Conflict check for {} failed, writing anyway: {}",
                        ticket.id,
                        error
                    );
                }
                Err(error) => return self.finish_write(&ticket, Err(error)),
            }
        }

        let result = self
            .guarded(self.gateway.update_task(&ticket.id, &ticket.changes))
            .await;
        self.finish_write(&ticket, result)
    }

    /// Validate and move to `Syncing`, or settle the save without a remote call.
    fn begin_save(&self) -> Result<std::result::Result<SaveTicket, SaveOutcome>> {
        let mut state = self.state();
        let id = state.loaded_id()?;
        if state.machine.is_syncing() {
            return Err(Error::SaveInFlight);
        }

        if let Err(Error::Validation(message)) = state.fields.validate() {
            tracing::debug!("Rejected save of {}: {}", id, message);
            state.machine.on_rejected(message.clone());
            return Ok(Err(SaveOutcome::Rejected(message)));
        }

        let changes = state.baseline.changes(&state.fields);
        if changes.is_empty() {
            self.drafts.clear_draft(&id);
            state.conflict = None;
            state.machine.on_save_succeeded(false);
            return Ok(Err(SaveOutcome::NoChanges));
        }

        let baseline = state.baseline.baseline().cloned().ok_or(Error::NotLoaded)?;

        // The draft must hold exactly what is being sent, whatever happens next.
        state.edit_generation += 1;
        self.drafts.save_draft(&id, &state.fields);

        state.machine.begin_save()?;
        state.conflict = None;

        Ok(Ok(SaveTicket {
            id,
            changes,
            baseline,
            epoch: state.epoch,
        }))
    }

    fn finish_with_conflict(&self, ticket: &SaveTicket, remote: Task) -> Result<SaveOutcome> {
        let mut state = self.state();
        if !state.is_current(ticket.epoch) {
            state.drop_stale_result();
            return Err(Error::SessionClosed);
        }

        let conflict = Conflict {
            remote,
            pending: ticket.changes.clone(),
        };
        tracing::info!(
            "Conflict on {}: remote changed since {}",
            ticket.id,
            ticket.baseline.updated_at
        );
        state.conflict = Some(conflict.clone());
        state.machine.on_conflict();
        Ok(SaveOutcome::Conflict(conflict))
    }

    fn finish_write(&self, ticket: &SaveTicket, result: Result<Task>) -> Result<SaveOutcome> {
        let mut state = self.state();
        if !state.is_current(ticket.epoch) {
            tracing::debug!("Dropping stale save result for {}", ticket.id);
            state.drop_stale_result();
            return Err(Error::SessionClosed);
        }

        match result {
            Ok(task) => {
                state.baseline.set_baseline(&task);
                state.task = Some(task.clone());
                let still_dirty = state.is_dirty();
                if !still_dirty {
                    self.drafts.clear_draft(&ticket.id);
                }
                state.machine.on_save_succeeded(still_dirty);
                tracing::info!(
                    "Saved {} ({})",
                    ticket.id,
                    ticket.changes.changed_field_names().join(", ")
                );
                Ok(SaveOutcome::Saved(task))
            }
            Err(error) => {
                tracing::warn!("Save of {} failed: {}", ticket.id, error);
                let message = error.to_string();
                state.machine.on_save_failed(message.clone());
                Ok(SaveOutcome::Failed(message))
            }
        }
    }

    /// Settle the pending conflict with the user's choice.
    ///
    /// The conflict stays pending until a choice goes through: "keep mine"
    /// only consumes it once the forced write starts, so a rejected save
    /// still leaves the other choices open.
    pub async fn resolve(&self, resolution: Resolution) -> Result<SaveOutcome> {
        let (id, conflict) = {
            let state = self.state();
            let id = state.loaded_id()?;
            let conflict = state.conflict.clone().ok_or(Error::NoConflict)?;
            (id, conflict)
        };

        tracing::info!("Resolving conflict on {} with {}", id, resolution);
        match resolution {
            Resolution::KeepMine => self.save_forced().await,
            Resolution::KeepTheirs => Ok(self.adopt_remote(&id, conflict.remote)),
            Resolution::Cancel => {
                let mut state = self.state();
                state.conflict = None;
                let dirty = state.is_dirty();
                state.machine.on_resolved(dirty);
                Ok(SaveOutcome::Cancelled)
            }
        }
    }

    /// Drafts live under the id the session was loaded with, which may be
    /// the team key while the remote reports the UUID.
    fn adopt_remote(&self, id: &TaskId, remote: Task) -> SaveOutcome {
        let mut state = self.state();
        state.fields = TaskFields::from(&remote);
        state.baseline.set_baseline(&remote);
        state.task = Some(remote.clone());
        state.conflict = None;
        state.edit_generation += 1;
        self.drafts.clear_draft(id);
        state.machine.on_resolved(false);
        SaveOutcome::Adopted(remote)
    }

    /// Tear the session down. Results of in-flight calls are discarded.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.epoch += 1;
        state.edit_generation += 1;
    }

    /// Page-unload path: write the draft synchronously, close the session,
    /// then attempt a save in the background.
    ///
    /// The background save never touches session state. It clears the draft
    /// only if the write is confirmed, and skips the write when the remote
    /// has drifted so a later load can surface the conflict.
    pub fn unload(&self) -> Option<JoinHandle<()>> {
        self.flush_draft();
        let ticket = self.unload_ticket();
        self.close();

        let ticket = ticket?;
        let gateway = Arc::clone(&self.gateway);
        let drafts = self.drafts.clone();
        let timeout = self.request_timeout;

        Some(tokio::spawn(async move {
            let check = tokio::time::timeout(timeout, gateway.fetch_task(&ticket.id)).await;
            if let Ok(Ok(remote)) = check {
                if detect(&ticket.baseline, &remote) == ConflictCheck::Drifted {
                    tracing::info!("Skipping unload save of {}: remote drifted", ticket.id);
                    return;
                }
            }

            match tokio::time::timeout(timeout, gateway.update_task(&ticket.id, &ticket.changes))
                .await
            {
                Ok(Ok(_)) => {
                    drafts.clear_draft(&ticket.id);
                    tracing::info!("Saved {} on unload", ticket.id);
                }
                Ok(Err(error)) => tracing::warn!("Unload save of {} failed: {}", ticket.id, error),
                Err(_) => tracing::warn!("Unload save of {} timed out", ticket.id),
            }
        }))
    }

    fn unload_ticket(&self) -> Option<SaveTicket> {
        let state = self.state();
        let id = state.loaded_id().ok()?;
        let baseline = state.baseline.baseline().cloned()?;
        let changes = state.baseline.changes(&state.fields);
        if changes.is_empty() || state.fields.validate().is_err() || state.machine.is_syncing() {
            return None;
        }
        Some(SaveTicket {
            id,
            changes,
            baseline,
            epoch: state.epoch,
        })
    }

    pub fn status(&self) -> SaveStatus {
        self.state().machine.status()
    }

    /// Message of the last failed or rejected save
    pub fn last_error(&self) -> Option<String> {
        self.state().machine.message().map(str::to_string)
    }

    /// Current edit buffer
    pub fn fields(&self) -> TaskFields {
        self.state().fields.clone()
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.state().baseline.baseline().cloned()
    }

    /// Last task snapshot received from the remote
    pub fn task(&self) -> Option<Task> {
        self.state().task.clone()
    }

    /// Conflict waiting for a [`Resolution`]
    pub fn conflict(&self) -> Option<Conflict> {
        self.state().conflict.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().is_dirty()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
