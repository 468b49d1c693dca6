use std::path::PathBuf;

use chrono::NaiveDate;
use tasksync_core::gateway::{RemoteGateway, WorkflowStateCache};
use tasksync_core::models::{Baseline, Task, TaskFields, TaskId};
use tasksync_core::projection::{move_task, TaskBoard};
use tasksync_core::store::KeyValueStore;
use tasksync_core::{Conflict, EditSession, Resolution, SaveOutcome, SaveStatus};

use crate::cli::TaskCommands;
use crate::commands::common::{
    connect_gateway, format_conflict_lines, format_task_lines, load_context, open_store,
    parse_task_id, task_to_item, ProfileContext,
};
use crate::error::CliError;

/// Field changes requested on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskEdits {
    pub fn from_flags(
        title: Option<String>,
        description: Option<String>,
        due: Option<NaiveDate>,
        clear_due: bool,
    ) -> Self {
        Self {
            title,
            description,
            due_date: if clear_due { Some(None) } else { due.map(Some) },
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }

    pub fn apply_to(&self, fields: &mut TaskFields) {
        if let Some(title) = &self.title {
            fields.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            fields.description.clone_from(description);
        }
        if let Some(due_date) = self.due_date {
            fields.due_date = due_date;
        }
    }
}

/// What `task edit` did, for printing
#[derive(Debug, Clone)]
pub struct EditReport {
    pub restored_draft: bool,
    pub baseline: Option<Baseline>,
    /// Conflict met on the first attempt, if any
    pub conflict: Option<Conflict>,
    /// Outcome after the conflict choice was applied
    pub outcome: SaveOutcome,
    pub status: SaveStatus,
    pub fields: TaskFields,
}

pub async fn run_task(
    command: TaskCommands,
    global_profile: Option<&str>,
    store_override: Option<PathBuf>,
) -> Result<(), CliError> {
    let context = load_context(global_profile, store_override)?;
    match command {
        TaskCommands::Show { id, json } => run_show(&id, json, &context).await,
        TaskCommands::Edit {
            id,
            title,
            description,
            due,
            clear_due,
            on_conflict,
        } => {
            let edits = TaskEdits::from_flags(title, description, due, clear_due);
            run_edit(&id, &edits, on_conflict.into(), &context).await
        }
        TaskCommands::Move { id, state } => run_move(&id, &state, &context).await,
    }
}

async fn run_show(id: &str, as_json: bool, context: &ProfileContext) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let gateway = connect_gateway(context)?;
    let task = gateway.fetch_task(&task_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&task_to_item(&task))?);
    } else {
        for line in format_task_lines(&task) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_edit(
    id: &str,
    edits: &TaskEdits,
    on_conflict: Resolution,
    context: &ProfileContext,
) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let gateway = connect_gateway(context)?;
    let store = open_store(&context.store_path)?;
    let session = EditSession::new(gateway, store, &context.settings);

    let report = edit_with_session(&session, &task_id, edits, on_conflict).await?;
    for line in format_edit_report(&task_id, &report) {
        println!("{line}");
    }

    match report.outcome {
        SaveOutcome::Rejected(message) => Err(CliError::SaveRejected(message)),
        SaveOutcome::Failed(message) => Err(CliError::SaveFailed(message)),
        _ => Ok(()),
    }
}

/// Load, apply `edits`, save, and settle a conflict with `on_conflict`.
pub async fn edit_with_session<G, S>(
    session: &EditSession<G, S>,
    id: &TaskId,
    edits: &TaskEdits,
    on_conflict: Resolution,
) -> Result<EditReport, CliError>
where
    G: RemoteGateway + 'static,
    S: KeyValueStore + 'static,
{
    let loaded = session.load(id).await?;
    let baseline = session.baseline();

    if !edits.is_empty() {
        session.edit(|fields| edits.apply_to(fields))?;
    }
    session.flush_draft();

    let mut conflict = None;
    let mut outcome = session.save().await?;
    if let SaveOutcome::Conflict(found) = outcome {
        conflict = Some(found);
        outcome = session.resolve(on_conflict).await?;
    }

    Ok(EditReport {
        restored_draft: loaded.restored_draft,
        baseline,
        conflict,
        outcome,
        status: session.status(),
        fields: session.fields(),
    })
}

pub fn format_edit_report(id: &TaskId, report: &EditReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.restored_draft {
        lines.push(format!("Restored an unsynced local draft for {id}"));
    }
    if let Some(conflict) = &report.conflict {
        lines.extend(format_conflict_lines(
            conflict,
            &report.fields,
            report.baseline.as_ref(),
        ));
    }

    let summary = match &report.outcome {
        SaveOutcome::NoChanges => "Nothing to save".to_string(),
        SaveOutcome::Saved(task) => format!("Saved {}", task.identifier),
        SaveOutcome::Adopted(task) => format!("Kept the server version of {}", task.identifier),
        SaveOutcome::Cancelled => {
            "Conflict left unresolved; your changes stay in the local draft".to_string()
        }
        SaveOutcome::Conflict(_) => "Conflict pending".to_string(),
        SaveOutcome::Rejected(message) | SaveOutcome::Failed(message) => message.clone(),
    };
    lines.push(summary);
    lines.push(format!("Status: {}", report.status));
    lines
}

async fn run_move(id: &str, state_name: &str, context: &ProfileContext) -> Result<(), CliError> {
    let task_id = parse_task_id(id)?;
    let gateway = connect_gateway(context)?;

    let (from, moved) = move_to_state(gateway.as_ref(), &task_id, state_name).await?;
    println!("{}: {} -> {}", moved.identifier, from, moved.state.name);
    Ok(())
}

/// Fetch a task and move it to `state_name`. Returns the previous state name
/// and the task as the server reports it after the move.
pub async fn move_to_state<G: RemoteGateway>(
    gateway: &G,
    task_id: &TaskId,
    state_name: &str,
) -> Result<(String, Task), CliError> {
    let states = WorkflowStateCache::new();
    let mut board = TaskBoard::new();

    let task = gateway.fetch_task(task_id).await?;
    let from = task.state.name.clone();
    // The API answers key lookups with the canonical id.
    let canonical_id = task.id.clone();
    board.upsert(task);

    let moved = move_task(&mut board, gateway, &states, &canonical_id, state_name).await?;
    Ok((from, moved))
}
