use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tasksync_core::config::SyncSettings;
use tasksync_core::draft::DraftStore;
use tasksync_core::gateway::LinearGateway;
use tasksync_core::models::{Baseline, Draft, Task, TaskFields, TaskId};
use tasksync_core::store::SqliteKeyValueStore;
use tasksync_core::Conflict;

use crate::auth::require_api_key;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Resolved profile: which settings and which local store to use.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub profile_name: String,
    pub settings: SyncSettings,
    pub store_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TaskItem {
    pub id: String,
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub state: String,
    pub state_kind: String,
    pub updated_at: String,
}

pub fn load_context(
    global_profile: Option<&str>,
    store_override: Option<PathBuf>,
) -> Result<ProfileContext, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let settings = profile.resolve_settings().map_err(CliError::Config)?;
    let store_path = profile
        .resolve_store_path(store_override)
        .map_err(CliError::Config)?;

    tracing::debug!(
        "Using profile '{}' with store {}",
        profile_name,
        store_path.display()
    );
    Ok(ProfileContext {
        profile_name,
        settings,
        store_path,
    })
}

pub fn open_store(path: &Path) -> Result<Arc<SqliteKeyValueStore>, CliError> {
    Ok(Arc::new(SqliteKeyValueStore::open(path)?))
}

pub fn open_drafts(context: &ProfileContext) -> Result<DraftStore<SqliteKeyValueStore>, CliError> {
    let store = open_store(&context.store_path)?;
    Ok(DraftStore::new(
        store,
        context.settings.draft_key_prefix.clone(),
    ))
}

pub fn connect_gateway(context: &ProfileContext) -> Result<Arc<LinearGateway>, CliError> {
    let api_key = require_api_key(&context.profile_name)?;
    Ok(Arc::new(LinearGateway::new(&context.settings, api_key)?))
}

pub fn parse_task_id(raw: &str) -> Result<TaskId, CliError> {
    if raw.trim().is_empty() {
        return Err(CliError::EmptyTaskId);
    }
    Ok(TaskId::parse(raw)?)
}

pub fn task_to_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        identifier: task.identifier.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        due_date: task.due_date.map(|date| date.to_string()),
        state: task.state.name.clone(),
        state_kind: serde_json::to_value(task.state.kind)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default(),
        updated_at: format_timestamp(task.updated_at),
    }
}

pub fn format_task_lines(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("{}  {}", task.identifier, task.title),
        format!(
            "state:    {}{}",
            task.state.name,
            if task.state.kind.is_closed() { " (closed)" } else { "" }
        ),
        format!("due:      {}", format_due(task.due_date)),
        format!("updated:  {}", format_timestamp(task.updated_at)),
    ];
    if !task.description.trim().is_empty() {
        lines.push(String::new());
        lines.extend(task.description.lines().map(str::to_string));
    }
    lines
}

pub fn format_fields_lines(fields: &TaskFields) -> Vec<String> {
    vec![
        format!("title:        {}", fields.title),
        format!("description:  {}", text_preview(&fields.description, 60)),
        format!("due:          {}", format_due(fields.due_date)),
    ]
}

pub fn format_draft_lines(id: &TaskId, draft: &Draft) -> Vec<String> {
    let mut lines = vec![format!(
        "Draft for {} saved {}",
        id,
        format_timestamp(draft.saved_at)
    )];
    lines.extend(format_fields_lines(&draft.fields));
    lines
}

/// Side-by-side summary of a conflict: what changed there and what is pending here.
pub fn format_conflict_lines(
    conflict: &Conflict,
    local: &TaskFields,
    baseline: Option<&Baseline>,
) -> Vec<String> {
    let remote = TaskFields::from(&conflict.remote);
    let mut lines = vec![format!(
        "{} was changed on the server at {}",
        conflict.remote.identifier,
        format_timestamp(conflict.remote.updated_at)
    )];

    if let Some(baseline) = baseline {
        let overlapping = conflict.overlapping_fields(baseline);
        if !overlapping.is_empty() {
            lines.push(format!("Both sides changed: {}", overlapping.join(", ")));
        }
    }

    lines.push("Server:".to_string());
    lines.extend(format_fields_lines(&remote).into_iter().map(|line| format!("  {line}")));
    lines.push("Yours:".to_string());
    lines.extend(format_fields_lines(local).into_iter().map(|line| format!("  {line}")));
    lines
}

pub fn format_due(due_date: Option<NaiveDate>) -> String {
    due_date.map_or_else(|| "none".to_string(), |date| date.format("%Y-%m-%d").to_string())
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn text_preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
