use std::path::PathBuf;

use serde::Serialize;

use tasksync_core::draft::DraftStore;
use tasksync_core::models::TaskId;
use tasksync_core::store::KeyValueStore;

use crate::cli::DraftCommands;
use crate::commands::common::{
    format_draft_lines, format_timestamp, load_context, open_drafts, parse_task_id, text_preview,
};
use crate::error::CliError;

pub fn run_draft(
    command: DraftCommands,
    global_profile: Option<&str>,
    store_override: Option<PathBuf>,
) -> Result<(), CliError> {
    let context = load_context(global_profile, store_override)?;
    let drafts = open_drafts(&context)?;

    match command {
        DraftCommands::List { json } => {
            for line in list_drafts(&drafts, json)? {
                println!("{line}");
            }
        }
        DraftCommands::Show { id, json } => {
            let task_id = parse_task_id(&id)?;
            for line in describe_draft(&drafts, &task_id, json)? {
                println!("{line}");
            }
        }
        DraftCommands::Clear { id } => {
            let task_id = parse_task_id(&id)?;
            drafts.clear_draft(&task_id);
            println!("Cleared local draft for {task_id}");
        }
    }
    Ok(())
}

pub fn describe_draft<S: KeyValueStore>(
    drafts: &DraftStore<S>,
    id: &TaskId,
    as_json: bool,
) -> Result<Vec<String>, CliError> {
    let Some(draft) = drafts.load_draft(id) else {
        return Ok(vec![format!("No local draft for {id}")]);
    };

    if as_json {
        Ok(vec![serde_json::to_string_pretty(&draft)?])
    } else {
        Ok(format_draft_lines(id, &draft))
    }
}

#[derive(Debug, Serialize)]
struct DraftItem {
    id: String,
    title: String,
    saved_at: String,
}

pub fn list_drafts<S: KeyValueStore>(
    drafts: &DraftStore<S>,
    as_json: bool,
) -> Result<Vec<String>, CliError> {
    let pending = drafts.pending_drafts();

    if as_json {
        let items = pending
            .iter()
            .map(|(id, draft)| DraftItem {
                id: id.to_string(),
                title: draft.fields.title.clone(),
                saved_at: format_timestamp(draft.saved_at),
            })
            .collect::<Vec<_>>();
        return Ok(vec![serde_json::to_string_pretty(&items)?]);
    }

    if pending.is_empty() {
        return Ok(vec!["No local drafts".to_string()]);
    }

    Ok(pending
        .iter()
        .map(|(id, draft)| {
            format!(
                "{:<12} {}  {}",
                id.as_str(),
                format_timestamp(draft.saved_at),
                text_preview(&draft.fields.title, 50)
            )
        })
        .collect())
}
