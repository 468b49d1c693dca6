//! Linear GraphQL gateway.
//!
//! Responses are decoded against a strict schema: a missing or mistyped
//! field is an `Error::Api`, never a partially filled task.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use super::RemoteGateway;
use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::models::{FieldChanges, StateKind, Task, TaskId, WorkflowState};
use crate::util::compact_text;

const TASK_FIELDS: &str = "id identifier title description dueDate updatedAt team { id } state { id name type }";

#[derive(Clone)]
pub struct LinearGateway {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for LinearGateway {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LinearGateway")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl LinearGateway {
    pub fn new(settings: &SyncSettings, api_key: impl Into<String>) -> Result<Self> {
        settings.validate()?;
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Config("Linear API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            endpoint: settings.api_url.trim().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Api(describe_http_error(status, &body)));
        }

        decode_envelope(&body)
    }
}

impl RemoteGateway for LinearGateway {
    async fn fetch_task(&self, id: &TaskId) -> Result<Task> {
        let query = format!("query Issue($id: String!) {{ issue(id: $id) {{ {TASK_FIELDS} }} }}");
        let data: IssueData = self.execute(&query, json!({ "id": id.as_str() })).await?;
        data.issue.try_into()
    }

    async fn update_task(&self, id: &TaskId, changes: &FieldChanges) -> Result<Task> {
        let input = update_input(changes);
        tracing::debug!("Updating {} fields {:?}", id, changes.changed_field_names());
        self.issue_update(id, Value::Object(input)).await
    }

    async fn list_workflow_states(&self, team_id: &str) -> Result<Vec<WorkflowState>> {
        let query = "query TeamStates($teamId: String!) { team(id: $teamId) { states { nodes { id name type } } } }";
        let data: TeamData = self.execute(query, json!({ "teamId": team_id })).await?;
        let mut states = data
            .team
            .states
            .nodes
            .into_iter()
            .map(WorkflowState::try_from)
            .collect::<Result<Vec<_>>>()?;
        states.sort_by_key(|state| board_order(state.kind));
        Ok(states)
    }

    async fn set_task_state(&self, id: &TaskId, state_id: &str) -> Result<Task> {
        self.issue_update(id, json!({ "stateId": state_id })).await
    }
}

impl LinearGateway {
    async fn issue_update(&self, id: &TaskId, input: Value) -> Result<Task> {
        let query = format!(
            "mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {{ issueUpdate(id: $id, input: $input) {{ success issue {{ {TASK_FIELDS} }} }} }}"
        );
        let data: IssueUpdateData = self
            .execute(&query, json!({ "id": id.as_str(), "input": input }))
            .await?;

        if !data.issue_update.success {
            return Err(Error::Api(format!("issueUpdate for {id} reported failure")));
        }
        data.issue_update
            .issue
            .ok_or_else(|| Error::Api(format!("issueUpdate for {id} returned no issue")))?
            .try_into()
    }
}

/// GraphQL input containing only the changed fields.
fn update_input(changes: &FieldChanges) -> Map<String, Value> {
    let mut input = Map::new();
    if let Some(title) = &changes.title {
        input.insert("title".to_string(), json!(title));
    }
    if let Some(description) = &changes.description {
        input.insert("description".to_string(), json!(description));
    }
    if let Some(due_date) = changes.due_date {
        input.insert(
            "dueDate".to_string(),
            due_date.map_or(Value::Null, |date| json!(date.format("%Y-%m-%d").to_string())),
        );
    }
    input
}

const fn board_order(kind: StateKind) -> u8 {
    match kind {
        StateKind::Triage => 0,
        StateKind::Backlog => 1,
        StateKind::Unstarted => 2,
        StateKind::Started => 3,
        StateKind::Completed => 4,
        StateKind::Canceled => 5,
    }
}

fn describe_http_error(status: StatusCode, body: &str) -> String {
    if status == StatusCode::UNAUTHORIZED {
        return "authentication failed; check the Linear API key (401)".to_string();
    }
    if let Ok(envelope) = serde_json::from_str::<ErrorsOnly>(body) {
        if let Some(message) = join_errors(&envelope.errors) {
            return format!("{message} ({})", status.as_u16());
        }
    }
    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|error| Error::Api(format!("unexpected response shape: {error}")))?;

    if let Some(message) = join_errors(&envelope.errors) {
        return Err(Error::Api(message));
    }
    envelope
        .data
        .ok_or_else(|| Error::Api("response did not include data".to_string()))
}

fn join_errors(errors: &[GraphQlError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|error| error.message.trim())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Present-but-nullable: unlike plain `Option`, a missing key is an error.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::deserialize(deserializer)
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct ErrorsOnly {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IssueData {
    issue: IssueNode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct IssueUpdateData {
    issue_update: IssueUpdatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IssueUpdatePayload {
    success: bool,
    #[serde(deserialize_with = "nullable")]
    issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TeamData {
    team: TeamNode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TeamNode {
    states: StateConnection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateConnection {
    nodes: Vec<StateNode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct IssueNode {
    id: String,
    identifier: String,
    title: String,
    #[serde(deserialize_with = "nullable")]
    description: Option<String>,
    #[serde(deserialize_with = "nullable")]
    due_date: Option<NaiveDate>,
    updated_at: DateTime<Utc>,
    team: IdNode,
    state: StateNode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateNode {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

impl TryFrom<StateNode> for WorkflowState {
    type Error = Error;

    fn try_from(node: StateNode) -> Result<Self> {
        let kind = serde_json::from_value::<StateKind>(Value::String(node.kind.clone()))
            .map_err(|_| Error::Api(format!("unknown workflow state type '{}'", node.kind)))?;
        Ok(Self {
            id: node.id,
            name: node.name,
            kind,
        })
    }
}

impl TryFrom<IssueNode> for Task {
    type Error = Error;

    fn try_from(node: IssueNode) -> Result<Self> {
        let id = TaskId::parse(&node.id)
            .map_err(|_| Error::Api(format!("invalid issue id '{}'", node.id)))?;
        Ok(Self {
            id,
            identifier: node.identifier,
            team_id: node.team.id,
            title: node.title,
            description: node.description.unwrap_or_default(),
            due_date: node.due_date,
            state: node.state.try_into()?,
            updated_at: node.updated_at,
        })
    }
}
