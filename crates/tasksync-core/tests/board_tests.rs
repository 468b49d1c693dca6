//! Workflow state cache and optimistic state moves.

mod common;

use common::{at, canonical_task, sample_task, task_id, Failure, ScriptedGateway};
use pretty_assertions::assert_eq;
use tasksync_core::gateway::WorkflowStateCache;
use tasksync_core::models::StateKind;
use tasksync_core::projection::{move_task, TaskBoard};
use tasksync_core::Error;

#[tokio::test]
async fn test_states_are_fetched_once_per_team() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();

    let first = cache.get_or_load(gateway.as_ref(), "team-eng").await.unwrap();
    let second = cache.get_or_load(gateway.as_ref(), "team-eng").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(gateway.list_count(), 1);
    assert!(cache.is_cached("team-eng"));
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();
    cache.get_or_load(gateway.as_ref(), "team-eng").await.unwrap();

    cache.clear_cache();
    assert!(!cache.is_cached("team-eng"));
    cache.get_or_load(gateway.as_ref(), "team-eng").await.unwrap();

    assert_eq!(gateway.list_count(), 2);
}

#[tokio::test]
async fn test_find_by_name_ignores_case() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();

    let state = cache
        .find_by_name(gateway.as_ref(), "team-eng", " in progress ")
        .await
        .unwrap();

    assert_eq!(state.id, "state-doing");
    assert_eq!(state.kind, StateKind::Started);
}

#[tokio::test]
async fn test_move_confirms_with_server_task() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();
    let mut board = TaskBoard::new();
    board.upsert(sample_task());

    let moved = move_task(&mut board, gateway.as_ref(), &cache, &task_id(), "Done")
        .await
        .unwrap();

    assert_eq!(moved.state.name, "Done");
    assert_eq!(moved.updated_at, at(0, 5));
    assert_eq!(board.get(&task_id()), Some(&moved));
    assert!(!board.is_pending(&task_id()));
}

#[tokio::test]
async fn test_failed_move_reverts() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();
    let mut board = TaskBoard::new();
    board.upsert(sample_task());
    gateway.fail_next_update(Failure::Network);

    let result = move_task(&mut board, gateway.as_ref(), &cache, &task_id(), "Done").await;

    assert!(matches!(result, Err(Error::Network(_))));
    assert_eq!(board.get(&task_id()), Some(&sample_task()));
    assert!(!board.is_pending(&task_id()));
}

#[tokio::test]
async fn test_move_to_unknown_state_changes_nothing() {
    let gateway = ScriptedGateway::new(sample_task());
    let cache = WorkflowStateCache::new();
    let mut board = TaskBoard::new();
    board.upsert(sample_task());

    let result = move_task(&mut board, gateway.as_ref(), &cache, &task_id(), "Shipped").await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(board.get(&task_id()), Some(&sample_task()));
    assert_eq!(gateway.update_count(), 0);
}

#[tokio::test]
async fn test_move_by_team_key_updates_canonical_entry() {
    let gateway = ScriptedGateway::new(canonical_task());
    let cache = WorkflowStateCache::new();
    let mut board = TaskBoard::new();
    board.upsert(canonical_task());

    let moved = move_task(&mut board, gateway.as_ref(), &cache, &task_id(), "Done")
        .await
        .unwrap();

    assert_eq!(moved.id, canonical_task().id);
    assert_eq!(moved.state.name, "Done");
    assert_eq!(board.get(&canonical_task().id), Some(&moved));
    assert_eq!(board.get(&task_id()), None);
    assert!(!board.is_pending(&canonical_task().id));
}
