// Merge Tests
// Tests for deep-merging remote state into local state

use eventmesh::state::{deep_merge, GameRecord, SharedState};
use serde_json::json;

// ============================================================================
// DEEP MERGE
// ============================================================================

#[test]
fn test_scalars_incoming_wins() {
    let mut local = json!({"x": 1, "y": "keep"});
    deep_merge(&mut local, &json!({"x": 2}));
    assert_eq!(local, json!({"x": 2, "y": "keep"}));
}

#[test]
fn test_object_replaces_scalar_and_back() {
    let mut local = json!({"x": 1});
    deep_merge(&mut local, &json!({"x": {"nested": true}}));
    assert_eq!(local, json!({"x": {"nested": true}}));

    deep_merge(&mut local, &json!({"x": null}));
    assert_eq!(local, json!({"x": null}));
}

#[test]
fn test_merge_is_idempotent() {
    let incoming = json!({"g1": {"x": 1, "userData": {"u1": {"n": "bob"}}}});
    let mut once = json!({});
    deep_merge(&mut once, &incoming);
    let mut twice = once.clone();
    deep_merge(&mut twice, &incoming);

    assert_eq!(once, twice);
}

// ============================================================================
// SHARED STATE MERGE
// ============================================================================

#[test]
fn test_merge_adds_new_games() {
    let mut state = SharedState::new();

    let result = state
        .merge_value(&json!({"g1": {"x": 1}, "g2": {"chatData": ["hi"]}}))
        .unwrap();

    assert_eq!(result.new_games, 2);
    assert_eq!(result.updated_games, 0);
    assert_eq!(result.total_after_merge, 2);
    assert_eq!(state.game("g2").unwrap().chat(), Some(&[json!("hi")][..]));
}

#[test]
fn test_merge_keeps_local_only_games() {
    let mut state = SharedState::new();
    state.add_game("local", GameRecord::new());

    state.merge_value(&json!({"remote": {}})).unwrap();

    assert!(state.game("local").is_some());
    assert!(state.game("remote").is_some());
}

#[test]
fn test_merge_unions_users() {
    let mut state = SharedState::new();
    state.add_game("g1", GameRecord::new().with_prop("x", json!(1)));
    state.add_user("g1", "u1", json!({"n": "bob"})).unwrap();

    let result = state
        .merge_value(&json!({"g1": {"userData": {"u2": {"n": "ann"}}}}))
        .unwrap();

    assert_eq!(result.updated_games, 1);
    assert_eq!(
        state.game("g1").unwrap().to_value(),
        json!({"x": 1, "userData": {"u1": {"n": "bob"}, "u2": {"n": "ann"}}})
    );
}

#[test]
fn test_merge_unchanged_game_not_counted() {
    let mut state = SharedState::new();
    state.add_game("g1", GameRecord::new().with_prop("x", json!(1)));

    let result = state.merge_value(&json!({"g1": {"x": 1}})).unwrap();

    assert!(!result.changed());
}

#[test]
fn test_merge_chat_is_replaced_not_concatenated() {
    let mut state = SharedState::new();
    state.add_game("g1", GameRecord::new());
    state.add_chat("g1", json!("a")).unwrap();

    state.merge_value(&json!({"g1": {"chatData": ["a", "b"]}})).unwrap();

    assert_eq!(
        state.game("g1").unwrap().chat(),
        Some(&[json!("a"), json!("b")][..])
    );
}

#[test]
fn test_merge_rejects_non_object() {
    let mut state = SharedState::new();
    assert!(state.merge_value(&json!([1, 2, 3])).is_err());
    assert!(state.merge_value(&json!({"g1": 5})).is_err());
    assert!(state.is_empty());
}

/// Two nodes starting empty converge on the same g1
#[test]
fn test_two_node_convergence() {
    let mut a = SharedState::new();
    let mut b = SharedState::new();

    // A creates g1 and syncs
    a.add_game("g1", GameRecord::new().with_prop("x", json!(1)));
    b.merge_value(&a.to_value()).unwrap();

    // B adds a user under the now-existing g1 and syncs
    b.add_user("g1", "u1", json!({"n": "bob"})).unwrap();
    a.merge_value(&b.to_value()).unwrap();

    let expected = json!({"x": 1, "userData": {"u1": {"n": "bob"}}});
    assert_eq!(a.game("g1").unwrap().to_value(), expected);
    assert_eq!(b.game("g1").unwrap().to_value(), expected);
    assert_eq!(a, b);
}

/// Test: reserved names handed to the record builder never poison a sync
#[test]
fn test_builder_reserved_props_stay_replicable() {
    let mut local = SharedState::new();
    local.add_game("g1", GameRecord::new().with_prop("userData", json!("oops")));
    local.add_game(
        "g2",
        GameRecord::new()
            .with_prop("x", json!(1))
            .with_prop("chatData", json!(["gg"])),
    );

    let mut peer = SharedState::new();
    let result = peer.merge_value(&local.to_value()).expect("Should merge");
    assert_eq!(result.new_games, 2);
    assert_eq!(peer, local);
    assert_eq!(peer.game("g2").unwrap().chat(), local.game("g2").unwrap().chat());
    assert!(local.game("g2").unwrap().chat().is_some());

    let reloaded = SharedState::from_json(&local.to_json().unwrap()).expect("Should reload");
    assert_eq!(reloaded, local);
}
