use super::*;
use serde_json::json;
use supervisor_core::JobId;

fn new_state() -> SupervisorState {
    SupervisorState::new(JobId::new())
}

#[test]
fn submit_rejects_duplicate_label() {
    let mut state = new_state();
    let tree = json!({"Label": "com.example.dup", "ProgramArguments": ["/bin/true"]});
    state.submit(&tree, None).expect("first submission");
    let err = state.submit(&tree, None).expect_err("duplicate label rejected");
    assert!(err.to_string().contains("com.example.dup"));
}

#[test]
fn dispatch_all_covers_every_submitted_job() {
    let mut state = new_state();
    let tree_a = json!({"Label": "com.example.a", "ProgramArguments": ["/bin/true"], "KeepAlive": true});
    let tree_b = json!({"Label": "com.example.b", "ProgramArguments": ["/bin/true"], "OnDemand": true});
    let (id_a, _) = state.submit(&tree_a, None).expect("submit a");
    let (id_b, _) = state.submit(&tree_b, None).expect("submit b");

    let actions = state.dispatch_all();
    assert_eq!(actions.len(), 2);
    let action_a = actions.iter().find(|(id, _)| *id == id_a).expect("a present").1;
    let action_b = actions.iter().find(|(id, _)| *id == id_b).expect("b present").1;
    assert_eq!(action_a, DispatchAction::Start);
    assert_eq!(action_b, DispatchAction::ArmSources);
}

#[test]
fn reap_marks_useless_job_and_sweep_removes_it() {
    let mut state = new_state();
    let tree = json!({
        "Label": "com.example.unload",
        "ProgramArguments": ["/bin/true"],
        "OnDemand": true,
    });
    let (id, _) = state.submit(&tree, None).expect("submit");
    state.arena.get_mut(id).expect("job present").flags.unload_at_exit = true;
    state.arena.get_mut(id).expect("job present").record_start(123, 0);

    let outcome = state.reap(id, 0, 1_000).expect("reap outcome");
    assert_eq!(outcome, ReapOutcome::Remove);
    assert!(state.arena.is_marked(id));

    let removed = state.sweep();
    assert_eq!(removed.len(), 1);
    assert!(state.arena.get(id).is_none());
}

#[test]
fn peer_contributed_environment_excludes_self_and_non_siblings() {
    let mut state = new_state();
    let parent_tree = json!({"Label": "com.example.parent"});
    let (parent_id, _) = state.submit(&parent_tree, None).expect("submit parent");

    let mut child_a = supervisor_core::Job::builder().label("com.example.child-a").parent(parent_id).build();
    child_a.environment.contributed.insert("FROM_A".to_string(), "1".to_string());
    let id_a = state.arena.insert(child_a);

    let mut child_b = supervisor_core::Job::builder().label("com.example.child-b").parent(parent_id).build();
    child_b.environment.contributed.insert("FROM_B".to_string(), "2".to_string());
    let _id_b = state.arena.insert(child_b);

    let peers = state.peer_contributed_environment(id_a);
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].get("FROM_B"), Some(&"2".to_string()));
}

#[test]
fn requestor_token_for_is_stable_per_job() {
    let mut state = new_state();
    let job_id = JobId::new();
    let first = state.requestor_token_for(job_id);
    let second = state.requestor_token_for(job_id);
    assert_eq!(first, second);
}

#[test]
fn sweep_collapses_broker_contexts_owned_by_a_removed_job() {
    let mut state = new_state();
    let tree = json!({"Label": "com.example.broker-owner", "OnDemand": true});
    let (id, _) = state.submit(&tree, None).expect("submit");
    let token = state.requestor_token_for(id);
    let root = state.broker.root();
    let subset = state.broker.subset(root, id, token).expect("subset");
    state.broker.create_service(subset, "com.example.svc", id).expect("create service");

    state.arena.mark_for_removal(id);
    state.sweep();

    assert!(state.broker.context(subset).is_none());
}
