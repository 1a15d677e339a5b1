use super::*;
use crate::job::JobBuilder;

fn job(label: &str) -> Job {
    JobBuilder::default().label(label).build()
}

#[test]
fn label_in_use_detects_duplicates() {
    let mut arena = JobArena::new();
    arena.insert(job("com.example.a"));
    assert!(arena.label_in_use("com.example.a"));
    assert!(!arena.label_in_use("com.example.b"));
}

#[test]
fn insert_links_child_into_parent_children_list() {
    let mut arena = JobArena::new();
    let parent_id = arena.insert(job("com.example.parent"));
    let mut child = job("com.example.child");
    child.parent = Some(parent_id);
    let child_id = arena.insert(child);
    assert_eq!(arena.get(parent_id).expect("present").children, vec![child_id]);
}

#[test]
fn mark_for_removal_cascades_to_children_and_sets_dead() {
    let mut arena = JobArena::new();
    let parent_id = arena.insert(job("com.example.parent"));
    let mut child = job("com.example.child");
    child.parent = Some(parent_id);
    let child_id = arena.insert(child);

    arena.mark_for_removal(parent_id);
    assert!(arena.is_marked(parent_id));
    assert!(arena.is_marked(child_id));
    assert_eq!(arena.get(parent_id).expect("present").dispatch, DispatchState::Dead);
    assert_eq!(arena.get(child_id).expect("present").dispatch, DispatchState::Dead);
}

#[test]
fn sweep_removes_marked_jobs_and_detaches_parent_links() {
    let mut arena = JobArena::new();
    let parent_id = arena.insert(job("com.example.parent"));
    let mut child = job("com.example.child");
    child.parent = Some(parent_id);
    let child_id = arena.insert(child);

    arena.mark_for_removal(child_id);
    let removed = arena.sweep();
    assert_eq!(removed.len(), 1);
    assert!(arena.get(child_id).is_none());
    assert!(arena.get(parent_id).expect("present").children.is_empty());
}

#[test]
fn sweep_with_nothing_marked_is_a_no_op() {
    let mut arena = JobArena::new();
    arena.insert(job("com.example.a"));
    let removed = arena.sweep();
    assert!(removed.is_empty());
    assert_eq!(arena.len(), 1);
}
