//! CommitStreamer delivery and recovery.

mod common;

use std::sync::Arc;

use common::{st, RecordingDestination};
use graft_core::traits::CommitDestination;
use graft_core::{BranchId, Commit};
use graft_engine::{CommitStreamer, StateKeeper};
use graft_storage::{MemoryCache, MemoryLog};

fn keeper_with_commits(n: usize) -> (Arc<StateKeeper>, Arc<MemoryCache>, Vec<Commit>) {
    let cache = Arc::new(MemoryCache::new());
    let keeper = Arc::new(StateKeeper::new(
        BranchId::from("a"),
        Arc::new(MemoryLog::new()),
        cache.clone(),
    ));
    let commits = (0..n)
        .map(|i| {
            let c = Commit::new(
                BranchId::from("a"),
                keeper.last_commit_id(),
                format!("c{i}"),
                vec![st(&format!("s{i}"), "p", "o")],
                vec![],
            );
            keeper.after_services(&c).unwrap();
            c
        })
        .collect();
    (keeper, cache, commits)
}

fn ids(commits: &[Commit]) -> Vec<String> {
    commits.iter().map(|c| c.id().to_string()).collect()
}

#[test]
fn recovery_redelivers_everything_after_the_marker() {
    let (keeper, _cache, commits) = keeper_with_commits(3);
    keeper.after_forwarded(&commits[0]).unwrap();

    let first = RecordingDestination::new("first");
    let second = RecordingDestination::new("second");
    let destinations: Vec<Arc<dyn CommitDestination>> = vec![first.clone(), second.clone()];
    let streamer = CommitStreamer::new(keeper.clone(), destinations, 16);

    streamer.start().unwrap();
    assert_eq!(streamer.recover_state().unwrap(), 2);
    let stats = streamer.shutdown();

    assert_eq!(stats.commits_forwarded, 2);
    assert_eq!(stats.deliveries_ok, 4);
    assert_eq!(first.received_ids(), ids(&commits[1..]));
    assert_eq!(second.received_ids(), ids(&commits[1..]));
    assert!(keeper.get_non_forwarded_commits().unwrap().is_empty());
}

#[test]
fn failing_destination_does_not_block_others_or_marker() {
    let (keeper, _cache, commits) = keeper_with_commits(1);
    let broken = RecordingDestination::failing("broken");
    let healthy = RecordingDestination::new("healthy");
    let destinations: Vec<Arc<dyn CommitDestination>> = vec![broken.clone(), healthy.clone()];
    let streamer = CommitStreamer::new(keeper.clone(), destinations, 16);

    streamer.start().unwrap();
    streamer.enqueue(commits[0].clone());
    let stats = streamer.shutdown();

    assert_eq!(stats.deliveries_failed, 1);
    assert_eq!(stats.deliveries_ok, 1);
    assert_eq!(healthy.received_ids(), ids(&commits));
    assert!(keeper.get_non_forwarded_commits().unwrap().is_empty());
}

#[test]
fn destinations_get_independent_copies() {
    let (keeper, _cache, commits) = keeper_with_commits(1);
    let left = RecordingDestination::new("left");
    let right = RecordingDestination::new("right");
    let destinations: Vec<Arc<dyn CommitDestination>> = vec![left.clone(), right.clone()];
    let streamer = CommitStreamer::new(keeper, destinations, 16);

    streamer.start().unwrap();
    streamer.enqueue(commits[0].clone());
    streamer.shutdown();

    let mut from_left = left.received().remove(0);
    let from_right = right.received().remove(0);
    assert_eq!(from_left, from_right);
    let (l, r) = (
        from_left.added().get_index(0).cloned().unwrap(),
        from_right.added().get_index(0).cloned().unwrap(),
    );
    assert!(l.shares_storage_with(&r));

    from_left.append_added(vec![st("extra", "p", "o")]);
    assert_eq!(from_right.addition_count(), 1);
}

#[test]
fn marker_failure_means_redundant_redelivery() {
    let (keeper, cache, commits) = keeper_with_commits(1);
    let dest = RecordingDestination::new("dest");
    let destinations: Vec<Arc<dyn CommitDestination>> = vec![dest.clone()];
    let streamer = CommitStreamer::new(keeper.clone(), destinations, 16);

    cache.fail_next_puts(1);
    streamer.start().unwrap();
    streamer.enqueue(commits[0].clone());
    let stats = streamer.shutdown();

    assert_eq!(stats.commits_forwarded, 1);
    assert_eq!(keeper.get_non_forwarded_commits().unwrap(), commits);
}

#[test]
fn destinations_can_change_at_runtime() {
    let (keeper, _cache, commits) = keeper_with_commits(1);
    let streamer = CommitStreamer::new(keeper, Vec::new(), 16);
    let late = RecordingDestination::new("late");

    streamer.add_destination(late.clone());
    assert_eq!(streamer.destination_count(), 1);
    assert!(!streamer.is_running());
    streamer.start().unwrap();
    assert!(streamer.is_running());
    streamer.enqueue(commits[0].clone());
    streamer.shutdown();
    assert!(!streamer.is_running());
    assert_eq!(late.received().len(), 1);

    assert!(streamer.remove_destination("late"));
    assert!(!streamer.remove_destination("late"));
    assert_eq!(streamer.shutdown(), Default::default());
}
