//! Operation grouping step definitions

use cucumber::{given, then};
use dossier_audit::services::GroupingOptions;

use crate::features::support::TestWorld;

#[given(expr = "a grouping window of {int} ms")]
async fn grouping_window(world: &mut TestWorld, window_ms: u64) {
    world.grouping = GroupingOptions::with_window_ms(window_ms);
}

#[given("grouping is disabled")]
async fn grouping_disabled(world: &mut TestWorld) {
    world.grouping = GroupingOptions::disabled();
}

#[then(expr = "the timeline has {int} operation(s)")]
async fn operation_count(world: &mut TestWorld, count: usize) {
    assert_eq!(world.snapshot().groups.len(), count);
}

#[then(expr = "operation {int} groups {int} change(s)")]
async fn operation_members(world: &mut TestWorld, index: usize, count: usize) {
    let group = &world.snapshot().groups[index - 1];
    assert_eq!(group.member_count, count);
}

#[then(expr = "operation {int} was performed by {string}")]
async fn operation_actor(world: &mut TestWorld, index: usize, email: String) {
    assert_eq!(world.snapshot().groups[index - 1].actor.email, email);
}
