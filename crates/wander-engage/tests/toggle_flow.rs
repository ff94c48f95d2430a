//! End-to-end toggle flows: optimistic flip, settlement, rollback, and
//! the per-key in-flight gate, driven through scripted collaborators.

use futures::FutureExt;
use wander_core::{ApiError, CounterKind, EngagementDelta, EntityKey, SourcePriority};
use wander_engage::{
    EngagementStore, SavedPosts, Severity, ToggleAction, ToggleController, ToggleOutcome,
};
use wander_testkit::{fixtures, init_test_logging, ManualClock, ScriptedApi};

struct Harness {
    store: EngagementStore,
    api: ScriptedApi,
    clock: ManualClock,
    saved: SavedPosts,
    controller: ToggleController<ScriptedApi, ManualClock>,
}

fn harness(api: ScriptedApi) -> Harness {
    init_test_logging();
    let store = EngagementStore::new();
    let clock = ManualClock::new(10_000);
    let saved = SavedPosts::new();
    let controller = ToggleController::new(
        store.clone(),
        api.clone(),
        clock.clone(),
        saved.clone(),
    );
    Harness {
        store,
        api,
        clock,
        saved,
        controller,
    }
}

fn seed_likes(store: &EngagementStore, key: &EntityKey, engaged: bool, likes: u64) {
    store.commit(
        key,
        &EngagementDelta::new()
            .engaged(engaged)
            .counter(CounterKind::Likes, likes),
        SourcePriority::FreshFetch,
        9_000,
    );
}

#[tokio::test]
async fn like_flips_immediately_and_settles_confirmed() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_like(Ok(fixtures::like_confirmed(11)));
    let key = EntityKey::post(fixtures::post(1), fixtures::viewer(1));
    seed_likes(&fx.store, &key, false, 10);

    let mut watch = fx.store.subscribe(&key);
    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    // First notification is the optimistic flip, before any response.
    let flipped = watch.try_recv().expect("flip notification");
    assert!(flipped.snapshot.engaged);
    assert_eq!(flipped.snapshot.counters.get(CounterKind::Likes), 11);
    assert_eq!(flipped.source, Some(SourcePriority::LocalInflight));

    let settled = watch.try_recv().expect("settlement notification");
    assert_eq!(settled.source, Some(SourcePriority::LocalResult));
    assert_eq!(settled.snapshot.counters.get(CounterKind::Likes), 11);

    assert_eq!(outcome.severity(), Severity::Silent);
    match outcome {
        ToggleOutcome::Applied { state } => {
            assert!(state.snapshot.engaged);
            assert!(!state.in_flight);
        }
        other => panic!("expected Applied, got {other:?}"),
    }
}

#[tokio::test]
async fn hard_failure_rolls_back_with_exactly_two_notifications() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_like(Err(ApiError::Connection {
        reason: "socket reset".to_string(),
    }));
    let key = EntityKey::post(fixtures::post(2), fixtures::viewer(1));
    seed_likes(&fx.store, &key, false, 10);
    let before = fx.store.read(&key).snapshot;

    let mut watch = fx.store.subscribe(&key);
    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    assert!(matches!(outcome, ToggleOutcome::Failed { .. }));
    assert_eq!(outcome.severity(), Severity::Error);
    assert_eq!(
        outcome.message(),
        Some("Something went wrong. Please try again.")
    );

    let flipped = watch.try_recv().expect("flip notification");
    assert!(flipped.snapshot.engaged);
    let rolled_back = watch.try_recv().expect("rollback notification");
    assert_eq!(rolled_back.snapshot, before);
    assert!(watch.try_recv().is_none(), "no third notification");
}

#[tokio::test]
async fn rollback_on_a_never_fetched_record_restores_zero() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_like(Err(ApiError::Timeout { timeout_ms: 8_000 }));
    let key = EntityKey::post(fixtures::post(3), fixtures::viewer(1));

    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    assert!(matches!(outcome, ToggleOutcome::Failed { .. }));
    let record = fx.store.read(&key);
    assert!(!record.snapshot.engaged);
    assert_eq!(record.snapshot.counters.get(CounterKind::Likes), 0);
}

#[tokio::test]
async fn double_tap_reaches_the_api_once() {
    let fx = harness(ScriptedApi::gated());
    fx.api.queue_like(Ok(fixtures::like_confirmed(11)));
    let key = EntityKey::post(fixtures::post(4), fixtures::viewer(1));
    seed_likes(&fx.store, &key, false, 10);
    let _watch = fx.store.subscribe(&key);

    let first = fx.controller.toggle(&key, ToggleAction::Like);
    let second = async {
        let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;
        // Second tap resolved; let the parked first call answer.
        fx.api.release(1);
        outcome
    };
    let (first_outcome, second_outcome) = futures::future::join(first, second).await;

    assert_eq!(second_outcome, ToggleOutcome::AlreadyInProgress);
    assert_eq!(second_outcome.severity(), Severity::Silent);
    assert!(matches!(first_outcome, ToggleOutcome::Applied { .. }));
    assert_eq!(fx.api.like_calls(), 1);
    assert_eq!(
        fx.store.read(&key).snapshot.counters.get(CounterKind::Likes),
        11
    );
}

#[tokio::test]
async fn gate_reopens_after_settlement() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_like(Ok(fixtures::like_confirmed(11)));
    fx.api.queue_like(Ok(fixtures::unlike_confirmed(10)));
    let key = EntityKey::post(fixtures::post(5), fixtures::viewer(1));
    seed_likes(&fx.store, &key, false, 10);
    let _watch = fx.store.subscribe(&key);

    assert!(matches!(
        fx.controller.toggle(&key, ToggleAction::Like).await,
        ToggleOutcome::Applied { .. }
    ));
    fx.clock.advance(50);
    assert!(matches!(
        fx.controller.toggle(&key, ToggleAction::Like).await,
        ToggleOutcome::Applied { .. }
    ));

    assert_eq!(fx.api.like_calls(), 2);
    let record = fx.store.read(&key);
    assert!(!record.snapshot.engaged);
    assert_eq!(record.snapshot.counters.get(CounterKind::Likes), 10);
}

#[tokio::test]
async fn private_account_conflict_parks_the_request() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_follow(Err(ApiError::bare_status(409)));
    let viewer = fixtures::viewer(1);
    let target = fixtures::user(2);
    let key = EntityKey::user(target, viewer);
    fx.store.commit(
        &key,
        &EngagementDelta::new().counter(CounterKind::Followers, 40),
        SourcePriority::FreshFetch,
        9_000,
    );
    let _watch = fx.store.subscribe(&key);

    let outcome = fx.controller.toggle(&key, ToggleAction::Follow).await;

    assert_eq!(
        outcome,
        ToggleOutcome::Pending {
            message: "Follow request already pending".to_string()
        }
    );
    assert_eq!(outcome.severity(), Severity::Info);

    let record = fx.store.read(&key).snapshot;
    assert!(!record.engaged);
    assert!(record.requested);
    assert_eq!(record.counters.get(CounterKind::Followers), 40);
}

#[tokio::test]
async fn withdrawing_a_parked_request_clears_both_flags() {
    let fx = harness(ScriptedApi::new());
    fx.api
        .queue_follow(Ok(fixtures::unfollow_confirmed(40, 7)));
    let viewer = fixtures::viewer(1);
    let target = fixtures::user(2);
    let key = EntityKey::user(target, viewer);
    fx.store.commit(
        &key,
        &EngagementDelta::new()
            .requested(true)
            .counter(CounterKind::Followers, 40),
        SourcePriority::FreshFetch,
        9_000,
    );

    let mut watch = fx.store.subscribe(&key);
    let outcome = fx.controller.toggle(&key, ToggleAction::Follow).await;

    // The flip withdraws the request without moving any counter.
    let flipped = watch.try_recv().expect("flip notification");
    assert!(!flipped.snapshot.engaged);
    assert!(!flipped.snapshot.requested);
    assert_eq!(flipped.snapshot.counters.get(CounterKind::Followers), 40);

    assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    assert_eq!(fx.api.follow_targets(), vec![target]);
}

#[tokio::test]
async fn unlike_at_zero_never_shows_a_negative_count() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_like(Ok(fixtures::unlike_confirmed(0)));
    let key = EntityKey::post(fixtures::post(6), fixtures::viewer(1));
    fx.store.commit(
        &key,
        &EngagementDelta::new()
            .engaged(true)
            .counter(CounterKind::Likes, 0),
        SourcePriority::FreshFetch,
        9_000,
    );

    let mut watch = fx.store.subscribe(&key);
    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    let flipped = watch.try_recv().expect("flip notification");
    assert_eq!(flipped.snapshot.counters.get(CounterKind::Likes), 0);
    assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    assert_eq!(
        fx.store.read(&key).snapshot.counters.get(CounterKind::Likes),
        0
    );
}

#[tokio::test]
async fn self_follow_never_reaches_the_api() {
    let fx = harness(ScriptedApi::new());
    let viewer = fixtures::viewer(1);
    let key = EntityKey::user(viewer.as_user(), viewer);

    let outcome = fx.controller.toggle(&key, ToggleAction::Follow).await;

    assert_eq!(outcome, ToggleOutcome::SelfActionRejected);
    assert_eq!(outcome.severity(), Severity::Info);
    assert_eq!(fx.api.follow_calls(), 0);
    // Nothing was flipped, so nothing was materialized.
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn mismatched_action_fails_without_a_flip() {
    let fx = harness(ScriptedApi::new());
    let key = EntityKey::user(fixtures::user(2), fixtures::viewer(1));

    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    assert!(matches!(outcome, ToggleOutcome::Failed { .. }));
    assert_eq!(fx.api.like_calls(), 0);
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn save_settles_locally_without_the_api() {
    let fx = harness(ScriptedApi::new());
    let post = fixtures::post(7);
    let key = EntityKey::post(post, fixtures::viewer(1));
    let _watch = fx.store.subscribe(&key);

    let outcome = fx.controller.toggle(&key, ToggleAction::Save).await;

    assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    assert!(fx.saved.contains(&post));
    let record = fx.store.read(&key).snapshot;
    assert!(record.engaged);
    assert_eq!(record.counters.get(CounterKind::Saves), 1);

    fx.clock.advance(50);
    let outcome = fx.controller.toggle(&key, ToggleAction::Save).await;
    assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    assert!(!fx.saved.contains(&post));
    let record = fx.store.read(&key).snapshot;
    assert!(!record.engaged);
    assert_eq!(record.counters.get(CounterKind::Saves), 0);
    assert_eq!(fx.api.like_calls() + fx.api.follow_calls(), 0);
}

#[tokio::test]
async fn dropping_a_toggle_mid_request_reopens_the_gate() {
    let fx = harness(ScriptedApi::gated());
    fx.api.queue_like(Ok(fixtures::unlike_confirmed(10)));
    let key = EntityKey::post(fixtures::post(8), fixtures::viewer(1));
    seed_likes(&fx.store, &key, false, 10);
    let _watch = fx.store.subscribe(&key);

    // Abandon the first toggle while it is parked on the network.
    let abandoned = fx
        .controller
        .toggle(&key, ToggleAction::Like)
        .now_or_never();
    assert!(abandoned.is_none());

    fx.api.release(1);
    fx.clock.advance(50);
    let outcome = fx.controller.toggle(&key, ToggleAction::Like).await;

    assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    assert_eq!(fx.api.like_calls(), 2);
    let record = fx.store.read(&key);
    assert!(!record.in_flight);
    assert!(!record.snapshot.engaged);
    assert_eq!(record.snapshot.counters.get(CounterKind::Likes), 10);
}

#[tokio::test]
async fn pending_marker_in_a_plain_error_is_still_parked() {
    let fx = harness(ScriptedApi::new());
    fx.api.queue_follow(Err(ApiError::status(
        400,
        "A follow request already pending approval exists",
    )));
    let key = EntityKey::user(fixtures::user(2), fixtures::viewer(1));
    let _watch = fx.store.subscribe(&key);

    let outcome = fx.controller.toggle(&key, ToggleAction::Follow).await;

    assert!(matches!(outcome, ToggleOutcome::Pending { .. }));
    let record = fx.store.read(&key).snapshot;
    assert!(record.requested);
}
