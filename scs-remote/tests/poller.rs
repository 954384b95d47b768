//! Long-operation polling, rate-limit recovery and update retries against the
//! in-memory place.

use std::sync::Arc;

use rstest::rstest;
use scs_core::{InstanceId, NodeKind, OperationHandle, ScriptKind};
use scs_remote::{
    fake::{fake_client, FakeNode, FakeTransport},
    ApiRequest, ApiResponse, RemoteClient, RemoteError, Transport,
};

fn place() -> FakeTransport {
    FakeTransport::new().with_children(
        "root",
        vec![
            FakeNode::script("a", "ScriptA", ScriptKind::Script, "print(1)"),
            FakeNode::folder("x", "FolderX"),
        ],
    )
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
fn n_pending_polls_then_done_costs_n_plus_one_fetches(#[case] pending: u32) {
    let transport = Arc::new(place().with_pending_polls(pending));
    let (client, sleeper) = fake_client(transport.clone());

    let children = client.list_children(&InstanceId::root()).expect("list");

    assert_eq!(children.len(), 2);
    assert_eq!(transport.operation_fetches(), pending as usize + 1);

    let delays = sleeper.delays();
    assert_eq!(delays.len(), pending as usize + 1, "one sleep before each fetch");
    assert!(
        delays.windows(2).all(|w| w[0] <= w[1]),
        "delays must not decrease: {delays:?}"
    );
}

#[test]
fn exhausted_budget_is_timeout() {
    let transport = Arc::new(place().with_pending_polls(1_000));
    let (client, _sleeper) = fake_client(transport.clone());
    let budget = client.policy().poll.max_attempts;

    let err = client.list_children(&InstanceId::root()).unwrap_err();

    match err {
        RemoteError::Timeout { attempts, .. } => assert_eq!(attempts, budget),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(transport.operation_fetches(), budget as usize);
}

#[test]
fn unknown_operation_propagates_status() {
    let (client, _) = fake_client(Arc::new(place()));
    let err = client
        .poll(&OperationHandle::from("universes/100/operations/missing"))
        .unwrap_err();
    assert_eq!(err.status(), Some(404), "got: {err}");
}

#[test]
fn list_children_classifies_nodes() {
    let (client, _) = fake_client(Arc::new(place()));
    let children = client.list_children(&InstanceId::root()).expect("list");

    let script = children.iter().find(|n| n.name == "ScriptA").unwrap();
    assert_eq!(script.kind, NodeKind::Script(ScriptKind::Script));
    assert_eq!(script.source.as_deref(), Some("print(1)"));

    let folder = children.iter().find(|n| n.name == "FolderX").unwrap();
    assert!(folder.is_folder());
    assert!(folder.has_children);
}

#[test]
fn list_failure_is_remote_request_failed() {
    let (client, _) = fake_client(Arc::new(place().with_failing_list("root")));
    let err = client.list_children(&InstanceId::root()).unwrap_err();
    assert_eq!(err.status(), Some(500), "got: {err}");
}

/// A listing that finishes synchronously needs no polling.
struct ImmediateListing;

impl Transport for ImmediateListing {
    fn send(&self, _request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
        Ok(ApiResponse {
            status: 200,
            body: r#"{"done": true, "response": {"instances": [
                {"hasChildren": false, "engineInstance": {"Id": "m", "Name": "Mod",
                 "Details": {"ModuleScript": {"Source": "return {}"}}}}
            ]}}"#
                .to_owned(),
        })
    }
}

#[test]
fn done_listing_skips_polling() {
    let client = RemoteClient::new(scs_remote::fake::fake_config(), Arc::new(ImmediateListing))
        .with_policy(scs_remote::fake::fast_policy());
    let children = client.list_children(&InstanceId::root()).expect("list");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].kind, NodeKind::Script(ScriptKind::ModuleScript));
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[test]
fn rate_limit_cools_down_reconnects_and_keeps_poll_budget() {
    let transport = Arc::new(place().with_rate_limits(3).with_pending_polls(2));
    let (client, sleeper) = fake_client(transport.clone());
    let cooldown = client.policy().rate_limit_cooldown;

    let children = client.list_children(&InstanceId::root()).expect("list");

    assert_eq!(children.len(), 2);
    assert_eq!(transport.reconnects(), 3);
    let cooldowns = sleeper.delays().iter().filter(|d| **d == cooldown).count();
    assert_eq!(cooldowns, 3);
    // 3 throttled listChildren attempts + 1 accepted, then 3 status fetches.
    assert_eq!(transport.requests().len(), 7);
    assert_eq!(transport.operation_fetches(), 3);
}

#[test]
fn throttled_status_fetches_do_not_spend_poll_budget() {
    let budget = scs_remote::fake::fast_policy().poll.max_attempts;
    let transport = Arc::new(
        place()
            .with_throttled_fetches()
            .with_pending_polls(budget - 1),
    );
    let (client, sleeper) = fake_client(transport.clone());
    let cooldown = client.policy().rate_limit_cooldown;

    let children = client
        .list_children(&InstanceId::root())
        .expect("every fetch recovers after one cooldown");

    assert_eq!(children.len(), 2);
    // Each of the `budget` fetches was answered 429 once, then served.
    assert_eq!(transport.operation_fetches(), 2 * budget as usize);
    assert_eq!(transport.reconnects(), budget);
    let cooldowns = sleeper.delays().iter().filter(|d| **d == cooldown).count();
    assert_eq!(cooldowns, budget as usize);
}

#[test]
fn persistent_rate_limit_surfaces_after_cap() {
    let transport = Arc::new(place().with_rate_limits(100));
    let (client, _) = fake_client(transport.clone());
    let cap = client.policy().max_rate_limit_retries;

    let err = client.list_children(&InstanceId::root()).unwrap_err();

    assert!(matches!(err, RemoteError::RateLimited { retries, .. } if retries == cap), "got: {err}");
    assert_eq!(transport.requests().len(), cap as usize + 1);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[test]
fn update_sends_kind_keyed_source() {
    let transport = Arc::new(place());
    let (client, _) = fake_client(transport.clone());

    client
        .update(&InstanceId::from("a"), ScriptKind::Script, "print(2)")
        .expect("update");

    assert_eq!(transport.source_of("a").as_deref(), Some("print(2)"));
    let requests = transport.requests();
    let patch = requests.last().unwrap();
    assert!(patch.url.ends_with("/instances/a"));
}

#[test]
fn update_with_retry_recovers_from_transient_failures() {
    let transport = Arc::new(place().with_failing_update("a", 2));
    let (client, sleeper) = fake_client(transport.clone());
    let initial = client.policy().update.initial;

    client
        .update_with_retry(&InstanceId::from("a"), ScriptKind::Script, "print(3)")
        .expect("third attempt succeeds");

    assert_eq!(transport.updates().len(), 1);
    assert_eq!(sleeper.delays(), vec![initial, initial * 2]);
}

#[test]
fn update_with_retry_returns_last_error_when_exhausted() {
    let transport = Arc::new(place().with_failing_update("a", 50));
    let (client, _) = fake_client(transport.clone());
    let attempts = client.policy().update.max_attempts as usize;

    let err = client
        .update_with_retry(&InstanceId::from("a"), ScriptKind::Script, "x")
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(transport.requests().len(), attempts);
    assert!(transport.updates().is_empty());
}

#[test]
fn throttled_updates_do_not_spend_update_attempts() {
    let attempts = scs_remote::fake::fast_policy().update.max_attempts;
    let transport = Arc::new(
        place()
            .with_throttled_updates()
            .with_failing_update("a", attempts - 1),
    );
    let (client, sleeper) = fake_client(transport.clone());
    let policy = *client.policy();

    client
        .update_with_retry(&InstanceId::from("a"), ScriptKind::Script, "print(4)")
        .expect("last attempt succeeds");

    assert_eq!(transport.updates().len(), 1);
    assert_eq!(transport.source_of("a").as_deref(), Some("print(4)"));
    assert_eq!(transport.reconnects(), attempts);
    // Every PATCH is throttled once before it is handled.
    assert_eq!(transport.requests().len(), 2 * attempts as usize);
    let delays = sleeper.delays();
    let cooldowns = delays
        .iter()
        .filter(|d| **d == policy.rate_limit_cooldown)
        .count();
    assert_eq!(cooldowns, attempts as usize);
    let backoffs: Vec<_> = delays
        .into_iter()
        .filter(|d| *d != policy.rate_limit_cooldown)
        .collect();
    assert_eq!(backoffs, vec![policy.update.initial, policy.update.initial * 2]);
}
