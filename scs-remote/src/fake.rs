//! In-memory place tree speaking the same wire format as the real API.
//!
//! Used by this crate's tests and, through the `test-util` feature, by
//! downstream crates. It understands the three routes the client uses:
//! `…/instances/{id}:listChildren`, `{operation path}` and
//! `PATCH …/instances/{id}`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};

use scs_core::ScriptKind;

use crate::backoff::{Backoff, RetryPolicy};
use crate::client::{RemoteClient, RemoteConfig, Sleeper};
use crate::error::RemoteError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

pub const FAKE_BASE_URL: &str = "http://place.test/cloud/v2";
pub const FAKE_UNIVERSE: &str = "100";
pub const FAKE_PLACE: &str = "200";

/// One child entry in the fake tree.
#[derive(Debug, Clone)]
pub struct FakeNode {
    pub id: String,
    pub name: String,
    details: Value,
    has_children: bool,
}

impl FakeNode {
    pub fn script(id: &str, name: &str, kind: ScriptKind, source: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            details: json!({ kind.as_str(): { "Source": source } }),
            has_children: false,
        }
    }

    pub fn folder(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            details: json!({ "Folder": {} }),
            has_children: true,
        }
    }

    /// A non-script, non-folder container such as a service.
    pub fn service(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            details: json!({}),
            has_children: true,
        }
    }

    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }

    fn to_wire(&self) -> Value {
        json!({
            "hasChildren": self.has_children,
            "engineInstance": {
                "Id": self.id,
                "Name": self.name,
                "Details": self.details,
            }
        })
    }
}

#[derive(Default)]
struct FakeState {
    children: HashMap<String, Vec<FakeNode>>,
    sources: HashMap<String, String>,
    operations: HashMap<String, (u32, Value)>,
    next_operation: u64,
    pending_polls: u32,
    failing_lists: HashSet<String>,
    failing_updates: HashMap<String, u32>,
    rate_limits: u32,
    throttle_fetches: bool,
    throttle_updates: bool,
    fetch_throttled: bool,
    update_throttled: bool,
    requests: Vec<ApiRequest>,
    updates: Vec<(String, Value)>,
    reconnects: u32,
}

/// Scriptable [`Transport`] over an in-memory tree.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the children listed under `parent` (`"root"` for the top).
    pub fn with_children(self, parent: &str, children: Vec<FakeNode>) -> Self {
        {
            let mut state = self.lock();
            for child in &children {
                if let Some(source) = child.details.as_object().and_then(|d| {
                    d.values()
                        .find_map(|props| props.get("Source").and_then(Value::as_str))
                }) {
                    state.sources.insert(child.id.clone(), source.to_owned());
                }
            }
            state.children.insert(parent.to_owned(), children);
        }
        self
    }

    /// Number of not-done responses each operation gives before completing.
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.lock().pending_polls = polls;
        self
    }

    /// Make `listChildren` on `parent` answer HTTP 500.
    pub fn with_failing_list(self, parent: &str) -> Self {
        self.lock().failing_lists.insert(parent.to_owned());
        self
    }

    /// Make the next `times` updates of `id` answer HTTP 503.
    pub fn with_failing_update(self, id: &str, times: u32) -> Self {
        self.lock().failing_updates.insert(id.to_owned(), times);
        self
    }

    /// Answer the next `times` requests, of any route, with HTTP 429.
    pub fn with_rate_limits(self, times: u32) -> Self {
        self.lock().rate_limits = times;
        self
    }

    /// Answer every operation status fetch with one HTTP 429 before serving it.
    pub fn with_throttled_fetches(self) -> Self {
        self.lock().throttle_fetches = true;
        self
    }

    /// Answer every update with one HTTP 429 before handling it.
    pub fn with_throttled_updates(self) -> Self {
        self.lock().throttle_updates = true;
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Number of operation status fetches seen so far.
    pub fn operation_fetches(&self) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == Method::Get && !r.url.ends_with(":listChildren"))
            .count()
    }

    /// `(instance id, parsed body)` of every accepted update, in order.
    pub fn updates(&self) -> Vec<(String, Value)> {
        self.lock().updates.clone()
    }

    /// Current remote source of `id`.
    pub fn source_of(&self, id: &str) -> Option<String> {
        self.lock().sources.get(id).cloned()
    }

    pub fn reconnects(&self) -> u32 {
        self.lock().reconnects
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if state.rate_limits > 0 {
            state.rate_limits -= 1;
            return Ok(respond(429, json!({ "message": "Too many requests" })));
        }

        let Some(route) = request.url.strip_prefix(FAKE_BASE_URL) else {
            return Ok(respond(404, json!({ "message": "unknown host" })));
        };
        let route = route.trim_start_matches('/');
        let instances_prefix = format!("universes/{FAKE_UNIVERSE}/places/{FAKE_PLACE}/instances/");

        match request.method {
            Method::Get => {
                if let Some(parent) = route
                    .strip_prefix(&instances_prefix)
                    .and_then(|rest| rest.strip_suffix(":listChildren"))
                {
                    if state.failing_lists.contains(parent) {
                        return Ok(respond(500, json!({ "message": "internal error" })));
                    }
                    let instances: Vec<Value> = state
                        .children
                        .get(parent)
                        .map(|nodes| nodes.iter().map(FakeNode::to_wire).collect())
                        .unwrap_or_default();
                    state.next_operation += 1;
                    let path = format!(
                        "universes/{FAKE_UNIVERSE}/places/{FAKE_PLACE}/instances/{parent}/operations/op-{}",
                        state.next_operation
                    );
                    let pending = state.pending_polls;
                    state
                        .operations
                        .insert(path.clone(), (pending, json!({ "instances": instances })));
                    return Ok(respond(200, json!({ "path": path, "done": false })));
                }

                if state.throttle_fetches {
                    state.fetch_throttled = !state.fetch_throttled;
                    if state.fetch_throttled {
                        return Ok(respond(429, json!({ "message": "Too many requests" })));
                    }
                }

                match state.operations.get_mut(route) {
                    Some((remaining, _)) if *remaining > 0 => {
                        *remaining -= 1;
                        Ok(respond(200, json!({ "path": route, "done": false })))
                    }
                    Some((_, response)) => Ok(respond(
                        200,
                        json!({ "path": route, "done": true, "response": response }),
                    )),
                    None => Ok(respond(404, json!({ "message": "no such operation" }))),
                }
            }
            Method::Patch => {
                let Some(id) = route.strip_prefix(&instances_prefix) else {
                    return Ok(respond(404, json!({ "message": "no such route" })));
                };
                let id = id.to_owned();
                if state.throttle_updates {
                    state.update_throttled = !state.update_throttled;
                    if state.update_throttled {
                        return Ok(respond(429, json!({ "message": "Too many requests" })));
                    }
                }
                if let Some(remaining) = state.failing_updates.get_mut(&id) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Ok(respond(503, json!({ "message": "unavailable" })));
                    }
                }
                let body: Value = request
                    .body
                    .as_deref()
                    .and_then(|b| serde_json::from_str(b).ok())
                    .unwrap_or(Value::Null);
                let source = body["engineInstance"]["Details"]
                    .as_object()
                    .and_then(|details| details.values().next())
                    .and_then(|props| props["Source"].as_str())
                    .map(str::to_owned);
                if let Some(source) = source {
                    state.sources.insert(id.clone(), source);
                }
                state.updates.push((id.clone(), body));
                Ok(respond(
                    200,
                    json!({ "path": format!("{instances_prefix}{id}") }),
                ))
            }
        }
    }

    fn reconnect(&self) {
        self.lock().reconnects += 1;
    }
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: body.to_string(),
    }
}

/// [`Sleeper`] that records requested delays instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        match self.delays.lock() {
            Ok(delays) => delays.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        match self.delays.lock() {
            Ok(mut delays) => delays.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}

/// Config pointing at the fake routes.
pub fn fake_config() -> RemoteConfig {
    RemoteConfig::new(FAKE_BASE_URL, FAKE_UNIVERSE, FAKE_PLACE)
}

/// Short schedules so tests stay fast even with a real sleeper.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        poll: Backoff::new(Duration::from_millis(1), 5),
        update: Backoff::new(Duration::from_millis(1), 3),
        rate_limit_cooldown: Duration::from_millis(15),
        max_rate_limit_retries: 4,
    }
}

/// Client over `transport` with [`fast_policy`] and a [`RecordingSleeper`].
pub fn fake_client(transport: Arc<FakeTransport>) -> (RemoteClient, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = RemoteClient::new(fake_config(), transport)
        .with_policy(fast_policy())
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}
