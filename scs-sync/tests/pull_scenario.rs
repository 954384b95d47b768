//! End-to-end pull and push against the in-memory place.

use std::fs;
use std::sync::Arc;

use scs_core::{metadata, InstanceId, ScriptKind, TraversalPolicy};
use scs_remote::fake::{fake_client, FakeNode, FakeTransport};
use scs_sync::{pull, push, PullOptions, PushOptions};
use tempfile::TempDir;

fn nested_place() -> FakeTransport {
    FakeTransport::new()
        .with_children(
            "root",
            vec![
                FakeNode::script("id-a", "ScriptA", ScriptKind::Script, "print('A')"),
                FakeNode::folder("id-x", "FolderX"),
            ],
        )
        .with_children(
            "id-x",
            vec![FakeNode::script(
                "id-b",
                "ScriptB",
                ScriptKind::ModuleScript,
                "return 'B'",
            )],
        )
}

#[tokio::test]
async fn nested_folder_scripts_are_named_after_their_parent() {
    let (client, _) = fake_client(Arc::new(nested_place().with_pending_polls(2)));
    let mirror = TempDir::new().unwrap();

    let report = pull(Arc::new(client), &PullOptions::new(mirror.path()))
        .await
        .expect("pull");

    assert_eq!(report.containers_visited, 2);
    assert!(report.is_complete());
    let names: Vec<_> = report
        .written
        .iter()
        .map(|w| w.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["FolderX_ScriptB-ModuleScript.lua", "root_ScriptA-Script.lua"]
    );

    let b = fs::read_to_string(mirror.path().join("FolderX_ScriptB-ModuleScript.lua")).unwrap();
    assert!(b.starts_with("return 'B'"));
    assert_eq!(
        metadata::extract(&b).binding(),
        Some((InstanceId::from("id-b"), ScriptKind::ModuleScript))
    );
}

#[tokio::test]
async fn failing_subtree_does_not_stop_siblings() {
    let transport = FakeTransport::new()
        .with_children(
            "root",
            vec![
                FakeNode::folder("id-bad", "Broken"),
                FakeNode::folder("id-good", "Fine"),
            ],
        )
        .with_children(
            "id-good",
            vec![FakeNode::script("id-s", "S", ScriptKind::Script, "ok()")],
        )
        .with_failing_list("id-bad");
    let (client, _) = fake_client(Arc::new(transport));
    let mirror = TempDir::new().unwrap();

    let mut options = PullOptions::new(mirror.path());
    options.workers = 1;
    let report = pull(Arc::new(client), &options).await.expect("pull");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].container, InstanceId::from("id-bad"));
    assert_eq!(report.failures[0].name, "Broken");
    assert_eq!(report.written.len(), 1);
    assert!(mirror.path().join("Fine_S-Script.lua").exists());
}

#[tokio::test]
async fn services_are_walked_only_when_allowed() {
    let place = || {
        FakeTransport::new()
            .with_children("root", vec![FakeNode::service("id-sss", "ServerScriptService")])
            .with_children(
                "id-sss",
                vec![FakeNode::script("id-m", "Main", ScriptKind::Script, "main()")],
            )
    };

    let mirror = TempDir::new().unwrap();
    let (client, _) = fake_client(Arc::new(place()));
    let report = pull(Arc::new(client), &PullOptions::new(mirror.path()))
        .await
        .unwrap();
    assert!(report.written.is_empty(), "services are skipped by default");

    let mut allowed = PullOptions::new(mirror.path());
    allowed.allow_list = vec!["ServerScriptService".to_owned()];
    let (client, _) = fake_client(Arc::new(place()));
    let report = pull(Arc::new(client), &allowed).await.unwrap();
    assert_eq!(report.written.len(), 1);

    let mut everything = PullOptions::new(mirror.path());
    everything.traversal = TraversalPolicy::AllContainers;
    let (client, _) = fake_client(Arc::new(place()));
    let report = pull(Arc::new(client), &everything).await.unwrap();
    assert_eq!(report.written.len(), 1);
    assert!(mirror
        .path()
        .join("ServerScriptService_Main-Script.lua")
        .exists());
}

#[tokio::test]
async fn pulled_mirror_pushes_back_unchanged() {
    let transport = Arc::new(nested_place());
    let (client, _) = fake_client(transport.clone());
    let client = Arc::new(client);
    let mirror = TempDir::new().unwrap();

    pull(client.clone(), &PullOptions::new(mirror.path()))
        .await
        .expect("pull");
    let report = push(&client, &PushOptions::new(mirror.path())).expect("push");

    assert_eq!(report.pushed(), 2);
    let on_disk = fs::read_to_string(mirror.path().join("root_ScriptA-Script.lua")).unwrap();
    assert_eq!(transport.source_of("id-a").as_deref(), Some(on_disk.as_str()));
}
