//! Round-trip tests for the metadata codec over realistic script bodies.
//!
//! Each `#[case]` is isolated — no shared state.

use rstest::rstest;
use scs_core::{
    metadata::{self, BLOCK_END, BLOCK_START},
    InstanceId, ScriptKind,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const MODULE: &str = r#"local Inventory = {}
Inventory.__index = Inventory

--[[
    Multi-line comment that is not ours.
]]
function Inventory.new(owner)
    return setmetatable({ owner = owner, items = {} }, Inventory)
end

return Inventory
"#;

const CRLF_SCRIPT: &str = "local Players = game:GetService(\"Players\")\r\nprint(#Players:GetPlayers())\r\n";

const UNICODE_SCRIPT: &str = "print(\"こんにちは — привет — 你好\")";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[rstest]
#[case::module(MODULE, "5f8c1a7e-0000-4b1e-9c61-2f3e2a1d0c11", ScriptKind::ModuleScript)]
#[case::crlf(CRLF_SCRIPT, "RBX0123456789ABCDEF", ScriptKind::Script)]
#[case::unicode(UNICODE_SCRIPT, "id-ünï", ScriptKind::LocalScript)]
#[case::empty("", "root-child", ScriptKind::Script)]
fn extract_recovers_embedded_identity(
    #[case] content: &str,
    #[case] id: &str,
    #[case] kind: ScriptKind,
) {
    let id = InstanceId::from(id);
    let tagged = metadata::embed(content, &id, kind);

    assert!(tagged.starts_with(content), "original content must be a prefix");
    assert_eq!(metadata::extract(&tagged).binding(), Some((id, kind)));
}

#[rstest]
#[case::module(MODULE)]
#[case::crlf(CRLF_SCRIPT)]
#[case::unicode(UNICODE_SCRIPT)]
fn retagging_keeps_one_block_and_surrounding_text(#[case] content: &str) {
    let first = metadata::embed(content, &InstanceId::from("one"), ScriptKind::Script);
    let edited = first.replace("print", "warn");
    let second = metadata::embed(&edited, &InstanceId::from("two"), ScriptKind::LocalScript);

    assert_eq!(second.matches(BLOCK_START).count(), 1);
    assert_eq!(second.matches(BLOCK_END).count(), 1);
    assert_eq!(
        metadata::extract(&second).binding(),
        Some((InstanceId::from("two"), ScriptKind::LocalScript))
    );

    let block_at = second.find(BLOCK_START).unwrap();
    assert_eq!(&second[..block_at], &edited[..block_at]);
}

#[test]
fn untagged_script_has_no_binding() {
    let meta = metadata::extract(MODULE);
    assert!(meta.instance_id.is_none());
    assert!(meta.instance_type.is_none());
}
