//! Integration coverage of the six seed scenarios end-to-end through the
//! public `Kernel` API, independent of the crate's own inline unit tests.
//!
//! `kernel_id="k1"`, `variant="strict"` (or the variant the scenario names),
//! virtual clock starting at 1000, +1 ms per submit.

use governor_kernel::physics::canonical::Value;
use governor_kernel::{
    Decision, Kernel, KernelState, PolicyBuilder, Request, Status, ToolCall, ToolRegistry,
    Variant, VirtualClock,
};

fn registry() -> ToolRegistry {
    let mut r = ToolRegistry::new();
    r.register("echo", |params: &governor_kernel::compat::BTreeMap<String, Value>| {
        let mut out = Value::object();
        out.insert(
            "echoed".to_string(),
            params.get("message").cloned().unwrap_or(Value::Null),
        );
        Ok(Value::Object(out))
    });
    r.register("boom", |_: &governor_kernel::compat::BTreeMap<String, Value>| {
        Err("kaboom".to_string())
    });
    r
}

fn strict_kernel() -> Kernel {
    let policy = PolicyBuilder::new()
        .allow_actor("a")
        .allow_tool("echo")
        .allow_tool("boom")
        .max_intent_length(100)
        .max_params_bytes(1000)
        .build()
        .unwrap();
    Kernel::boot(
        "k1",
        Variant::Strict,
        policy,
        registry(),
        Box::new(VirtualClock::starting_at(1000)),
    )
}

fn req(id: &str, actor: &str, intent: &str, tool_call: Option<ToolCall>) -> Request {
    Request {
        request_id: id.to_string(),
        actor: actor.to_string(),
        intent: intent.to_string(),
        tool_call,
        evidence: None,
        constraints: None,
        timestamp_ms: 1000,
    }
}

#[test]
fn scenario_1_happy_path() {
    let mut k = strict_kernel();
    let mut params = governor_kernel::compat::BTreeMap::new();
    params.insert("message".to_string(), Value::str("hi"));
    let r = k.submit(req(
        "r1",
        "a",
        "say hi",
        Some(ToolCall {
            name: "echo".to_string(),
            params,
        }),
    ));
    assert_eq!(r.decision, Decision::Allow);
    let mut expected = Value::object();
    expected.insert("echoed".to_string(), Value::str("hi"));
    assert_eq!(r.tool_result, Some(Value::Object(expected)));
    assert_eq!(k.ledger_size(), 1);
    let bundle = k.export_evidence();
    assert_eq!(bundle.root_hash, bundle.entries[0].entry_hash);
}

#[test]
fn scenario_2_unknown_actor() {
    let mut k = strict_kernel();
    let r = k.submit(req("r2", "b", "say hi", None));
    assert_eq!(r.decision, Decision::Deny);
    assert!(r.error_message.unwrap().contains("actor"));
    assert_eq!(k.ledger_size(), 1);
    let bundle = k.export_evidence();
    assert!(governor_kernel::replay_and_verify(&bundle, &bundle.root_hash).0);
}

#[test]
fn scenario_3_unknown_tool_denied_before_handler_lookup() {
    let mut k = strict_kernel();
    let r = k.submit(req(
        "r3",
        "a",
        "do a thing",
        Some(ToolCall {
            name: "nope".to_string(),
            params: governor_kernel::compat::BTreeMap::new(),
        }),
    ));
    assert_eq!(r.decision, Decision::Deny);
    assert_eq!(k.state(), KernelState::Idle);
    assert_eq!(k.ledger_size(), 1);
}

#[test]
fn scenario_4_execution_error() {
    let mut k = strict_kernel();
    let r = k.submit(req(
        "r4",
        "a",
        "x",
        Some(ToolCall {
            name: "boom".to_string(),
            params: governor_kernel::compat::BTreeMap::new(),
        }),
    ));
    assert_eq!(r.status, Status::Failed);
    assert_eq!(r.decision, Decision::Deny);
    assert_eq!(
        r.error_message,
        Some("execution failed: kaboom".to_string())
    );
    assert_eq!(k.state(), KernelState::Idle);
    assert_eq!(k.ledger_size(), 1);
}

#[test]
fn scenario_5_evidence_first_variant() {
    let policy = PolicyBuilder::new()
        .allow_actor("a")
        .allow_tool(governor_kernel::model::WILDCARD)
        .max_intent_length(100)
        .max_params_bytes(1000)
        .build()
        .unwrap();
    let mut k = Kernel::boot(
        "k1",
        Variant::EvidenceFirst,
        policy,
        ToolRegistry::new(),
        Box::new(VirtualClock::starting_at(1000)),
    );
    let mut r1 = req("r5a", "a", "do it", None);
    r1.evidence = None;
    let resp1 = k.submit(r1);
    assert_eq!(resp1.decision, Decision::Deny);
    assert!(resp1.error_message.unwrap().contains("evidence required"));

    let mut r2 = req("r5b", "a", "do it", None);
    r2.evidence = Some(vec!["e1".to_string()]);
    let resp2 = k.submit(r2);
    assert_eq!(resp2.decision, Decision::Allow);

    let bundle = k.export_evidence();
    assert_eq!(bundle.entries.len(), 2);
    assert_eq!(bundle.entries[1].prev_hash, bundle.entries[0].entry_hash);
}

#[test]
fn scenario_6_tamper_detection() {
    let mut k = strict_kernel();
    for i in 0..3 {
        let mut params = governor_kernel::compat::BTreeMap::new();
        params.insert("message".to_string(), Value::str("hi"));
        k.submit(req(
            &format!("r{i}"),
            "a",
            "say hi",
            Some(ToolCall {
                name: "echo".to_string(),
                params,
            }),
        ));
    }
    let mut bundle = k.export_evidence();
    let mut c = bundle.entries[1].intent.clone();
    c.push('!');
    bundle.entries[1].intent = c;
    let (ok, errors) = governor_kernel::replay_and_verify(&bundle, &bundle.root_hash);
    assert!(!ok);
    assert!(!errors.is_empty());
}
