//! Audit Ledger (C2, §4.2).
//!
//! Append-only sequence of entries, each linking the previous via hash.
//! Grounded in the teacher's `EpochState` self-commit pattern
//! (`state/epoch.rs`): build the entry with a placeholder hash, compute the
//! canonical bytes of everything else, hash, then assign.

use crate::error::KernelError;
use crate::model::{AuditEntry, Decision, EvidenceBundle, KernelState};
use crate::physics::canonical::Value;
use crate::physics::hashing::{sha256, to_hex, GENESIS_HASH};

/// Append-only, single-writer (by the kernel's own discipline, §5) ledger.
pub struct AuditLedger {
    entries: Vec<AuditEntry>,
    head: String,
}

/// Fields needed to append one entry; `prev_hash` and `entry_hash` are
/// computed by the ledger itself, never supplied by the caller.
pub struct PartialEntry {
    pub request_id: String,
    pub actor: String,
    pub intent: String,
    pub decision: Decision,
    pub state_from: KernelState,
    pub state_to: KernelState,
    pub timestamp_ms: i64,
    pub tool_name: Option<String>,
    pub params_hash: Option<String>,
    pub evidence_hash: Option<String>,
    pub error: Option<String>,
}

fn decision_value(d: Decision) -> Value {
    Value::str(d.as_str())
}

fn opt_str(s: &Option<String>) -> Value {
    match s {
        Some(v) => Value::str(v.clone()),
        None => Value::Null,
    }
}

/// Build the canonical fields object for an entry, excluding `prev_hash` and
/// `entry_hash` themselves (those would be circular). Key order follows the
/// wire format in §6, though the encoder sorts regardless.
/// Exposed to the replay verifier so both sides of the chain (append-time
/// hashing and replay-time re-hashing) derive entry bytes from one function,
/// not two copies that could silently drift apart.
pub(crate) fn entry_fields_for_replay(p: &PartialEntry) -> Value {
    entry_fields(p)
}

/// Build one entry's §6 wire-format object: the same fields as
/// `entry_fields`, plus `prev_hash`/`entry_hash` (omitted there only to
/// avoid the circular hash dependency; the exported wire format carries
/// both, per the documented key order `actor, decision, entry_hash, error,
/// evidence_hash, intent, params_hash, prev_hash, request_id, state_from,
/// state_to, timestamp_ms, tool_name`).
fn entry_wire_value(entry: &AuditEntry) -> Value {
    let mut obj = Value::object();
    obj.insert("actor".into(), Value::str(entry.actor.clone()));
    obj.insert("decision".into(), decision_value(entry.decision));
    obj.insert("entry_hash".into(), Value::str(entry.entry_hash.clone()));
    obj.insert("error".into(), opt_str(&entry.error));
    obj.insert("evidence_hash".into(), opt_str(&entry.evidence_hash));
    obj.insert("intent".into(), Value::str(entry.intent.clone()));
    obj.insert("params_hash".into(), opt_str(&entry.params_hash));
    obj.insert("prev_hash".into(), Value::str(entry.prev_hash.clone()));
    obj.insert("request_id".into(), Value::str(entry.request_id.clone()));
    obj.insert("state_from".into(), Value::str(entry.state_from.as_str()));
    obj.insert("state_to".into(), Value::str(entry.state_to.as_str()));
    obj.insert("timestamp_ms".into(), Value::Int(entry.timestamp_ms));
    obj.insert("tool_name".into(), opt_str(&entry.tool_name));
    Value::Object(obj)
}

/// Build the §6 wire-format `Value` for a whole bundle: top-level keys
/// `entries, exported_at_ms, kernel_id, root_hash, variant` (the wire key is
/// `variant`, not the in-memory struct's `variant_tag` field name).
pub fn bundle_wire_value(bundle: &EvidenceBundle) -> Value {
    let mut obj = Value::object();
    obj.insert(
        "entries".into(),
        Value::Array(bundle.entries.iter().map(entry_wire_value).collect()),
    );
    obj.insert("exported_at_ms".into(), Value::Int(bundle.exported_at_ms));
    obj.insert("kernel_id".into(), Value::str(bundle.kernel_id.clone()));
    obj.insert("root_hash".into(), Value::str(bundle.root_hash.clone()));
    obj.insert("variant".into(), Value::str(bundle.variant_tag.clone()));
    Value::Object(obj)
}

/// The bytes of the §6 canonical wire-format serialization — what an
/// external replay verifier canonicalizes and rehashes.
pub fn canonical_bundle_bytes(bundle: &EvidenceBundle) -> Vec<u8> {
    crate::physics::canonical::canonical_bytes(&bundle_wire_value(bundle))
}

fn entry_fields(p: &PartialEntry) -> Value {
    let mut obj = Value::object();
    obj.insert("actor".into(), Value::str(p.actor.clone()));
    obj.insert("decision".into(), decision_value(p.decision));
    obj.insert("error".into(), opt_str(&p.error));
    obj.insert("evidence_hash".into(), opt_str(&p.evidence_hash));
    obj.insert("intent".into(), Value::str(p.intent.clone()));
    obj.insert("params_hash".into(), opt_str(&p.params_hash));
    obj.insert("request_id".into(), Value::str(p.request_id.clone()));
    obj.insert("state_from".into(), Value::str(p.state_from.as_str()));
    obj.insert("state_to".into(), Value::str(p.state_to.as_str()));
    obj.insert("timestamp_ms".into(), Value::Int(p.timestamp_ms));
    obj.insert("tool_name".into(), opt_str(&p.tool_name));
    Value::Object(obj)
}

impl AuditLedger {
    pub fn new() -> Self {
        AuditLedger {
            entries: Vec::new(),
            head: to_hex(&GENESIS_HASH),
        }
    }

    /// `prev_hash` to use for the next append.
    pub fn head(&self) -> String {
        self.head.clone()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Compute `prev_hash`, compute `entry_hash`, store, advance the head.
    /// All-or-nothing: on `Err`, the ledger is unchanged.
    pub fn append(&mut self, partial: PartialEntry) -> Result<String, KernelError> {
        let prev_hash = self.head.clone();
        let fields_bytes = crate::physics::canonical::canonical_bytes(&entry_fields(&partial));
        let mut preimage = Vec::with_capacity(prev_hash.len() + 1 + fields_bytes.len());
        preimage.extend_from_slice(prev_hash.as_bytes());
        preimage.push(b':');
        preimage.extend_from_slice(&fields_bytes);
        let entry_hash = to_hex(&sha256(&preimage));

        let entry = AuditEntry {
            prev_hash: prev_hash.clone(),
            entry_hash: entry_hash.clone(),
            request_id: partial.request_id,
            actor: partial.actor,
            intent: partial.intent,
            decision: partial.decision,
            state_from: partial.state_from,
            state_to: partial.state_to,
            timestamp_ms: partial.timestamp_ms,
            tool_name: partial.tool_name,
            params_hash: partial.params_hash,
            evidence_hash: partial.evidence_hash,
            error: partial.error,
        };
        self.entries.push(entry);
        self.head = entry_hash.clone();
        Ok(entry_hash)
    }

    /// Deep-copy snapshot of entries plus the current root.
    pub fn export(&self, kernel_id: &str, variant_tag: &str, exported_at_ms: i64) -> EvidenceBundle {
        EvidenceBundle {
            kernel_id: kernel_id.to_string(),
            variant_tag: variant_tag.to_string(),
            entries: self.entries.clone(),
            root_hash: self.head.clone(),
            exported_at_ms,
        }
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(request_id: &str) -> PartialEntry {
        PartialEntry {
            request_id: request_id.to_string(),
            actor: "a".to_string(),
            intent: "do things".to_string(),
            decision: Decision::Allow,
            state_from: KernelState::Arbitrating,
            state_to: KernelState::Auditing,
            timestamp_ms: 1000,
            tool_name: None,
            params_hash: None,
            evidence_hash: None,
            error: None,
        }
    }

    #[test]
    fn empty_ledger_head_is_genesis() {
        let l = AuditLedger::new();
        assert_eq!(l.head(), "0".repeat(64));
        assert_eq!(l.size(), 0);
    }

    #[test]
    fn append_advances_head_and_size() {
        let mut l = AuditLedger::new();
        let h = l.append(sample("r1")).unwrap();
        assert_eq!(l.size(), 1);
        assert_eq!(l.head(), h);
        assert_ne!(h, "0".repeat(64));
    }

    #[test]
    fn chain_links_prev_hash_to_prior_entry_hash() {
        let mut l = AuditLedger::new();
        let h1 = l.append(sample("r1")).unwrap();
        l.append(sample("r2")).unwrap();
        let bundle = l.export("k1", "strict", 2000);
        assert_eq!(bundle.entries[0].prev_hash, "0".repeat(64));
        assert_eq!(bundle.entries[1].prev_hash, h1);
        assert_eq!(bundle.entries[1].prev_hash, bundle.entries[0].entry_hash);
    }

    #[test]
    fn same_request_id_twice_yields_distinct_entry_hashes() {
        let mut l = AuditLedger::new();
        let h1 = l.append(sample("same")).unwrap();
        let h2 = l.append(sample("same")).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn export_is_a_deep_copy_not_a_live_view() {
        let mut l = AuditLedger::new();
        l.append(sample("r1")).unwrap();
        let bundle = l.export("k1", "strict", 1234);
        l.append(sample("r2")).unwrap();
        assert_eq!(bundle.entries.len(), 1, "snapshot must not see later appends");
    }

    #[test]
    fn export_twice_in_succession_is_identical_modulo_exported_at_ms() {
        let mut l = AuditLedger::new();
        l.append(sample("r1")).unwrap();
        let b1 = l.export("k1", "strict", 1);
        let b2 = l.export("k1", "strict", 2);
        assert_eq!(b1.entries, b2.entries);
        assert_eq!(b1.root_hash, b2.root_hash);
        assert_ne!(b1.exported_at_ms, b2.exported_at_ms);
    }

    #[test]
    fn canonical_bundle_bytes_emits_the_documented_wire_format() {
        let mut l = AuditLedger::new();
        l.append(sample("r1")).unwrap();
        let bundle = l.export("k1", "strict", 5000);
        let bytes = canonical_bundle_bytes(&bundle);
        let text = String::from_utf8(bytes).unwrap();

        // Top-level keys, sorted: entries, exported_at_ms, kernel_id,
        // root_hash, variant (the wire key, not the struct field name).
        assert!(text.starts_with(r#"{"entries":[{"#));
        assert!(text.contains(r#""exported_at_ms":5000"#));
        assert!(text.contains(r#""kernel_id":"k1""#));
        assert!(text.contains(&format!(r#""root_hash":"{}""#, bundle.root_hash)));
        assert!(text.ends_with(r#""variant":"strict"}"#));
        assert!(!text.contains("variant_tag"));

        // Per-entry key order.
        let entry_start = text.find(r#"{"actor""#).expect("entry object");
        let entry_text = &text[entry_start..];
        let order = [
            "actor",
            "decision",
            "entry_hash",
            "error",
            "evidence_hash",
            "intent",
            "params_hash",
            "prev_hash",
            "request_id",
            "state_from",
            "state_to",
            "timestamp_ms",
            "tool_name",
        ];
        let mut last_pos = 0;
        for key in order {
            let needle = format!("\"{key}\":");
            let pos = entry_text.find(&needle).unwrap_or_else(|| panic!("missing key {key}"));
            assert!(pos >= last_pos, "key {key} out of order");
            last_pos = pos;
        }
    }

    #[test]
    fn canonical_bundle_bytes_is_deterministic_and_reflects_tampering() {
        let mut l = AuditLedger::new();
        l.append(sample("r1")).unwrap();
        l.append(sample("r2")).unwrap();
        let bundle = l.export("k1", "strict", 1);
        let a = canonical_bundle_bytes(&bundle);
        let b = canonical_bundle_bytes(&bundle);
        assert_eq!(a, b);

        let mut tampered = bundle.clone();
        tampered.entries[0].intent = "tampered".to_string();
        assert_ne!(canonical_bundle_bytes(&bundle), canonical_bundle_bytes(&tampered));
    }
}
