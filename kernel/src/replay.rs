//! Replay Verifier (§4.7). Standalone: re-chains an exported bundle and
//! compares it to a root. Never short-circuits — it reports every failure,
//! not just the first.

use crate::ledger::PartialEntry;
use crate::model::EvidenceBundle;
use crate::physics::canonical::canonical_bytes;
use crate::physics::hashing::{ct_eq, from_hex, sha256, to_hex, GENESIS_HASH};

/// Re-derive the same canonical field bytes the ledger hashed at append time
/// (§4.2), from an already-materialized `AuditEntry`.
fn entry_field_bytes(entry: &crate::model::AuditEntry) -> Vec<u8> {
    let partial = PartialEntry {
        request_id: entry.request_id.clone(),
        actor: entry.actor.clone(),
        intent: entry.intent.clone(),
        decision: entry.decision,
        state_from: entry.state_from,
        state_to: entry.state_to,
        timestamp_ms: entry.timestamp_ms,
        tool_name: entry.tool_name.clone(),
        params_hash: entry.params_hash.clone(),
        evidence_hash: entry.evidence_hash.clone(),
        error: entry.error.clone(),
    };
    canonical_bytes(&crate::ledger::entry_fields_for_replay(&partial))
}

/// `(ok, errors)`. Every failure is reported; the algorithm never
/// short-circuits (§4.7 step 4).
pub fn replay_and_verify(bundle: &EvidenceBundle, expected_root_hash: &str) -> (bool, Vec<String>) {
    let mut errors = Vec::new();
    let mut prev = to_hex(&GENESIS_HASH);

    for (i, entry) in bundle.entries.iter().enumerate() {
        if !ct_eq(entry.prev_hash.as_bytes(), prev.as_bytes()) {
            errors.push(format!(
                "entry {i}: prev_hash mismatch (expected {prev}, got {})",
                entry.prev_hash
            ));
        }

        let bytes = entry_field_bytes(entry);
        let mut preimage = Vec::with_capacity(prev.len() + 1 + bytes.len());
        preimage.extend_from_slice(prev.as_bytes());
        preimage.push(b':');
        preimage.extend_from_slice(&bytes);
        let recomputed = to_hex(&sha256(&preimage));

        if !ct_eq(recomputed.as_bytes(), entry.entry_hash.as_bytes()) {
            errors.push(format!(
                "entry {i}: entry_hash mismatch (expected {recomputed}, got {})",
                entry.entry_hash
            ));
        }

        prev = entry.entry_hash.clone();
    }

    if !ct_eq(prev.as_bytes(), expected_root_hash.as_bytes()) {
        errors.push(format!(
            "final chain head {prev} does not match expected root {expected_root_hash}"
        ));
    }

    // Decoding check: entry_hash / prev_hash must at least be well-formed hex,
    // independent of whether they matched above.
    for (i, entry) in bundle.entries.iter().enumerate() {
        if from_hex(&entry.entry_hash).is_none() {
            errors.push(format!("entry {i}: entry_hash is not valid hex"));
        }
        if from_hex(&entry.prev_hash).is_none() {
            errors.push(format!("entry {i}: prev_hash is not valid hex"));
        }
    }

    (errors.is_empty(), errors)
}
