//! Policy Evaluator (C3, §4.3).
//!
//! Pure: no I/O, no clock, no randomness. Split into two entry points that
//! mirror where the kernel core calls them (§4.5 steps 3 and 4): structural
//! checks run during `VALIDATING`, jurisdiction/ambiguity/custom-rule checks
//! run during `ARBITRATING`, after the variant contract check (§4.6).

use crate::model::{Decision, Policy, Request};
use crate::physics::canonical::{canonical_bytes, Value};

/// Outcome of steps 5-9: `allowed = violations.is_empty()`.
pub struct ArbitrationOutcome {
    pub violations: Vec<String>,
    pub halt_demanded: bool,
}

impl ArbitrationOutcome {
    pub fn allowed(&self) -> bool {
        self.violations.is_empty()
    }

    /// HALT is reserved for custom rules that demand it; otherwise
    /// fail-closed ambiguity yields DENY, never HALT (§4.5 step 4).
    pub fn decision(&self) -> Decision {
        if self.allowed() {
            Decision::Allow
        } else if self.halt_demanded {
            Decision::Halt
        } else {
            Decision::Deny
        }
    }
}

fn params_to_value(params: &crate::compat::BTreeMap<String, Value>) -> Value {
    Value::Object(params.clone())
}

/// Steps 1-4 and 7 (§4.3): structural and size checks, run during `VALIDATING`.
pub fn validate_structural(req: &Request, policy: &Policy) -> Vec<String> {
    let mut violations = Vec::new();

    // Step 1: required fields.
    if req.request_id.trim().is_empty() {
        violations.push("request_id must be non-empty".to_string());
    }
    if req.actor.trim().is_empty() {
        violations.push("actor must be non-empty".to_string());
    }
    if req.intent.is_empty() {
        violations.push("intent must be non-empty".to_string());
    }
    if req.timestamp_ms < 0 {
        violations.push("timestamp_ms must be >= 0".to_string());
    }

    // Step 2: intent bounds.
    if req.intent.len() > policy.max_intent_length {
        violations.push(format!(
            "intent exceeds max_intent_length ({} > {})",
            req.intent.len(),
            policy.max_intent_length
        ));
    }
    if !req.intent.is_empty() && req.intent.trim().is_empty() {
        violations.push("intent must not be composed solely of whitespace".to_string());
    }

    // Step 3: tool-call presence.
    if policy.require_tool_call && req.tool_call.is_none() {
        violations.push("tool_call is required by policy".to_string());
    }

    // Step 4: tool-call structure.
    if let Some(tc) = &req.tool_call {
        if tc.name.trim().is_empty() {
            violations.push("tool_call.name must be non-empty".to_string());
        }
        // params is always a BTreeMap (possibly empty) by construction —
        // "params is a mapping (even if empty)" is enforced by the type.
    }

    // Step 7: params size.
    if let Some(tc) = &req.tool_call {
        let bytes = canonical_bytes(&params_to_value(&tc.params));
        if bytes.len() > policy.max_params_bytes {
            violations.push(format!(
                "params exceeds max_params_bytes ({} > {})",
                bytes.len(),
                policy.max_params_bytes
            ));
        }
    }

    violations
}

/// Steps 5-9 (§4.3): jurisdiction, ambiguity heuristics, custom rules. Run
/// during `ARBITRATING`, after the variant contract check.
///
/// `strict_heuristics` selects whether step 8's full heuristic set applies
/// (Strict variant) or only the high-severity subset (every other variant,
/// per §4.6).
pub fn arbitrate(req: &Request, policy: &Policy, strict_heuristics: bool) -> ArbitrationOutcome {
    let mut violations = Vec::new();
    let mut halt_demanded = false;

    // Step 5: actor admissibility.
    if !policy.actor_allowed(&req.actor) {
        violations.push(format!("actor '{}' is not admissible", req.actor));
    }

    // Step 6: tool admissibility.
    if let Some(tc) = &req.tool_call {
        if !policy.tool_allowed(&tc.name) {
            violations.push(format!("tool '{}' is not admissible", tc.name));
        }
    }

    // Step 8: ambiguity heuristics.
    // High severity, always applied: empty/whitespace intent.
    if req.intent.trim().is_empty() {
        violations.push("intent is empty or whitespace-only".to_string());
    }
    if strict_heuristics {
        // Overly long but under-limit intent: flag intents using >90% of budget.
        if req.intent.len() * 10 > policy.max_intent_length * 9 {
            violations.push("intent is suspiciously close to max_intent_length".to_string());
        }
        // "non-mapping params" is the fourth strict heuristic in the spec's
        // rule pipeline; it can never fire here because `ToolCall::params`
        // is a `BTreeMap`, making a non-mapping params value unrepresentable.
        if let Some(tc) = &req.tool_call {
            if tc.name.trim().is_empty() {
                violations.push("tool_call.name is empty under strict heuristics".to_string());
            }
        }
    }

    // Step 9: custom rules.
    for rule in &policy.custom_rules {
        let verdict = rule(req);
        if !verdict.allowed {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "custom rule denied request".to_string());
            violations.push(reason);
            if verdict.demands_halt {
                halt_demanded = true;
            }
        }
    }

    ArbitrationOutcome {
        violations,
        halt_demanded,
    }
}
