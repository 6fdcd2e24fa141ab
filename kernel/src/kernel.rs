//! Kernel Core (C5, §4.5) — the orchestrator.
//!
//! `submit` is the only ingress. The execution sequence below is frozen:
//! state transitions -> clock read -> ledger append -> receipt construction
//! -> return (§5 ordering guarantees). No step is reordered with any other.

use crate::clock::Clock;
use crate::error::KernelError;
use crate::fsm::validate_transition;
use crate::ledger::{AuditLedger, PartialEntry};
use crate::model::{
    Decision, EvidenceBundle, KernelState, Policy, Receipt, Request, Status, Variant,
};
use crate::physics::canonical::{canonical_bytes, evidence_wrapper, Value};
use crate::physics::hashing::{sha256, to_hex};
use crate::policy::{arbitrate, validate_structural};
use crate::registry::ToolRegistry;
use crate::variant::{check as variant_check, uses_strict_heuristics};

pub struct Kernel {
    kernel_id: String,
    variant: Variant,
    policy: Policy,
    registry: ToolRegistry,
    clock: Box<dyn Clock>,
    ledger: AuditLedger,
    state: KernelState,
    last_receipt: Option<Receipt>,
}

impl Kernel {
    /// Construction enters `BOOTING`; a successful boot atomically moves to
    /// `IDLE`. A failed boot moves to `HALTED` — any subsequent `submit` is
    /// then rejected with the "kernel halted" `StateFailure`.
    ///
    /// Boot fails only if the supplied `Policy`'s own field contract is
    /// violated (`max_intent_length`/`max_params_bytes` must be positive,
    /// §3) — `PolicyBuilder::build` already enforces this, but `Policy`'s
    /// fields are public, so a hand-built policy is checked again here.
    pub fn boot(
        kernel_id: impl Into<String>,
        variant: Variant,
        policy: Policy,
        registry: ToolRegistry,
        clock: Box<dyn Clock>,
    ) -> Kernel {
        let kernel_id = kernel_id.into();
        let boot_ok = policy.max_intent_length > 0 && policy.max_params_bytes > 0;
        let state = if boot_ok {
            tracing::debug!(kernel_id = %kernel_id, "kernel boot succeeded");
            KernelState::Idle
        } else {
            tracing::error!(kernel_id = %kernel_id, "kernel boot failed: invalid policy");
            KernelState::Halted
        };
        Kernel {
            kernel_id,
            variant,
            policy,
            registry,
            clock,
            ledger: AuditLedger::new(),
            state,
            last_receipt: None,
        }
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    pub fn kernel_id(&self) -> &str {
        &self.kernel_id
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn ledger_size(&self) -> usize {
        self.ledger.size()
    }

    fn force_transition(&mut self, to: KernelState) -> Result<(), KernelError> {
        let result = validate_transition(self.state, to);
        match result {
            Ok(()) => {
                tracing::debug!(kernel_id = %self.kernel_id, from = self.state.as_str(), to = to.as_str(), "state transition");
                self.state = to;
                Ok(())
            }
            Err(e) => {
                tracing::error!(kernel_id = %self.kernel_id, error = %e, "undefined transition, halting");
                self.state = KernelState::Halted;
                Err(e)
            }
        }
    }

    /// The only ingress (§4.5).
    pub fn submit(&mut self, request: Request) -> Receipt {
        let state_from = self.state;

        // Step 1: precondition (§7 StateFailure — no new ledger entry, state unchanged).
        if self.state != KernelState::Idle {
            let err = if self.state == KernelState::Halted {
                KernelError::StateFailure("kernel halted".to_string())
            } else {
                KernelError::StateFailure(format!(
                    "kernel not idle (current state: {})",
                    self.state.as_str()
                ))
            };
            tracing::warn!(kernel_id = %self.kernel_id, state = self.state.as_str(), "submit rejected: not idle");
            return Receipt {
                request_id: request.request_id,
                status: Status::Rejected,
                decision: Decision::Deny,
                state_from,
                state_to: state_from,
                timestamp_ms: self.clock.now_ms(),
                tool_result: None,
                error_message: Some(err.message()),
                evidence_hash: None,
            };
        }

        // Step 2: transition to VALIDATING.
        if let Err(e) = self.force_transition(KernelState::Validating) {
            return self.fatal_internal_receipt(request, state_from, e);
        }

        // Step 3: structural validation (§4.3 steps 1-4, 7; §7 ValidationFailure).
        let structural_violations = validate_structural(&request, &self.policy);
        if !structural_violations.is_empty() {
            let err = KernelError::ValidationFailure(structural_violations.join("; "));
            return self.deny_path(request, KernelState::Validating, err);
        }

        // Step 4: transition to ARBITRATING, variant check, then §4.3 steps 5-9.
        if let Err(e) = self.force_transition(KernelState::Arbitrating) {
            return self.fatal_internal_receipt(request, state_from, e);
        }

        // §7 PolicyFailure: variant contract check, then jurisdiction/ambiguity/custom rules.
        if let Err(reason) = variant_check(self.variant, &request) {
            return self.deny_path(request, KernelState::Arbitrating, KernelError::PolicyFailure(reason));
        }

        let strict = uses_strict_heuristics(self.variant);
        let outcome = arbitrate(&request, &self.policy, strict);
        let decision = outcome.decision();

        if decision == Decision::Deny {
            let err = KernelError::PolicyFailure(outcome.violations.join("; "));
            return self.deny_path(request, KernelState::Arbitrating, err);
        }
        if decision == Decision::Halt {
            let err = KernelError::PolicyFailure(outcome.violations.join("; "));
            return self.halt_decision_path(request, KernelState::Arbitrating, err);
        }

        // decision == Allow from here on.
        let evidence_hash_req = request.evidence.as_ref().map(|e| {
            to_hex(&sha256(&canonical_bytes(&evidence_wrapper(e))))
        });

        let Some(tool_call) = request.tool_call.clone() else {
            // Allow without a tool_call: straight to AUDITING from ARBITRATING.
            return self.finish_allow(request, KernelState::Arbitrating, None, None, evidence_hash_req, None, None);
        };

        // Step 5: ALLOW with a tool_call present -> EXECUTING.
        if let Err(e) = self.force_transition(KernelState::Executing) {
            return self.fatal_internal_receipt(request, state_from, e);
        }

        let params_hash = Some(to_hex(&sha256(&canonical_bytes(&Value::Object(
            tool_call.params.clone(),
        )))));

        // §7 ExecutionFailure: tool not found, or the handler itself errors.
        let exec_result = match self.registry.lookup(&tool_call.name) {
            None => Err(KernelError::ExecutionFailure(format!(
                "tool '{}' not found",
                tool_call.name
            ))),
            Some(handler) => handler
                .call(&tool_call.params)
                .map_err(KernelError::ExecutionFailure),
        };

        match exec_result {
            Ok(value) => self.finish_allow(
                request,
                KernelState::Executing,
                Some(tool_call.name),
                params_hash,
                evidence_hash_req,
                Some(value),
                None,
            ),
            Err(err) => self.execution_failure_path(
                request,
                KernelState::Executing,
                tool_call.name,
                params_hash,
                evidence_hash_req,
                err,
            ),
        }
    }

    /// Shared ledger-append + final-state-transition logic for every path
    /// that reaches `AUDITING` (§4.5 step 6-8). `entry_state_from` is the
    /// kernel state the request was arbitrated/executed in
    /// (`ARBITRATING` or `EXECUTING`), recorded verbatim on the entry.
    #[allow(clippy::too_many_arguments)]
    fn commit(
        &mut self,
        req: &Request,
        entry_state_from: KernelState,
        decision: Decision,
        tool_name: Option<String>,
        params_hash: Option<String>,
        evidence_hash: Option<String>,
        error: Option<String>,
    ) -> Result<(String, i64), KernelError> {
        self.force_transition(KernelState::Auditing)?;

        let timestamp_ms = self.clock.now_ms();
        let partial = PartialEntry {
            request_id: req.request_id.clone(),
            actor: req.actor.clone(),
            intent: req.intent.clone(),
            decision,
            state_from: entry_state_from,
            state_to: KernelState::Auditing,
            timestamp_ms,
            tool_name,
            params_hash,
            evidence_hash,
            error,
        };

        match self.ledger.append(partial) {
            Ok(entry_hash) => {
                // §4.5 open question: HALT decisions commit but then move
                // to HALTED terminally, not IDLE.
                let next = if decision == Decision::Halt {
                    KernelState::Halted
                } else {
                    KernelState::Idle
                };
                self.force_transition(next).ok();
                Ok((entry_hash, timestamp_ms))
            }
            Err(e) => {
                tracing::error!(kernel_id = %self.kernel_id, error = %e, "ledger append failed, halting");
                // §4.5 step 7: append failure is always fatal. The entry
                // that would have described any prior execution never
                // exists, so its result is never surfaced to the caller.
                self.force_transition(KernelState::Halted).ok();
                Err(e)
            }
        }
    }

    /// `err` is `ValidationFailure` or `PolicyFailure` (§7); both are
    /// recoverable and surface as `status=REJECTED, decision=DENY`.
    fn deny_path(&mut self, request: Request, entry_state_from: KernelState, err: KernelError) -> Receipt {
        debug_assert!(!err.is_fatal(), "deny_path only carries recoverable errors");
        let reason = err.message();
        match self.commit(
            &request,
            entry_state_from,
            Decision::Deny,
            None,
            None,
            None,
            Some(reason.clone()),
        ) {
            Ok((entry_hash, timestamp_ms)) => Receipt {
                request_id: request.request_id,
                status: Status::Rejected,
                decision: Decision::Deny,
                state_from: entry_state_from,
                state_to: KernelState::Idle,
                timestamp_ms,
                tool_result: None,
                error_message: Some(reason),
                evidence_hash: Some(entry_hash),
            },
            Err(e) => self.audit_failure_receipt(request, entry_state_from, e),
        }
    }

    /// `err` is a `PolicyFailure` whose custom rule demanded HALT rather
    /// than DENY — the decision itself still commits to the ledger before
    /// the kernel moves to `HALTED` (§4.5 open question, resolved in DESIGN.md).
    fn halt_decision_path(
        &mut self,
        request: Request,
        entry_state_from: KernelState,
        err: KernelError,
    ) -> Receipt {
        let reason = err.message();
        match self.commit(
            &request,
            entry_state_from,
            Decision::Halt,
            None,
            None,
            None,
            Some(reason.clone()),
        ) {
            Ok((entry_hash, timestamp_ms)) => Receipt {
                request_id: request.request_id,
                status: Status::Failed,
                decision: Decision::Halt,
                state_from: entry_state_from,
                state_to: KernelState::Halted,
                timestamp_ms,
                tool_result: None,
                error_message: Some(reason),
                evidence_hash: Some(entry_hash),
            },
            Err(e) => self.audit_failure_receipt(request, entry_state_from, e),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_allow(
        &mut self,
        request: Request,
        entry_state_from: KernelState,
        tool_name: Option<String>,
        params_hash: Option<String>,
        evidence_hash: Option<String>,
        tool_result: Option<Value>,
        error: Option<String>,
    ) -> Receipt {
        match self.commit(
            &request,
            entry_state_from,
            Decision::Allow,
            tool_name,
            params_hash,
            evidence_hash,
            error,
        ) {
            Ok((entry_hash, timestamp_ms)) => Receipt {
                request_id: request.request_id,
                status: Status::Accepted,
                decision: Decision::Allow,
                state_from: entry_state_from,
                state_to: KernelState::Idle,
                timestamp_ms,
                tool_result,
                error_message: None,
                evidence_hash: Some(entry_hash),
            },
            Err(e) => self.audit_failure_receipt(request, entry_state_from, e),
        }
    }

    fn execution_failure_path(
        &mut self,
        request: Request,
        entry_state_from: KernelState,
        tool_name: String,
        params_hash: Option<String>,
        evidence_hash: Option<String>,
        error: KernelError,
    ) -> Receipt {
        // §4.5 step 5 / §7: execution failure flips the decision to DENY.
        // The kernel does not HALT for a recoverable tool error.
        debug_assert!(!error.is_fatal(), "execution errors are always recoverable");
        let message = error.message();
        match self.commit(
            &request,
            entry_state_from,
            Decision::Deny,
            Some(tool_name),
            params_hash,
            evidence_hash,
            Some(message.clone()),
        ) {
            Ok((entry_hash, timestamp_ms)) => Receipt {
                request_id: request.request_id,
                status: Status::Failed,
                decision: Decision::Deny,
                state_from: entry_state_from,
                state_to: KernelState::Idle,
                timestamp_ms,
                tool_result: None,
                error_message: Some(message),
                evidence_hash: Some(entry_hash),
            },
            Err(e) => self.audit_failure_receipt(request, entry_state_from, e),
        }
    }

    fn audit_failure_receipt(
        &mut self,
        request: Request,
        entry_state_from: KernelState,
        e: KernelError,
    ) -> Receipt {
        Receipt {
            request_id: request.request_id,
            status: Status::Failed,
            decision: Decision::Halt,
            state_from: entry_state_from,
            state_to: KernelState::Halted,
            timestamp_ms: self.clock.now_ms(),
            tool_result: None,
            error_message: Some(e.message()),
            evidence_hash: None,
        }
    }

    fn fatal_internal_receipt(
        &mut self,
        request: Request,
        state_from: KernelState,
        e: KernelError,
    ) -> Receipt {
        Receipt {
            request_id: request.request_id,
            status: Status::Failed,
            decision: Decision::Halt,
            state_from,
            state_to: KernelState::Halted,
            timestamp_ms: self.clock.now_ms(),
            tool_result: None,
            error_message: Some(e.message()),
            evidence_hash: None,
        }
    }

    /// Permitted from any non-terminal state. Idempotent: calling `halt`
    /// while already `HALTED` is a no-op returning the last receipt (or a
    /// synthetic one if none exists yet).
    pub fn halt(&mut self, reason: &str) -> Receipt {
        if self.state == KernelState::Halted {
            return self.last_receipt.clone().unwrap_or_else(|| Receipt {
                request_id: String::new(),
                status: Status::Failed,
                decision: Decision::Halt,
                state_from: KernelState::Halted,
                state_to: KernelState::Halted,
                timestamp_ms: self.clock.now_ms(),
                tool_result: None,
                error_message: Some(reason.to_string()),
                evidence_hash: None,
            });
        }

        let state_from = self.state;
        let timestamp_ms = self.clock.now_ms();
        let partial = PartialEntry {
            request_id: String::new(),
            actor: "kernel".to_string(),
            intent: "halt".to_string(),
            decision: Decision::Halt,
            state_from,
            state_to: KernelState::Halted,
            timestamp_ms,
            tool_name: None,
            params_hash: None,
            evidence_hash: None,
            error: Some(reason.to_string()),
        };
        let append_result = self.ledger.append(partial);
        self.state = KernelState::Halted;

        let receipt = Receipt {
            request_id: String::new(),
            status: Status::Failed,
            decision: Decision::Halt,
            state_from,
            state_to: KernelState::Halted,
            timestamp_ms,
            tool_result: None,
            error_message: Some(reason.to_string()),
            evidence_hash: append_result.ok(),
        };
        self.last_receipt = Some(receipt.clone());
        receipt
    }

    /// Permitted from any state, including `HALTED`.
    pub fn export_evidence(&self) -> EvidenceBundle {
        self.ledger
            .export(&self.kernel_id, self.variant.tag(), self.clock.now_ms())
    }
}
