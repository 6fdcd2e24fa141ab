//! State Machine (C4, §4.4).
//!
//! Enforces the lifecycle transitions exhaustively; any move not in the
//! table is rejected and drives C5 to `HALTED` (§4.4, invariant 6).

use crate::error::KernelError;
use crate::model::KernelState;

/// Validate `from -> to` against the exhaustive transition table in §4.4.
/// `HALTED` has no outgoing transitions (global invariant 6).
pub fn validate_transition(from: KernelState, to: KernelState) -> Result<(), KernelError> {
    use KernelState::*;
    let ok = matches!(
        (from, to),
        (Booting, Idle)
            | (Booting, Halted)
            | (Idle, Validating)
            | (Idle, Halted)
            | (Validating, Arbitrating)
            | (Validating, Auditing)
            | (Validating, Halted)
            | (Arbitrating, Executing)
            | (Arbitrating, Auditing)
            | (Arbitrating, Halted)
            | (Executing, Auditing)
            | (Executing, Halted)
            | (Auditing, Idle)
            | (Auditing, Halted)
    );
    if ok {
        Ok(())
    } else {
        Err(KernelError::FatalInternal(format!(
            "undefined transition {} -> {}",
            from.as_str(),
            to.as_str()
        )))
    }
}
