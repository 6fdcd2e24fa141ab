//! Error taxonomy (§7).
//!
//! The kernel enum carries no variant that conflates a recoverable condition
//! with a fatal one — the band is a first-class property (`Severity`), not
//! something a caller infers from matching on the variant name, because §7's
//! invariants depend on the two bands staying distinct all the way to the
//! receipt and the ledger entry.

use thiserror::Error;

/// Which band a `KernelError` belongs to (§7 propagation policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Captured into the receipt and the ledger; control returns normally.
    Recoverable,
    /// Drives the state machine to `HALTED`.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Structural request error (§7 ValidationFailure).
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// Jurisdiction/ambiguity/custom-rule denial (§7 PolicyFailure).
    #[error("policy denied: {0}")]
    PolicyFailure(String),

    /// Tool not found, or the tool handler returned an error (§7 ExecutionFailure).
    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    /// Ledger append or hash failure — always fatal (§7 AuditFailure).
    #[error("audit append failed: {0}")]
    AuditFailure(String),

    /// `submit` called while the kernel was not `IDLE` (§7 StateFailure).
    /// No new entry is recorded; state is unchanged.
    #[error("kernel not idle: {0}")]
    StateFailure(String),

    /// Any unhandled condition inside the orchestration (§7 FatalInternal).
    #[error("fatal internal error: {0}")]
    FatalInternal(String),
}

impl KernelError {
    pub fn severity(&self) -> Severity {
        match self {
            KernelError::AuditFailure(_) | KernelError::FatalInternal(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// The text to surface on a `Receipt`/`AuditEntry`'s `error` field.
    pub fn message(&self) -> String {
        self.to_string()
    }
}
