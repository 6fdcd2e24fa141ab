//! governor-kernel — a deterministic control-plane governor.
//!
//! Mediates every request between an untrusted actor (or AI agent) and a
//! tool registry, producing a cryptographically hash-chained, append-only
//! audit ledger. Single-threaded, cooperative, no hidden I/O: the only
//! collaborators the core reaches out to are a `Clock` and a `ToolRegistry`,
//! both supplied at boot (§5, §6).
//!
//! INVARIANTS:
//! 1. BTreeMap/BTreeSet used everywhere inside `physics`, `model`, `ledger`:
//!    iteration order is deterministic (sorted by key).
//! 2. HashMap is forbidden anywhere that feeds a hash. The tool registry is
//!    the one exception — lookup order there never feeds a hash.
//! 3. Floating-point arithmetic never appears in a hashed payload. There is
//!    no `Value::Float` variant; this is enforced by the type, not a runtime
//!    check.
//! 4. All hash/signature comparisons go through `physics::hashing::ct_eq`.
//! 5. Commit-before-visible-effect: a tool's result is only returned to the
//!    caller after the ledger append that records it has succeeded.

pub mod clock;
pub mod compat;
pub mod error;
pub mod fsm;
pub mod kernel;
pub mod ledger;
pub mod model;
pub mod physics;
pub mod policy;
pub mod registry;
pub mod replay;
pub mod variant;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use error::{KernelError, Severity};
pub use kernel::Kernel;
pub use ledger::{canonical_bundle_bytes, AuditLedger};
pub use model::{
    AuditEntry, Decision, EvidenceBundle, KernelState, Policy, PolicyBuilder, Receipt, Request,
    RuleVerdict, Status, ToolCall, Variant,
};
pub use registry::{Handler, ToolRegistry};
pub use replay::replay_and_verify;
