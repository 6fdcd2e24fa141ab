//! Data model (§3): Request, Receipt, AuditEntry, EvidenceBundle, Policy.

use crate::compat::{BTreeMap, BTreeSet};
use crate::physics::canonical::Value;

/// Wildcard sentinel for `Policy::allowed_actors` / `allowed_tools`.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    Halt,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
            Decision::Halt => "HALT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Accepted,
    Rejected,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Accepted => "ACCEPTED",
            Status::Rejected => "REJECTED",
            Status::Failed => "FAILED",
        }
    }
}

/// The kernel's lifecycle state (§4.4). Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Booting,
    Idle,
    Validating,
    Arbitrating,
    Executing,
    Auditing,
    Halted,
}

impl KernelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelState::Booting => "BOOTING",
            KernelState::Idle => "IDLE",
            KernelState::Validating => "VALIDATING",
            KernelState::Arbitrating => "ARBITRATING",
            KernelState::Executing => "EXECUTING",
            KernelState::Auditing => "AUDITING",
            KernelState::Halted => "HALTED",
        }
    }
}

/// A requested tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub params: BTreeMap<String, Value>,
}

/// Inputs from the caller (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_id: String,
    pub actor: String,
    pub intent: String,
    pub tool_call: Option<ToolCall>,
    pub evidence: Option<Vec<String>>,
    pub constraints: Option<BTreeMap<String, Value>>,
    pub timestamp_ms: i64,
}

/// Output to the caller (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub request_id: String,
    pub status: Status,
    pub decision: Decision,
    pub state_from: KernelState,
    pub state_to: KernelState,
    pub timestamp_ms: i64,
    pub tool_result: Option<Value>,
    pub error_message: Option<String>,
    /// Hash of the committed audit entry. Absent only for `StateFailure`
    /// rejections, which append nothing to the ledger.
    pub evidence_hash: Option<String>,
}

/// One immutable record in the hash-chained ledger (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub prev_hash: String,
    pub entry_hash: String,
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

/// Exportable snapshot of the ledger plus its root hash (§3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceBundle {
    pub kernel_id: String,
    pub variant_tag: String,
    pub entries: Vec<AuditEntry>,
    pub root_hash: String,
    pub exported_at_ms: i64,
}

/// A pure rule function's verdict (§4.3 step 9, design note 9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    /// Only a custom rule may demand HALT (§4.5 step 4). Fail-closed
    /// ambiguity elsewhere always yields DENY, never HALT.
    pub demands_halt: bool,
}

impl RuleVerdict {
    pub fn allow() -> Self {
        RuleVerdict {
            allowed: true,
            reason: None,
            demands_halt: false,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        RuleVerdict {
            allowed: false,
            reason: Some(reason.into()),
            demands_halt: false,
        }
    }

    pub fn halt(reason: impl Into<String>) -> Self {
        RuleVerdict {
            allowed: false,
            reason: Some(reason.into()),
            demands_halt: true,
        }
    }
}

/// A pure, named rule function over a request (design note 9: modeled as a
/// sequence of function values, not a subclass hierarchy).
pub type CustomRule = Box<dyn Fn(&Request) -> RuleVerdict + Send + Sync>;

/// Immutable configuration of what is permitted (§3). Constructed once,
/// shared by reference, never mutated (Non-goal: no live policy mutation).
pub struct Policy {
    pub allowed_actors: BTreeSet<String>,
    pub allowed_tools: BTreeSet<String>,
    pub require_tool_call: bool,
    pub max_intent_length: usize,
    pub max_params_bytes: usize,
    pub custom_rules: Vec<CustomRule>,
}

impl Policy {
    pub fn actor_allowed(&self, actor: &str) -> bool {
        self.allowed_actors.contains(WILDCARD) || self.allowed_actors.contains(actor)
    }

    pub fn tool_allowed(&self, tool: &str) -> bool {
        self.allowed_tools.contains(WILDCARD) || self.allowed_tools.contains(tool)
    }
}

/// Fluent, infallible-until-`build()` construction ergonomics for `Policy`.
/// Additive convenience only — it does not relax the immutability invariant;
/// the result is still frozen the moment `build()` returns it.
#[derive(Default)]
pub struct PolicyBuilder {
    allowed_actors: BTreeSet<String>,
    allowed_tools: BTreeSet<String>,
    require_tool_call: bool,
    max_intent_length: usize,
    max_params_bytes: usize,
    custom_rules: Vec<CustomRule>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        PolicyBuilder {
            max_intent_length: 0,
            max_params_bytes: 0,
            ..Default::default()
        }
    }

    pub fn allow_actor(mut self, actor: impl Into<String>) -> Self {
        self.allowed_actors.insert(actor.into());
        self
    }

    pub fn allow_tool(mut self, tool: impl Into<String>) -> Self {
        self.allowed_tools.insert(tool.into());
        self
    }

    pub fn require_tool_call(mut self, required: bool) -> Self {
        self.require_tool_call = required;
        self
    }

    pub fn max_intent_length(mut self, n: usize) -> Self {
        self.max_intent_length = n;
        self
    }

    pub fn max_params_bytes(mut self, n: usize) -> Self {
        self.max_params_bytes = n;
        self
    }

    pub fn custom_rule(
        mut self,
        rule: impl Fn(&Request) -> RuleVerdict + Send + Sync + 'static,
    ) -> Self {
        self.custom_rules.push(Box::new(rule));
        self
    }

    /// Validates `max_intent_length > 0` and `max_params_bytes > 0` per the
    /// `Policy` field contract (§3: both are "positive integer"). A failing
    /// build is what drives a kernel's boot to `HALTED` (§4.5).
    pub fn build(self) -> Result<Policy, String> {
        if self.max_intent_length == 0 {
            return Err("max_intent_length must be positive".to_string());
        }
        if self.max_params_bytes == 0 {
            return Err("max_params_bytes must be positive".to_string());
        }
        Ok(Policy {
            allowed_actors: self.allowed_actors,
            allowed_tools: self.allowed_tools,
            require_tool_call: self.require_tool_call,
            max_intent_length: self.max_intent_length,
            max_params_bytes: self.max_params_bytes,
            custom_rules: self.custom_rules,
        })
    }
}

/// A posture selector that adds a pre-policy contract check (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Strict,
    Permissive,
    EvidenceFirst,
    DualChannel,
}

impl Variant {
    pub fn tag(&self) -> &'static str {
        match self {
            Variant::Strict => "strict",
            Variant::Permissive => "permissive",
            Variant::EvidenceFirst => "evidence_first",
            Variant::DualChannel => "dual_channel",
        }
    }
}
