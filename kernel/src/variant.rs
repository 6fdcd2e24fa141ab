//! Variant contract checks (§4.6).
//!
//! All variants share C5 and all invariants; they differ only in a
//! pre-policy predicate over the request, applied after structural
//! validation (§4.3 steps 1-4, 7) and before steps 5-9. Modeled as a single
//! dispatch point over a tagged enum (design note 9) rather than a subclass
//! hierarchy per variant.

use crate::model::{Request, Variant};

/// `Ok(())` if the request satisfies the variant's contract; `Err(reason)`
/// naming the missing requirement otherwise.
pub fn check(variant: Variant, req: &Request) -> Result<(), String> {
    match variant {
        Variant::Strict | Variant::Permissive => Ok(()),
        Variant::EvidenceFirst => {
            let has_evidence = req.evidence.as_ref().is_some_and(|e| !e.is_empty());
            if has_evidence {
                Ok(())
            } else {
                Err("evidence required".to_string())
            }
        }
        Variant::DualChannel => {
            let constraints = req
                .constraints
                .as_ref()
                .ok_or_else(|| "constraints required".to_string())?;
            for key in ["scope", "non_goals", "success_criteria"] {
                let value = constraints.get(key).ok_or_else(|| format!("constraints.{key} required"))?;
                let non_empty = match value {
                    crate::physics::canonical::Value::Str(s) => !s.trim().is_empty(),
                    crate::physics::canonical::Value::Array(a) => !a.is_empty(),
                    crate::physics::canonical::Value::Object(o) => !o.is_empty(),
                    crate::physics::canonical::Value::Null => false,
                    _ => true,
                };
                if !non_empty {
                    return Err(format!("constraints.{key} must be non-empty"));
                }
            }
            Ok(())
        }
    }
}

/// Does this variant apply the full ambiguity heuristic set (§4.3 step 8)?
/// Strict does; every other variant applies only the high-severity subset.
pub fn uses_strict_heuristics(variant: Variant) -> bool {
    matches!(variant, Variant::Strict)
}
