use crate::domain::UserEvidence;

/// Account must have been created at or before the cutoff.
pub fn created_before(cutoff: Option<f64>, evidence: &UserEvidence) -> bool {
    match (cutoff, evidence.created_at) {
        (Some(cutoff), Some(created)) => cutoff >= created,
        _ => false,
    }
}

/// Observed count must reach the rule's minimum.
pub fn at_least(minimum: Option<f64>, observed: Option<f64>) -> bool {
    match (minimum, observed) {
        (Some(minimum), Some(observed)) => minimum <= observed,
        _ => false,
    }
}

/// Verified flag must stringify to exactly `"true"`.
pub fn verified(evidence: &UserEvidence) -> bool {
    evidence
        .verified
        .as_ref()
        .is_some_and(|flag| flag.to_string() == "true")
}
