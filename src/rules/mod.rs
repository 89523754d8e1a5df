pub mod account;
pub mod content;

use tracing::{debug, warn};

use crate::domain::{Rule, RuleKind, RuleValue, UserEvidence};

/// Evaluate a rule against the caller-supplied evidence.
///
/// Pure and deterministic. A rule whose required input is missing fails.
/// Kinds enforced by another system (on-chain programs, marketplace
/// integrations) and unrecognized kinds always pass here.
pub fn evaluate(rule: &Rule, evidence: &UserEvidence, choices: Option<&[String]>) -> bool {
    match rule {
        Rule::CreatedBefore { time } => account::created_before(*time, evidence),
        Rule::Followers { count } => account::at_least(*count, evidence.followers),
        Rule::Friends { count } => account::at_least(*count, evidence.friends),
        Rule::Verified => account::verified(evidence),
        Rule::Post { message } => content::post_contains(message.as_deref(), evidence.post.as_deref()),
        Rule::Reply { message } => content::reply_matches(message.as_deref(), evidence.post.as_deref()),
        Rule::Choice { message } => match choices {
            Some(choices) => {
                content::choice_matches(message.as_deref(), evidence.post.as_deref(), choices)
            }
            None => {
                debug!("choice rule evaluated without choices");
                false
            }
        },
        Rule::Deferred(kind) => {
            debug!(rule_kind = %kind, "enforcement deferred, passing");
            true
        }
        Rule::Unsupported(tag) => {
            warn!(rule_kind = %tag, "unsupported rule kind, passing");
            true
        }
    }
}

/// Build the typed rule from wire parts and evaluate it.
pub fn evaluate_parts(
    kind: RuleKind,
    value: RuleValue,
    evidence: &UserEvidence,
    choices: Option<&[String]>,
) -> bool {
    evaluate(&Rule::new(kind, value), evidence, choices)
}
