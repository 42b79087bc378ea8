//! Evaluation core: per-request context, attribute resolution and predicate
//! matching.

mod context;
mod finder;
mod matcher;

pub use context::EvaluationContext;
pub use finder::{AttributeFinder, StaticAttributeFinder};
pub use matcher::{AttributeMatcher, ConditionEvaluator, MatchResult, Matchers, TargetMatcher};
