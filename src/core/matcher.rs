//! Target matching and condition evaluation.

use super::EvaluationContext;
use crate::policy::{
    AttributeDesignator, Condition, ConditionOperator, ConditionValue, MissingAttributeDetail,
    Target,
};
use crate::request::Request;
use crate::Result;

use std::fmt;
use std::sync::Arc;

/// Three-valued outcome of a target match or condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchResult {
    /// The predicate holds
    Match,
    /// The predicate does not hold
    NoMatch,
    /// The predicate could not be evaluated
    Indeterminate,
}

impl From<bool> for MatchResult {
    fn from(matched: bool) -> Self {
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NoMatch
        }
    }
}

/// Decides whether a target applies to a request.
///
/// On [`MatchResult::Indeterminate`] the implementation records the cause on
/// the context (status code, missing attributes).
pub trait TargetMatcher: Send + Sync {
    /// Match `target` against `request`.
    fn match_target(
        &self,
        target: &Target,
        request: &Request,
        ctx: &mut EvaluationContext<'_>,
    ) -> MatchResult;
}

/// Evaluates a rule condition against a request.
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate `condition` against `request`.
    fn evaluate_condition(
        &self,
        condition: &Condition,
        request: &Request,
        ctx: &mut EvaluationContext<'_>,
    ) -> MatchResult;
}

/// The pair of predicates rule evaluation depends on.
#[derive(Clone)]
pub struct Matchers {
    /// Target matcher
    pub target: Arc<dyn TargetMatcher>,
    /// Condition evaluator
    pub condition: Arc<dyn ConditionEvaluator>,
}

impl Matchers {
    /// Build from explicit collaborators.
    pub fn new(target: Arc<dyn TargetMatcher>, condition: Arc<dyn ConditionEvaluator>) -> Self {
        Self { target, condition }
    }
}

impl Default for Matchers {
    fn default() -> Self {
        let matcher = Arc::new(AttributeMatcher::new());
        Self {
            target: matcher.clone(),
            condition: matcher,
        }
    }
}

impl fmt::Debug for Matchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchers").finish_non_exhaustive()
    }
}

/// Matches conditions over attribute bags.
///
/// A comparison holds when any value in the bag satisfies it. Negated
/// comparisons (`not_equals`, `not_in`) hold when no value satisfies the
/// positive form. Bags come from the request first and the attribute finder
/// second.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeMatcher;

impl AttributeMatcher {
    /// Create a matcher.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a condition, surfacing errors instead of recording them.
    pub fn evaluate(
        &self,
        condition: &Condition,
        request: &Request,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        match condition.operator {
            ConditionOperator::And => {
                for nested in &condition.conditions {
                    if !self.evaluate(nested, request, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionOperator::Or => {
                for nested in &condition.conditions {
                    if self.evaluate(nested, request, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ConditionOperator::Not => {
                let nested = condition.conditions.first().ok_or_else(|| {
                    crate::Error::expression("NOT condition requires a nested condition")
                })?;
                Ok(!self.evaluate(nested, request, ctx)?)
            }
            _ => self.evaluate_comparison(condition, request, ctx),
        }
    }

    fn evaluate_comparison(
        &self,
        condition: &Condition,
        request: &Request,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool> {
        let designator = condition
            .attribute
            .as_ref()
            .ok_or_else(|| crate::Error::expression("Condition requires an attribute"))?;

        let bag = resolve_bag(designator, request, ctx)?;

        match condition.operator {
            ConditionOperator::Exists => Ok(!bag.is_empty()),
            ConditionOperator::NotExists => Ok(bag.is_empty()),
            ConditionOperator::NotEquals => {
                let expected = expected_value(condition)?;
                Ok(!bag.iter().any(|actual| values_equal(actual, expected)))
            }
            ConditionOperator::NotIn => {
                let expected = expected_value(condition)?;
                for actual in &bag {
                    if compare_values(ConditionOperator::In, actual, expected)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            operator => {
                let expected = expected_value(condition)?;
                for actual in &bag {
                    if compare_values(operator, actual, expected)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn record(&self, outcome: Result<bool>, ctx: &mut EvaluationContext<'_>) -> MatchResult {
        match outcome {
            Ok(matched) => MatchResult::from(matched),
            Err(err) => {
                tracing::debug!(error = %err, "Predicate evaluation failed");
                ctx.update_status_code(err.status_code());
                if let crate::Error::MissingAttribute(detail) = err {
                    ctx.add_missing_attribute(detail);
                }
                MatchResult::Indeterminate
            }
        }
    }
}

impl TargetMatcher for AttributeMatcher {
    fn match_target(
        &self,
        target: &Target,
        request: &Request,
        ctx: &mut EvaluationContext<'_>,
    ) -> MatchResult {
        let outcome = self.evaluate(&target.condition, request, ctx);
        self.record(outcome, ctx)
    }
}

impl ConditionEvaluator for AttributeMatcher {
    fn evaluate_condition(
        &self,
        condition: &Condition,
        request: &Request,
        ctx: &mut EvaluationContext<'_>,
    ) -> MatchResult {
        let outcome = self.evaluate(condition, request, ctx);
        self.record(outcome, ctx)
    }
}

/// Resolve the bag a designator selects.
fn resolve_bag(
    designator: &AttributeDesignator,
    request: &Request,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<serde_json::Value>> {
    let mut bag = request.bag(designator);
    if bag.is_empty() {
        if let Some(finder) = ctx.attribute_finder() {
            bag = finder.find(designator, request)?;
        }
    }

    if bag.is_empty() && designator.must_be_present {
        return Err(crate::Error::missing_attribute(MissingAttributeDetail::new(
            designator.category,
            designator.attribute_id.clone(),
            designator.data_type.clone(),
            designator.issuer.clone(),
        )));
    }
    Ok(bag)
}

fn expected_value(condition: &Condition) -> Result<&ConditionValue> {
    condition.value.as_ref().ok_or_else(|| {
        crate::Error::expression(format!("{:?} condition requires a value", condition.operator))
    })
}

/// Compare one bag value against the expected value.
fn compare_values(
    operator: ConditionOperator,
    actual: &serde_json::Value,
    expected: &ConditionValue,
) -> Result<bool> {
    match operator {
        ConditionOperator::Equals => Ok(values_equal(actual, expected)),
        ConditionOperator::GreaterThan => compare_numeric(actual, expected, |a, b| a > b),
        ConditionOperator::GreaterThanOrEquals => compare_numeric(actual, expected, |a, b| a >= b),
        ConditionOperator::LessThan => compare_numeric(actual, expected, |a, b| a < b),
        ConditionOperator::LessThanOrEquals => compare_numeric(actual, expected, |a, b| a <= b),
        ConditionOperator::In => match expected {
            ConditionValue::Array(candidates) => {
                Ok(candidates.iter().any(|v| values_equal(actual, v)))
            }
            other => Ok(values_equal(actual, other)),
        },
        ConditionOperator::Contains => match (actual, expected) {
            (serde_json::Value::String(haystack), ConditionValue::String(needle)) => {
                Ok(haystack.contains(needle.as_str()))
            }
            (serde_json::Value::Array(items), needle) => {
                Ok(items.iter().any(|item| values_equal(item, needle)))
            }
            _ => Ok(false),
        },
        ConditionOperator::StartsWith => match (actual, expected) {
            (serde_json::Value::String(s), ConditionValue::String(prefix)) => {
                Ok(s.starts_with(prefix.as_str()))
            }
            _ => Ok(false),
        },
        ConditionOperator::EndsWith => match (actual, expected) {
            (serde_json::Value::String(s), ConditionValue::String(suffix)) => {
                Ok(s.ends_with(suffix.as_str()))
            }
            _ => Ok(false),
        },
        ConditionOperator::Matches => match (actual, expected) {
            (serde_json::Value::String(s), ConditionValue::String(pattern)) => {
                let regex = regex::Regex::new(pattern).map_err(|e| {
                    crate::Error::expression_with_expr(
                        format!("Invalid regex: {}", e),
                        pattern.clone(),
                    )
                })?;
                Ok(regex.is_match(s))
            }
            _ => Ok(false),
        },
        other => Err(crate::Error::expression(format!(
            "{:?} is not a comparison operator",
            other
        ))),
    }
}

/// Check if a bag value equals a condition value.
fn values_equal(actual: &serde_json::Value, expected: &ConditionValue) -> bool {
    match (actual, expected) {
        (serde_json::Value::String(a), ConditionValue::String(e)) => a == e,
        (serde_json::Value::Number(a), ConditionValue::Integer(e)) => {
            a.as_i64().map(|n| n == *e).unwrap_or(false)
        }
        (serde_json::Value::Number(a), ConditionValue::Float(e)) => {
            a.as_f64().map(|n| (n - e).abs() < f64::EPSILON).unwrap_or(false)
        }
        (serde_json::Value::Bool(a), ConditionValue::Boolean(e)) => a == e,
        (serde_json::Value::Null, ConditionValue::Null) => true,
        (serde_json::Value::Array(actual_arr), ConditionValue::Array(expected_arr)) => {
            actual_arr.len() == expected_arr.len()
                && actual_arr
                    .iter()
                    .zip(expected_arr.iter())
                    .all(|(a, e)| values_equal(a, e))
        }
        _ => false,
    }
}

fn compare_numeric<F>(actual: &serde_json::Value, expected: &ConditionValue, cmp: F) -> Result<bool>
where
    F: Fn(f64, f64) -> bool,
{
    let actual_num = actual
        .as_f64()
        .ok_or_else(|| crate::Error::evaluation("Expected numeric value for comparison"))?;

    let expected_num = match expected {
        ConditionValue::Integer(n) => *n as f64,
        ConditionValue::Float(n) => *n,
        _ => {
            return Err(crate::Error::evaluation(
                "Expected numeric value for comparison",
            ))
        }
    };

    Ok(cmp(actual_num, expected_num))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::CombiningAlgorithms;
    use crate::core::StaticAttributeFinder;
    use crate::policy::StatusCode;
    use crate::request::{data_type, Category};

    fn role() -> AttributeDesignator {
        AttributeDesignator::string(Category::Subject, "role")
    }

    fn tokens() -> AttributeDesignator {
        AttributeDesignator::new(Category::Resource, "tokens", data_type::INTEGER)
    }

    fn request() -> Request {
        Request::builder()
            .with_string(Category::Subject, "role", "admin")
            .with_string(Category::Subject, "role", "auditor")
            .with_value(Category::Resource, "tokens", data_type::INTEGER, serde_json::json!(2000))
            .build()
    }

    #[test]
    fn test_any_of_bag_semantics() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();
        let request = request();

        let condition = Condition::equals(role(), "auditor");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::Match
        );

        let condition = Condition::not_equals(role(), "auditor");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::NoMatch
        );

        let condition = Condition::is_in(role(), vec!["guest".into(), "admin".into()]);
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::Match
        );
    }

    #[test]
    fn test_numeric_comparison() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();
        let request = request();

        let target = Target::new(Condition::greater_than(tokens(), 1000i64));
        assert_eq!(
            matcher.match_target(&target, &request, &mut ctx),
            MatchResult::Match
        );

        let target = Target::new(Condition::less_than(tokens(), 1000i64));
        assert_eq!(
            matcher.match_target(&target, &request, &mut ctx),
            MatchResult::NoMatch
        );
        assert_eq!(ctx.status_code(), StatusCode::Ok);
    }

    #[test]
    fn test_type_mismatch_is_indeterminate() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();

        let condition = Condition::greater_than(role(), 3i64);
        assert_eq!(
            matcher.evaluate_condition(&condition, &request(), &mut ctx),
            MatchResult::Indeterminate
        );
        assert_eq!(ctx.status_code(), StatusCode::ProcessingError);
    }

    #[test]
    fn test_invalid_regex_is_syntax_error() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();

        let condition = Condition::matches(role(), "([unclosed");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request(), &mut ctx),
            MatchResult::Indeterminate
        );
        assert_eq!(ctx.status_code(), StatusCode::SyntaxError);
    }

    #[test]
    fn test_missing_required_attribute() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();
        let clearance = AttributeDesignator::string(Category::Subject, "clearance");

        let condition = Condition::equals(clearance.clone(), "secret");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request(), &mut ctx),
            MatchResult::NoMatch
        );

        let condition = Condition::equals(clearance.required(), "secret");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request(), &mut ctx),
            MatchResult::Indeterminate
        );
        assert_eq!(ctx.status_code(), StatusCode::MissingAttribute);
        assert_eq!(ctx.missing_attributes().len(), 1);
        assert_eq!(ctx.missing_attributes()[0].attribute_id, "clearance");
    }

    #[test]
    fn test_finder_fills_gaps() {
        let algorithms = CombiningAlgorithms::default();
        let clearance = AttributeDesignator::string(Category::Subject, "clearance");
        let finder = StaticAttributeFinder::new()
            .with_value(clearance.clone(), serde_json::json!("secret"));
        let mut ctx = EvaluationContext::new(&algorithms).with_attribute_finder(&finder);
        let matcher = AttributeMatcher::new();

        let condition = Condition::equals(clearance.required(), "secret");
        assert_eq!(
            matcher.evaluate_condition(&condition, &request(), &mut ctx),
            MatchResult::Match
        );
    }

    #[test]
    fn test_logical_operators() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let matcher = AttributeMatcher::new();
        let request = request();

        let condition = Condition::and(vec![
            Condition::equals(role(), "admin"),
            Condition::greater_than(tokens(), 1000i64),
        ]);
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::Match
        );

        let condition = Condition::or(vec![
            Condition::equals(role(), "guest"),
            Condition::exists(AttributeDesignator::string(Category::Action, "verb")),
        ]);
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::NoMatch
        );

        let condition = Condition::not(Condition::equals(role(), "guest"));
        assert_eq!(
            matcher.evaluate_condition(&condition, &request, &mut ctx),
            MatchResult::Match
        );
    }
}
