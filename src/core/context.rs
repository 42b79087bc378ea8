//! Per-request evaluation state.

use super::AttributeFinder;
use crate::combining::CombiningAlgorithms;
use crate::policy::{Effect, MissingAttributeDetail, Obligation, StatusCode};
use crate::store::EvaluatableIndex;

use std::fmt;

/// Mutable state threaded through one request's evaluation.
///
/// A context belongs to exactly one in-flight request. It is created by the
/// caller that starts an evaluation and lent by exclusive reference to every
/// combining algorithm invocation beneath it, so it needs no locking. The
/// collaborators it borrows (algorithm table, attribute finder, evaluatable
/// index) are shared and immutable.
pub struct EvaluationContext<'a> {
    algorithms: &'a CombiningAlgorithms,
    attribute_finder: Option<&'a dyn AttributeFinder>,
    evaluatable_index: Option<&'a dyn EvaluatableIndex>,
    max_reference_depth: usize,
    reference_depth: usize,
    status_code: StatusCode,
    status_codes: Vec<StatusCode>,
    missing_attributes: Vec<MissingAttributeDetail>,
    obligations: Vec<Obligation>,
    target_matched: bool,
}

impl<'a> EvaluationContext<'a> {
    /// Default limit on nested policy references.
    pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 16;

    /// Create a context resolving combining algorithms from `algorithms`.
    pub fn new(algorithms: &'a CombiningAlgorithms) -> Self {
        Self {
            algorithms,
            attribute_finder: None,
            evaluatable_index: None,
            max_reference_depth: Self::DEFAULT_MAX_REFERENCE_DEPTH,
            reference_depth: 0,
            status_code: StatusCode::Ok,
            status_codes: Vec::new(),
            missing_attributes: Vec::new(),
            obligations: Vec::new(),
            target_matched: false,
        }
    }

    /// Consult `finder` for attributes the request does not carry.
    pub fn with_attribute_finder(mut self, finder: &'a dyn AttributeFinder) -> Self {
        self.attribute_finder = Some(finder);
        self
    }

    /// Resolve policy references through `index`.
    pub fn with_evaluatable_index(mut self, index: &'a dyn EvaluatableIndex) -> Self {
        self.evaluatable_index = Some(index);
        self
    }

    /// Limit how deeply references may nest.
    pub fn with_max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }

    /// The combining algorithm table.
    pub fn algorithms(&self) -> &'a CombiningAlgorithms {
        self.algorithms
    }

    /// The attribute finder, if one was supplied.
    pub fn attribute_finder(&self) -> Option<&'a dyn AttributeFinder> {
        self.attribute_finder
    }

    /// The evaluatable index, if one was supplied.
    pub fn evaluatable_index(&self) -> Option<&'a dyn EvaluatableIndex> {
        self.evaluatable_index
    }

    /// Reset status, status history and missing attributes before a child is
    /// evaluated.
    pub fn reset_status(&mut self) {
        self.status_code = StatusCode::Ok;
        self.status_codes.clear();
        self.missing_attributes.clear();
    }

    /// Record a status code. The first non-Ok code becomes the primary
    /// status; every non-Ok code is kept in [`Self::status_codes`].
    pub fn update_status_code(&mut self, code: StatusCode) {
        if code.is_ok() {
            return;
        }
        if self.status_code.is_ok() {
            self.status_code = code;
        }
        self.status_codes.push(code);
    }

    /// Record several status codes in order.
    pub fn update_status_codes(&mut self, codes: &[StatusCode]) {
        for code in codes {
            self.update_status_code(*code);
        }
    }

    /// The primary status code.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Every non-Ok status code recorded since the last reset.
    pub fn status_codes(&self) -> &[StatusCode] {
        &self.status_codes
    }

    /// Attributes that were required but could not be resolved.
    pub fn missing_attributes(&self) -> &[MissingAttributeDetail] {
        &self.missing_attributes
    }

    /// Replace the missing attributes.
    pub fn set_missing_attributes(&mut self, missing: Vec<MissingAttributeDetail>) {
        self.missing_attributes = missing;
    }

    /// Record one missing attribute, ignoring duplicates.
    pub fn add_missing_attribute(&mut self, detail: MissingAttributeDetail) {
        if !self.missing_attributes.contains(&detail) {
            self.missing_attributes.push(detail);
        }
    }

    /// Obligations produced by the evaluation that just returned.
    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Add the obligations among `obligations` that apply to `effect`.
    pub fn add_obligations(
        &mut self,
        obligations: impl IntoIterator<Item = Obligation>,
        effect: Effect,
    ) {
        self.obligations
            .extend(obligations.into_iter().filter(|o| o.applies_to(effect)));
    }

    /// Drop all obligations.
    pub fn clear_obligations(&mut self) {
        self.obligations.clear();
    }

    /// Remove and return all obligations.
    pub fn take_obligations(&mut self) -> Vec<Obligation> {
        std::mem::take(&mut self.obligations)
    }

    /// Whether the target of the child evaluated last matched.
    pub fn is_target_matched(&self) -> bool {
        self.target_matched
    }

    /// Record whether the target of the child about to be evaluated matched.
    pub fn set_target_matched(&mut self, matched: bool) {
        self.target_matched = matched;
    }

    /// Enter a policy reference. Returns false when the nesting limit is hit.
    pub fn enter_reference(&mut self) -> bool {
        if self.reference_depth >= self.max_reference_depth {
            return false;
        }
        self.reference_depth += 1;
        true
    }

    /// Leave a policy reference entered with [`Self::enter_reference`].
    pub fn leave_reference(&mut self) {
        self.reference_depth = self.reference_depth.saturating_sub(1);
    }
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("status_code", &self.status_code)
            .field("status_codes", &self.status_codes)
            .field("missing_attributes", &self.missing_attributes)
            .field("obligations", &self.obligations)
            .field("target_matched", &self.target_matched)
            .field("reference_depth", &self.reference_depth)
            .field("has_attribute_finder", &self.attribute_finder.is_some())
            .field("has_evaluatable_index", &self.evaluatable_index.is_some())
            .finish()
    }
}
