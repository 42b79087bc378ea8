//! Policy decision point implementation.

use super::Response;
use crate::cache::{CacheStats, DecisionCache};
use crate::combining::{CombiningAlgorithm, CombiningAlgorithms, PolicyCombiningAlgorithm};
use crate::config::Config;
use crate::core::{AttributeFinder, EvaluationContext, Matchers};
use crate::policy::{Evaluatable, PolicyDocument, PolicyRef, PolicyTreeNode};
use crate::request::Request;
use crate::store::{EvaluatableIndex, PolicyStore};
use crate::telemetry::{Telemetry, TelemetryMetrics};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Answers decision requests against the loaded policies.
///
/// Evaluation is synchronous and takes `&self`; one instance can be shared
/// across threads and tasks behind an `Arc`.
pub struct PolicyDecisionPoint {
    config: Config,
    root: PolicyCombiningAlgorithm,
    algorithms: CombiningAlgorithms,
    store: Arc<PolicyStore>,
    attribute_finder: Option<Arc<dyn AttributeFinder>>,
    cache: Option<DecisionCache>,
    telemetry: Option<Telemetry>,
}

impl PolicyDecisionPoint {
    /// Create a decision point builder.
    pub fn builder() -> PolicyDecisionPointBuilder {
        PolicyDecisionPointBuilder::new()
    }

    /// Create a decision point with the default matchers and no policies.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_parts(config, Matchers::default(), None)
    }

    fn with_parts(
        config: Config,
        matchers: Matchers,
        attribute_finder: Option<Arc<dyn AttributeFinder>>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = match (config.cache.enabled, &attribute_finder) {
            (true, Some(_)) => {
                tracing::warn!(
                    "Decision cache disabled: attribute finder results are not cacheable"
                );
                None
            }
            (true, None) => Some(DecisionCache::new(
                config.cache.l1_max_entries,
                config.cache.l1_ttl(),
            )),
            (false, _) => None,
        };
        let telemetry = if config.telemetry.enabled {
            Some(Telemetry::new(&config.telemetry))
        } else {
            None
        };

        let root = PolicyCombiningAlgorithm::new(
            config.engine.root_combining_algorithm,
            matchers.clone(),
            config.engine.respect_abandoned_evaluatables,
        );

        Ok(Self {
            root,
            algorithms: CombiningAlgorithms::new(matchers, &config.engine),
            store: Arc::new(PolicyStore::new()),
            attribute_finder,
            cache,
            telemetry,
            config,
        })
    }

    /// Evaluate a request.
    ///
    /// The enabled top-level evaluatables are combined with the configured
    /// root algorithm. Faults inside the policies surface as an
    /// Indeterminate response, never as `Err`.
    pub fn evaluate(&self, request: &Request) -> Result<Response> {
        let start = Instant::now();
        let generation = self.store.generation();

        if let Some(cache) = &self.cache {
            let cached = cache.get(request, generation);
            if let Some(telemetry) = &self.telemetry {
                telemetry.record_cache_lookup(cached.is_some());
            }
            if let Some(mut response) = cached {
                response.cached = true;
                response.evaluation_time_ms = start.elapsed().as_secs_f64() * 1000.0;
                if let Some(telemetry) = &self.telemetry {
                    telemetry.record_evaluation(response.decision, response.evaluation_time_ms);
                }
                return Ok(response);
            }
        }

        let mut ctx = EvaluationContext::new(&self.algorithms)
            .with_evaluatable_index(self.store.as_ref())
            .with_max_reference_depth(self.config.engine.max_reference_depth);
        if let Some(finder) = &self.attribute_finder {
            ctx = ctx.with_attribute_finder(finder.as_ref());
        }

        let candidates: Vec<Option<PolicyRef>> = self
            .store
            .candidates(request)
            .into_iter()
            .map(Some)
            .collect();

        let decision = self.root.evaluate(request, Some(&candidates[..]), &mut ctx);
        let response = Response::from_context(request.id.clone(), decision, &mut ctx)
            .with_evaluation_time(start.elapsed());

        tracing::debug!(
            request = %request.id,
            decision = %response.decision,
            status = %response.status_code,
            candidates = candidates.len(),
            "Request evaluated"
        );

        if let Some(cache) = &self.cache {
            cache.put(request, generation, &response);
        }
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_evaluation(response.decision, response.evaluation_time_ms);
        }

        Ok(response)
    }

    /// Load a policy document from a YAML or JSON file.
    ///
    /// Returns the ids of the loaded top-level evaluatables.
    pub async fn load_policy_file(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        let document = match Self::read_document(path).await {
            Ok(document) => document,
            Err(err) => return Err(self.track(err)),
        };
        tracing::info!(
            path = %path.display(),
            count = document.policies.len(),
            "Loading policy file"
        );
        self.load_document(document)
    }

    async fn read_document(path: &Path) -> Result<PolicyDocument> {
        let content = tokio::fs::read_to_string(path).await?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        PolicyDocument::from_str_with_extension(&content, extension)
    }

    /// Load a policy document from a YAML string.
    pub fn load_policy_yaml(&self, yaml: &str) -> Result<Vec<String>> {
        let document = PolicyDocument::from_yaml(yaml).map_err(|err| self.track(err))?;
        self.load_document(document)
    }

    /// Load a policy document from a JSON string.
    pub fn load_policy_json(&self, json: &str) -> Result<Vec<String>> {
        let document = PolicyDocument::from_json(json).map_err(|err| self.track(err))?;
        self.load_document(document)
    }

    /// Load every top-level evaluatable of a document.
    pub fn load_document(&self, document: PolicyDocument) -> Result<Vec<String>> {
        let ids = document
            .policies
            .iter()
            .map(|node| node.id().to_string())
            .collect();
        self.store
            .insert_document(document)
            .map_err(|err| self.track(err))?;
        self.clear_cache();
        Ok(ids)
    }

    /// Load a single top-level policy or policy set.
    ///
    /// References are only valid as children and are rejected.
    pub fn load_policy(&self, node: impl Into<PolicyTreeNode>) -> Result<String> {
        let node = node.into();
        let id = node.id().to_string();
        self.store.insert(node).map_err(|err| self.track(err))?;
        self.clear_cache();
        Ok(id)
    }

    /// Unload a top-level evaluatable by id.
    pub fn unload_policy(&self, id: &str) -> Result<()> {
        if self.store.remove(id).is_none() {
            let err = Error::validation(format!("Evaluatable not found: {}", id));
            return Err(self.track(err));
        }
        self.clear_cache();
        Ok(())
    }

    fn track(&self, err: Error) -> Error {
        tracing::warn!(error = %err, category = err.category(), "Policy change rejected");
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_error(err.category());
        }
        err
    }

    /// Get a top-level evaluatable by id.
    pub fn get_policy(&self, id: &str) -> Option<PolicyRef> {
        self.store.get(id)
    }

    /// Ids of the loaded top-level evaluatables, in load order.
    pub fn list_policies(&self) -> Vec<String> {
        self.store
            .list()
            .iter()
            .map(|node| node.id().to_string())
            .collect()
    }

    /// Number of loaded top-level evaluatables.
    pub fn policy_count(&self) -> usize {
        self.store.len()
    }

    /// The evaluatable store.
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clear the decision cache.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Get decision point metrics.
    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            policy_count: self.policy_count(),
            cache_enabled: self.cache.is_some(),
            cache_stats: self.cache_stats(),
            decisions: self.telemetry.as_ref().map(|t| t.metrics()),
        }
    }
}

impl std::fmt::Debug for PolicyDecisionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyDecisionPoint")
            .field("config", &self.config)
            .field("policy_count", &self.policy_count())
            .field("has_attribute_finder", &self.attribute_finder.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Builder for creating a [`PolicyDecisionPoint`].
#[derive(Default)]
pub struct PolicyDecisionPointBuilder {
    config: Option<Config>,
    matchers: Option<Matchers>,
    attribute_finder: Option<Arc<dyn AttributeFinder>>,
    policies: Vec<PolicyTreeNode>,
    documents: Vec<PolicyDocument>,
    policy_files: Vec<PathBuf>,
    telemetry_enabled: Option<bool>,
    cache_enabled: Option<bool>,
    cache_size: Option<usize>,
}

impl PolicyDecisionPointBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use custom target and condition matchers.
    pub fn with_matchers(mut self, matchers: Matchers) -> Self {
        self.matchers = Some(matchers);
        self
    }

    /// Resolve attributes the request lacks through `finder`.
    ///
    /// Decisions then depend on more than the request, so the decision cache
    /// stays off even when enabled.
    pub fn with_attribute_finder(mut self, finder: Arc<dyn AttributeFinder>) -> Self {
        self.attribute_finder = Some(finder);
        self
    }

    /// Add a top-level evaluatable to load.
    pub fn with_policy(mut self, node: impl Into<PolicyTreeNode>) -> Self {
        self.policies.push(node.into());
        self
    }

    /// Add a policy document to load.
    pub fn with_document(mut self, document: PolicyDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Add a policy file to load.
    pub fn with_policy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_files.push(path.into());
        self
    }

    /// Enable or disable decision counters.
    pub fn with_telemetry_enabled(mut self, enabled: bool) -> Self {
        self.telemetry_enabled = Some(enabled);
        self
    }

    /// Enable or disable caching.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    /// Set the cache size.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Build the decision point and load everything that was added.
    pub async fn build(self) -> Result<PolicyDecisionPoint> {
        let mut config = self.config.unwrap_or_default();

        if let Some(enabled) = self.telemetry_enabled {
            config.telemetry.enabled = enabled;
        }
        if let Some(enabled) = self.cache_enabled {
            config.cache.enabled = enabled;
        }
        if let Some(size) = self.cache_size {
            config.cache.l1_max_entries = size;
        }

        let pdp = PolicyDecisionPoint::with_parts(
            config,
            self.matchers.unwrap_or_default(),
            self.attribute_finder,
        )?;

        for node in self.policies {
            pdp.load_policy(node)?;
        }
        for document in self.documents {
            pdp.load_document(document)?;
        }
        for path in self.policy_files {
            pdp.load_policy_file(&path).await?;
        }

        tracing::info!(
            policies = pdp.policy_count(),
            root_algorithm = %pdp.config.engine.root_combining_algorithm,
            respect_abandoned = pdp.config.engine.respect_abandoned_evaluatables,
            "Policy decision point ready"
        );
        Ok(pdp)
    }
}

/// Decision point metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    /// Number of loaded top-level evaluatables
    pub policy_count: usize,
    /// Whether caching is enabled
    pub cache_enabled: bool,
    /// Cache statistics (if caching is enabled)
    pub cache_stats: Option<CacheStats>,
    /// Decision counters (if telemetry is enabled)
    pub decisions: Option<TelemetryMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::{PolicyCombiningAlgId, RuleCombiningAlgId};
    use crate::core::StaticAttributeFinder;
    use crate::policy::{
        AttributeDesignator, Condition, Decision, Obligation, Policy, PolicyReference, PolicySet,
        Rule, StatusCode,
    };
    use crate::request::{Category, ACTION_ID};
    use std::io::Write;

    const DOCUMENT: &str = r#"
apiVersion: pdp.xacml.io/v1
kind: PolicyDocument
policies:
  - kind: policy
    id: read-access
    combiningAlgorithm: "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides"
    target:
      operator: equals
      attribute:
        category: action
        attributeId: urn:oasis:names:tc:xacml:1.0:action:action-id
      value: read
    rules:
      - id: permit-read
        effect: Permit
    obligations:
      - id: log-read
        fulfillOn: Permit
  - kind: policy
    id: block-mallory
    combiningAlgorithm: "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable"
    rules:
      - id: deny-mallory
        effect: Deny
        condition:
          operator: equals
          attribute:
            category: subject
            attributeId: urn:oasis:names:tc:xacml:1.0:subject:subject-id
          value: mallory
        obligations:
          - id: alert
            fulfillOn: Deny
"#;

    fn read_by(subject: &str) -> Request {
        Request::builder()
            .with_subject_id(subject)
            .with_action_id("read")
            .build()
    }

    fn action_is(action: &str) -> Condition {
        Condition::equals(AttributeDesignator::string(Category::Action, ACTION_ID), action)
    }

    #[tokio::test]
    async fn test_creation() {
        let pdp = PolicyDecisionPoint::builder()
            .with_cache_enabled(true)
            .build()
            .await
            .unwrap();

        assert_eq!(pdp.policy_count(), 0);
        assert!(pdp.metrics().cache_enabled);

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::NotApplicable);
        assert_eq!(response.status_code, StatusCode::Ok);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.engine.max_reference_depth = 0;
        assert!(PolicyDecisionPoint::builder().with_config(config).build().await.is_err());
    }

    #[tokio::test]
    async fn test_yaml_document_evaluation() {
        let pdp = PolicyDecisionPoint::builder().build().await.unwrap();
        let ids = pdp.load_policy_yaml(DOCUMENT).unwrap();
        assert_eq!(ids, vec!["read-access", "block-mallory"]);

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Permit);
        assert_eq!(response.obligation_ids(), vec!["log-read"]);

        let response = pdp.evaluate(&read_by("mallory")).unwrap();
        assert_eq!(response.decision, Decision::Deny);
        assert_eq!(response.obligation_ids(), vec!["alert"]);
        assert_eq!(response.status_code, StatusCode::Ok);
    }

    #[tokio::test]
    async fn test_root_algorithm_from_config() {
        let mut config = Config::default();
        config.engine.root_combining_algorithm = PolicyCombiningAlgId::PermitOverrides;
        let pdp = PolicyDecisionPoint::builder()
            .with_config(config)
            .build()
            .await
            .unwrap();
        pdp.load_policy_yaml(DOCUMENT).unwrap();

        let response = pdp.evaluate(&read_by("mallory")).unwrap();
        assert_eq!(response.decision, Decision::Permit);
        assert_eq!(response.obligation_ids(), vec!["log-read"]);
    }

    #[tokio::test]
    async fn test_load_policy_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let pdp = PolicyDecisionPoint::builder()
            .with_policy_file(file.path())
            .build()
            .await
            .unwrap();
        assert_eq!(pdp.list_policies(), vec!["read-access", "block-mallory"]);

        assert!(pdp.load_policy_file("/nonexistent/policies.yaml").await.is_err());
    }

    #[tokio::test]
    async fn test_load_and_unload() {
        let pdp = PolicyDecisionPoint::builder().build().await.unwrap();
        let policy = Policy::builder("p")
            .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
            .rule(Rule::permit("r"))
            .build();

        assert_eq!(pdp.load_policy(policy).unwrap(), "p");
        assert!(pdp.get_policy("p").is_some());

        pdp.unload_policy("p").unwrap();
        assert_eq!(pdp.policy_count(), 0);
        assert!(pdp.unload_policy("p").is_err());
    }

    #[tokio::test]
    async fn test_cache_hit_and_invalidation() {
        let pdp = PolicyDecisionPoint::builder()
            .with_cache_enabled(true)
            .with_policy(
                Policy::builder("allow-all")
                    .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
                    .rule(Rule::permit("r"))
                    .build(),
            )
            .build()
            .await
            .unwrap();

        let first = pdp.evaluate(&read_by("alice")).unwrap();
        assert!(!first.cached);
        let second = pdp.evaluate(&read_by("alice")).unwrap();
        assert!(second.cached);
        assert_eq!(second.decision, Decision::Permit);

        pdp.load_policy(
            Policy::builder("deny-all")
                .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
                .rule(Rule::deny("r"))
                .build(),
        )
        .unwrap();

        let third = pdp.evaluate(&read_by("alice")).unwrap();
        assert!(!third.cached);
        assert_eq!(third.decision, Decision::Deny);

        let stats = pdp.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);

        let decisions = pdp.metrics().decisions.unwrap();
        assert_eq!(decisions.total_evaluations, 3);
        assert_eq!(decisions.cache_hits, 1);
        assert_eq!(decisions.cache_misses, 2);
    }

    #[tokio::test]
    async fn test_policy_change_after_evaluation_not_served_stale() {
        let pdp = PolicyDecisionPoint::builder()
            .with_cache_enabled(true)
            .with_policy(
                Policy::builder("gate")
                    .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
                    .rule(Rule::permit("r"))
                    .build(),
            )
            .build()
            .await
            .unwrap();
        let request = read_by("alice");

        // A slow evaluation whose write lands after the policy swap.
        let stale_generation = pdp.store().generation();
        let stale = pdp.evaluate(&request).unwrap();
        pdp.load_policy(
            Policy::builder("gate")
                .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
                .rule(Rule::deny("r"))
                .build(),
        )
        .unwrap();
        pdp.cache.as_ref().unwrap().put(&request, stale_generation, &stale);

        let response = pdp.evaluate(&request).unwrap();
        assert!(!response.cached);
        assert_eq!(response.decision, Decision::Deny);
    }

    #[tokio::test]
    async fn test_attribute_finder_disables_cache() {
        let finder = StaticAttributeFinder::new();
        let pdp = PolicyDecisionPoint::builder()
            .with_cache_enabled(true)
            .with_attribute_finder(Arc::new(finder))
            .build()
            .await
            .unwrap();

        assert!(pdp.cache_stats().is_none());
        pdp.evaluate(&read_by("alice")).unwrap();
        assert!(!pdp.evaluate(&read_by("alice")).unwrap().cached);
    }

    #[tokio::test]
    async fn test_top_level_reference_rejected() {
        let pdp = PolicyDecisionPoint::builder()
            .with_policy(
                Policy::builder("shared")
                    .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
                    .rule(Rule::permit("r"))
                    .build(),
            )
            .build()
            .await
            .unwrap();

        assert!(pdp.load_policy(PolicyReference::new("shared")).is_err());
        assert_eq!(pdp.get_policy("shared").unwrap().kind(), "policy");

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Permit);
        assert_eq!(pdp.metrics().decisions.unwrap().errors, 1);
    }

    #[tokio::test]
    async fn test_reference_to_top_level_policy() {
        let shared = Policy::builder("shared")
            .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
            .rule(Rule::deny("r"))
            .obligation(Obligation::on_deny("shared-alert"))
            .enabled(false)
            .build();
        let set = PolicySet::builder("entry")
            .combining_algorithm(PolicyCombiningAlgId::FirstApplicable)
            .child(PolicyReference::new("shared"))
            .build();

        let pdp = PolicyDecisionPoint::builder()
            .with_policy(shared)
            .with_policy(set)
            .build()
            .await
            .unwrap();

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Deny);
        assert_eq!(response.obligation_ids(), vec!["shared-alert"]);
    }

    #[tokio::test]
    async fn test_unresolved_reference_is_indeterminate() {
        let set = PolicySet::builder("entry")
            .combining_algorithm(PolicyCombiningAlgId::FirstApplicable)
            .child(PolicyReference::new("missing"))
            .build();
        let pdp = PolicyDecisionPoint::builder().with_policy(set).build().await.unwrap();

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Indeterminate);
        assert_eq!(response.status_code, StatusCode::ProcessingError);
    }

    #[tokio::test]
    async fn test_attribute_finder_supplies_missing_attribute() {
        let clearance = AttributeDesignator::string(Category::Subject, "clearance").required();
        let policy = Policy::builder("clearance")
            .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
            .target(action_is("read"))
            .rule(
                Rule::permit("cleared")
                    .with_condition(Condition::equals(clearance.clone(), "secret")),
            )
            .build();

        let pdp = PolicyDecisionPoint::builder()
            .with_policy(policy.clone())
            .build()
            .await
            .unwrap();
        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Indeterminate);
        assert_eq!(response.status_code, StatusCode::MissingAttribute);
        assert_eq!(response.missing_attributes[0].attribute_id, "clearance");

        let finder =
            StaticAttributeFinder::new().with_value(clearance, serde_json::json!("secret"));
        let pdp = PolicyDecisionPoint::builder()
            .with_attribute_finder(Arc::new(finder))
            .with_policy(policy)
            .build()
            .await
            .unwrap();
        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Permit);
        assert!(response.missing_attributes.is_empty());
    }

    #[tokio::test]
    async fn test_respect_abandoned_collects_every_deny_obligation() {
        let deny = |id: &str, obligation: &str| {
            Policy::builder(id)
                .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
                .rule(Rule::deny("r"))
                .obligation(Obligation::on_deny(obligation))
                .build()
        };

        let mut config = Config::default();
        config.engine.respect_abandoned_evaluatables = true;
        let pdp = PolicyDecisionPoint::builder()
            .with_config(config)
            .with_policy(deny("first", "first-alert"))
            .with_policy(deny("second", "second-alert"))
            .build()
            .await
            .unwrap();

        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert_eq!(response.decision, Decision::Deny);
        assert_eq!(response.obligation_ids(), vec!["first-alert", "second-alert"]);
    }

    #[tokio::test]
    async fn test_metrics() {
        let pdp = PolicyDecisionPoint::builder().build().await.unwrap();
        pdp.load_policy_yaml(DOCUMENT).unwrap();
        pdp.evaluate(&read_by("alice")).unwrap();
        pdp.evaluate(&read_by("mallory")).unwrap();

        assert!(pdp.unload_policy("missing").is_err());
        assert!(pdp.load_policy_yaml("policies: [").is_err());

        let metrics = pdp.metrics();
        assert_eq!(metrics.policy_count, 2);
        let decisions = metrics.decisions.unwrap();
        assert_eq!(decisions.permit, 1);
        assert_eq!(decisions.deny, 1);
        assert_eq!(decisions.cache_hits, 0);
        assert_eq!(decisions.cache_misses, 0);
        assert_eq!(decisions.errors, 2);
    }

    struct AlwaysTrue;

    impl crate::core::ConditionEvaluator for AlwaysTrue {
        fn evaluate_condition(
            &self,
            _condition: &Condition,
            _request: &Request,
            _ctx: &mut EvaluationContext<'_>,
        ) -> crate::core::MatchResult {
            crate::core::MatchResult::Match
        }
    }

    #[tokio::test]
    async fn test_builder_options() {
        let matchers = Matchers::new(
            Arc::new(crate::core::AttributeMatcher::new()),
            Arc::new(AlwaysTrue),
        );
        let pdp = PolicyDecisionPoint::builder()
            .with_document(PolicyDocument::from_yaml(DOCUMENT).unwrap())
            .with_matchers(matchers)
            .with_telemetry_enabled(false)
            .with_cache_enabled(true)
            .with_cache_size(1)
            .build()
            .await
            .unwrap();

        assert_eq!(pdp.config().cache.l1_max_entries, 1);
        assert!(pdp.metrics().decisions.is_none());

        // Every condition holds, so deny-mallory applies to anyone.
        let response = pdp.evaluate(&read_by("alice")).unwrap();
        assert!(response.decision.is_deny());
        assert_eq!(response.obligation_ids(), vec!["alert"]);
    }

    #[tokio::test]
    async fn test_shared_across_threads() {
        let pdp = Arc::new(PolicyDecisionPoint::builder().build().await.unwrap());
        pdp.load_policy_yaml(DOCUMENT).unwrap();

        let handles: Vec<_> = ["alice", "mallory", "bob", "mallory"]
            .into_iter()
            .map(|subject| {
                let pdp = Arc::clone(&pdp);
                std::thread::spawn(move || pdp.evaluate(&read_by(subject)).unwrap().decision)
            })
            .collect();

        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(
            decisions,
            vec![Decision::Permit, Decision::Deny, Decision::Permit, Decision::Deny]
        );
    }
}
