//! # XACML Policy Decision Point
//!
//! A policy decision point built around the XACML combining algorithms. A
//! request is matched against a tree of policies and policy sets; each level
//! of the tree folds its children's decisions with a combining algorithm
//! (deny-overrides, permit-overrides, first-applicable, only-one-applicable
//! and the ordered variants) and carries the obligations of the winning
//! effect up to the caller.
//!
//! ## Features
//!
//! - **Combining algorithms**: every XACML 1.x rule and policy combining
//!   algorithm, with optional evaluation of abandoned children so that late
//!   obligations are not lost
//! - **Policy references**: children may refer to top-level evaluatables by id
//! - **Pluggable matching**: target matcher, condition evaluator and
//!   attribute finder are traits with a usable default
//! - **Decision cache**: optional LRU cache invalidated on policy changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xacml_pdp::{Decision, PolicyDecisionPoint, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pdp = PolicyDecisionPoint::builder()
//!         .with_policy_file("policies/access.yaml")
//!         .with_cache_enabled(true)
//!         .build()
//!         .await?;
//!
//!     let request = Request::builder()
//!         .with_subject_id("alice")
//!         .with_resource_id("report-42")
//!         .with_action_id("read")
//!         .build();
//!
//!     let response = pdp.evaluate(&request)?;
//!     match response.decision {
//!         Decision::Permit => println!("Permitted, obligations: {:?}", response.obligation_ids()),
//!         Decision::Deny => println!("Denied"),
//!         other => println!("{} ({})", other, response.status_code),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod api;
pub mod cache;
pub mod combining;
pub mod config;
pub mod core;
pub mod error;
pub mod policy;
pub mod request;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use api::{PolicyDecisionPoint, PolicyDecisionPointBuilder, Response};
pub use combining::{
    CombiningAlgorithm, CombiningAlgorithms, PolicyCombiningAlgId, PolicyCombiningAlgorithm,
    RuleCombiningAlgId, RuleCombiningAlgorithm,
};
pub use config::Config;
pub use crate::core::{
    AttributeFinder, ConditionEvaluator, EvaluationContext, MatchResult, Matchers, TargetMatcher,
};
pub use error::{Error, Result};
pub use policy::{
    Condition, Decision, Effect, Evaluatable, Obligation, Policy, PolicyDocument, PolicyRef,
    PolicyReference, PolicySet, PolicyTreeNode, Rule, StatusCode, Target,
};
pub use request::{Category, Request};
pub use store::{EvaluatableIndex, PolicyStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
