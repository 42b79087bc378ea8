//! Public API of the decision point.
//!
//! [`PolicyDecisionPoint`] owns the loaded policies and answers
//! [`Request`](crate::request::Request)s with a [`Response`].

mod engine;
mod response;

pub use engine::{EngineMetrics, PolicyDecisionPoint, PolicyDecisionPointBuilder};
pub use response::Response;
