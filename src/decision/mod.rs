//! Decision module
//!
//! Fuses sub-scores into an action with confidence and an audit trail, then
//! enforces hard risk limits on the result

mod fusion;
mod types;
mod validator;

pub use fusion::{DecisionFusion, FusionWeights};
pub use types::{
    Action, Decision, Explanation, FactorContribution, FusionResult, RejectReason,
    ValidatorOutcome,
};
pub use validator::{DecisionValidator, ValidationContext};
