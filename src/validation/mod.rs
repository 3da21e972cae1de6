// src/validation/mod.rs

pub mod normalize;
pub mod plan;

pub use normalize::{ARG_ALIASES, ResolvedAction, default_action, is_present, normalize, select_action};
pub use plan::{PlanValidationError, missing_args, resolve, validate_action};
