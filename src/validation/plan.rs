// src/validation/plan.rs

use crate::actions::{ActionDescriptor, ActionRegistry};
use crate::context::RequestContext;
use crate::model::Args;
use crate::protocol::{Intent, Plan};
use crate::validation::normalize::{ResolvedAction, is_present, select_action};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanValidationError {
    /// Intent has no default action and the planner proposed none.
    #[error("No handler for intent '{0}'")]
    NoAction(Intent),

    #[error("No handler for action '{0}'")]
    UnknownAction(String),

    #[error("{message}")]
    MissingArgs {
        action: String,
        missing: Vec<String>,
        message: String,
    },
}

/// Required arguments that are absent or empty, in descriptor order.
pub fn missing_args(args: &Args, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|key| !is_present(args.get(**key)))
        .map(|key| key.to_string())
        .collect()
}

pub fn validate_action(
    action: &ResolvedAction,
    descriptor: &ActionDescriptor,
) -> Result<(), PlanValidationError> {
    let missing = missing_args(&action.args, descriptor.required_args);
    if missing.is_empty() {
        return Ok(());
    }
    Err(PlanValidationError::MissingArgs {
        action: action.name.clone(),
        message: descriptor.hint.message(&missing),
        missing,
    })
}

/// Picks, normalizes and validates the action for a plan. On success the
/// action is ready to dispatch through the returned descriptor.
pub fn resolve<'r>(
    plan: &Plan,
    ctx: &RequestContext,
    registry: &'r ActionRegistry,
) -> Result<(ResolvedAction, &'r ActionDescriptor), PlanValidationError> {
    let action = select_action(plan, ctx).ok_or(PlanValidationError::NoAction(plan.intent))?;
    let descriptor = registry
        .get(&action.name)
        .ok_or_else(|| PlanValidationError::UnknownAction(action.name.clone()))?;

    validate_action(&action, descriptor)?;
    debug!(action = %action.name, "action validated");
    Ok((action, descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionHandler;
    use crate::error::ActionError;
    use crate::protocol::ProposedAction;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn execute(&self, _args: &Args, _ctx: &RequestContext) -> Result<Value, ActionError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> ActionRegistry {
        ActionRegistry::new()
            .register(ActionDescriptor::update_ticket_time(Noop))
            .register(ActionDescriptor::get_trips(Noop))
            .register(ActionDescriptor::get_pending_orders(Noop))
            .register(ActionDescriptor::faq(Noop))
    }

    fn ctx() -> RequestContext {
        RequestContext {
            text: "Đổi giờ vé order 12".into(),
            user_id: Some(7),
        }
    }

    fn proposed(name: &str, args: Value) -> Plan {
        Plan {
            intent: Intent::ChangeTime,
            slots: Args::new(),
            action: Some(ProposedAction {
                name: name.into(),
                args: args.as_object().cloned().unwrap(),
            }),
            notes: None,
        }
    }

    #[test]
    fn every_empty_required_argument_is_reported() {
        let registry = registry();
        for args in [
            json!({"order_id": 12}),
            json!({"order_id": 12, "new_time_iso": ""}),
            json!({"order_id": 12, "new_time_iso": null}),
        ] {
            let err = resolve(&proposed("update_ticket_time", args), &ctx(), &registry).unwrap_err();
            match err {
                PlanValidationError::MissingArgs { action, missing, message } => {
                    assert_eq!(action, "update_ticket_time");
                    assert_eq!(missing, vec!["new_time_iso".to_string()]);
                    assert!(message.contains("new_time_iso"));
                }
                other => panic!("expected clarification, got {other:?}"),
            }
        }

        let err = resolve(&proposed("get_trips", json!({})), &ctx(), &registry).unwrap_err();
        assert!(matches!(err, PlanValidationError::MissingArgs { ref missing, .. } if missing == &["route_id"]));
    }

    #[test]
    fn alias_counts_as_the_canonical_argument() {
        let registry = registry();
        let (with_alias, _) = resolve(
            &proposed("update_ticket_time", json!({"order_id": 12, "new_time": "2025-09-15T10:00:00"})),
            &ctx(),
            &registry,
        )
        .unwrap();
        let (canonical, _) = resolve(
            &proposed("update_ticket_time", json!({"order_id": 12, "new_time_iso": "2025-09-15T10:00:00"})),
            &ctx(),
            &registry,
        )
        .unwrap();
        assert_eq!(with_alias.args["new_time_iso"], canonical.args["new_time_iso"]);
    }

    #[test]
    fn unregistered_and_missing_actions_are_not_silent() {
        let registry = registry();
        let err = resolve(&proposed("query_ticket_time", json!({"order_id": 3})), &ctx(), &registry).unwrap_err();
        assert_eq!(err.to_string(), "No handler for action 'query_ticket_time'");

        let err = resolve(&Plan::unknown(), &ctx(), &registry).unwrap_err();
        assert_eq!(err, PlanValidationError::NoAction(Intent::Unknown));
    }

    #[test]
    fn anonymous_pending_orders_need_clarification() {
        let registry = registry();
        let plan = Plan {
            intent: Intent::GetPendingOrders,
            ..Plan::unknown()
        };
        let anonymous = RequestContext { user_id: None, ..ctx() };
        let err = resolve(&plan, &anonymous, &registry).unwrap_err();
        assert!(matches!(err, PlanValidationError::MissingArgs { ref missing, .. } if missing == &["user_id"]));

        let (action, descriptor) = resolve(&plan, &ctx(), &registry).unwrap();
        assert_eq!(descriptor.name, "get_pending_orders");
        assert_eq!(action.args["user_id"], 7);
    }
}
