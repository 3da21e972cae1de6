// src/validation/normalize.rs

//! Turns a plan into a concrete action name and canonical argument map.

use crate::actions::{FAQ, GET_PENDING_ORDERS, GET_TRIPS, UPDATE_TICKET_TIME};
use crate::context::RequestContext;
use crate::model::Args;
use crate::protocol::{Intent, Plan};
use serde_json::Value;

/// `(action, alias, canonical)` argument names.
pub const ARG_ALIASES: &[(&str, &str, &str)] = &[
    (UPDATE_TICKET_TIME, "new_time", "new_time_iso"),
    (GET_TRIPS, "route", "route_id"),
    (FAQ, "query", "question"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAction {
    pub name: String,
    pub args: Args,
}

/// A value counts only when it carries information.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

fn copy_slot(args: &mut Args, plan: &Plan, slot_keys: &[&str], arg: &str) {
    if let Some(value) = slot_keys
        .iter()
        .map(|k| plan.slot(k))
        .find(|v| is_present(*v))
        .flatten()
    {
        args.insert(arg.to_string(), value.clone());
    }
}

/// The action implied by the intent when the planner proposed none.
pub fn default_action(plan: &Plan, ctx: &RequestContext) -> Option<ResolvedAction> {
    let mut args = Args::new();
    let name = match plan.intent {
        Intent::GetTrips => {
            copy_slot(&mut args, plan, &["route_id"], "route_id");
            GET_TRIPS
        }
        Intent::GetPendingOrders => {
            if let Some(uid) = ctx.user_id {
                args.insert("user_id".into(), uid.into());
            }
            GET_PENDING_ORDERS
        }
        Intent::ChangeTime => {
            copy_slot(&mut args, plan, &["order_id"], "order_id");
            copy_slot(&mut args, plan, &["new_time", "new_time_iso"], "new_time_iso");
            UPDATE_TICKET_TIME
        }
        Intent::Faq => {
            copy_slot(&mut args, plan, &["question"], "question");
            if !args.contains_key("question") {
                args.insert("question".into(), ctx.text.clone().into());
            }
            FAQ
        }
        Intent::Unknown => return None,
    };
    Some(ResolvedAction {
        name: name.to_string(),
        args,
    })
}

/// Applies the alias table, then pins `user_id` to the caller for
/// `get_pending_orders`.
pub fn normalize(mut action: ResolvedAction, ctx: &RequestContext) -> ResolvedAction {
    for (name, alias, canonical) in ARG_ALIASES {
        if action.name != *name || is_present(action.args.get(*canonical)) {
            continue;
        }
        if let Some(value) = action.args.get(*alias).filter(|v| is_present(Some(*v))).cloned() {
            action.args.insert(canonical.to_string(), value);
        }
    }

    if action.name == GET_PENDING_ORDERS {
        match ctx.user_id {
            Some(uid) => {
                action.args.insert("user_id".into(), uid.into());
            }
            None => {
                action.args.remove("user_id");
            }
        }
    }
    action
}

/// Planner action if any, else the intent default, normalized.
pub fn select_action(plan: &Plan, ctx: &RequestContext) -> Option<ResolvedAction> {
    let action = match &plan.action {
        Some(proposed) => ResolvedAction {
            name: proposed.name.clone(),
            args: proposed.args.clone(),
        },
        None => default_action(plan, ctx)?,
    };
    Some(normalize(action, ctx))
}
