use crate::actions::{
    ActionDescriptor, ActionRegistry, FaqAction, GetPendingOrdersAction, GetTripsAction,
    UpdateTicketTimeAction,
};
use crate::agent::ToolAgent;
use crate::backend::{OrderStore, TripStore};
use crate::context::UserRequest;
use crate::error::{ErrorKind, PipelineError};
use crate::faq::FaqAnswerer;
use crate::protocol::{ExecutionEnvelope, Planner};
use crate::validation::{PlanValidationError, resolve};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The four built-in actions wired to their collaborators.
pub fn standard_registry(
    orders: Arc<dyn OrderStore>,
    trips: Arc<dyn TripStore>,
    faq: Arc<dyn FaqAnswerer>,
    agent: Arc<ToolAgent>,
) -> ActionRegistry {
    ActionRegistry::new()
        .register(ActionDescriptor::update_ticket_time(UpdateTicketTimeAction::new(
            orders.clone(),
            agent,
        )))
        .register(ActionDescriptor::get_trips(GetTripsAction::new(trips)))
        .register(ActionDescriptor::get_pending_orders(GetPendingOrdersAction::new(orders)))
        .register(ActionDescriptor::faq(FaqAction::new(faq)))
}

/// Text in, envelope out: plan, validate, dispatch.
pub struct IntentPipeline {
    planner: Arc<dyn Planner>,
    registry: ActionRegistry,
}

impl IntentPipeline {
    pub fn new(planner: Arc<dyn Planner>, registry: ActionRegistry) -> Self {
        Self { planner, registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Fails only when no plan can be produced at all. Every later problem
    /// is reported inside the envelope.
    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn handle(&self, request: &UserRequest) -> Result<ExecutionEnvelope, PipelineError> {
        request.ensure_supported()?;

        let plan = self.planner.plan(&request.text, request.user_id).await?;
        info!(intent = %plan.intent, "plan received");

        let ctx = request.context();
        let (action, descriptor) = match resolve(&plan, &ctx, &self.registry) {
            Ok(resolved) => resolved,
            Err(PlanValidationError::MissingArgs {
                action,
                missing,
                message,
            }) => {
                info!(%action, ?missing, "asking for clarification");
                return Ok(ExecutionEnvelope::clarification(plan, &action, missing, message));
            }
            Err(err) => {
                warn!(%err, "no handler");
                return Ok(ExecutionEnvelope::failure(plan, ErrorKind::NoHandler, err.to_string()));
            }
        };

        match descriptor.handler.execute(&action.args, &ctx).await {
            Ok(result) => {
                info!(action = %action.name, "action completed");
                Ok(ExecutionEnvelope::success(plan, result))
            }
            Err(err) => {
                warn!(action = %action.name, %err, "action failed");
                Ok(ExecutionEnvelope::failure(plan, err.kind(), err.to_string()))
            }
        }
    }
}
