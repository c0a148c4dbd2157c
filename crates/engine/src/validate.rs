//! Structural validation. Run this before persisting or scheduling an
//! automation.
//!
//! Rules enforced:
//! 1. Step IDs must be unique within the automation.
//! 2. Exactly one trigger step, at order 0.
//! 3. Action steps at order ≥ 1, no two at the same order.
//! 4. Every `source_step_id` names a step of this automation that runs
//!    earlier. Unwired actions are allowed; they fail at run time.
//! 5. Every `connector_id` is registered for its step's role.
//!
//! Returns the action step IDs in execution order on success.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{AutomationDefinition, StepRole};
use crate::registry::ConnectorRegistry;
use crate::EngineError;

/// Validate `definition` against `registry`.
///
/// # Errors
/// The first rule violation found, as the matching [`EngineError`] variant.
pub fn validate_automation(
    definition: &AutomationDefinition,
    registry: &ConnectorRegistry,
) -> Result<Vec<Uuid>, EngineError> {
    let steps = &definition.steps;

    // -----------------------------------------------------------------------
    // 1. Unique IDs
    // -----------------------------------------------------------------------
    let mut seen_ids: HashSet<Uuid> = HashSet::new();
    for step in steps {
        if !seen_ids.insert(step.id) {
            return Err(EngineError::DuplicateStepId(step.id));
        }
    }

    // -----------------------------------------------------------------------
    // 2. One trigger at order 0
    // -----------------------------------------------------------------------
    let triggers: Vec<_> = steps.iter().filter(|s| s.role == StepRole::Trigger).collect();
    if triggers.len() != 1 {
        return Err(EngineError::TriggerCount {
            automation_id: definition.automation.id,
            found: triggers.len(),
        });
    }
    if triggers[0].order != 0 {
        return Err(EngineError::TriggerOrder {
            step_id: triggers[0].id,
            order: triggers[0].order,
        });
    }

    // -----------------------------------------------------------------------
    // 3. Action orders
    // -----------------------------------------------------------------------
    let mut actions: Vec<_> = steps.iter().filter(|s| s.role == StepRole::Action).collect();
    actions.sort_by_key(|s| s.order);

    let mut seen_orders: HashSet<i32> = HashSet::new();
    for action in &actions {
        if action.order < 1 {
            return Err(EngineError::ActionOrder {
                step_id: action.id,
                order: action.order,
            });
        }
        if !seen_orders.insert(action.order) {
            return Err(EngineError::DuplicateOrder { order: action.order });
        }
    }

    // -----------------------------------------------------------------------
    // 4. Source wiring
    // -----------------------------------------------------------------------
    let order_of: HashMap<Uuid, i32> = steps.iter().map(|s| (s.id, s.order)).collect();
    for action in &actions {
        let Some(source_step_id) = action.source_step_id else {
            continue;
        };
        match order_of.get(&source_step_id) {
            None => {
                return Err(EngineError::UnknownSourceStep {
                    step_id: action.id,
                    source_step_id,
                })
            }
            Some(&source_order) if source_order >= action.order => {
                return Err(EngineError::ForwardSourceReference {
                    step_id: action.id,
                    source_step_id,
                })
            }
            Some(_) => {}
        }
    }

    // -----------------------------------------------------------------------
    // 5. Registered connectors
    // -----------------------------------------------------------------------
    for step in steps {
        registry.ensure_known(step.role, &step.connector_id)?;
    }

    Ok(actions.iter().map(|s| s.id).collect())
}
