//! One-time setup of a push callback for a webhook-type trigger step.
//!
//! Registration is all or nothing: the secret is only persisted (and
//! attached to the step) after the external service accepted the hook.

use std::sync::Arc;

use rand::RngCore;
use tracing::{error, info};
use uuid::Uuid;

use connectors::{TriggerKind, TriggerParams};

use crate::boundary::guarded;
use crate::config::EngineConfig;
use crate::models::{Step, StepRole, WebhookRecord};
use crate::registry::ConnectorRegistry;
use crate::store::{access_token_for, AutomationStore};
use crate::EngineError;

pub struct WebhookRegistrar {
    store: Arc<dyn AutomationStore>,
    registry: Arc<ConnectorRegistry>,
    config: EngineConfig,
}

impl WebhookRegistrar {
    pub fn new(
        store: Arc<dyn AutomationStore>,
        registry: Arc<ConnectorRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// The step's webhook ID, registering one first if it has none.
    pub async fn ensure_registered(&self, step: &Step) -> Result<Uuid, EngineError> {
        match step.webhook_id {
            Some(id) => Ok(id),
            None => Ok(self.register(step).await?.id),
        }
    }

    /// Register every active webhook trigger that has no callback yet.
    ///
    /// Failures are logged per step and do not stop the sweep. Returns how
    /// many registrations succeeded.
    pub async fn register_pending(&self) -> Result<usize, EngineError> {
        let mut registered = 0;

        for automation in self.store.list_active_automations().await? {
            let step = match self.store.get_trigger_step(automation.id).await {
                Ok(step) => step,
                Err(e) => {
                    error!(
                        automation_id = %automation.id,
                        error = %e,
                        "cannot load trigger step, skipping webhook registration"
                    );
                    continue;
                }
            };
            let is_webhook = self
                .registry
                .trigger(&step.connector_id)
                .map_or(false, |r| r.kind == TriggerKind::Webhook);
            if !is_webhook || step.webhook_id.is_some() {
                continue;
            }

            match self.register(&step).await {
                Ok(_) => registered += 1,
                Err(e) => error!(
                    automation_id = %automation.id,
                    step_id = %step.id,
                    error = %e,
                    "webhook registration failed"
                ),
            }
        }

        Ok(registered)
    }

    /// Generate a secret, ask the connector to register the callback and,
    /// if it accepts, persist the secret and attach it to `step`.
    ///
    /// # Errors
    /// [`EngineError::WebhookRegistration`] if the step is not a webhook
    /// trigger or the service refused, errored or timed out. Nothing is
    /// persisted in that case.
    pub async fn register(&self, step: &Step) -> Result<WebhookRecord, EngineError> {
        let rejected = |message: String| EngineError::WebhookRegistration {
            step_id: step.id,
            message,
        };

        if step.role != StepRole::Trigger {
            return Err(rejected("only trigger steps accept webhooks".into()));
        }

        let registration = self.registry.trigger(&step.connector_id)?;
        if registration.kind != TriggerKind::Webhook {
            return Err(rejected(format!(
                "connector '{}' is not a webhook trigger",
                step.connector_id
            )));
        }

        let access_token = access_token_for(self.store.as_ref(), step).await?;
        let connector = registration.build(TriggerParams {
            step_id: step.id,
            kind: registration.kind,
            last_execution_time: None,
            last_comparison_data: None,
            polling_interval: registration.polling_interval,
            access_token,
            payload: step.payload.clone(),
        });

        let secret = generate_secret(self.config.webhook_secret_len);
        let url = format!("{}/{}", self.config.webhook_base_url, step.id);

        match guarded(self.config.call_timeout, connector.hook(&url, &secret)).await {
            Ok(true) => {}
            Ok(false) => return Err(rejected("service refused the registration".into())),
            Err(e) => return Err(rejected(e.to_string())),
        }

        let record = self.store.create_webhook(step.id, &secret).await?;
        info!(step_id = %step.id, webhook_id = %record.id, %url, "webhook registered");
        Ok(record)
    }
}

/// `len` random bytes, hex encoded.
fn generate_secret(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
