//! LoadTemplateHandler - fetches, parses and announces a template.

use std::sync::Arc;
use tracing::{info, warn};

use super::errors::EngineError;
use crate::domain::foundation::SerializableDomainEvent;
use crate::domain::template::{Template, TemplateLoaded};
use crate::ports::{EventPublisher, TemplateStore};

/// Command to load one template by id.
#[derive(Debug, Clone)]
pub struct LoadTemplateCommand {
    pub template_id: String,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadTemplateResult {
    pub template: Arc<Template>,
    pub event: TemplateLoaded,
}

/// Handler for loading templates.
pub struct LoadTemplateHandler {
    store: Arc<dyn TemplateStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl LoadTemplateHandler {
    pub fn new(store: Arc<dyn TemplateStore>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            event_publisher,
        }
    }

    /// # Errors
    ///
    /// - `Store` if the document cannot be fetched
    /// - `Template(Parse)` if it is malformed; nothing is published
    pub async fn handle(&self, cmd: LoadTemplateCommand) -> Result<LoadTemplateResult, EngineError> {
        let bytes = self.store.fetch(&cmd.template_id).await?;
        let template = Arc::new(Template::parse(&bytes)?);

        let event = TemplateLoaded::for_template(&template);
        info!(
            template_id = %event.template_id,
            version = %event.version,
            fields = event.field_count,
            steps = event.step_count,
            "template loaded"
        );

        let published = match event.to_envelope() {
            Ok(envelope) => self.event_publisher.publish(envelope).await,
            Err(e) => Err(e),
        };
        if let Err(e) = published {
            warn!(template_id = %event.template_id, error = %e, "event publish failed");
        }

        Ok(LoadTemplateResult { template, event })
    }
}
