//! Template events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, Timestamp};

/// Published when a template document parses successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLoaded {
    pub event_id: EventId,
    pub template_id: String,
    pub version: String,
    pub name: String,
    pub field_count: usize,
    pub step_count: usize,
    pub loaded_at: Timestamp,
}

crate::domain_event!(
    TemplateLoaded,
    event_type = "template.loaded.v1",
    schema_version = 1,
    aggregate_id = template_id,
    aggregate_type = "Template",
    occurred_at = loaded_at,
    event_id = event_id
);

impl TemplateLoaded {
    pub fn for_template(template: &super::Template) -> Self {
        Self {
            event_id: EventId::new(),
            template_id: template.id().to_string(),
            version: template.version().to_string(),
            name: template.name().to_string(),
            field_count: template.fields().count(),
            step_count: template.steps().len(),
            loaded_at: Timestamp::now(),
        }
    }
}
