//! TemplateStore port - Where template documents come from.
//!
//! Storage is a host concern. The engine only asks for the raw bytes of a
//! template by id and parses them itself.

use async_trait::async_trait;

/// Port for fetching template documents.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Raw JSON or YAML bytes for `template_id`.
    async fn fetch(&self, template_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Ids of every stored template.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Template store errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("template store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn TemplateStore) {}

    #[test]
    fn not_found_names_template() {
        assert_eq!(
            StoreError::NotFound("dmv-renewal".into()).to_string(),
            "template 'dmv-renewal' not found"
        );
    }
}
