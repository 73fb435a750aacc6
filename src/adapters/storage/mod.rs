//! Template storage adapters.

mod file_template_store;

pub use file_template_store::FileTemplateStore;
