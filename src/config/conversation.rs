//! Conversation configuration

use serde::Deserialize;

/// Session behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationConfig {
    /// Defer proposals for fields outside the current step
    #[serde(default = "default_restrict")]
    pub restrict_updates_to_step: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            restrict_updates_to_step: default_restrict(),
        }
    }
}

fn default_restrict() -> bool {
    true
}
