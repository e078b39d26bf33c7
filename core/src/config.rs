//! Startup configuration for the bootstrap.

/// Element id of the command input the input guard protects.
pub const DEFAULT_GUARDED_INPUT_ID: &str = "cm-command-input";

/// Key code of Tab, the key that advances focus.
pub const TAB_KEY_CODE: u32 = 9;

/// Settings consumed by [`crate::bootstrap::embed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Id of the input element whose focus-advance key is suppressed.
    pub guarded_input_id: String,
    /// Key code the guard swallows.
    pub advance_focus_key: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            guarded_input_id: DEFAULT_GUARDED_INPUT_ID.to_string(),
            advance_focus_key: TAB_KEY_CODE,
        }
    }
}
