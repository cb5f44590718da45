use crate::config::APP_NAME;
use serde::{Deserialize, Serialize};

/// State the tool keeps for itself between runs.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct GlobalState {
    /// Fingerprint of the last auto-installed `loadit` package.
    pub autoinstall_hash: Option<u32>,
}

impl GlobalState {
    pub fn load() -> GlobalState {
        confy::load(APP_NAME, "state").unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "state", self)
    }
}
