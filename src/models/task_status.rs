use serde::{Deserialize, Serialize};

/// Incremental status pushed to whoever is watching a long-running task.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", content = "data")]
pub enum TaskStatus {
    Log(String),
    Progress { title: String, percentage: u8 },
    Finished(String),
}
