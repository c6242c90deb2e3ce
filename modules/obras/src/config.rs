use serde::{Deserialize, Serialize};

/// Configuration for the obras module (`modules.obras` in the client config).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObrasConfig {
    /// Upper bound on concurrent per-part expense requests in the work detail.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
    /// `limit` sent with subgroup and part listings.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ObrasConfig {
    fn default() -> Self {
        Self {
            fanout_concurrency: default_fanout_concurrency(),
            page_limit: default_page_limit(),
        }
    }
}

fn default_fanout_concurrency() -> usize {
    4
}

fn default_page_limit() -> u32 {
    100
}
