//! Request and response types

use serde::{Deserialize, Serialize};

/// `/add_activity` parameters, from the query string or a form body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddActivityParams {
    pub user: Option<String>,
    pub data: Option<String>,
    pub key: Option<String>,
    /// Seconds since the epoch; the current time when absent
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddActivityResponse {
    pub log_written: bool,
    pub statistics_updated: bool,
}

/// Addresses one counter tree: `key` wins over `timestamp`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveUsersParams {
    pub key: Option<String>,
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLogsParams {
    pub user: Option<String>,
    pub begin_time: Option<u64>,
    pub end_time: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLogsResponse {
    /// One entry per day bucket, payloads concatenated
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepartitionParams {
    pub key: Option<String>,
    pub timestamp: Option<u64>,
    pub chunks: Option<u32>,
    /// Copy the tree here instead of resharding in place
    pub new_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
