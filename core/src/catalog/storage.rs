//! Storage resource descriptions

use serde::{Deserialize, Serialize};

use super::DataMovementInterface;
use crate::ids::DEFAULT_ID;

/// A storage host that gateways stage data to and from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageResourceDescription {
    pub storage_resource_id: String,
    pub host_name: String,
    pub storage_resource_description: Option<String>,
    pub enabled: bool,
    pub data_movement_interfaces: Vec<DataMovementInterface>,
    pub creation_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl Default for StorageResourceDescription {
    fn default() -> Self {
        Self {
            storage_resource_id: DEFAULT_ID.to_string(),
            host_name: String::new(),
            storage_resource_description: None,
            enabled: true,
            data_movement_interfaces: Vec::new(),
            creation_time: None,
            update_time: None,
        }
    }
}

impl StorageResourceDescription {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            ..Default::default()
        }
    }
}
