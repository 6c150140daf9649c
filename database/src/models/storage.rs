use appcatalog_core::StorageResourceDescription;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct StorageResourceRow {
    pub storage_resource_id: String,
    pub host_name: String,
    pub storage_resource_description: Option<String>,
    pub enabled: bool,
    pub creation_time: i64,
    pub update_time: i64,
}

impl StorageResourceRow {
    pub fn into_description(self) -> StorageResourceDescription {
        StorageResourceDescription {
            storage_resource_id: self.storage_resource_id,
            host_name: self.host_name,
            storage_resource_description: self.storage_resource_description,
            enabled: self.enabled,
            data_movement_interfaces: Vec::new(),
            creation_time: Some(self.creation_time),
            update_time: Some(self.update_time),
        }
    }
}
