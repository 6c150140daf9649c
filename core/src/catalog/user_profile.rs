//! User resource profiles

use serde::{Deserialize, Serialize};

/// A user's own settings for one compute resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserComputeResourcePreference {
    pub compute_resource_id: String,
    pub login_user_name: Option<String>,
    pub preferred_batch_queue: Option<String>,
    pub scratch_location: Option<String>,
    pub allocation_project_number: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
    pub quality_of_service: Option<String>,
    pub reservation: Option<String>,
    pub reservation_start_time: Option<i64>,
    pub reservation_end_time: Option<i64>,
    pub validated: bool,
}

/// A user's own settings for one storage resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStoragePreference {
    pub storage_resource_id: String,
    pub login_user_name: Option<String>,
    pub file_system_root_location: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
}

/// Per-user resource settings within a gateway
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserResourceProfile {
    pub user_id: String,
    pub gateway_id: String,
    pub credential_store_token: Option<String>,
    pub user_compute_resource_preferences: Vec<UserComputeResourcePreference>,
    pub user_storage_preferences: Vec<UserStoragePreference>,
    pub identity_server_tenant: Option<String>,
    pub identity_server_pwd_cred_token: Option<String>,
    pub is_null_user: bool,
    pub creation_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl UserResourceProfile {
    pub fn new(user_id: impl Into<String>, gateway_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            gateway_id: gateway_id.into(),
            ..Default::default()
        }
    }

    /// Validate profile input
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("User id cannot be empty".to_string());
        }
        if self.gateway_id.trim().is_empty() {
            return Err("Gateway id cannot be empty".to_string());
        }
        Ok(())
    }
}
