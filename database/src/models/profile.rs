//! Row types for gateway and user resource profiles

use appcatalog_core::{
    ComputeResourcePreference, GatewayResourceProfile, Result, StoragePreference,
    UserComputeResourcePreference, UserResourceProfile, UserStoragePreference,
};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GatewayProfileRow {
    pub gateway_id: String,
    pub credential_store_token: Option<String>,
    pub identity_server_tenant: Option<String>,
    pub identity_server_pwd_cred_token: Option<String>,
    pub creation_time: i64,
    pub update_time: i64,
}

impl GatewayProfileRow {
    pub fn into_profile(self) -> GatewayResourceProfile {
        GatewayResourceProfile {
            gateway_id: self.gateway_id,
            credential_store_token: self.credential_store_token,
            identity_server_tenant: self.identity_server_tenant,
            identity_server_pwd_cred_token: self.identity_server_pwd_cred_token,
            creation_time: Some(self.creation_time),
            update_time: Some(self.update_time),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GatewayComputePreferenceRow {
    pub compute_resource_id: String,
    pub override_by_airavata: bool,
    pub login_user_name: Option<String>,
    pub preferred_job_submission_protocol: Option<String>,
    pub preferred_data_movement_protocol: Option<String>,
    pub preferred_batch_queue: Option<String>,
    pub scratch_location: Option<String>,
    pub allocation_project_number: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
    pub usage_reporting_gateway_id: Option<String>,
    pub quality_of_service: Option<String>,
    pub reservation: Option<String>,
    pub reservation_start_time: Option<i64>,
    pub reservation_end_time: Option<i64>,
}

impl GatewayComputePreferenceRow {
    pub fn into_preference(self) -> Result<ComputeResourcePreference> {
        Ok(ComputeResourcePreference {
            compute_resource_id: self.compute_resource_id,
            override_by_airavata: self.override_by_airavata,
            login_user_name: self.login_user_name,
            preferred_job_submission_protocol: self
                .preferred_job_submission_protocol
                .map(|p| p.parse())
                .transpose()?,
            preferred_data_movement_protocol: self
                .preferred_data_movement_protocol
                .map(|p| p.parse())
                .transpose()?,
            preferred_batch_queue: self.preferred_batch_queue,
            scratch_location: self.scratch_location,
            allocation_project_number: self.allocation_project_number,
            resource_specific_credential_store_token: self.resource_specific_credential_store_token,
            usage_reporting_gateway_id: self.usage_reporting_gateway_id,
            quality_of_service: self.quality_of_service,
            reservation: self.reservation,
            reservation_start_time: self.reservation_start_time,
            reservation_end_time: self.reservation_end_time,
        })
    }
}

/// Storage preference columns, shared by gateway and user profiles
#[derive(Debug, Clone, FromRow)]
pub struct StoragePreferenceRow {
    pub storage_resource_id: String,
    pub login_user_name: Option<String>,
    pub file_system_root_location: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
}

impl From<StoragePreferenceRow> for StoragePreference {
    fn from(row: StoragePreferenceRow) -> Self {
        StoragePreference {
            storage_resource_id: row.storage_resource_id,
            login_user_name: row.login_user_name,
            file_system_root_location: row.file_system_root_location,
            resource_specific_credential_store_token: row.resource_specific_credential_store_token,
        }
    }
}

impl From<StoragePreferenceRow> for UserStoragePreference {
    fn from(row: StoragePreferenceRow) -> Self {
        UserStoragePreference {
            storage_resource_id: row.storage_resource_id,
            login_user_name: row.login_user_name,
            file_system_root_location: row.file_system_root_location,
            resource_specific_credential_store_token: row.resource_specific_credential_store_token,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub user_id: String,
    pub gateway_id: String,
    pub credential_store_token: Option<String>,
    pub identity_server_tenant: Option<String>,
    pub identity_server_pwd_cred_token: Option<String>,
    pub is_null_user: bool,
    pub creation_time: i64,
    pub update_time: i64,
}

impl UserProfileRow {
    pub fn into_profile(self) -> UserResourceProfile {
        UserResourceProfile {
            user_id: self.user_id,
            gateway_id: self.gateway_id,
            credential_store_token: self.credential_store_token,
            identity_server_tenant: self.identity_server_tenant,
            identity_server_pwd_cred_token: self.identity_server_pwd_cred_token,
            is_null_user: self.is_null_user,
            creation_time: Some(self.creation_time),
            update_time: Some(self.update_time),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserComputePreferenceRow {
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

impl From<UserComputePreferenceRow> for UserComputeResourcePreference {
    fn from(row: UserComputePreferenceRow) -> Self {
        UserComputeResourcePreference {
            compute_resource_id: row.compute_resource_id,
            login_user_name: row.login_user_name,
            preferred_batch_queue: row.preferred_batch_queue,
            scratch_location: row.scratch_location,
            allocation_project_number: row.allocation_project_number,
            resource_specific_credential_store_token: row.resource_specific_credential_store_token,
            quality_of_service: row.quality_of_service,
            reservation: row.reservation,
            reservation_start_time: row.reservation_start_time,
            reservation_end_time: row.reservation_end_time,
            validated: row.validated,
        }
    }
}
