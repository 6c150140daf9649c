//! Row types for group resource profiles

use appcatalog_core::{
    AwsComputeResourcePreference, BatchQueueResourcePolicy, GroupComputeResourcePreference,
    GroupResourceProfile, Result,
};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GroupProfileRow {
    pub group_resource_profile_id: String,
    pub gateway_id: String,
    pub group_resource_profile_name: String,
    pub default_credential_store_token: Option<String>,
    pub creation_time: i64,
    pub updated_time: i64,
}

impl GroupProfileRow {
    pub fn into_profile(self) -> GroupResourceProfile {
        GroupResourceProfile {
            gateway_id: self.gateway_id,
            group_resource_profile_id: self.group_resource_profile_id,
            group_resource_profile_name: self.group_resource_profile_name,
            default_credential_store_token: self.default_credential_store_token,
            creation_time: Some(self.creation_time),
            updated_time: Some(self.updated_time),
            ..Default::default()
        }
    }
}

/// Common columns of a group compute preference
#[derive(Debug, Clone, FromRow)]
pub struct GroupComputePreferenceRow {
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
    pub resource_type: String,
    pub override_by_airavata: bool,
    pub login_user_name: Option<String>,
    pub preferred_job_submission_protocol: Option<String>,
    pub preferred_data_movement_protocol: Option<String>,
    pub scratch_location: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
}

impl GroupComputePreferenceRow {
    /// Preference without its scheduler specific part
    pub fn into_preference(self) -> Result<GroupComputeResourcePreference> {
        Ok(GroupComputeResourcePreference {
            compute_resource_id: self.compute_resource_id,
            group_resource_profile_id: self.group_resource_profile_id,
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
            scratch_location: self.scratch_location,
            resource_specific_credential_store_token: self.resource_specific_credential_store_token,
            specific_preferences: None,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SlurmPreferenceRow {
    pub allocation_project_number: Option<String>,
    pub preferred_batch_queue: Option<String>,
    pub quality_of_service: Option<String>,
    pub usage_reporting_gateway_id: Option<String>,
    pub ssh_account_provisioner: Option<String>,
    pub ssh_account_provisioner_additional_info: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AwsPreferenceRow {
    pub region: Option<String>,
    pub preferred_ami_id: Option<String>,
    pub preferred_instance_type: Option<String>,
}

impl From<AwsPreferenceRow> for AwsComputeResourcePreference {
    fn from(row: AwsPreferenceRow) -> Self {
        AwsComputeResourcePreference {
            region: row.region,
            preferred_ami_id: row.preferred_ami_id,
            preferred_instance_type: row.preferred_instance_type,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    pub reservation_id: String,
    pub reservation_name: String,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ComputeResourcePolicyRow {
    pub resource_policy_id: String,
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct BatchQueuePolicyRow {
    pub resource_policy_id: String,
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
    pub queuename: String,
    pub max_allowed_nodes: Option<i32>,
    pub max_allowed_cores: Option<i32>,
    pub max_allowed_walltime: Option<i32>,
}

impl From<BatchQueuePolicyRow> for BatchQueueResourcePolicy {
    fn from(row: BatchQueuePolicyRow) -> Self {
        BatchQueueResourcePolicy {
            resource_policy_id: row.resource_policy_id,
            compute_resource_id: row.compute_resource_id,
            group_resource_profile_id: row.group_resource_profile_id,
            queuename: row.queuename,
            max_allowed_nodes: row.max_allowed_nodes,
            max_allowed_cores: row.max_allowed_cores,
            max_allowed_walltime: row.max_allowed_walltime,
        }
    }
}
