//! Group resource profiles
//!
//! A group compute preference carries common fields plus an optional
//! scheduler-specific part. The specific part is a tagged variant so a
//! preference is either SLURM or AWS flavoured, never both.

use serde::{Deserialize, Serialize};

use super::{DataMovementProtocol, JobSubmissionProtocol};

string_enum! {
    /// Kind of resource a group compute preference targets
    ResourceType {
        Slurm => "SLURM",
        Aws => "AWS",
    }
}

/// A named reservation on a SLURM resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeResourceReservation {
    pub reservation_id: String,
    pub reservation_name: String,
    pub queue_names: Vec<String>,
    pub start_time: i64,
    pub end_time: i64,
}

/// One key/value setting for the SSH account provisioner
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupAccountSshProvisionerConfig {
    pub resource_id: String,
    pub group_resource_profile_id: String,
    pub config_name: String,
    pub config_value: Option<String>,
}

/// SLURM specific group preferences
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlurmComputeResourcePreference {
    pub allocation_project_number: Option<String>,
    pub preferred_batch_queue: Option<String>,
    pub quality_of_service: Option<String>,
    pub usage_reporting_gateway_id: Option<String>,
    pub ssh_account_provisioner: Option<String>,
    pub group_ssh_account_provisioner_configs: Vec<GroupAccountSshProvisionerConfig>,
    pub ssh_account_provisioner_additional_info: Option<String>,
    pub reservations: Vec<ComputeResourceReservation>,
}

/// AWS specific group preferences
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsComputeResourcePreference {
    pub region: Option<String>,
    pub preferred_ami_id: Option<String>,
    pub preferred_instance_type: Option<String>,
}

/// Scheduler specific part of a group compute preference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecificPreferences {
    Slurm(SlurmComputeResourcePreference),
    Aws(AwsComputeResourcePreference),
}

impl SpecificPreferences {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            SpecificPreferences::Slurm(_) => ResourceType::Slurm,
            SpecificPreferences::Aws(_) => ResourceType::Aws,
        }
    }
}

/// How a group prefers to use one compute resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupComputeResourcePreference {
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
    pub override_by_airavata: bool,
    pub login_user_name: Option<String>,
    pub preferred_job_submission_protocol: Option<JobSubmissionProtocol>,
    pub preferred_data_movement_protocol: Option<DataMovementProtocol>,
    pub scratch_location: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
    pub specific_preferences: Option<SpecificPreferences>,
}

impl GroupComputeResourcePreference {
    /// Resource type derived from the specific preferences, SLURM when unset
    pub fn resource_type(&self) -> ResourceType {
        self.specific_preferences
            .as_ref()
            .map(SpecificPreferences::resource_type)
            .unwrap_or(ResourceType::Slurm)
    }

    pub fn slurm(&self) -> Option<&SlurmComputeResourcePreference> {
        match &self.specific_preferences {
            Some(SpecificPreferences::Slurm(s)) => Some(s),
            _ => None,
        }
    }

    pub fn aws(&self) -> Option<&AwsComputeResourcePreference> {
        match &self.specific_preferences {
            Some(SpecificPreferences::Aws(a)) => Some(a),
            _ => None,
        }
    }
}

/// Queues of a resource a group may submit to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeResourcePolicy {
    pub resource_policy_id: String,
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
    pub allowed_batch_queues: Vec<String>,
}

/// Limits a group is held to on one batch queue
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchQueueResourcePolicy {
    pub resource_policy_id: String,
    pub compute_resource_id: String,
    pub group_resource_profile_id: String,
    pub queuename: String,
    pub max_allowed_nodes: Option<i32>,
    pub max_allowed_cores: Option<i32>,
    pub max_allowed_walltime: Option<i32>,
}

/// Resource settings shared by a group of gateway users
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupResourceProfile {
    pub gateway_id: String,
    pub group_resource_profile_id: String,
    pub group_resource_profile_name: String,
    pub compute_preferences: Vec<GroupComputeResourcePreference>,
    pub compute_resource_policies: Vec<ComputeResourcePolicy>,
    pub batch_queue_resource_policies: Vec<BatchQueueResourcePolicy>,
    pub creation_time: Option<i64>,
    pub updated_time: Option<i64>,
    pub default_credential_store_token: Option<String>,
}

impl GroupResourceProfile {
    /// Validate profile input
    pub fn validate(&self) -> Result<(), String> {
        if self.gateway_id.trim().is_empty() {
            return Err("Gateway id cannot be empty".to_string());
        }
        if self.group_resource_profile_name.trim().is_empty() {
            return Err("Group resource profile name cannot be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for pref in &self.compute_preferences {
            if !seen.insert(pref.compute_resource_id.as_str()) {
                return Err(format!(
                    "Duplicate compute preference for resource {}",
                    pref.compute_resource_id
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_preferences_tagged_json() {
        let pref = GroupComputeResourcePreference {
            compute_resource_id: "comet".to_string(),
            specific_preferences: Some(SpecificPreferences::Aws(AwsComputeResourcePreference {
                region: Some("us-east-1".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        };
        let json = serde_json::to_value(&pref).unwrap();
        assert_eq!(json["specific_preferences"]["resource_type"], "AWS");
        assert_eq!(json["specific_preferences"]["region"], "us-east-1");

        let back: GroupComputeResourcePreference = serde_json::from_value(json).unwrap();
        assert_eq!(back.resource_type(), ResourceType::Aws);
        assert!(back.slurm().is_none());
    }

    #[test]
    fn test_resource_type_defaults_to_slurm() {
        let pref = GroupComputeResourcePreference::default();
        assert_eq!(pref.resource_type(), ResourceType::Slurm);
    }

    #[test]
    fn test_validation_rejects_duplicate_preferences() {
        let profile = GroupResourceProfile {
            gateway_id: "seagrid".to_string(),
            group_resource_profile_name: "default".to_string(),
            compute_preferences: vec![
                GroupComputeResourcePreference {
                    compute_resource_id: "comet".to_string(),
                    ..Default::default()
                },
                GroupComputeResourcePreference {
                    compute_resource_id: "comet".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }
}
