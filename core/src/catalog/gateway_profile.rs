//! Gateway resource profiles

use serde::{Deserialize, Serialize};

use super::{DataMovementProtocol, JobSubmissionProtocol};

/// How a gateway prefers to use one compute resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeResourcePreference {
    pub compute_resource_id: String,
    pub override_by_airavata: bool,
    pub login_user_name: Option<String>,
    pub preferred_job_submission_protocol: Option<JobSubmissionProtocol>,
    pub preferred_data_movement_protocol: Option<DataMovementProtocol>,
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

impl ComputeResourcePreference {
    pub fn new(compute_resource_id: impl Into<String>) -> Self {
        Self {
            compute_resource_id: compute_resource_id.into(),
            override_by_airavata: true,
            ..Default::default()
        }
    }

    /// Whether the reservation window covers `at` (epoch millis)
    pub fn reservation_active(&self, at: i64) -> bool {
        match (
            self.reservation.as_deref(),
            self.reservation_start_time,
            self.reservation_end_time,
        ) {
            (Some(r), Some(start), Some(end)) if !r.is_empty() => start <= at && at <= end,
            _ => false,
        }
    }
}

/// How a gateway prefers to use one storage resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoragePreference {
    pub storage_resource_id: String,
    pub login_user_name: Option<String>,
    pub file_system_root_location: Option<String>,
    pub resource_specific_credential_store_token: Option<String>,
}

/// Everything a gateway has configured about the resources it uses
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayResourceProfile {
    pub gateway_id: String,
    pub credential_store_token: Option<String>,
    pub compute_resource_preferences: Vec<ComputeResourcePreference>,
    pub storage_preferences: Vec<StoragePreference>,
    pub identity_server_tenant: Option<String>,
    pub identity_server_pwd_cred_token: Option<String>,
    pub creation_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl GatewayResourceProfile {
    pub fn new(gateway_id: impl Into<String>) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            ..Default::default()
        }
    }

    /// Compute preference for a resource, if the gateway has one
    pub fn compute_preference(&self, compute_resource_id: &str) -> Option<&ComputeResourcePreference> {
        self.compute_resource_preferences
            .iter()
            .find(|p| p.compute_resource_id == compute_resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_active() {
        let mut pref = ComputeResourcePreference::new("comet");
        assert!(!pref.reservation_active(100));

        pref.reservation = Some("workshop".to_string());
        pref.reservation_start_time = Some(50);
        pref.reservation_end_time = Some(150);
        assert!(pref.reservation_active(100));
        assert!(!pref.reservation_active(200));
    }
}
