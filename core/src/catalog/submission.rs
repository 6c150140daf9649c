//! Job submission, data movement and resource job manager descriptions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ApplicationParallelismType;
use crate::ids::DEFAULT_ID;

string_enum! {
    /// Credential scheme used to reach a resource
    SecurityProtocol {
        UsernamePassword => "USERNAME_PASSWORD",
        SshKeys => "SSH_KEYS",
        Gsi => "GSI",
        Kerberos => "KERBEROS",
        Oauth => "OAUTH",
        LocalCredential => "LOCAL",
    }
}

string_enum! {
    /// How submitted jobs are monitored
    MonitorMode {
        PollJobManager => "POLL_JOB_MANAGER",
        CloudJobMonitor => "CLOUD_JOB_MONITOR",
        JobEmailNotificationMonitor => "JOB_EMAIL_NOTIFICATION_MONITOR",
        XsedeAmqpSubscribe => "XSEDE_AMQP_SUBSCRIBE",
        Fork => "FORK",
        Local => "LOCAL",
    }
}

string_enum! {
    /// Batch system flavour running on a resource
    ResourceJobManagerType {
        Fork => "FORK",
        Pbs => "PBS",
        Slurm => "SLURM",
        Lsf => "LSF",
        Uge => "UGE",
        Cloud => "CLOUD",
        Airavata => "AIRAVATA",
        HtCondor => "HTCONDOR",
    }
}

string_enum! {
    /// Commands a resource job manager exposes
    JobManagerCommand {
        Submission => "SUBMISSION",
        JobMonitoring => "JOB_MONITORING",
        Deletion => "DELETION",
        CheckJob => "CHECK_JOB",
        ShowQueue => "SHOW_QUEUE",
        ShowReservation => "SHOW_RESERVATION",
        ShowStart => "SHOW_START",
    }
}

string_enum! {
    /// Cloud provider behind a cloud job submission
    ProviderName {
        Ec2 => "EC2",
        AwsEc2 => "AWSEC2",
        Rackspace => "RACKSPACE",
    }
}

/// Batch system configuration shared by SSH and local submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceJobManager {
    #[serde(default = "default_id")]
    pub resource_job_manager_id: String,
    pub resource_job_manager_type: ResourceJobManagerType,
    #[serde(default)]
    pub push_monitoring_endpoint: Option<String>,
    #[serde(default)]
    pub job_manager_bin_path: Option<String>,
    #[serde(default)]
    pub job_manager_commands: BTreeMap<JobManagerCommand, String>,
    #[serde(default)]
    pub parallelism_prefix: BTreeMap<ApplicationParallelismType, String>,
}

impl ResourceJobManager {
    /// Create a job manager of the given type with no commands
    pub fn new(resource_job_manager_type: ResourceJobManagerType) -> Self {
        Self {
            resource_job_manager_id: default_id(),
            resource_job_manager_type,
            push_monitoring_endpoint: None,
            job_manager_bin_path: None,
            job_manager_commands: BTreeMap::new(),
            parallelism_prefix: BTreeMap::new(),
        }
    }

    /// Full path of a job manager command, prefixed with the bin path if set
    pub fn command_path(&self, command: JobManagerCommand) -> Option<String> {
        let cmd = self.job_manager_commands.get(&command)?;
        match self.job_manager_bin_path.as_deref() {
            Some(bin) if !bin.is_empty() => {
                Some(format!("{}/{}", bin.trim_end_matches('/'), cmd))
            }
            _ => Some(cmd.clone()),
        }
    }
}

/// Job submission over SSH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshJobSubmission {
    #[serde(default = "default_id")]
    pub job_submission_interface_id: String,
    pub security_protocol: SecurityProtocol,
    pub resource_job_manager: ResourceJobManager,
    #[serde(default)]
    pub alternative_ssh_host_name: Option<String>,
    #[serde(default)]
    pub ssh_port: Option<i32>,
    #[serde(default)]
    pub monitor_mode: Option<MonitorMode>,
}

/// Job submission on the registry's own host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSubmission {
    #[serde(default = "default_id")]
    pub job_submission_interface_id: String,
    #[serde(default = "default_local_security")]
    pub security_protocol: SecurityProtocol,
    pub resource_job_manager: ResourceJobManager,
}

/// Job submission to a cloud provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudJobSubmission {
    #[serde(default = "default_id")]
    pub job_submission_interface_id: String,
    pub security_protocol: SecurityProtocol,
    pub node_id: String,
    pub executable_type: String,
    pub provider_name: ProviderName,
    pub user_account_name: String,
}

/// Job submission through a UNICORE endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnicoreJobSubmission {
    #[serde(default = "default_id")]
    pub job_submission_interface_id: String,
    pub security_protocol: SecurityProtocol,
    pub unicore_end_point_url: String,
}

/// File transfer over SCP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScpDataMovement {
    #[serde(default = "default_id")]
    pub data_movement_interface_id: String,
    pub security_protocol: SecurityProtocol,
    #[serde(default)]
    pub alternative_scp_host_name: Option<String>,
    #[serde(default)]
    pub ssh_port: Option<i32>,
}

/// File transfer over GridFTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFtpDataMovement {
    #[serde(default = "default_id")]
    pub data_movement_interface_id: String,
    pub security_protocol: SecurityProtocol,
    #[serde(default)]
    pub grid_ftp_end_points: Vec<String>,
}

/// File transfer through a UNICORE storage service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnicoreDataMovement {
    #[serde(default = "default_id")]
    pub data_movement_interface_id: String,
    pub security_protocol: SecurityProtocol,
    pub unicore_end_point_url: String,
}

/// Local file copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDataMovement {
    #[serde(default = "default_id")]
    pub data_movement_interface_id: String,
}

fn default_id() -> String {
    DEFAULT_ID.to_string()
}

fn default_local_security() -> SecurityProtocol {
    SecurityProtocol::LocalCredential
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_path_with_bin_path() {
        let mut rjm = ResourceJobManager::new(ResourceJobManagerType::Pbs);
        rjm.job_manager_bin_path = Some("/opt/torque/bin/".to_string());
        rjm.job_manager_commands
            .insert(JobManagerCommand::Submission, "qsub".to_string());

        assert_eq!(
            rjm.command_path(JobManagerCommand::Submission).as_deref(),
            Some("/opt/torque/bin/qsub")
        );
        assert!(rjm.command_path(JobManagerCommand::Deletion).is_none());
    }

    #[test]
    fn test_ssh_submission_defaults_id() {
        let json = r#"{
            "security_protocol": "SSH_KEYS",
            "resource_job_manager": { "resource_job_manager_type": "SLURM" }
        }"#;
        let sub: SshJobSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(sub.job_submission_interface_id, DEFAULT_ID);
        assert_eq!(
            sub.resource_job_manager.resource_job_manager_type,
            ResourceJobManagerType::Slurm
        );
        assert!(sub.monitor_mode.is_none());
    }
}
