//! Row types for compute resources, job managers and concrete
//! submission / data movement settings

use appcatalog_core::{
    BatchQueue, CloudJobSubmission, ComputeResourceDescription, DataMovementInterface,
    JobSubmissionInterface, Result, ScpDataMovement, UnicoreDataMovement, UnicoreJobSubmission,
};
use sqlx::FromRow;

/// Scalar columns of a compute resource
#[derive(Debug, Clone, FromRow)]
pub struct ComputeResourceRow {
    pub compute_resource_id: String,
    pub host_name: String,
    pub resource_description: Option<String>,
    pub enabled: bool,
    pub max_memory_per_node: Option<i32>,
    pub gateway_usage_reporting: bool,
    pub gateway_usage_module_load_command: Option<String>,
    pub gateway_usage_executable: Option<String>,
    pub cpus_per_node: Option<i32>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub creation_time: i64,
    pub update_time: i64,
}

impl ComputeResourceRow {
    /// Description with scalar fields filled in and empty child collections
    pub fn into_description(self) -> ComputeResourceDescription {
        ComputeResourceDescription {
            compute_resource_id: self.compute_resource_id,
            host_name: self.host_name,
            resource_description: self.resource_description,
            enabled: self.enabled,
            max_memory_per_node: self.max_memory_per_node,
            gateway_usage_reporting: self.gateway_usage_reporting,
            gateway_usage_module_load_command: self.gateway_usage_module_load_command,
            gateway_usage_executable: self.gateway_usage_executable,
            cpus_per_node: self.cpus_per_node,
            default_node_count: self.default_node_count,
            default_cpu_count: self.default_cpu_count,
            default_walltime: self.default_walltime,
            creation_time: Some(self.creation_time),
            update_time: Some(self.update_time),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BatchQueueRow {
    pub compute_resource_id: String,
    pub queue_name: String,
    pub queue_description: Option<String>,
    pub max_run_time: Option<i32>,
    pub max_nodes: Option<i32>,
    pub max_processors: Option<i32>,
    pub max_jobs_in_queue: Option<i32>,
    pub max_memory: Option<i32>,
    pub cpu_per_node: Option<i32>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub queue_specific_macros: Option<String>,
    pub is_default_queue: bool,
}

impl From<BatchQueueRow> for BatchQueue {
    fn from(row: BatchQueueRow) -> Self {
        BatchQueue {
            queue_name: row.queue_name,
            queue_description: row.queue_description,
            max_run_time: row.max_run_time,
            max_nodes: row.max_nodes,
            max_processors: row.max_processors,
            max_jobs_in_queue: row.max_jobs_in_queue,
            max_memory: row.max_memory,
            cpu_per_node: row.cpu_per_node,
            default_node_count: row.default_node_count,
            default_cpu_count: row.default_cpu_count,
            default_walltime: row.default_walltime,
            queue_specific_macros: row.queue_specific_macros,
            is_default_queue: row.is_default_queue,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobSubmissionInterfaceRow {
    pub job_submission_interface_id: String,
    pub job_submission_protocol: String,
    pub priority_order: i32,
}

impl JobSubmissionInterfaceRow {
    pub fn into_interface(self) -> Result<JobSubmissionInterface> {
        Ok(JobSubmissionInterface {
            job_submission_interface_id: self.job_submission_interface_id,
            job_submission_protocol: self.job_submission_protocol.parse()?,
            priority_order: self.priority_order,
        })
    }
}

/// Data movement interface row, shared by compute and storage resources
#[derive(Debug, Clone, FromRow)]
pub struct DataMovementInterfaceRow {
    pub data_movement_interface_id: String,
    pub data_movement_protocol: String,
    pub priority_order: i32,
}

impl DataMovementInterfaceRow {
    pub fn into_interface(self) -> Result<DataMovementInterface> {
        Ok(DataMovementInterface {
            data_movement_interface_id: self.data_movement_interface_id,
            data_movement_protocol: self.data_movement_protocol.parse()?,
            priority_order: self.priority_order,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ResourceJobManagerRow {
    pub resource_job_manager_id: String,
    pub resource_job_manager_type: String,
    pub push_monitoring_endpoint: Option<String>,
    pub job_manager_bin_path: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SshJobSubmissionRow {
    pub job_submission_interface_id: String,
    pub resource_job_manager_id: String,
    pub security_protocol: String,
    pub alternative_ssh_host_name: Option<String>,
    pub ssh_port: Option<i32>,
    pub monitor_mode: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LocalSubmissionRow {
    pub job_submission_interface_id: String,
    pub resource_job_manager_id: String,
    pub security_protocol: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CloudJobSubmissionRow {
    pub job_submission_interface_id: String,
    pub security_protocol: String,
    pub node_id: String,
    pub executable_type: String,
    pub provider_name: String,
    pub user_account_name: String,
}

impl CloudJobSubmissionRow {
    pub fn into_submission(self) -> Result<CloudJobSubmission> {
        Ok(CloudJobSubmission {
            job_submission_interface_id: self.job_submission_interface_id,
            security_protocol: self.security_protocol.parse()?,
            node_id: self.node_id,
            executable_type: self.executable_type,
            provider_name: self.provider_name.parse()?,
            user_account_name: self.user_account_name,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UnicoreJobSubmissionRow {
    pub job_submission_interface_id: String,
    pub security_protocol: String,
    pub unicore_end_point_url: String,
}

impl UnicoreJobSubmissionRow {
    pub fn into_submission(self) -> Result<UnicoreJobSubmission> {
        Ok(UnicoreJobSubmission {
            job_submission_interface_id: self.job_submission_interface_id,
            security_protocol: self.security_protocol.parse()?,
            unicore_end_point_url: self.unicore_end_point_url,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ScpDataMovementRow {
    pub data_movement_interface_id: String,
    pub security_protocol: String,
    pub alternative_scp_host_name: Option<String>,
    pub ssh_port: Option<i32>,
}

impl ScpDataMovementRow {
    pub fn into_data_movement(self) -> Result<ScpDataMovement> {
        Ok(ScpDataMovement {
            data_movement_interface_id: self.data_movement_interface_id,
            security_protocol: self.security_protocol.parse()?,
            alternative_scp_host_name: self.alternative_scp_host_name,
            ssh_port: self.ssh_port,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UnicoreDataMovementRow {
    pub data_movement_interface_id: String,
    pub security_protocol: String,
    pub unicore_end_point_url: String,
}

impl UnicoreDataMovementRow {
    pub fn into_data_movement(self) -> Result<UnicoreDataMovement> {
        Ok(UnicoreDataMovement {
            data_movement_interface_id: self.data_movement_interface_id,
            security_protocol: self.security_protocol.parse()?,
            unicore_end_point_url: self.unicore_end_point_url,
        })
    }
}
