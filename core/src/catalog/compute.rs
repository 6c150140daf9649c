//! Compute resource descriptions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::DEFAULT_ID;

string_enum! {
    /// Well known file system locations on a compute host
    FileSystem {
        Home => "HOME",
        Work => "WORK",
        LocalTmp => "LOCALTMP",
        Scratch => "SCRATCH",
        Archive => "ARCHIVE",
    }
}

string_enum! {
    /// How jobs reach a compute resource
    JobSubmissionProtocol {
        Local => "LOCAL",
        Ssh => "SSH",
        Globus => "GLOBUS",
        Unicore => "UNICORE",
        Cloud => "CLOUD",
        SshFork => "SSH_FORK",
        LocalFork => "LOCAL_FORK",
    }
}

string_enum! {
    /// How files reach a compute or storage resource
    DataMovementProtocol {
        Local => "LOCAL",
        Scp => "SCP",
        Sftp => "SFTP",
        GridFtp => "GridFTP",
        UnicoreStorageService => "UNICORE_STORAGE_SERVICE",
    }
}

/// A batch queue offered by a compute resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchQueue {
    pub queue_name: String,
    pub queue_description: Option<String>,
    /// Maximum run time in minutes
    pub max_run_time: Option<i32>,
    pub max_nodes: Option<i32>,
    pub max_processors: Option<i32>,
    pub max_jobs_in_queue: Option<i32>,
    /// Maximum memory in MB
    pub max_memory: Option<i32>,
    pub cpu_per_node: Option<i32>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub queue_specific_macros: Option<String>,
    pub is_default_queue: bool,
}

/// Reference from a resource to one of its job submission mechanisms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmissionInterface {
    pub job_submission_interface_id: String,
    pub job_submission_protocol: JobSubmissionProtocol,
    #[serde(default)]
    pub priority_order: i32,
}

/// Reference from a resource to one of its data movement mechanisms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMovementInterface {
    pub data_movement_interface_id: String,
    pub data_movement_protocol: DataMovementProtocol,
    #[serde(default)]
    pub priority_order: i32,
}

/// A compute host registered with the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeResourceDescription {
    pub compute_resource_id: String,
    pub host_name: String,
    pub host_aliases: Vec<String>,
    pub ip_addresses: Vec<String>,
    pub resource_description: Option<String>,
    pub enabled: bool,
    pub batch_queues: Vec<BatchQueue>,
    pub file_systems: BTreeMap<FileSystem, String>,
    pub job_submission_interfaces: Vec<JobSubmissionInterface>,
    pub data_movement_interfaces: Vec<DataMovementInterface>,
    /// Maximum memory per node in MB
    pub max_memory_per_node: Option<i32>,
    pub gateway_usage_reporting: bool,
    pub gateway_usage_module_load_command: Option<String>,
    pub gateway_usage_executable: Option<String>,
    pub cpus_per_node: Option<i32>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub creation_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl Default for ComputeResourceDescription {
    fn default() -> Self {
        Self {
            compute_resource_id: DEFAULT_ID.to_string(),
            host_name: String::new(),
            host_aliases: Vec::new(),
            ip_addresses: Vec::new(),
            resource_description: None,
            enabled: true,
            batch_queues: Vec::new(),
            file_systems: BTreeMap::new(),
            job_submission_interfaces: Vec::new(),
            data_movement_interfaces: Vec::new(),
            max_memory_per_node: None,
            gateway_usage_reporting: false,
            gateway_usage_module_load_command: None,
            gateway_usage_executable: None,
            cpus_per_node: None,
            default_node_count: None,
            default_cpu_count: None,
            default_walltime: None,
            creation_time: None,
            update_time: None,
        }
    }
}

impl ComputeResourceDescription {
    /// Create a description for a host with everything else defaulted
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            ..Default::default()
        }
    }

    /// Validate description input
    pub fn validate(&self) -> Result<(), String> {
        if self.host_name.trim().is_empty() {
            return Err("Compute resource host name cannot be empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for queue in &self.batch_queues {
            if queue.queue_name.trim().is_empty() {
                return Err("Batch queue name cannot be empty".to_string());
            }
            if !seen.insert(queue.queue_name.as_str()) {
                return Err(format!("Duplicate batch queue: {}", queue.queue_name));
            }
        }

        Ok(())
    }

    /// Look up a batch queue by name
    pub fn batch_queue(&self, queue_name: &str) -> Option<&BatchQueue> {
        self.batch_queues
            .iter()
            .find(|q| q.queue_name == queue_name)
    }

    /// The queue marked as default, if any
    pub fn default_queue(&self) -> Option<&BatchQueue> {
        self.batch_queues.iter().find(|q| q.is_default_queue)
    }

    /// Job submission interface with the lowest priority order
    pub fn preferred_job_submission(&self) -> Option<&JobSubmissionInterface> {
        self.job_submission_interfaces
            .iter()
            .min_by_key(|i| i.priority_order)
    }
}
