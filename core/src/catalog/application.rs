//! Application modules, interfaces and deployments

use serde::{Deserialize, Serialize};

use crate::ids::DEFAULT_ID;

string_enum! {
    /// How an application is launched in parallel
    ApplicationParallelismType {
        Serial => "SERIAL",
        Mpi => "MPI",
        OpenMp => "OPENMP",
        OpenMpMpi => "OPENMP_MPI",
        Ccm => "CCM",
        CrayMpi => "CRAY_MPI",
    }
}

string_enum! {
    /// Type of an application input or output
    DataType {
        String => "STRING",
        Integer => "INTEGER",
        Float => "FLOAT",
        Uri => "URI",
        UriCollection => "URI_COLLECTION",
        Stdout => "STDOUT",
        Stderr => "STDERR",
    }
}

/// A versioned piece of software known to a gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationModule {
    #[serde(default = "default_id")]
    pub app_module_id: String,
    pub app_module_name: String,
    #[serde(default)]
    pub app_module_version: Option<String>,
    #[serde(default)]
    pub app_module_description: Option<String>,
}

impl ApplicationModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            app_module_id: default_id(),
            app_module_name: name.into(),
            app_module_version: None,
            app_module_description: None,
        }
    }
}

/// An input an application accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputDataObjectType {
    pub name: String,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub application_argument: Option<String>,
    pub standard_input: bool,
    pub user_friendly_description: Option<String>,
    pub meta_data: Option<String>,
    pub input_order: i32,
    pub is_required: bool,
    pub required_to_added_to_command_line: bool,
    pub data_staged: bool,
    pub storage_resource_id: Option<String>,
    pub is_read_only: bool,
    pub override_filename: Option<String>,
}

impl Default for InputDataObjectType {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: None,
            data_type: DataType::String,
            application_argument: None,
            standard_input: false,
            user_friendly_description: None,
            meta_data: None,
            input_order: 0,
            is_required: false,
            required_to_added_to_command_line: false,
            data_staged: false,
            storage_resource_id: None,
            is_read_only: false,
            override_filename: None,
        }
    }
}

/// An output an application produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDataObjectType {
    pub name: String,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub application_argument: Option<String>,
    pub is_required: bool,
    pub required_to_added_to_command_line: bool,
    pub data_movement: bool,
    pub location: Option<String>,
    pub search_query: Option<String>,
    pub output_streaming: bool,
    pub storage_resource_id: Option<String>,
    pub meta_data: Option<String>,
}

impl Default for OutputDataObjectType {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: None,
            data_type: DataType::String,
            application_argument: None,
            is_required: false,
            required_to_added_to_command_line: false,
            data_movement: false,
            location: None,
            search_query: None,
            output_streaming: false,
            storage_resource_id: None,
            meta_data: None,
        }
    }
}

/// The user facing contract of an application: what goes in, what comes out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationInterfaceDescription {
    pub application_interface_id: String,
    pub application_name: String,
    pub application_description: Option<String>,
    /// Ids of the modules implementing this interface
    pub application_modules: Vec<String>,
    pub application_inputs: Vec<InputDataObjectType>,
    pub application_outputs: Vec<OutputDataObjectType>,
    pub archive_working_directory: bool,
    pub has_optional_file_inputs: bool,
}

impl Default for ApplicationInterfaceDescription {
    fn default() -> Self {
        Self {
            application_interface_id: default_id(),
            application_name: String::new(),
            application_description: None,
            application_modules: Vec::new(),
            application_inputs: Vec::new(),
            application_outputs: Vec::new(),
            archive_working_directory: false,
            has_optional_file_inputs: false,
        }
    }
}

impl ApplicationInterfaceDescription {
    /// Validate interface input
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.trim().is_empty() {
            return Err("Application name cannot be empty".to_string());
        }
        let mut names = std::collections::HashSet::new();
        for input in &self.application_inputs {
            if !names.insert(input.name.as_str()) {
                return Err(format!("Duplicate application input: {}", input.name));
            }
        }
        names.clear();
        for output in &self.application_outputs {
            if !names.insert(output.name.as_str()) {
                return Err(format!("Duplicate application output: {}", output.name));
            }
        }
        Ok(())
    }
}

/// An ordered shell command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandObject {
    pub command: String,
    #[serde(default)]
    pub command_order: i32,
}

/// A named environment value or path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEnvPaths {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub env_path_order: i32,
}

/// How a module is installed and launched on one compute resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDeploymentDescription {
    pub app_deployment_id: String,
    pub app_module_id: String,
    pub compute_host_id: String,
    pub executable_path: String,
    pub parallelism: ApplicationParallelismType,
    pub app_deployment_description: Option<String>,
    pub module_load_cmds: Vec<CommandObject>,
    pub lib_prepend_paths: Vec<SetEnvPaths>,
    pub lib_append_paths: Vec<SetEnvPaths>,
    pub set_environment: Vec<SetEnvPaths>,
    pub pre_job_commands: Vec<CommandObject>,
    pub post_job_commands: Vec<CommandObject>,
    pub default_queue_name: Option<String>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub editable_by_user: bool,
}

impl Default for ApplicationDeploymentDescription {
    fn default() -> Self {
        Self {
            app_deployment_id: default_id(),
            app_module_id: String::new(),
            compute_host_id: String::new(),
            executable_path: String::new(),
            parallelism: ApplicationParallelismType::Serial,
            app_deployment_description: None,
            module_load_cmds: Vec::new(),
            lib_prepend_paths: Vec::new(),
            lib_append_paths: Vec::new(),
            set_environment: Vec::new(),
            pre_job_commands: Vec::new(),
            post_job_commands: Vec::new(),
            default_queue_name: None,
            default_node_count: None,
            default_cpu_count: None,
            default_walltime: None,
            editable_by_user: false,
        }
    }
}

impl ApplicationDeploymentDescription {
    /// Module load commands in execution order
    pub fn ordered_module_load_cmds(&self) -> Vec<&CommandObject> {
        let mut cmds: Vec<&CommandObject> = self.module_load_cmds.iter().collect();
        cmds.sort_by_key(|c| c.command_order);
        cmds
    }
}

fn default_id() -> String {
    DEFAULT_ID.to_string()
}
