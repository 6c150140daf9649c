//! Row types for application modules, interfaces and deployments

use appcatalog_core::{
    ApplicationDeploymentDescription, ApplicationInterfaceDescription, ApplicationModule,
    InputDataObjectType, OutputDataObjectType, Result,
};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AppModuleRow {
    pub app_module_id: String,
    pub app_module_name: String,
    pub app_module_version: Option<String>,
    pub app_module_description: Option<String>,
    pub gateway_id: String,
}

impl From<AppModuleRow> for ApplicationModule {
    fn from(row: AppModuleRow) -> Self {
        ApplicationModule {
            app_module_id: row.app_module_id,
            app_module_name: row.app_module_name,
            app_module_version: row.app_module_version,
            app_module_description: row.app_module_description,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationInterfaceRow {
    pub application_interface_id: String,
    pub application_name: String,
    pub application_description: Option<String>,
    pub archive_working_directory: bool,
    pub has_optional_file_inputs: bool,
    pub gateway_id: String,
}

impl ApplicationInterfaceRow {
    pub fn into_description(self) -> ApplicationInterfaceDescription {
        ApplicationInterfaceDescription {
            application_interface_id: self.application_interface_id,
            application_name: self.application_name,
            application_description: self.application_description,
            archive_working_directory: self.archive_working_directory,
            has_optional_file_inputs: self.has_optional_file_inputs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationInputRow {
    pub name: String,
    pub value: Option<String>,
    pub data_type: String,
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

impl ApplicationInputRow {
    pub fn into_input(self) -> Result<InputDataObjectType> {
        Ok(InputDataObjectType {
            name: self.name,
            value: self.value,
            data_type: self.data_type.parse()?,
            application_argument: self.application_argument,
            standard_input: self.standard_input,
            user_friendly_description: self.user_friendly_description,
            meta_data: self.meta_data,
            input_order: self.input_order,
            is_required: self.is_required,
            required_to_added_to_command_line: self.required_to_added_to_command_line,
            data_staged: self.data_staged,
            storage_resource_id: self.storage_resource_id,
            is_read_only: self.is_read_only,
            override_filename: self.override_filename,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationOutputRow {
    pub name: String,
    pub value: Option<String>,
    pub data_type: String,
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

impl ApplicationOutputRow {
    pub fn into_output(self) -> Result<OutputDataObjectType> {
        Ok(OutputDataObjectType {
            name: self.name,
            value: self.value,
            data_type: self.data_type.parse()?,
            application_argument: self.application_argument,
            is_required: self.is_required,
            required_to_added_to_command_line: self.required_to_added_to_command_line,
            data_movement: self.data_movement,
            location: self.location,
            search_query: self.search_query,
            output_streaming: self.output_streaming,
            storage_resource_id: self.storage_resource_id,
            meta_data: self.meta_data,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AppDeploymentRow {
    pub app_deployment_id: String,
    pub app_module_id: String,
    pub compute_host_id: String,
    pub executable_path: String,
    pub parallelism: String,
    pub app_deployment_description: Option<String>,
    pub default_queue_name: Option<String>,
    pub default_node_count: Option<i32>,
    pub default_cpu_count: Option<i32>,
    pub default_walltime: Option<i32>,
    pub editable_by_user: bool,
    pub gateway_id: String,
}

impl AppDeploymentRow {
    /// Description without commands or environment paths
    pub fn into_description(self) -> Result<ApplicationDeploymentDescription> {
        Ok(ApplicationDeploymentDescription {
            app_deployment_id: self.app_deployment_id,
            app_module_id: self.app_module_id,
            compute_host_id: self.compute_host_id,
            executable_path: self.executable_path,
            parallelism: self.parallelism.parse()?,
            app_deployment_description: self.app_deployment_description,
            default_queue_name: self.default_queue_name,
            default_node_count: self.default_node_count,
            default_cpu_count: self.default_cpu_count,
            default_walltime: self.default_walltime,
            editable_by_user: self.editable_by_user,
            ..Default::default()
        })
    }
}

/// Which list of a deployment a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ModuleLoad,
    PreJob,
    PostJob,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::ModuleLoad => "MODULE_LOAD",
            CommandKind::PreJob => "PRE_JOB",
            CommandKind::PostJob => "POST_JOB",
        }
    }
}

/// Which list of a deployment an environment entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPathKind {
    LibPrepend,
    LibAppend,
    Environment,
}

impl EnvPathKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvPathKind::LibPrepend => "LIB_PREPEND",
            EnvPathKind::LibAppend => "LIB_APPEND",
            EnvPathKind::Environment => "ENVIRONMENT",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DeploymentCommandRow {
    pub command_kind: String,
    pub command: String,
    pub command_order: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeploymentEnvPathRow {
    pub path_kind: String,
    pub name: String,
    pub value: String,
    pub env_path_order: i32,
}
