//! Application module and interface queries

use std::collections::BTreeMap;

use appcatalog_core::{
    ensure_id, now_millis, ApplicationInterfaceDescription, ApplicationModule, Error,
    InputDataObjectType, OutputDataObjectType, Result,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{validation, DbResultExt};
use crate::models::{AppModuleRow, ApplicationInputRow, ApplicationInterfaceRow, ApplicationOutputRow};

// ============================================================================
// Application Module Queries
// ============================================================================

#[instrument(skip(pool, module), fields(name = %module.app_module_name))]
pub async fn add_application_module(
    pool: &Pool<Sqlite>,
    module: &ApplicationModule,
    gateway_id: &str,
) -> Result<String> {
    if module.app_module_name.trim().is_empty() {
        return Err(Error::ValidationError(
            "Application module name cannot be empty".to_string(),
        ));
    }
    let id = ensure_id(&module.app_module_id, &module.app_module_name);
    let now = now_millis();

    sqlx::query(
        r#"
        INSERT INTO app_modules (
            app_module_id, app_module_name, app_module_version, app_module_description,
            gateway_id, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&module.app_module_name)
    .bind(&module.app_module_version)
    .bind(&module.app_module_description)
    .bind(gateway_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .db_context("Failed to save application module")?;

    info!(app_module_id = %id, "Application module added");
    Ok(id)
}

#[instrument(skip(pool, module))]
pub async fn update_application_module(
    pool: &Pool<Sqlite>,
    id: &str,
    module: &ApplicationModule,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE app_modules
        SET app_module_name = ?, app_module_version = ?, app_module_description = ?, update_time = ?
        WHERE app_module_id = ?
        "#,
    )
    .bind(&module.app_module_name)
    .bind(&module.app_module_version)
    .bind(&module.app_module_description)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await
    .db_context("Failed to update application module")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application module", id));
    }
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_application_module(pool: &Pool<Sqlite>, id: &str) -> Result<ApplicationModule> {
    sqlx::query_as::<_, AppModuleRow>(
        r#"
        SELECT app_module_id, app_module_name, app_module_version, app_module_description, gateway_id
        FROM app_modules
        WHERE app_module_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get application module")?
    .map(ApplicationModule::from)
    .ok_or_else(|| Error::not_found("Application module", id))
}

#[instrument(skip(pool))]
pub async fn get_all_application_modules(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<Vec<ApplicationModule>> {
    let rows = sqlx::query_as::<_, AppModuleRow>(
        r#"
        SELECT app_module_id, app_module_name, app_module_version, app_module_description, gateway_id
        FROM app_modules
        WHERE gateway_id = ?
        ORDER BY app_module_name
        "#,
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list application modules")?;
    Ok(rows.into_iter().map(ApplicationModule::from).collect())
}

#[instrument(skip(pool))]
pub async fn is_application_module_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_modules WHERE app_module_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .db_context("Failed to check application module")?;
    Ok(count > 0)
}

/// Delete a module; its deployments and interface mappings cascade
#[instrument(skip(pool))]
pub async fn remove_application_module(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM app_modules WHERE app_module_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete application module")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application module", id));
    }
    info!(app_module_id = %id, "Application module removed");
    Ok(())
}

// ============================================================================
// Application Interface Queries
// ============================================================================

async fn insert_interface_children(
    conn: &mut SqliteConnection,
    id: &str,
    iface: &ApplicationInterfaceDescription,
) -> Result<()> {
    for module_id in &iface.application_modules {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM app_modules WHERE app_module_id = ?")
            .bind(module_id)
            .fetch_one(&mut *conn)
            .await
            .db_context("Failed to check application module")?;
        if exists == 0 {
            return Err(Error::AppCatalogError(format!(
                "Application module does not exist in the system. Please create an application module first. App Module Id : {}",
                module_id
            )));
        }
        sqlx::query(
            "INSERT OR IGNORE INTO app_module_mappings (application_interface_id, app_module_id) VALUES (?, ?)",
        )
        .bind(id)
        .bind(module_id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save module mapping")?;
    }

    for input in &iface.application_inputs {
        sqlx::query(
            r#"
            INSERT INTO application_inputs (
                application_interface_id, name, value, data_type, application_argument,
                standard_input, user_friendly_description, meta_data, input_order, is_required,
                required_to_added_to_command_line, data_staged, storage_resource_id,
                is_read_only, override_filename
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.value)
        .bind(input.data_type.as_str())
        .bind(&input.application_argument)
        .bind(input.standard_input)
        .bind(&input.user_friendly_description)
        .bind(&input.meta_data)
        .bind(input.input_order)
        .bind(input.is_required)
        .bind(input.required_to_added_to_command_line)
        .bind(input.data_staged)
        .bind(&input.storage_resource_id)
        .bind(input.is_read_only)
        .bind(&input.override_filename)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save application input")?;
    }

    for output in &iface.application_outputs {
        sqlx::query(
            r#"
            INSERT INTO application_outputs (
                application_interface_id, name, value, data_type, application_argument,
                is_required, required_to_added_to_command_line, data_movement, location,
                search_query, output_streaming, storage_resource_id, meta_data
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&output.name)
        .bind(&output.value)
        .bind(output.data_type.as_str())
        .bind(&output.application_argument)
        .bind(output.is_required)
        .bind(output.required_to_added_to_command_line)
        .bind(output.data_movement)
        .bind(&output.location)
        .bind(&output.search_query)
        .bind(output.output_streaming)
        .bind(&output.storage_resource_id)
        .bind(&output.meta_data)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save application output")?;
    }
    Ok(())
}

/// Register an interface with its module mappings, inputs and outputs
#[instrument(skip(pool, iface), fields(name = %iface.application_name))]
pub async fn add_application_interface(
    pool: &Pool<Sqlite>,
    iface: &ApplicationInterfaceDescription,
    gateway_id: &str,
) -> Result<String> {
    validation(iface.validate())?;
    let id = ensure_id(&iface.application_interface_id, &iface.application_name);
    let now = now_millis();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    sqlx::query(
        r#"
        INSERT INTO application_interfaces (
            application_interface_id, application_name, application_description,
            archive_working_directory, has_optional_file_inputs, gateway_id,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&iface.application_name)
    .bind(&iface.application_description)
    .bind(iface.archive_working_directory)
    .bind(iface.has_optional_file_inputs)
    .bind(gateway_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .db_context("Failed to save application interface")?;

    insert_interface_children(&mut tx, &id, iface).await?;
    tx.commit().await.db_context("Failed to commit application interface")?;

    info!(application_interface_id = %id, "Application interface added");
    Ok(id)
}

/// Replace an interface's fields, module mappings, inputs and outputs
#[instrument(skip(pool, iface))]
pub async fn update_application_interface(
    pool: &Pool<Sqlite>,
    id: &str,
    iface: &ApplicationInterfaceDescription,
) -> Result<()> {
    validation(iface.validate())?;

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    let result = sqlx::query(
        r#"
        UPDATE application_interfaces
        SET application_name = ?, application_description = ?, archive_working_directory = ?,
            has_optional_file_inputs = ?, update_time = ?
        WHERE application_interface_id = ?
        "#,
    )
    .bind(&iface.application_name)
    .bind(&iface.application_description)
    .bind(iface.archive_working_directory)
    .bind(iface.has_optional_file_inputs)
    .bind(now_millis())
    .bind(id)
    .execute(&mut *tx)
    .await
    .db_context("Failed to update application interface")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application interface", id));
    }

    for table in ["app_module_mappings", "application_inputs", "application_outputs"] {
        sqlx::query(&format!("DELETE FROM {} WHERE application_interface_id = ?", table))
            .bind(id)
            .execute(&mut *tx)
            .await
            .db_context("Failed to clear application interface children")?;
    }
    insert_interface_children(&mut tx, id, iface).await?;
    tx.commit().await.db_context("Failed to commit application interface")?;

    info!(application_interface_id = %id, "Application interface updated");
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_application_interface(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<ApplicationInterfaceDescription> {
    let row = sqlx::query_as::<_, ApplicationInterfaceRow>(
        r#"
        SELECT application_interface_id, application_name, application_description,
               archive_working_directory, has_optional_file_inputs, gateway_id
        FROM application_interfaces
        WHERE application_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get application interface")?
    .ok_or_else(|| Error::not_found("Application interface", id))?;

    let mut iface = row.into_description();
    iface.application_modules = sqlx::query_scalar(
        "SELECT app_module_id FROM app_module_mappings WHERE application_interface_id = ? ORDER BY app_module_id",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get module mappings")?;
    iface.application_inputs = fetch_inputs(pool, id).await?;
    iface.application_outputs = fetch_outputs(pool, id).await?;
    Ok(iface)
}

#[instrument(skip(pool))]
pub async fn get_all_application_interfaces(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<Vec<ApplicationInterfaceDescription>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT application_interface_id FROM application_interfaces WHERE gateway_id = ? ORDER BY application_name",
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list application interfaces")?;

    let mut interfaces = Vec::with_capacity(ids.len());
    for id in ids {
        interfaces.push(get_application_interface(pool, &id).await?);
    }
    Ok(interfaces)
}

/// Map of interface id to application name for one gateway
#[instrument(skip(pool))]
pub async fn get_all_application_interface_names(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT application_interface_id, application_name FROM application_interfaces WHERE gateway_id = ?",
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list application interface names")?;
    Ok(rows.into_iter().collect())
}

async fn fetch_inputs(pool: &Pool<Sqlite>, id: &str) -> Result<Vec<InputDataObjectType>> {
    sqlx::query_as::<_, ApplicationInputRow>(
        r#"
        SELECT name, value, data_type, application_argument, standard_input,
               user_friendly_description, meta_data, input_order, is_required,
               required_to_added_to_command_line, data_staged, storage_resource_id,
               is_read_only, override_filename
        FROM application_inputs
        WHERE application_interface_id = ?
        ORDER BY input_order, name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get application inputs")?
    .into_iter()
    .map(ApplicationInputRow::into_input)
    .collect()
}

async fn fetch_outputs(pool: &Pool<Sqlite>, id: &str) -> Result<Vec<OutputDataObjectType>> {
    sqlx::query_as::<_, ApplicationOutputRow>(
        r#"
        SELECT name, value, data_type, application_argument, is_required,
               required_to_added_to_command_line, data_movement, location, search_query,
               output_streaming, storage_resource_id, meta_data
        FROM application_outputs
        WHERE application_interface_id = ?
        ORDER BY name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get application outputs")?
    .into_iter()
    .map(ApplicationOutputRow::into_output)
    .collect()
}

/// Inputs of an interface, ordered by input order
#[instrument(skip(pool))]
pub async fn get_application_inputs(
    pool: &Pool<Sqlite>,
    interface_id: &str,
) -> Result<Vec<InputDataObjectType>> {
    if !is_application_interface_exists(pool, interface_id).await? {
        return Err(Error::not_found("Application interface", interface_id));
    }
    fetch_inputs(pool, interface_id).await
}

#[instrument(skip(pool))]
pub async fn get_application_outputs(
    pool: &Pool<Sqlite>,
    interface_id: &str,
) -> Result<Vec<OutputDataObjectType>> {
    if !is_application_interface_exists(pool, interface_id).await? {
        return Err(Error::not_found("Application interface", interface_id));
    }
    fetch_outputs(pool, interface_id).await
}

/// Link an existing module to an existing interface
#[instrument(skip(pool))]
pub async fn add_application_module_mapping(
    pool: &Pool<Sqlite>,
    module_id: &str,
    interface_id: &str,
) -> Result<()> {
    if !is_application_module_exists(pool, module_id).await? {
        return Err(Error::not_found("Application module", module_id));
    }
    if !is_application_interface_exists(pool, interface_id).await? {
        return Err(Error::not_found("Application interface", interface_id));
    }
    sqlx::query(
        "INSERT OR IGNORE INTO app_module_mappings (application_interface_id, app_module_id) VALUES (?, ?)",
    )
    .bind(interface_id)
    .bind(module_id)
    .execute(pool)
    .await
    .db_context("Failed to save module mapping")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn is_application_interface_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM application_interfaces WHERE application_interface_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .db_context("Failed to check application interface")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_application_interface(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM application_interfaces WHERE application_interface_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete application interface")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application interface", id));
    }
    info!(application_interface_id = %id, "Application interface removed");
    Ok(())
}

/// Enabled compute resources with a deployment of any module behind the
/// interface, as a map of compute resource id to host name
#[instrument(skip(pool))]
pub async fn get_available_app_interface_compute_resources(
    pool: &Pool<Sqlite>,
    interface_id: &str,
) -> Result<BTreeMap<String, String>> {
    if !is_application_interface_exists(pool, interface_id).await? {
        return Err(Error::not_found("Application interface", interface_id));
    }
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT DISTINCT cr.compute_resource_id, cr.host_name
        FROM app_module_mappings m
        JOIN app_deployments d ON d.app_module_id = m.app_module_id
        JOIN compute_resources cr ON cr.compute_resource_id = d.compute_host_id
        WHERE m.application_interface_id = ? AND cr.enabled = 1
        "#,
    )
    .bind(interface_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list interface compute resources")?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::DataType;

    const GATEWAY: &str = "seagrid";

    fn gaussian(module_id: &str) -> ApplicationInterfaceDescription {
        ApplicationInterfaceDescription {
            application_name: "Gaussian".to_string(),
            application_description: Some("Gaussian quantum chemistry".to_string()),
            application_modules: vec![module_id.to_string()],
            application_inputs: vec![
                InputDataObjectType {
                    name: "Input-File".to_string(),
                    data_type: DataType::Uri,
                    input_order: 1,
                    is_required: true,
                    ..Default::default()
                },
                InputDataObjectType {
                    name: "Nodes".to_string(),
                    data_type: DataType::Integer,
                    value: Some("1".to_string()),
                    input_order: 2,
                    ..Default::default()
                },
            ],
            application_outputs: vec![OutputDataObjectType {
                name: "Gaussian-Log".to_string(),
                data_type: DataType::Stdout,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let pool = test_pool().await;
        let mut module = ApplicationModule::new("Gaussian");
        module.app_module_version = Some("g16".to_string());

        let id = add_application_module(&pool, &module, GATEWAY).await.unwrap();
        assert!(id.starts_with("Gaussian_"));

        module.app_module_description = Some("updated".to_string());
        update_application_module(&pool, &id, &module).await.unwrap();
        let stored = get_application_module(&pool, &id).await.unwrap();
        assert_eq!(stored.app_module_description.as_deref(), Some("updated"));

        assert_eq!(get_all_application_modules(&pool, GATEWAY).await.unwrap().len(), 1);
        assert!(get_all_application_modules(&pool, "other").await.unwrap().is_empty());

        remove_application_module(&pool, &id).await.unwrap();
        assert!(!is_application_module_exists(&pool, &id).await.unwrap());
    }

    #[tokio::test]
    async fn test_interface_round_trip_and_update() {
        let pool = test_pool().await;
        let module_id = add_application_module(&pool, &ApplicationModule::new("Gaussian"), GATEWAY)
            .await
            .unwrap();

        let iface = gaussian(&module_id);
        let id = add_application_interface(&pool, &iface, GATEWAY).await.unwrap();

        let stored = get_application_interface(&pool, &id).await.unwrap();
        assert_eq!(stored.application_modules, vec![module_id.clone()]);
        assert_eq!(stored.application_inputs, iface.application_inputs);
        assert_eq!(stored.application_outputs, iface.application_outputs);

        let mut changed = stored.clone();
        changed.application_inputs.truncate(1);
        changed.application_outputs.clear();
        update_application_interface(&pool, &id, &changed).await.unwrap();

        assert_eq!(get_application_inputs(&pool, &id).await.unwrap().len(), 1);
        assert!(get_application_outputs(&pool, &id).await.unwrap().is_empty());

        let names = get_all_application_interface_names(&pool, GATEWAY).await.unwrap();
        assert_eq!(names.get(&id).map(String::as_str), Some("Gaussian"));
    }

    #[tokio::test]
    async fn test_interface_requires_existing_module() {
        let pool = test_pool().await;
        let err = add_application_interface(&pool, &gaussian("missing-module"), GATEWAY)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AppCatalogError(_)));
        assert!(get_all_application_interfaces(&pool, GATEWAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_module_mapping_and_removal() {
        let pool = test_pool().await;
        let m1 = add_application_module(&pool, &ApplicationModule::new("Gaussian"), GATEWAY)
            .await
            .unwrap();
        let m2 = add_application_module(&pool, &ApplicationModule::new("GaussView"), GATEWAY)
            .await
            .unwrap();
        let id = add_application_interface(&pool, &gaussian(&m1), GATEWAY).await.unwrap();

        add_application_module_mapping(&pool, &m2, &id).await.unwrap();
        assert_eq!(
            get_application_interface(&pool, &id).await.unwrap().application_modules.len(),
            2
        );

        remove_application_interface(&pool, &id).await.unwrap();
        assert!(!is_application_interface_exists(&pool, &id).await.unwrap());
        let inputs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM application_inputs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(inputs, 0);
    }

    #[tokio::test]
    async fn test_available_compute_resources_skip_disabled_hosts() {
        use crate::queries::{add_application_deployment, add_compute_resource};
        use appcatalog_core::{ApplicationDeploymentDescription, ComputeResourceDescription};

        let pool = test_pool().await;
        let module_id = add_application_module(&pool, &ApplicationModule::new("Gaussian"), GATEWAY)
            .await
            .unwrap();
        let iface_id = add_application_interface(&pool, &gaussian(&module_id), GATEWAY)
            .await
            .unwrap();

        let mut retired = ComputeResourceDescription::new("retired.example.org");
        retired.compute_resource_id = "retired".to_string();
        retired.enabled = false;
        let mut active = ComputeResourceDescription::new("expanse.sdsc.edu");
        active.compute_resource_id = "expanse".to_string();

        for host in [&retired, &active] {
            let host_id = add_compute_resource(&pool, host).await.unwrap();
            let deployment = ApplicationDeploymentDescription {
                app_module_id: module_id.clone(),
                compute_host_id: host_id,
                executable_path: "/opt/g16/g16".to_string(),
                ..Default::default()
            };
            add_application_deployment(&pool, &deployment, GATEWAY).await.unwrap();
        }

        let available = get_available_app_interface_compute_resources(&pool, &iface_id)
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available.get("expanse").map(String::as_str), Some("expanse.sdsc.edu"));
        assert!(!available.contains_key("retired"));
    }
}
