//! Application deployment queries

use appcatalog_core::{
    is_unset_id, now_millis, ApplicationDeploymentDescription, CommandObject, Error, Result,
    SetEnvPaths,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{error, info, instrument};

use super::application_interfaces::is_application_module_exists;
use super::compute_resources::{get_compute_resource, is_compute_resource_exists};
use super::DbResultExt;
use crate::models::{
    AppDeploymentRow, CommandKind, DeploymentCommandRow, DeploymentEnvPathRow, EnvPathKind,
};

/// Both the compute host and the module must already be registered
async fn check_references(pool: &Pool<Sqlite>, desc: &ApplicationDeploymentDescription) -> Result<()> {
    if !is_compute_resource_exists(pool, &desc.compute_host_id).await? {
        error!(compute_host_id = %desc.compute_host_id, "Deployment references unknown compute host");
        return Err(Error::AppCatalogError(format!(
            "Compute host does not exist in the system. Please create a Compute host first. Compute host id : {}",
            desc.compute_host_id
        )));
    }
    if !is_application_module_exists(pool, &desc.app_module_id).await? {
        error!(app_module_id = %desc.app_module_id, "Deployment references unknown module");
        return Err(Error::AppCatalogError(format!(
            "Application module does not exist in the system. Please create an application module first. App Module Id : {}",
            desc.app_module_id
        )));
    }
    Ok(())
}

async fn insert_deployment_children(
    conn: &mut SqliteConnection,
    id: &str,
    desc: &ApplicationDeploymentDescription,
) -> Result<()> {
    let commands = [
        (CommandKind::ModuleLoad, &desc.module_load_cmds),
        (CommandKind::PreJob, &desc.pre_job_commands),
        (CommandKind::PostJob, &desc.post_job_commands),
    ];
    for (kind, list) in commands {
        for cmd in list {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO deployment_commands (app_deployment_id, command_kind, command, command_order)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(kind.as_str())
            .bind(&cmd.command)
            .bind(cmd.command_order)
            .execute(&mut *conn)
            .await
            .db_context("Failed to save deployment command")?;
        }
    }

    let paths = [
        (EnvPathKind::LibPrepend, &desc.lib_prepend_paths),
        (EnvPathKind::LibAppend, &desc.lib_append_paths),
        (EnvPathKind::Environment, &desc.set_environment),
    ];
    for (kind, list) in paths {
        for path in list {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO deployment_env_paths (app_deployment_id, path_kind, name, value, env_path_order)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(kind.as_str())
            .bind(&path.name)
            .bind(&path.value)
            .bind(path.env_path_order)
            .execute(&mut *conn)
            .await
            .db_context("Failed to save deployment environment")?;
        }
    }
    Ok(())
}

/// Register a deployment of a module on a compute host
///
/// An unset id becomes `<host name>_<module id>`.
#[instrument(skip(pool, desc), fields(module = %desc.app_module_id, host = %desc.compute_host_id))]
pub async fn add_application_deployment(
    pool: &Pool<Sqlite>,
    desc: &ApplicationDeploymentDescription,
    gateway_id: &str,
) -> Result<String> {
    check_references(pool, desc).await?;

    let id = if is_unset_id(&desc.app_deployment_id) {
        let host = get_compute_resource(pool, &desc.compute_host_id).await?;
        format!("{}_{}", host.host_name, desc.app_module_id)
    } else {
        desc.app_deployment_id.clone()
    };
    let now = now_millis();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    sqlx::query(
        r#"
        INSERT INTO app_deployments (
            app_deployment_id, app_module_id, compute_host_id, executable_path, parallelism,
            app_deployment_description, default_queue_name, default_node_count,
            default_cpu_count, default_walltime, editable_by_user, gateway_id,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&desc.app_module_id)
    .bind(&desc.compute_host_id)
    .bind(&desc.executable_path)
    .bind(desc.parallelism.as_str())
    .bind(&desc.app_deployment_description)
    .bind(&desc.default_queue_name)
    .bind(desc.default_node_count)
    .bind(desc.default_cpu_count)
    .bind(desc.default_walltime)
    .bind(desc.editable_by_user)
    .bind(gateway_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .db_context("Failed to save application deployment")?;

    insert_deployment_children(&mut tx, &id, desc).await?;
    tx.commit().await.db_context("Failed to commit application deployment")?;

    info!(app_deployment_id = %id, "Application deployment added");
    Ok(id)
}

/// Replace a deployment's fields and every command and environment list
#[instrument(skip(pool, desc))]
pub async fn update_application_deployment(
    pool: &Pool<Sqlite>,
    id: &str,
    desc: &ApplicationDeploymentDescription,
) -> Result<()> {
    check_references(pool, desc).await?;

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    let result = sqlx::query(
        r#"
        UPDATE app_deployments
        SET app_module_id = ?, compute_host_id = ?, executable_path = ?, parallelism = ?,
            app_deployment_description = ?, default_queue_name = ?, default_node_count = ?,
            default_cpu_count = ?, default_walltime = ?, editable_by_user = ?, update_time = ?
        WHERE app_deployment_id = ?
        "#,
    )
    .bind(&desc.app_module_id)
    .bind(&desc.compute_host_id)
    .bind(&desc.executable_path)
    .bind(desc.parallelism.as_str())
    .bind(&desc.app_deployment_description)
    .bind(&desc.default_queue_name)
    .bind(desc.default_node_count)
    .bind(desc.default_cpu_count)
    .bind(desc.default_walltime)
    .bind(desc.editable_by_user)
    .bind(now_millis())
    .bind(id)
    .execute(&mut *tx)
    .await
    .db_context("Failed to update application deployment")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application deployment", id));
    }

    for table in ["deployment_commands", "deployment_env_paths"] {
        sqlx::query(&format!("DELETE FROM {} WHERE app_deployment_id = ?", table))
            .bind(id)
            .execute(&mut *tx)
            .await
            .db_context("Failed to clear deployment children")?;
    }
    insert_deployment_children(&mut tx, id, desc).await?;
    tx.commit().await.db_context("Failed to commit application deployment")?;

    info!(app_deployment_id = %id, "Application deployment updated");
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_application_deployment(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<ApplicationDeploymentDescription> {
    let row = sqlx::query_as::<_, AppDeploymentRow>(
        r#"
        SELECT app_deployment_id, app_module_id, compute_host_id, executable_path, parallelism,
               app_deployment_description, default_queue_name, default_node_count,
               default_cpu_count, default_walltime, editable_by_user, gateway_id
        FROM app_deployments
        WHERE app_deployment_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get application deployment")?
    .ok_or_else(|| Error::not_found("Application deployment", id))?;

    let mut desc = row.into_description()?;

    let commands = sqlx::query_as::<_, DeploymentCommandRow>(
        r#"
        SELECT command_kind, command, command_order
        FROM deployment_commands
        WHERE app_deployment_id = ?
        ORDER BY command_order, command
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get deployment commands")?;
    for row in commands {
        let cmd = CommandObject {
            command: row.command,
            command_order: row.command_order,
        };
        match row.command_kind.as_str() {
            "MODULE_LOAD" => desc.module_load_cmds.push(cmd),
            "PRE_JOB" => desc.pre_job_commands.push(cmd),
            "POST_JOB" => desc.post_job_commands.push(cmd),
            other => {
                return Err(Error::DatabaseError(format!("Unknown command kind: {}", other)));
            }
        }
    }

    let paths = sqlx::query_as::<_, DeploymentEnvPathRow>(
        r#"
        SELECT path_kind, name, value, env_path_order
        FROM deployment_env_paths
        WHERE app_deployment_id = ?
        ORDER BY env_path_order, name
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get deployment environment")?;
    for row in paths {
        let path = SetEnvPaths {
            name: row.name,
            value: row.value,
            env_path_order: row.env_path_order,
        };
        match row.path_kind.as_str() {
            "LIB_PREPEND" => desc.lib_prepend_paths.push(path),
            "LIB_APPEND" => desc.lib_append_paths.push(path),
            "ENVIRONMENT" => desc.set_environment.push(path),
            other => {
                return Err(Error::DatabaseError(format!("Unknown path kind: {}", other)));
            }
        }
    }

    Ok(desc)
}

async fn get_deployments_where(
    pool: &Pool<Sqlite>,
    column: &str,
    value: &str,
) -> Result<Vec<ApplicationDeploymentDescription>> {
    let ids: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT app_deployment_id FROM app_deployments WHERE {} = ? ORDER BY app_deployment_id",
        column
    ))
    .bind(value)
    .fetch_all(pool)
    .await
    .db_context("Failed to list application deployments")?;

    let mut deployments = Vec::with_capacity(ids.len());
    for id in ids {
        deployments.push(get_application_deployment(pool, &id).await?);
    }
    Ok(deployments)
}

/// Deployments of one module
#[instrument(skip(pool))]
pub async fn get_application_deployments(
    pool: &Pool<Sqlite>,
    app_module_id: &str,
) -> Result<Vec<ApplicationDeploymentDescription>> {
    get_deployments_where(pool, "app_module_id", app_module_id).await
}

#[instrument(skip(pool))]
pub async fn get_all_application_deployments(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<Vec<ApplicationDeploymentDescription>> {
    get_deployments_where(pool, "gateway_id", gateway_id).await
}

/// Compute host ids a module is deployed on
#[instrument(skip(pool))]
pub async fn get_app_module_deployed_resources(
    pool: &Pool<Sqlite>,
    app_module_id: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT DISTINCT compute_host_id FROM app_deployments WHERE app_module_id = ? ORDER BY compute_host_id",
    )
    .bind(app_module_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list deployed resources")
}

#[instrument(skip(pool))]
pub async fn is_application_deployment_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM app_deployments WHERE app_deployment_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .db_context("Failed to check application deployment")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_application_deployment(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM app_deployments WHERE app_deployment_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete application deployment")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Application deployment", id));
    }
    info!(app_deployment_id = %id, "Application deployment removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{add_application_module, add_compute_resource, remove_compute_resource};
    use crate::test_pool;
    use appcatalog_core::{ApplicationModule, ApplicationParallelismType, ComputeResourceDescription};

    const GATEWAY: &str = "seagrid";

    async fn setup(pool: &Pool<Sqlite>) -> (String, String) {
        let mut host = ComputeResourceDescription::new("comet.sdsc.edu");
        host.compute_resource_id = "comet".to_string();
        let host_id = add_compute_resource(pool, &host).await.unwrap();
        let module_id = add_application_module(pool, &ApplicationModule::new("Amber"), GATEWAY)
            .await
            .unwrap();
        (host_id, module_id)
    }

    fn deployment(host_id: &str, module_id: &str) -> ApplicationDeploymentDescription {
        ApplicationDeploymentDescription {
            app_module_id: module_id.to_string(),
            compute_host_id: host_id.to_string(),
            executable_path: "/opt/amber/bin/pmemd.MPI".to_string(),
            parallelism: ApplicationParallelismType::Mpi,
            module_load_cmds: vec![
                CommandObject {
                    command: "module purge".to_string(),
                    command_order: 0,
                },
                CommandObject {
                    command: "module load amber".to_string(),
                    command_order: 1,
                },
            ],
            set_environment: vec![SetEnvPaths {
                name: "AMBERHOME".to_string(),
                value: "/opt/amber".to_string(),
                env_path_order: 0,
            }],
            pre_job_commands: vec![CommandObject {
                command: "ulimit -s unlimited".to_string(),
                command_order: 0,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_uses_host_and_module_for_id() {
        let pool = test_pool().await;
        let (host_id, module_id) = setup(&pool).await;

        let desc = deployment(&host_id, &module_id);
        let id = add_application_deployment(&pool, &desc, GATEWAY).await.unwrap();
        assert_eq!(id, format!("comet.sdsc.edu_{}", module_id));

        let stored = get_application_deployment(&pool, &id).await.unwrap();
        assert_eq!(stored.parallelism, ApplicationParallelismType::Mpi);
        assert_eq!(stored.module_load_cmds, desc.module_load_cmds);
        assert_eq!(stored.set_environment, desc.set_environment);
        assert_eq!(stored.pre_job_commands, desc.pre_job_commands);
        assert!(stored.post_job_commands.is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_missing_references() {
        let pool = test_pool().await;
        let (host_id, module_id) = setup(&pool).await;

        let err = add_application_deployment(&pool, &deployment("nope", &module_id), GATEWAY)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Compute host does not exist"));

        let err = add_application_deployment(&pool, &deployment(&host_id, "nope"), GATEWAY)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Application module does not exist"));
    }

    #[tokio::test]
    async fn test_update_replaces_commands() {
        let pool = test_pool().await;
        let (host_id, module_id) = setup(&pool).await;
        let id = add_application_deployment(&pool, &deployment(&host_id, &module_id), GATEWAY)
            .await
            .unwrap();

        let mut changed = get_application_deployment(&pool, &id).await.unwrap();
        changed.module_load_cmds = vec![CommandObject {
            command: "module load amber/20".to_string(),
            command_order: 0,
        }];
        changed.set_environment.clear();
        update_application_deployment(&pool, &id, &changed).await.unwrap();

        let stored = get_application_deployment(&pool, &id).await.unwrap();
        assert_eq!(stored.module_load_cmds.len(), 1);
        assert!(stored.set_environment.is_empty());
        assert_eq!(stored.pre_job_commands.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_and_cascade_from_host() {
        let pool = test_pool().await;
        let (host_id, module_id) = setup(&pool).await;
        let id = add_application_deployment(&pool, &deployment(&host_id, &module_id), GATEWAY)
            .await
            .unwrap();

        assert_eq!(get_application_deployments(&pool, &module_id).await.unwrap().len(), 1);
        assert_eq!(get_all_application_deployments(&pool, GATEWAY).await.unwrap().len(), 1);
        assert_eq!(
            get_app_module_deployed_resources(&pool, &module_id).await.unwrap(),
            vec![host_id.clone()]
        );

        remove_compute_resource(&pool, &host_id).await.unwrap();
        assert!(!is_application_deployment_exists(&pool, &id).await.unwrap());
    }
}
