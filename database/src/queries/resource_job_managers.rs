//! Resource job manager queries

use appcatalog_core::{ensure_id, Error, ResourceJobManager, Result};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::DbResultExt;
use crate::models::ResourceJobManagerRow;

/// Register a job manager; an unset id is generated from "RJM"
#[instrument(skip(pool, rjm), fields(rjm_type = %rjm.resource_job_manager_type))]
pub async fn add_resource_job_manager(pool: &Pool<Sqlite>, rjm: &ResourceJobManager) -> Result<String> {
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    let id = save_resource_job_manager(&mut tx, rjm).await?;
    tx.commit().await.db_context("Failed to commit resource job manager")?;

    info!(resource_job_manager_id = %id, "Resource job manager added");
    Ok(id)
}

/// Insert or replace a job manager inside an open transaction
pub(crate) async fn save_resource_job_manager(
    conn: &mut SqliteConnection,
    rjm: &ResourceJobManager,
) -> Result<String> {
    let id = ensure_id(&rjm.resource_job_manager_id, "RJM");

    sqlx::query(
        r#"
        INSERT INTO resource_job_managers (
            resource_job_manager_id, resource_job_manager_type, push_monitoring_endpoint,
            job_manager_bin_path
        )
        VALUES (?, ?, ?, ?)
        ON CONFLICT(resource_job_manager_id) DO UPDATE SET
            resource_job_manager_type = excluded.resource_job_manager_type,
            push_monitoring_endpoint = excluded.push_monitoring_endpoint,
            job_manager_bin_path = excluded.job_manager_bin_path
        "#,
    )
    .bind(&id)
    .bind(rjm.resource_job_manager_type.as_str())
    .bind(&rjm.push_monitoring_endpoint)
    .bind(&rjm.job_manager_bin_path)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save resource job manager")?;

    sqlx::query("DELETE FROM job_manager_commands WHERE resource_job_manager_id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear job manager commands")?;
    sqlx::query("DELETE FROM parallelism_prefixes WHERE resource_job_manager_id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear parallelism prefixes")?;

    for (command_type, command) in &rjm.job_manager_commands {
        sqlx::query(
            "INSERT INTO job_manager_commands (resource_job_manager_id, command_type, command) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(command_type.as_str())
        .bind(command)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save job manager command")?;
    }
    for (parallelism, prefix) in &rjm.parallelism_prefix {
        sqlx::query(
            "INSERT INTO parallelism_prefixes (resource_job_manager_id, parallelism_type, command_prefix) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(parallelism.as_str())
        .bind(prefix)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save parallelism prefix")?;
    }

    Ok(id)
}

/// Replace a job manager's settings, commands and prefixes
#[instrument(skip(pool, rjm))]
pub async fn update_resource_job_manager(
    pool: &Pool<Sqlite>,
    id: &str,
    rjm: &ResourceJobManager,
) -> Result<()> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM resource_job_managers WHERE resource_job_manager_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .db_context("Failed to check resource job manager")?;
    if exists == 0 {
        return Err(Error::not_found("Resource job manager", id));
    }

    let mut rjm = rjm.clone();
    rjm.resource_job_manager_id = id.to_string();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_resource_job_manager(&mut tx, &rjm).await?;
    tx.commit().await.db_context("Failed to commit resource job manager")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_resource_job_manager(pool: &Pool<Sqlite>, id: &str) -> Result<ResourceJobManager> {
    let row = sqlx::query_as::<_, ResourceJobManagerRow>(
        r#"
        SELECT resource_job_manager_id, resource_job_manager_type, push_monitoring_endpoint,
               job_manager_bin_path
        FROM resource_job_managers
        WHERE resource_job_manager_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get resource job manager")?
    .ok_or_else(|| Error::not_found("Resource job manager", id))?;

    let mut rjm = ResourceJobManager::new(row.resource_job_manager_type.parse()?);
    rjm.resource_job_manager_id = row.resource_job_manager_id;
    rjm.push_monitoring_endpoint = row.push_monitoring_endpoint;
    rjm.job_manager_bin_path = row.job_manager_bin_path;

    let commands: Vec<(String, String)> = sqlx::query_as(
        "SELECT command_type, command FROM job_manager_commands WHERE resource_job_manager_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get job manager commands")?;
    for (command_type, command) in commands {
        rjm.job_manager_commands
            .insert(command_type.parse()?, command);
    }

    let prefixes: Vec<(String, String)> = sqlx::query_as(
        "SELECT parallelism_type, command_prefix FROM parallelism_prefixes WHERE resource_job_manager_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get parallelism prefixes")?;
    for (parallelism, prefix) in prefixes {
        rjm.parallelism_prefix.insert(parallelism.parse()?, prefix);
    }

    Ok(rjm)
}

/// Delete a job manager; submissions that use it cascade
#[instrument(skip(pool))]
pub async fn delete_resource_job_manager(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM resource_job_managers WHERE resource_job_manager_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete resource job manager")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Resource job manager", id));
    }
    info!(resource_job_manager_id = %id, "Resource job manager deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::{ApplicationParallelismType, JobManagerCommand, ResourceJobManagerType};

    fn slurm() -> ResourceJobManager {
        let mut rjm = ResourceJobManager::new(ResourceJobManagerType::Slurm);
        rjm.job_manager_bin_path = Some("/usr/bin".to_string());
        rjm.job_manager_commands
            .insert(JobManagerCommand::Submission, "sbatch".to_string());
        rjm.job_manager_commands
            .insert(JobManagerCommand::Deletion, "scancel".to_string());
        rjm.parallelism_prefix
            .insert(ApplicationParallelismType::Mpi, "srun".to_string());
        rjm
    }

    #[tokio::test]
    async fn test_add_get_update_delete() {
        let pool = test_pool().await;
        let id = add_resource_job_manager(&pool, &slurm()).await.unwrap();
        assert!(id.starts_with("RJM_"));

        let stored = get_resource_job_manager(&pool, &id).await.unwrap();
        assert_eq!(stored.resource_job_manager_type, ResourceJobManagerType::Slurm);
        assert_eq!(stored.job_manager_commands.len(), 2);
        assert_eq!(
            stored.command_path(JobManagerCommand::Submission).as_deref(),
            Some("/usr/bin/sbatch")
        );

        let mut changed = stored.clone();
        changed.job_manager_commands.clear();
        changed
            .job_manager_commands
            .insert(JobManagerCommand::JobMonitoring, "squeue".to_string());
        changed.parallelism_prefix.clear();
        update_resource_job_manager(&pool, &id, &changed).await.unwrap();

        let stored = get_resource_job_manager(&pool, &id).await.unwrap();
        assert_eq!(stored.job_manager_commands.len(), 1);
        assert!(stored.parallelism_prefix.is_empty());

        delete_resource_job_manager(&pool, &id).await.unwrap();
        assert!(get_resource_job_manager(&pool, &id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
