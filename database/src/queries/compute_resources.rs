//! Compute resource queries: hosts, batch queues, file systems and the
//! job submission / data movement interfaces they expose

use std::collections::BTreeMap;

use appcatalog_core::{
    ensure_id, now_millis, BatchQueue, ComputeResourceDescription, DataMovementInterface, Error,
    FileSystem, JobSubmissionInterface, Result,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{validation, DbResultExt};
use crate::models::{
    BatchQueueRow, ComputeResourceRow, DataMovementInterfaceRow, JobSubmissionInterfaceRow,
};

// ============================================================================
// Compute Resource Queries
// ============================================================================

/// Register a compute resource with all of its child collections
///
/// An unset id is generated from the host name. Returns the stored id.
#[instrument(skip(pool, desc), fields(host = %desc.host_name))]
pub async fn add_compute_resource(
    pool: &Pool<Sqlite>,
    desc: &ComputeResourceDescription,
) -> Result<String> {
    validation(desc.validate())?;

    let id = ensure_id(&desc.compute_resource_id, &desc.host_name);
    let now = now_millis();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    upsert_compute_resource(&mut tx, &id, desc, now).await?;
    insert_compute_children(&mut tx, &id, desc, now).await?;
    tx.commit().await.db_context("Failed to commit compute resource")?;

    info!(compute_resource_id = %id, "Compute resource added");
    Ok(id)
}

/// Replace a compute resource's fields and every child collection
#[instrument(skip(pool, desc))]
pub async fn update_compute_resource(
    pool: &Pool<Sqlite>,
    id: &str,
    desc: &ComputeResourceDescription,
) -> Result<()> {
    validation(desc.validate())?;
    if !is_compute_resource_exists(pool, id).await? {
        return Err(Error::not_found("Compute resource", id));
    }

    let now = now_millis();
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    upsert_compute_resource(&mut tx, id, desc, now).await?;
    for table in [
        "host_aliases",
        "host_ip_addresses",
        "batch_queues",
        "compute_resource_file_systems",
        "job_submission_interfaces",
        "data_movement_interfaces",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE compute_resource_id = ?", table))
            .bind(id)
            .execute(&mut *tx)
            .await
            .db_context("Failed to clear compute resource children")?;
    }
    insert_compute_children(&mut tx, id, desc, now).await?;
    tx.commit().await.db_context("Failed to commit compute resource")?;

    info!(compute_resource_id = %id, "Compute resource updated");
    Ok(())
}

/// Get a compute resource with all child collections
#[instrument(skip(pool))]
pub async fn get_compute_resource(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<ComputeResourceDescription> {
    let row = sqlx::query_as::<_, ComputeResourceRow>(
        r#"
        SELECT compute_resource_id, host_name, resource_description, enabled, max_memory_per_node,
               gateway_usage_reporting, gateway_usage_module_load_command, gateway_usage_executable,
               cpus_per_node, default_node_count, default_cpu_count, default_walltime,
               creation_time, update_time
        FROM compute_resources
        WHERE compute_resource_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get compute resource")?
    .ok_or_else(|| Error::not_found("Compute resource", id))?;

    let mut desc = row.into_description();

    desc.host_aliases = sqlx::query_scalar(
        "SELECT alias FROM host_aliases WHERE compute_resource_id = ? ORDER BY alias",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get host aliases")?;

    desc.ip_addresses = sqlx::query_scalar(
        "SELECT ip_address FROM host_ip_addresses WHERE compute_resource_id = ? ORDER BY ip_address",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get ip addresses")?;

    desc.batch_queues = list_batch_queues(pool, id).await?;

    let file_systems: Vec<(String, String)> = sqlx::query_as(
        "SELECT file_system, path FROM compute_resource_file_systems WHERE compute_resource_id = ?",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get file systems")?;
    desc.file_systems = file_systems
        .into_iter()
        .map(|(fs, path)| Ok((fs.parse::<FileSystem>()?, path)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    desc.job_submission_interfaces = list_job_submission_interfaces(pool, id).await?;
    desc.data_movement_interfaces = list_data_movement_interfaces(pool, id).await?;

    Ok(desc)
}

/// All compute resources, ordered by host name
#[instrument(skip(pool))]
pub async fn list_compute_resources(pool: &Pool<Sqlite>) -> Result<Vec<ComputeResourceDescription>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT compute_resource_id FROM compute_resources ORDER BY host_name, compute_resource_id",
    )
    .fetch_all(pool)
    .await
    .db_context("Failed to list compute resources")?;

    let mut resources = Vec::with_capacity(ids.len());
    for id in ids {
        resources.push(get_compute_resource(pool, &id).await?);
    }
    Ok(resources)
}

/// Map of compute resource id to host name
#[instrument(skip(pool))]
pub async fn get_all_compute_resource_id_names(
    pool: &Pool<Sqlite>,
) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT compute_resource_id, host_name FROM compute_resources")
            .fetch_all(pool)
            .await
            .db_context("Failed to list compute resource names")?;
    Ok(rows.into_iter().collect())
}

#[instrument(skip(pool))]
pub async fn is_compute_resource_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM compute_resources WHERE compute_resource_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .db_context("Failed to check compute resource")?;
    Ok(count > 0)
}

/// Delete a compute resource; child rows and deployments on it cascade
#[instrument(skip(pool))]
pub async fn remove_compute_resource(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM compute_resources WHERE compute_resource_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete compute resource")?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Compute resource", id));
    }
    info!(compute_resource_id = %id, "Compute resource removed");
    Ok(())
}

async fn upsert_compute_resource(
    conn: &mut SqliteConnection,
    id: &str,
    desc: &ComputeResourceDescription,
    now: i64,
) -> Result<()> {
    // ON CONFLICT keeps the row so cascading children are not dropped
    sqlx::query(
        r#"
        INSERT INTO compute_resources (
            compute_resource_id, host_name, resource_description, enabled, max_memory_per_node,
            gateway_usage_reporting, gateway_usage_module_load_command, gateway_usage_executable,
            cpus_per_node, default_node_count, default_cpu_count, default_walltime,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(compute_resource_id) DO UPDATE SET
            host_name = excluded.host_name,
            resource_description = excluded.resource_description,
            enabled = excluded.enabled,
            max_memory_per_node = excluded.max_memory_per_node,
            gateway_usage_reporting = excluded.gateway_usage_reporting,
            gateway_usage_module_load_command = excluded.gateway_usage_module_load_command,
            gateway_usage_executable = excluded.gateway_usage_executable,
            cpus_per_node = excluded.cpus_per_node,
            default_node_count = excluded.default_node_count,
            default_cpu_count = excluded.default_cpu_count,
            default_walltime = excluded.default_walltime,
            update_time = excluded.update_time
        "#,
    )
    .bind(id)
    .bind(&desc.host_name)
    .bind(&desc.resource_description)
    .bind(desc.enabled)
    .bind(desc.max_memory_per_node)
    .bind(desc.gateway_usage_reporting)
    .bind(&desc.gateway_usage_module_load_command)
    .bind(&desc.gateway_usage_executable)
    .bind(desc.cpus_per_node)
    .bind(desc.default_node_count)
    .bind(desc.default_cpu_count)
    .bind(desc.default_walltime)
    .bind(desc.creation_time.unwrap_or(now))
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save compute resource")?;
    Ok(())
}

async fn insert_compute_children(
    conn: &mut SqliteConnection,
    id: &str,
    desc: &ComputeResourceDescription,
    now: i64,
) -> Result<()> {
    for alias in &desc.host_aliases {
        sqlx::query("INSERT OR IGNORE INTO host_aliases (compute_resource_id, alias) VALUES (?, ?)")
            .bind(id)
            .bind(alias)
            .execute(&mut *conn)
            .await
            .db_context("Failed to save host alias")?;
    }
    for ip in &desc.ip_addresses {
        sqlx::query(
            "INSERT OR IGNORE INTO host_ip_addresses (compute_resource_id, ip_address) VALUES (?, ?)",
        )
        .bind(id)
        .bind(ip)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save ip address")?;
    }
    for queue in &desc.batch_queues {
        insert_batch_queue(&mut *conn, id, queue).await?;
    }
    for (fs, path) in &desc.file_systems {
        sqlx::query(
            "INSERT INTO compute_resource_file_systems (compute_resource_id, file_system, path) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(fs.as_str())
        .bind(path)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save file system")?;
    }
    for jsi in &desc.job_submission_interfaces {
        insert_job_submission_interface(&mut *conn, id, jsi, now).await?;
    }
    for dmi in &desc.data_movement_interfaces {
        insert_data_movement_interface(&mut *conn, id, dmi, now).await?;
    }
    Ok(())
}

// ============================================================================
// Batch Queue Queries
// ============================================================================

async fn list_batch_queues(pool: &Pool<Sqlite>, resource_id: &str) -> Result<Vec<BatchQueue>> {
    let rows = sqlx::query_as::<_, BatchQueueRow>(
        r#"
        SELECT compute_resource_id, queue_name, queue_description, max_run_time, max_nodes,
               max_processors, max_jobs_in_queue, max_memory, cpu_per_node, default_node_count,
               default_cpu_count, default_walltime, queue_specific_macros, is_default_queue
        FROM batch_queues
        WHERE compute_resource_id = ?
        ORDER BY queue_name
        "#,
    )
    .bind(resource_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get batch queues")?;
    Ok(rows.into_iter().map(BatchQueue::from).collect())
}

async fn insert_batch_queue(
    conn: &mut SqliteConnection,
    resource_id: &str,
    queue: &BatchQueue,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO batch_queues (
            compute_resource_id, queue_name, queue_description, max_run_time, max_nodes,
            max_processors, max_jobs_in_queue, max_memory, cpu_per_node, default_node_count,
            default_cpu_count, default_walltime, queue_specific_macros, is_default_queue
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resource_id)
    .bind(&queue.queue_name)
    .bind(&queue.queue_description)
    .bind(queue.max_run_time)
    .bind(queue.max_nodes)
    .bind(queue.max_processors)
    .bind(queue.max_jobs_in_queue)
    .bind(queue.max_memory)
    .bind(queue.cpu_per_node)
    .bind(queue.default_node_count)
    .bind(queue.default_cpu_count)
    .bind(queue.default_walltime)
    .bind(&queue.queue_specific_macros)
    .bind(queue.is_default_queue)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save batch queue")?;
    Ok(())
}

/// Add a batch queue to an existing compute resource
#[instrument(skip(pool, queue), fields(queue = %queue.queue_name))]
pub async fn add_batch_queue(pool: &Pool<Sqlite>, resource_id: &str, queue: &BatchQueue) -> Result<()> {
    if queue.queue_name.trim().is_empty() {
        return Err(Error::ValidationError("Batch queue name cannot be empty".to_string()));
    }
    if !is_compute_resource_exists(pool, resource_id).await? {
        return Err(Error::not_found("Compute resource", resource_id));
    }

    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    insert_batch_queue(&mut conn, resource_id, queue).await
}

/// Replace the settings of an existing batch queue
#[instrument(skip(pool, queue), fields(queue = %queue.queue_name))]
pub async fn update_batch_queue(pool: &Pool<Sqlite>, resource_id: &str, queue: &BatchQueue) -> Result<()> {
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    let result = sqlx::query("DELETE FROM batch_queues WHERE compute_resource_id = ? AND queue_name = ?")
        .bind(resource_id)
        .bind(&queue.queue_name)
        .execute(&mut *tx)
        .await
        .db_context("Failed to replace batch queue")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "Batch queue",
            format!("{}/{}", resource_id, queue.queue_name),
        ));
    }
    insert_batch_queue(&mut tx, resource_id, queue).await?;
    tx.commit().await.db_context("Failed to commit batch queue")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn remove_batch_queue(pool: &Pool<Sqlite>, resource_id: &str, queue_name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM batch_queues WHERE compute_resource_id = ? AND queue_name = ?")
        .bind(resource_id)
        .bind(queue_name)
        .execute(pool)
        .await
        .db_context("Failed to delete batch queue")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "Batch queue",
            format!("{}/{}", resource_id, queue_name),
        ));
    }
    Ok(())
}

// ============================================================================
// Job Submission Interface Queries
// ============================================================================

async fn list_job_submission_interfaces(
    pool: &Pool<Sqlite>,
    resource_id: &str,
) -> Result<Vec<JobSubmissionInterface>> {
    sqlx::query_as::<_, JobSubmissionInterfaceRow>(
        r#"
        SELECT job_submission_interface_id, job_submission_protocol, priority_order
        FROM job_submission_interfaces
        WHERE compute_resource_id = ?
        ORDER BY priority_order, job_submission_interface_id
        "#,
    )
    .bind(resource_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get job submission interfaces")?
    .into_iter()
    .map(JobSubmissionInterfaceRow::into_interface)
    .collect()
}

async fn insert_job_submission_interface(
    conn: &mut SqliteConnection,
    resource_id: &str,
    jsi: &JobSubmissionInterface,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO job_submission_interfaces (
            compute_resource_id, job_submission_interface_id, job_submission_protocol,
            priority_order, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resource_id)
    .bind(&jsi.job_submission_interface_id)
    .bind(jsi.job_submission_protocol.as_str())
    .bind(jsi.priority_order)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save job submission interface")?;
    Ok(())
}

/// Attach a job submission interface to a compute resource
#[instrument(skip(pool, jsi), fields(jsi = %jsi.job_submission_interface_id))]
pub async fn add_job_submission_interface(
    pool: &Pool<Sqlite>,
    resource_id: &str,
    jsi: &JobSubmissionInterface,
) -> Result<String> {
    if !is_compute_resource_exists(pool, resource_id).await? {
        return Err(Error::not_found("Compute resource", resource_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    insert_job_submission_interface(&mut conn, resource_id, jsi, now_millis()).await?;
    Ok(jsi.job_submission_interface_id.clone())
}

#[instrument(skip(pool))]
pub async fn remove_job_submission_interface(
    pool: &Pool<Sqlite>,
    resource_id: &str,
    jsi_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM job_submission_interfaces WHERE compute_resource_id = ? AND job_submission_interface_id = ?",
    )
    .bind(resource_id)
    .bind(jsi_id)
    .execute(pool)
    .await
    .db_context("Failed to delete job submission interface")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Job submission interface", jsi_id));
    }
    Ok(())
}

/// Set the priority order of a job submission interface
#[instrument(skip(pool))]
pub async fn change_job_submission_priority(
    pool: &Pool<Sqlite>,
    jsi_id: &str,
    priority_order: i32,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE job_submission_interfaces SET priority_order = ?, update_time = ? WHERE job_submission_interface_id = ?",
    )
    .bind(priority_order)
    .bind(now_millis())
    .bind(jsi_id)
    .execute(pool)
    .await
    .db_context("Failed to change job submission priority")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Job submission interface", jsi_id));
    }
    Ok(())
}

/// Set several priorities at once; all or nothing
#[instrument(skip(pool, priorities))]
pub async fn change_job_submission_priorities(
    pool: &Pool<Sqlite>,
    priorities: &BTreeMap<String, i32>,
) -> Result<()> {
    let now = now_millis();
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    for (jsi_id, order) in priorities {
        let result = sqlx::query(
            "UPDATE job_submission_interfaces SET priority_order = ?, update_time = ? WHERE job_submission_interface_id = ?",
        )
        .bind(order)
        .bind(now)
        .bind(jsi_id)
        .execute(&mut *tx)
        .await
        .db_context("Failed to change job submission priority")?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Job submission interface", jsi_id.as_str()));
        }
    }
    tx.commit().await.db_context("Failed to commit priorities")?;
    Ok(())
}

// ============================================================================
// Data Movement Interface Queries
// ============================================================================

async fn list_data_movement_interfaces(
    pool: &Pool<Sqlite>,
    resource_id: &str,
) -> Result<Vec<DataMovementInterface>> {
    sqlx::query_as::<_, DataMovementInterfaceRow>(
        r#"
        SELECT data_movement_interface_id, data_movement_protocol, priority_order
        FROM data_movement_interfaces
        WHERE compute_resource_id = ?
        ORDER BY priority_order, data_movement_interface_id
        "#,
    )
    .bind(resource_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get data movement interfaces")?
    .into_iter()
    .map(DataMovementInterfaceRow::into_interface)
    .collect()
}

async fn insert_data_movement_interface(
    conn: &mut SqliteConnection,
    resource_id: &str,
    dmi: &DataMovementInterface,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO data_movement_interfaces (
            compute_resource_id, data_movement_interface_id, data_movement_protocol,
            priority_order, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resource_id)
    .bind(&dmi.data_movement_interface_id)
    .bind(dmi.data_movement_protocol.as_str())
    .bind(dmi.priority_order)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save data movement interface")?;
    Ok(())
}

/// Attach a data movement interface to a compute resource
#[instrument(skip(pool, dmi), fields(dmi = %dmi.data_movement_interface_id))]
pub async fn add_data_movement_interface(
    pool: &Pool<Sqlite>,
    resource_id: &str,
    dmi: &DataMovementInterface,
) -> Result<String> {
    if !is_compute_resource_exists(pool, resource_id).await? {
        return Err(Error::not_found("Compute resource", resource_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    insert_data_movement_interface(&mut conn, resource_id, dmi, now_millis()).await?;
    Ok(dmi.data_movement_interface_id.clone())
}

#[instrument(skip(pool))]
pub async fn remove_data_movement_interface(
    pool: &Pool<Sqlite>,
    resource_id: &str,
    dmi_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM data_movement_interfaces WHERE compute_resource_id = ? AND data_movement_interface_id = ?",
    )
    .bind(resource_id)
    .bind(dmi_id)
    .execute(pool)
    .await
    .db_context("Failed to delete data movement interface")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Data movement interface", dmi_id));
    }
    Ok(())
}

/// Set the priority order of a data movement interface
#[instrument(skip(pool))]
pub async fn change_data_movement_priority(
    pool: &Pool<Sqlite>,
    dmi_id: &str,
    priority_order: i32,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE data_movement_interfaces SET priority_order = ?, update_time = ? WHERE data_movement_interface_id = ?",
    )
    .bind(priority_order)
    .bind(now_millis())
    .bind(dmi_id)
    .execute(pool)
    .await
    .db_context("Failed to change data movement priority")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Data movement interface", dmi_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::{DataMovementProtocol, JobSubmissionProtocol};

    fn stampede() -> ComputeResourceDescription {
        let mut desc = ComputeResourceDescription::new("stampede.tacc.xsede.org");
        desc.host_aliases = vec!["stampede".to_string()];
        desc.ip_addresses = vec!["129.114.1.1".to_string()];
        desc.resource_description = Some("TACC Stampede".to_string());
        desc.batch_queues = vec![
            BatchQueue {
                queue_name: "normal".to_string(),
                max_nodes: Some(256),
                is_default_queue: true,
                ..Default::default()
            },
            BatchQueue {
                queue_name: "development".to_string(),
                max_run_time: Some(120),
                ..Default::default()
            },
        ];
        desc.file_systems
            .insert(FileSystem::Scratch, "/scratch/01437/ogce".to_string());
        desc.job_submission_interfaces = vec![JobSubmissionInterface {
            job_submission_interface_id: "ssh-1".to_string(),
            job_submission_protocol: JobSubmissionProtocol::Ssh,
            priority_order: 0,
        }];
        desc.data_movement_interfaces = vec![DataMovementInterface {
            data_movement_interface_id: "scp-1".to_string(),
            data_movement_protocol: DataMovementProtocol::Scp,
            priority_order: 0,
        }];
        desc
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips() {
        let pool = test_pool().await;
        let desc = stampede();

        let id = add_compute_resource(&pool, &desc).await.unwrap();
        assert!(id.starts_with("stampede_tacc_xsede_org_"));

        let stored = get_compute_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.compute_resource_id, id);
        assert_eq!(stored.host_name, desc.host_name);
        assert_eq!(stored.host_aliases, desc.host_aliases);
        assert_eq!(stored.ip_addresses, desc.ip_addresses);
        assert_eq!(stored.file_systems, desc.file_systems);
        assert_eq!(stored.job_submission_interfaces, desc.job_submission_interfaces);
        assert_eq!(stored.data_movement_interfaces, desc.data_movement_interfaces);
        assert_eq!(stored.batch_queues.len(), 2);
        assert_eq!(stored.default_queue().unwrap().queue_name, "normal");
        assert!(stored.creation_time.is_some());
    }

    #[tokio::test]
    async fn test_update_replaces_children() {
        let pool = test_pool().await;
        let id = add_compute_resource(&pool, &stampede()).await.unwrap();

        let mut desc = get_compute_resource(&pool, &id).await.unwrap();
        desc.host_aliases = vec!["stampede2".to_string()];
        desc.batch_queues = vec![BatchQueue {
            queue_name: "skx-normal".to_string(),
            ..Default::default()
        }];
        desc.file_systems.clear();
        update_compute_resource(&pool, &id, &desc).await.unwrap();

        let stored = get_compute_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.host_aliases, vec!["stampede2".to_string()]);
        assert_eq!(stored.batch_queues.len(), 1);
        assert_eq!(stored.batch_queues[0].queue_name, "skx-normal");
        assert!(stored.file_systems.is_empty());
        assert_eq!(stored.creation_time, desc.creation_time);
    }

    #[tokio::test]
    async fn test_update_missing_resource_is_not_found() {
        let pool = test_pool().await;
        let err = update_compute_resource(&pool, "missing", &stampede())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remove_cascades_and_exists() {
        let pool = test_pool().await;
        let id = add_compute_resource(&pool, &stampede()).await.unwrap();
        assert!(is_compute_resource_exists(&pool, &id).await.unwrap());

        remove_compute_resource(&pool, &id).await.unwrap();
        assert!(!is_compute_resource_exists(&pool, &id).await.unwrap());

        let queues: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batch_queues")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(queues, 0);

        assert!(remove_compute_resource(&pool, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_interfaces_and_priorities() {
        let pool = test_pool().await;
        let id = add_compute_resource(&pool, &stampede()).await.unwrap();

        add_job_submission_interface(
            &pool,
            &id,
            &JobSubmissionInterface {
                job_submission_interface_id: "local-1".to_string(),
                job_submission_protocol: JobSubmissionProtocol::Local,
                priority_order: 5,
            },
        )
        .await
        .unwrap();
        change_job_submission_priority(&pool, "local-1", -1).await.unwrap();

        let stored = get_compute_resource(&pool, &id).await.unwrap();
        assert_eq!(
            stored.preferred_job_submission().unwrap().job_submission_interface_id,
            "local-1"
        );

        remove_job_submission_interface(&pool, &id, "ssh-1").await.unwrap();
        remove_data_movement_interface(&pool, &id, "scp-1").await.unwrap();
        let stored = get_compute_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.job_submission_interfaces.len(), 1);
        assert!(stored.data_movement_interfaces.is_empty());

        assert!(change_data_movement_priority(&pool, "scp-1", 1)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_batch_queue_operations() {
        let pool = test_pool().await;
        let id = add_compute_resource(&pool, &stampede()).await.unwrap();

        let mut queue = BatchQueue {
            queue_name: "largemem".to_string(),
            max_memory: Some(1024),
            ..Default::default()
        };
        add_batch_queue(&pool, &id, &queue).await.unwrap();

        queue.max_memory = Some(2048);
        update_batch_queue(&pool, &id, &queue).await.unwrap();
        let stored = get_compute_resource(&pool, &id).await.unwrap();
        assert_eq!(stored.batch_queue("largemem").unwrap().max_memory, Some(2048));

        remove_batch_queue(&pool, &id, "largemem").await.unwrap();
        assert!(remove_batch_queue(&pool, &id, "largemem")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_id_names() {
        let pool = test_pool().await;
        let mut desc = stampede();
        desc.compute_resource_id = "stampede".to_string();
        add_compute_resource(&pool, &desc).await.unwrap();

        let names = get_all_compute_resource_id_names(&pool).await.unwrap();
        assert_eq!(names.get("stampede").map(String::as_str), Some("stampede.tacc.xsede.org"));
        assert_eq!(list_compute_resources(&pool).await.unwrap().len(), 1);
    }
}
