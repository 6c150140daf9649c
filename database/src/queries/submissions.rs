//! Concrete job submission and data movement settings
//!
//! These rows are what a `JobSubmissionInterface` or `DataMovementInterface`
//! id points at. Ids left unset are generated from the protocol name.

use appcatalog_core::{
    ensure_id, now_millis, CloudJobSubmission, Error, GridFtpDataMovement, LocalDataMovement,
    LocalSubmission, Result, ScpDataMovement, SshJobSubmission, UnicoreDataMovement,
    UnicoreJobSubmission,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::resource_job_managers::{get_resource_job_manager, save_resource_job_manager};
use super::DbResultExt;
use crate::models::{
    CloudJobSubmissionRow, LocalSubmissionRow, ScpDataMovementRow, SshJobSubmissionRow,
    UnicoreDataMovementRow, UnicoreJobSubmissionRow,
};

async fn row_exists(pool: &Pool<Sqlite>, table: &str, column: &str, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column))
        .bind(id)
        .fetch_one(pool)
        .await
        .db_context("Failed to check submission settings")?;
    Ok(count > 0)
}

// ============================================================================
// SSH Job Submission
// ============================================================================

async fn save_ssh_job_submission(
    conn: &mut SqliteConnection,
    id: &str,
    sub: &SshJobSubmission,
) -> Result<()> {
    let rjm_id = save_resource_job_manager(&mut *conn, &sub.resource_job_manager).await?;
    let now = now_millis();

    sqlx::query(
        r#"
        INSERT INTO ssh_job_submissions (
            job_submission_interface_id, resource_job_manager_id, security_protocol,
            alternative_ssh_host_name, ssh_port, monitor_mode, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(job_submission_interface_id) DO UPDATE SET
            resource_job_manager_id = excluded.resource_job_manager_id,
            security_protocol = excluded.security_protocol,
            alternative_ssh_host_name = excluded.alternative_ssh_host_name,
            ssh_port = excluded.ssh_port,
            monitor_mode = excluded.monitor_mode,
            update_time = excluded.update_time
        "#,
    )
    .bind(id)
    .bind(&rjm_id)
    .bind(sub.security_protocol.as_str())
    .bind(&sub.alternative_ssh_host_name)
    .bind(sub.ssh_port)
    .bind(sub.monitor_mode.map(|m| m.as_str()))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save SSH job submission")?;
    Ok(())
}

/// Store SSH submission settings together with their job manager
#[instrument(skip(pool, sub))]
pub async fn add_ssh_job_submission(pool: &Pool<Sqlite>, sub: &SshJobSubmission) -> Result<String> {
    let id = ensure_id(&sub.job_submission_interface_id, "SSH");
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_ssh_job_submission(&mut tx, &id, sub).await?;
    tx.commit().await.db_context("Failed to commit SSH job submission")?;

    info!(job_submission_interface_id = %id, "SSH job submission added");
    Ok(id)
}

#[instrument(skip(pool, sub))]
pub async fn update_ssh_job_submission(
    pool: &Pool<Sqlite>,
    id: &str,
    sub: &SshJobSubmission,
) -> Result<()> {
    if !row_exists(pool, "ssh_job_submissions", "job_submission_interface_id", id).await? {
        return Err(Error::not_found("SSH job submission", id));
    }
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_ssh_job_submission(&mut tx, id, sub).await?;
    tx.commit().await.db_context("Failed to commit SSH job submission")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_ssh_job_submission(pool: &Pool<Sqlite>, id: &str) -> Result<SshJobSubmission> {
    let row = sqlx::query_as::<_, SshJobSubmissionRow>(
        r#"
        SELECT job_submission_interface_id, resource_job_manager_id, security_protocol,
               alternative_ssh_host_name, ssh_port, monitor_mode
        FROM ssh_job_submissions
        WHERE job_submission_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get SSH job submission")?
    .ok_or_else(|| Error::not_found("SSH job submission", id))?;

    Ok(SshJobSubmission {
        job_submission_interface_id: row.job_submission_interface_id,
        security_protocol: row.security_protocol.parse()?,
        resource_job_manager: get_resource_job_manager(pool, &row.resource_job_manager_id).await?,
        alternative_ssh_host_name: row.alternative_ssh_host_name,
        ssh_port: row.ssh_port,
        monitor_mode: row.monitor_mode.map(|m| m.parse()).transpose()?,
    })
}

// ============================================================================
// Local Submission
// ============================================================================

async fn save_local_submission(
    conn: &mut SqliteConnection,
    id: &str,
    sub: &LocalSubmission,
) -> Result<()> {
    let rjm_id = save_resource_job_manager(&mut *conn, &sub.resource_job_manager).await?;
    let now = now_millis();

    sqlx::query(
        r#"
        INSERT INTO local_submissions (
            job_submission_interface_id, resource_job_manager_id, security_protocol,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(job_submission_interface_id) DO UPDATE SET
            resource_job_manager_id = excluded.resource_job_manager_id,
            security_protocol = excluded.security_protocol,
            update_time = excluded.update_time
        "#,
    )
    .bind(id)
    .bind(&rjm_id)
    .bind(sub.security_protocol.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save local submission")?;
    Ok(())
}

#[instrument(skip(pool, sub))]
pub async fn add_local_job_submission(pool: &Pool<Sqlite>, sub: &LocalSubmission) -> Result<String> {
    let id = ensure_id(&sub.job_submission_interface_id, "LOCAL");
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_local_submission(&mut tx, &id, sub).await?;
    tx.commit().await.db_context("Failed to commit local submission")?;

    info!(job_submission_interface_id = %id, "Local job submission added");
    Ok(id)
}

#[instrument(skip(pool, sub))]
pub async fn update_local_job_submission(
    pool: &Pool<Sqlite>,
    id: &str,
    sub: &LocalSubmission,
) -> Result<()> {
    if !row_exists(pool, "local_submissions", "job_submission_interface_id", id).await? {
        return Err(Error::not_found("Local job submission", id));
    }
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_local_submission(&mut tx, id, sub).await?;
    tx.commit().await.db_context("Failed to commit local submission")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_local_job_submission(pool: &Pool<Sqlite>, id: &str) -> Result<LocalSubmission> {
    let row = sqlx::query_as::<_, LocalSubmissionRow>(
        r#"
        SELECT job_submission_interface_id, resource_job_manager_id, security_protocol
        FROM local_submissions
        WHERE job_submission_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get local submission")?
    .ok_or_else(|| Error::not_found("Local job submission", id))?;

    Ok(LocalSubmission {
        job_submission_interface_id: row.job_submission_interface_id,
        security_protocol: row.security_protocol.parse()?,
        resource_job_manager: get_resource_job_manager(pool, &row.resource_job_manager_id).await?,
    })
}

// ============================================================================
// Cloud and UNICORE Job Submission
// ============================================================================

#[instrument(skip(pool, sub))]
pub async fn add_cloud_job_submission(pool: &Pool<Sqlite>, sub: &CloudJobSubmission) -> Result<String> {
    let id = ensure_id(&sub.job_submission_interface_id, "Cloud");
    sqlx::query(
        r#"
        INSERT INTO cloud_job_submissions (
            job_submission_interface_id, security_protocol, node_id, executable_type,
            provider_name, user_account_name
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(sub.security_protocol.as_str())
    .bind(&sub.node_id)
    .bind(&sub.executable_type)
    .bind(sub.provider_name.as_str())
    .bind(&sub.user_account_name)
    .execute(pool)
    .await
    .db_context("Failed to save cloud job submission")?;
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_cloud_job_submission(pool: &Pool<Sqlite>, id: &str) -> Result<CloudJobSubmission> {
    sqlx::query_as::<_, CloudJobSubmissionRow>(
        r#"
        SELECT job_submission_interface_id, security_protocol, node_id, executable_type,
               provider_name, user_account_name
        FROM cloud_job_submissions
        WHERE job_submission_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get cloud job submission")?
    .ok_or_else(|| Error::not_found("Cloud job submission", id))?
    .into_submission()
}

#[instrument(skip(pool, sub))]
pub async fn add_unicore_job_submission(
    pool: &Pool<Sqlite>,
    sub: &UnicoreJobSubmission,
) -> Result<String> {
    let id = ensure_id(&sub.job_submission_interface_id, "UNICORE");
    sqlx::query(
        r#"
        INSERT INTO unicore_job_submissions (job_submission_interface_id, security_protocol, unicore_end_point_url)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(sub.security_protocol.as_str())
    .bind(&sub.unicore_end_point_url)
    .execute(pool)
    .await
    .db_context("Failed to save UNICORE job submission")?;
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_unicore_job_submission(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<UnicoreJobSubmission> {
    sqlx::query_as::<_, UnicoreJobSubmissionRow>(
        r#"
        SELECT job_submission_interface_id, security_protocol, unicore_end_point_url
        FROM unicore_job_submissions
        WHERE job_submission_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get UNICORE job submission")?
    .ok_or_else(|| Error::not_found("UNICORE job submission", id))?
    .into_submission()
}

// ============================================================================
// Data Movement
// ============================================================================

async fn save_scp_data_movement(pool: &Pool<Sqlite>, id: &str, dm: &ScpDataMovement) -> Result<()> {
    let now = now_millis();
    sqlx::query(
        r#"
        INSERT INTO scp_data_movements (
            data_movement_interface_id, security_protocol, alternative_scp_host_name, ssh_port,
            creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(data_movement_interface_id) DO UPDATE SET
            security_protocol = excluded.security_protocol,
            alternative_scp_host_name = excluded.alternative_scp_host_name,
            ssh_port = excluded.ssh_port,
            update_time = excluded.update_time
        "#,
    )
    .bind(id)
    .bind(dm.security_protocol.as_str())
    .bind(&dm.alternative_scp_host_name)
    .bind(dm.ssh_port)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .db_context("Failed to save SCP data movement")?;
    Ok(())
}

#[instrument(skip(pool, dm))]
pub async fn add_scp_data_movement(pool: &Pool<Sqlite>, dm: &ScpDataMovement) -> Result<String> {
    let id = ensure_id(&dm.data_movement_interface_id, "SCP");
    save_scp_data_movement(pool, &id, dm).await?;
    info!(data_movement_interface_id = %id, "SCP data movement added");
    Ok(id)
}

#[instrument(skip(pool, dm))]
pub async fn update_scp_data_movement(pool: &Pool<Sqlite>, id: &str, dm: &ScpDataMovement) -> Result<()> {
    if !row_exists(pool, "scp_data_movements", "data_movement_interface_id", id).await? {
        return Err(Error::not_found("SCP data movement", id));
    }
    save_scp_data_movement(pool, id, dm).await
}

#[instrument(skip(pool))]
pub async fn get_scp_data_movement(pool: &Pool<Sqlite>, id: &str) -> Result<ScpDataMovement> {
    sqlx::query_as::<_, ScpDataMovementRow>(
        r#"
        SELECT data_movement_interface_id, security_protocol, alternative_scp_host_name, ssh_port
        FROM scp_data_movements
        WHERE data_movement_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get SCP data movement")?
    .ok_or_else(|| Error::not_found("SCP data movement", id))?
    .into_data_movement()
}

/// Store GridFTP settings and their endpoint list
#[instrument(skip(pool, dm))]
pub async fn add_gridftp_data_movement(pool: &Pool<Sqlite>, dm: &GridFtpDataMovement) -> Result<String> {
    let id = ensure_id(&dm.data_movement_interface_id, "GRIDFTP");
    let now = now_millis();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    sqlx::query(
        r#"
        INSERT INTO gridftp_data_movements (data_movement_interface_id, security_protocol, creation_time, update_time)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(dm.security_protocol.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .db_context("Failed to save GridFTP data movement")?;

    for endpoint in &dm.grid_ftp_end_points {
        sqlx::query(
            "INSERT OR IGNORE INTO gridftp_endpoints (data_movement_interface_id, endpoint) VALUES (?, ?)",
        )
        .bind(&id)
        .bind(endpoint)
        .execute(&mut *tx)
        .await
        .db_context("Failed to save GridFTP endpoint")?;
    }
    tx.commit().await.db_context("Failed to commit GridFTP data movement")?;

    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_gridftp_data_movement(pool: &Pool<Sqlite>, id: &str) -> Result<GridFtpDataMovement> {
    let security_protocol: String = sqlx::query_scalar(
        "SELECT security_protocol FROM gridftp_data_movements WHERE data_movement_interface_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get GridFTP data movement")?
    .ok_or_else(|| Error::not_found("GridFTP data movement", id))?;

    let grid_ftp_end_points = sqlx::query_scalar(
        "SELECT endpoint FROM gridftp_endpoints WHERE data_movement_interface_id = ? ORDER BY endpoint",
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get GridFTP endpoints")?;

    Ok(GridFtpDataMovement {
        data_movement_interface_id: id.to_string(),
        security_protocol: security_protocol.parse()?,
        grid_ftp_end_points,
    })
}

#[instrument(skip(pool, dm))]
pub async fn add_unicore_data_movement(pool: &Pool<Sqlite>, dm: &UnicoreDataMovement) -> Result<String> {
    let id = ensure_id(&dm.data_movement_interface_id, "UNICORE_STORAGE");
    sqlx::query(
        r#"
        INSERT INTO unicore_data_movements (data_movement_interface_id, security_protocol, unicore_end_point_url)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(dm.security_protocol.as_str())
    .bind(&dm.unicore_end_point_url)
    .execute(pool)
    .await
    .db_context("Failed to save UNICORE data movement")?;
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_unicore_data_movement(pool: &Pool<Sqlite>, id: &str) -> Result<UnicoreDataMovement> {
    sqlx::query_as::<_, UnicoreDataMovementRow>(
        r#"
        SELECT data_movement_interface_id, security_protocol, unicore_end_point_url
        FROM unicore_data_movements
        WHERE data_movement_interface_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get UNICORE data movement")?
    .ok_or_else(|| Error::not_found("UNICORE data movement", id))?
    .into_data_movement()
}

#[instrument(skip(pool, dm))]
pub async fn add_local_data_movement(pool: &Pool<Sqlite>, dm: &LocalDataMovement) -> Result<String> {
    let id = ensure_id(&dm.data_movement_interface_id, "LOCAL");
    sqlx::query("INSERT INTO local_data_movements (data_movement_interface_id) VALUES (?)")
        .bind(&id)
        .execute(pool)
        .await
        .db_context("Failed to save local data movement")?;
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_local_data_movement(pool: &Pool<Sqlite>, id: &str) -> Result<LocalDataMovement> {
    if !row_exists(pool, "local_data_movements", "data_movement_interface_id", id).await? {
        return Err(Error::not_found("Local data movement", id));
    }
    Ok(LocalDataMovement {
        data_movement_interface_id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;
    use appcatalog_core::{
        JobManagerCommand, MonitorMode, ProviderName, ResourceJobManager, ResourceJobManagerType,
        SecurityProtocol,
    };

    fn pbs_manager() -> ResourceJobManager {
        let mut rjm = ResourceJobManager::new(ResourceJobManagerType::Pbs);
        rjm.job_manager_commands
            .insert(JobManagerCommand::Submission, "qsub".to_string());
        rjm
    }

    #[tokio::test]
    async fn test_ssh_submission_registers_job_manager() {
        let pool = test_pool().await;
        let sub = SshJobSubmission {
            job_submission_interface_id: appcatalog_core::DEFAULT_ID.to_string(),
            security_protocol: SecurityProtocol::SshKeys,
            resource_job_manager: pbs_manager(),
            alternative_ssh_host_name: Some("login2.stampede".to_string()),
            ssh_port: Some(2222),
            monitor_mode: Some(MonitorMode::PollJobManager),
        };

        let id = add_ssh_job_submission(&pool, &sub).await.unwrap();
        assert!(id.starts_with("SSH_"));

        let stored = get_ssh_job_submission(&pool, &id).await.unwrap();
        assert_eq!(stored.security_protocol, SecurityProtocol::SshKeys);
        assert_eq!(stored.ssh_port, Some(2222));
        assert_eq!(stored.monitor_mode, Some(MonitorMode::PollJobManager));
        assert!(stored.resource_job_manager.resource_job_manager_id.starts_with("RJM_"));
        assert_eq!(
            stored.resource_job_manager.job_manager_commands.get(&JobManagerCommand::Submission),
            Some(&"qsub".to_string())
        );

        let mut changed = stored.clone();
        changed.ssh_port = None;
        update_ssh_job_submission(&pool, &id, &changed).await.unwrap();
        assert_eq!(get_ssh_job_submission(&pool, &id).await.unwrap().ssh_port, None);
    }

    #[tokio::test]
    async fn test_local_submission_round_trip() {
        let pool = test_pool().await;
        let sub = LocalSubmission {
            job_submission_interface_id: String::new(),
            security_protocol: SecurityProtocol::LocalCredential,
            resource_job_manager: ResourceJobManager::new(ResourceJobManagerType::Fork),
        };
        let id = add_local_job_submission(&pool, &sub).await.unwrap();
        assert!(id.starts_with("LOCAL_"));

        let stored = get_local_job_submission(&pool, &id).await.unwrap();
        assert_eq!(
            stored.resource_job_manager.resource_job_manager_type,
            ResourceJobManagerType::Fork
        );
        assert!(update_local_job_submission(&pool, "missing", &sub)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_cloud_and_unicore_submissions() {
        let pool = test_pool().await;
        let cloud = CloudJobSubmission {
            job_submission_interface_id: String::new(),
            security_protocol: SecurityProtocol::SshKeys,
            node_id: "ami-12345".to_string(),
            executable_type: "docker".to_string(),
            provider_name: ProviderName::AwsEc2,
            user_account_name: "ubuntu".to_string(),
        };
        let id = add_cloud_job_submission(&pool, &cloud).await.unwrap();
        assert!(id.starts_with("Cloud_"));
        assert_eq!(
            get_cloud_job_submission(&pool, &id).await.unwrap().provider_name,
            ProviderName::AwsEc2
        );

        let unicore = UnicoreJobSubmission {
            job_submission_interface_id: String::new(),
            security_protocol: SecurityProtocol::Gsi,
            unicore_end_point_url: "https://unicore.example.org:8080".to_string(),
        };
        let id = add_unicore_job_submission(&pool, &unicore).await.unwrap();
        assert_eq!(
            get_unicore_job_submission(&pool, &id).await.unwrap().unicore_end_point_url,
            unicore.unicore_end_point_url
        );
    }

    #[tokio::test]
    async fn test_data_movements() {
        let pool = test_pool().await;

        let scp = ScpDataMovement {
            data_movement_interface_id: String::new(),
            security_protocol: SecurityProtocol::SshKeys,
            alternative_scp_host_name: None,
            ssh_port: Some(22),
        };
        let scp_id = add_scp_data_movement(&pool, &scp).await.unwrap();
        let mut changed = get_scp_data_movement(&pool, &scp_id).await.unwrap();
        changed.alternative_scp_host_name = Some("data.stampede".to_string());
        update_scp_data_movement(&pool, &scp_id, &changed).await.unwrap();
        assert_eq!(
            get_scp_data_movement(&pool, &scp_id)
                .await
                .unwrap()
                .alternative_scp_host_name
                .as_deref(),
            Some("data.stampede")
        );

        let gridftp = GridFtpDataMovement {
            data_movement_interface_id: String::new(),
            security_protocol: SecurityProtocol::Gsi,
            grid_ftp_end_points: vec![
                "gsiftp://a.example.org:2811".to_string(),
                "gsiftp://b.example.org:2811".to_string(),
            ],
        };
        let id = add_gridftp_data_movement(&pool, &gridftp).await.unwrap();
        assert!(id.starts_with("GRIDFTP_"));
        assert_eq!(
            get_gridftp_data_movement(&pool, &id).await.unwrap().grid_ftp_end_points,
            gridftp.grid_ftp_end_points
        );

        let local_id = add_local_data_movement(&pool, &LocalDataMovement {
            data_movement_interface_id: String::new(),
        })
        .await
        .unwrap();
        assert!(get_local_data_movement(&pool, &local_id).await.is_ok());
        assert!(get_local_data_movement(&pool, "nope").await.unwrap_err().is_not_found());
    }
}
