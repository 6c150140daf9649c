//! Group resource profile queries
//!
//! A group compute preference is stored as a common row plus one variant row
//! (`slurm_group_compute_preferences` or `aws_group_compute_preferences`)
//! chosen by its resource type. SLURM preferences also own provisioner
//! configs and reservations. All of these cascade from the common row, so
//! replacing a profile's preferences only has to delete the common rows.

use std::collections::HashSet;

use appcatalog_core::{
    is_unset_id, now_millis, BatchQueueResourcePolicy, ComputeResourcePolicy,
    ComputeResourceReservation, Error, GroupAccountSshProvisionerConfig,
    GroupComputeResourcePreference, GroupResourceProfile, ResourceType, Result,
    SlurmComputeResourcePreference, SpecificPreferences,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{validation, DbResultExt};
use crate::models::{
    AwsPreferenceRow, BatchQueuePolicyRow, ComputeResourcePolicyRow, GroupComputePreferenceRow,
    GroupProfileRow, ReservationRow, SlurmPreferenceRow,
};

fn id_or_uuid(id: &str) -> String {
    if is_unset_id(id) {
        Uuid::new_v4().to_string()
    } else {
        id.to_string()
    }
}

fn preference_key(compute_resource_id: &str, profile_id: &str) -> String {
    format!("{}/{}", profile_id, compute_resource_id)
}

async fn insert_compute_preference(
    conn: &mut SqliteConnection,
    profile_id: &str,
    pref: &GroupComputeResourcePreference,
) -> Result<()> {
    let compute_id = pref.compute_resource_id.as_str();

    sqlx::query(
        r#"
        INSERT INTO group_compute_preferences (
            compute_resource_id, group_resource_profile_id, resource_type, override_by_airavata,
            login_user_name, preferred_job_submission_protocol, preferred_data_movement_protocol,
            scratch_location, resource_specific_credential_store_token
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(compute_id)
    .bind(profile_id)
    .bind(pref.resource_type().as_str())
    .bind(pref.override_by_airavata)
    .bind(&pref.login_user_name)
    .bind(pref.preferred_job_submission_protocol.map(|p| p.as_str()))
    .bind(pref.preferred_data_movement_protocol.map(|p| p.as_str()))
    .bind(&pref.scratch_location)
    .bind(&pref.resource_specific_credential_store_token)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save group compute preference")?;

    match &pref.specific_preferences {
        Some(SpecificPreferences::Slurm(slurm)) => {
            insert_slurm_preference(&mut *conn, compute_id, profile_id, slurm).await?;
        }
        Some(SpecificPreferences::Aws(aws)) => {
            sqlx::query(
                r#"
                INSERT INTO aws_group_compute_preferences (
                    compute_resource_id, group_resource_profile_id, region, preferred_ami_id,
                    preferred_instance_type
                )
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(compute_id)
            .bind(profile_id)
            .bind(&aws.region)
            .bind(&aws.preferred_ami_id)
            .bind(&aws.preferred_instance_type)
            .execute(&mut *conn)
            .await
            .db_context("Failed to save AWS preference")?;
        }
        None => {}
    }
    Ok(())
}

async fn insert_slurm_preference(
    conn: &mut SqliteConnection,
    compute_id: &str,
    profile_id: &str,
    slurm: &SlurmComputeResourcePreference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO slurm_group_compute_preferences (
            compute_resource_id, group_resource_profile_id, allocation_project_number,
            preferred_batch_queue, quality_of_service, usage_reporting_gateway_id,
            ssh_account_provisioner, ssh_account_provisioner_additional_info
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(compute_id)
    .bind(profile_id)
    .bind(&slurm.allocation_project_number)
    .bind(&slurm.preferred_batch_queue)
    .bind(&slurm.quality_of_service)
    .bind(&slurm.usage_reporting_gateway_id)
    .bind(&slurm.ssh_account_provisioner)
    .bind(&slurm.ssh_account_provisioner_additional_info)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save SLURM preference")?;

    for config in &slurm.group_ssh_account_provisioner_configs {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO group_ssh_provisioner_configs (
                compute_resource_id, group_resource_profile_id, config_name, config_value
            )
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(compute_id)
        .bind(profile_id)
        .bind(&config.config_name)
        .bind(&config.config_value)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save SSH provisioner config")?;
    }

    for reservation in &slurm.reservations {
        let reservation_id = id_or_uuid(&reservation.reservation_id);
        sqlx::query(
            r#"
            INSERT INTO compute_resource_reservations (
                reservation_id, compute_resource_id, group_resource_profile_id,
                reservation_name, start_time, end_time
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reservation_id)
        .bind(compute_id)
        .bind(profile_id)
        .bind(&reservation.reservation_name)
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save reservation")?;

        for queue in &reservation.queue_names {
            sqlx::query(
                "INSERT OR IGNORE INTO compute_resource_reservation_queues (reservation_id, queue_name) VALUES (?, ?)",
            )
            .bind(&reservation_id)
            .bind(queue)
            .execute(&mut *conn)
            .await
            .db_context("Failed to save reservation queue")?;
        }
    }
    Ok(())
}

async fn insert_compute_resource_policy(
    conn: &mut SqliteConnection,
    profile_id: &str,
    policy: &ComputeResourcePolicy,
) -> Result<()> {
    let policy_id = id_or_uuid(&policy.resource_policy_id);
    sqlx::query(
        r#"
        INSERT INTO compute_resource_policies (
            resource_policy_id, compute_resource_id, group_resource_profile_id
        )
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&policy_id)
    .bind(&policy.compute_resource_id)
    .bind(profile_id)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save compute resource policy")?;

    for queue in &policy.allowed_batch_queues {
        sqlx::query(
            "INSERT OR IGNORE INTO compute_resource_policy_queues (resource_policy_id, queue_name) VALUES (?, ?)",
        )
        .bind(&policy_id)
        .bind(queue)
        .execute(&mut *conn)
        .await
        .db_context("Failed to save policy queue")?;
    }
    Ok(())
}

async fn insert_batch_queue_policy(
    conn: &mut SqliteConnection,
    profile_id: &str,
    policy: &BatchQueueResourcePolicy,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO batch_queue_resource_policies (
            resource_policy_id, compute_resource_id, group_resource_profile_id, queuename,
            max_allowed_nodes, max_allowed_cores, max_allowed_walltime
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id_or_uuid(&policy.resource_policy_id))
    .bind(&policy.compute_resource_id)
    .bind(profile_id)
    .bind(&policy.queuename)
    .bind(policy.max_allowed_nodes)
    .bind(policy.max_allowed_cores)
    .bind(policy.max_allowed_walltime)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save batch queue policy")?;
    Ok(())
}

async fn save_group_profile(
    conn: &mut SqliteConnection,
    profile_id: &str,
    profile: &GroupResourceProfile,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO group_resource_profiles (
            group_resource_profile_id, gateway_id, group_resource_profile_name,
            default_credential_store_token, creation_time, updated_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(group_resource_profile_id) DO UPDATE SET
            gateway_id = excluded.gateway_id,
            group_resource_profile_name = excluded.group_resource_profile_name,
            default_credential_store_token = excluded.default_credential_store_token,
            updated_time = excluded.updated_time
        "#,
    )
    .bind(profile_id)
    .bind(&profile.gateway_id)
    .bind(&profile.group_resource_profile_name)
    .bind(&profile.default_credential_store_token)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save group resource profile")?;

    for table in [
        "group_compute_preferences",
        "compute_resource_policies",
        "batch_queue_resource_policies",
    ] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE group_resource_profile_id = ?",
            table
        ))
        .bind(profile_id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear group profile children")?;
    }

    for pref in &profile.compute_preferences {
        insert_compute_preference(&mut *conn, profile_id, pref).await?;
    }
    for policy in &profile.compute_resource_policies {
        insert_compute_resource_policy(&mut *conn, profile_id, policy).await?;
    }
    for policy in &profile.batch_queue_resource_policies {
        insert_batch_queue_policy(&mut *conn, profile_id, policy).await?;
    }
    Ok(())
}

/// Create a group profile under a fresh UUID and return that id
#[instrument(skip(pool, profile), fields(gateway_id = %profile.gateway_id, name = %profile.group_resource_profile_name))]
pub async fn add_group_resource_profile(pool: &Pool<Sqlite>, profile: &GroupResourceProfile) -> Result<String> {
    validation(profile.validate())?;
    let id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_group_profile(&mut tx, &id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit group resource profile")?;

    info!(group_resource_profile_id = %id, "Group resource profile added");
    Ok(id)
}

/// Replace a group profile's fields, preferences and policies
///
/// The profile is identified by its own `group_resource_profile_id`.
#[instrument(skip(pool, profile), fields(group_resource_profile_id = %profile.group_resource_profile_id))]
pub async fn update_group_resource_profile(pool: &Pool<Sqlite>, profile: &GroupResourceProfile) -> Result<()> {
    validation(profile.validate())?;
    let id = profile.group_resource_profile_id.as_str();
    if !is_group_resource_profile_exists(pool, id).await? {
        return Err(Error::not_found("Group resource profile", id));
    }

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_group_profile(&mut tx, id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit group resource profile")?;

    info!("Group resource profile updated");
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_group_resource_profile(pool: &Pool<Sqlite>, id: &str) -> Result<GroupResourceProfile> {
    let row = sqlx::query_as::<_, GroupProfileRow>(
        r#"
        SELECT group_resource_profile_id, gateway_id, group_resource_profile_name,
               default_credential_store_token, creation_time, updated_time
        FROM group_resource_profiles
        WHERE group_resource_profile_id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get group resource profile")?
    .ok_or_else(|| Error::not_found("Group resource profile", id))?;

    let mut profile = row.into_profile();
    profile.compute_preferences = get_all_group_compute_resource_preferences(pool, id).await?;
    profile.compute_resource_policies = get_all_group_compute_resource_policies(pool, id).await?;
    profile.batch_queue_resource_policies = get_all_group_batch_queue_resource_policies(pool, id).await?;
    Ok(profile)
}

/// Profiles of a gateway restricted to the ids the caller may see
#[instrument(skip(pool, accessible_ids), fields(accessible = accessible_ids.len()))]
pub async fn get_all_group_resource_profiles(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    accessible_ids: &[String],
) -> Result<Vec<GroupResourceProfile>> {
    if accessible_ids.is_empty() {
        return Ok(Vec::new());
    }
    let accessible: HashSet<&str> = accessible_ids.iter().map(String::as_str).collect();

    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT group_resource_profile_id
        FROM group_resource_profiles
        WHERE gateway_id = ?
        ORDER BY group_resource_profile_name
        "#,
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list group resource profiles")?;

    let mut profiles = Vec::new();
    for id in ids.iter().filter(|id| accessible.contains(id.as_str())) {
        profiles.push(get_group_resource_profile(pool, id).await?);
    }
    Ok(profiles)
}

#[instrument(skip(pool))]
pub async fn is_group_resource_profile_exists(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM group_resource_profiles WHERE group_resource_profile_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .db_context("Failed to check group resource profile")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_group_resource_profile(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM group_resource_profiles WHERE group_resource_profile_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .db_context("Failed to delete group resource profile")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Group resource profile", id));
    }
    info!(group_resource_profile_id = %id, "Group resource profile removed");
    Ok(())
}

async fn load_slurm_preference(
    pool: &Pool<Sqlite>,
    compute_id: &str,
    profile_id: &str,
) -> Result<Option<SlurmComputeResourcePreference>> {
    let Some(row) = sqlx::query_as::<_, SlurmPreferenceRow>(
        r#"
        SELECT allocation_project_number, preferred_batch_queue, quality_of_service,
               usage_reporting_gateway_id, ssh_account_provisioner,
               ssh_account_provisioner_additional_info
        FROM slurm_group_compute_preferences
        WHERE compute_resource_id = ? AND group_resource_profile_id = ?
        "#,
    )
    .bind(compute_id)
    .bind(profile_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get SLURM preference")?
    else {
        return Ok(None);
    };

    let configs: Vec<(String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT config_name, config_value
        FROM group_ssh_provisioner_configs
        WHERE compute_resource_id = ? AND group_resource_profile_id = ?
        ORDER BY config_name
        "#,
    )
    .bind(compute_id)
    .bind(profile_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get SSH provisioner configs")?;

    let reservation_rows = sqlx::query_as::<_, ReservationRow>(
        r#"
        SELECT reservation_id, reservation_name, start_time, end_time
        FROM compute_resource_reservations
        WHERE compute_resource_id = ? AND group_resource_profile_id = ?
        ORDER BY start_time, reservation_name
        "#,
    )
    .bind(compute_id)
    .bind(profile_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get reservations")?;

    let mut reservations = Vec::with_capacity(reservation_rows.len());
    for row in reservation_rows {
        let queue_names: Vec<String> = sqlx::query_scalar(
            "SELECT queue_name FROM compute_resource_reservation_queues WHERE reservation_id = ? ORDER BY queue_name",
        )
        .bind(&row.reservation_id)
        .fetch_all(pool)
        .await
        .db_context("Failed to get reservation queues")?;
        reservations.push(ComputeResourceReservation {
            reservation_id: row.reservation_id,
            reservation_name: row.reservation_name,
            queue_names,
            start_time: row.start_time,
            end_time: row.end_time,
        });
    }

    Ok(Some(SlurmComputeResourcePreference {
        allocation_project_number: row.allocation_project_number,
        preferred_batch_queue: row.preferred_batch_queue,
        quality_of_service: row.quality_of_service,
        usage_reporting_gateway_id: row.usage_reporting_gateway_id,
        ssh_account_provisioner: row.ssh_account_provisioner,
        group_ssh_account_provisioner_configs: configs
            .into_iter()
            .map(|(config_name, config_value)| GroupAccountSshProvisionerConfig {
                resource_id: compute_id.to_string(),
                group_resource_profile_id: profile_id.to_string(),
                config_name,
                config_value,
            })
            .collect(),
        ssh_account_provisioner_additional_info: row.ssh_account_provisioner_additional_info,
        reservations,
    }))
}

/// Attach the variant row matching the stored resource type
async fn load_preference(
    pool: &Pool<Sqlite>,
    row: GroupComputePreferenceRow,
) -> Result<GroupComputeResourcePreference> {
    let resource_type: ResourceType = row.resource_type.parse()?;
    let mut pref = row.into_preference()?;
    let compute_id = pref.compute_resource_id.clone();
    let profile_id = pref.group_resource_profile_id.clone();

    pref.specific_preferences = match resource_type {
        ResourceType::Slurm => load_slurm_preference(pool, &compute_id, &profile_id)
            .await?
            .map(SpecificPreferences::Slurm),
        ResourceType::Aws => sqlx::query_as::<_, AwsPreferenceRow>(
            r#"
            SELECT region, preferred_ami_id, preferred_instance_type
            FROM aws_group_compute_preferences
            WHERE compute_resource_id = ? AND group_resource_profile_id = ?
            "#,
        )
        .bind(&compute_id)
        .bind(&profile_id)
        .fetch_optional(pool)
        .await
        .db_context("Failed to get AWS preference")?
        .map(|row| SpecificPreferences::Aws(row.into())),
    };

    if pref.specific_preferences.is_none() {
        warn!(
            compute_resource_id = %compute_id,
            group_resource_profile_id = %profile_id,
            resource_type = %resource_type,
            "Group compute preference has no variant row"
        );
    }
    Ok(pref)
}

#[instrument(skip(pool))]
pub async fn get_group_compute_resource_preference(
    pool: &Pool<Sqlite>,
    compute_resource_id: &str,
    group_resource_profile_id: &str,
) -> Result<GroupComputeResourcePreference> {
    let row = sqlx::query_as::<_, GroupComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, group_resource_profile_id, resource_type, override_by_airavata,
               login_user_name, preferred_job_submission_protocol, preferred_data_movement_protocol,
               scratch_location, resource_specific_credential_store_token
        FROM group_compute_preferences
        WHERE compute_resource_id = ? AND group_resource_profile_id = ?
        "#,
    )
    .bind(compute_resource_id)
    .bind(group_resource_profile_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get group compute preference")?
    .ok_or_else(|| {
        Error::not_found(
            "Group compute resource preference",
            preference_key(compute_resource_id, group_resource_profile_id),
        )
    })?;
    load_preference(pool, row).await
}

#[instrument(skip(pool))]
pub async fn get_all_group_compute_resource_preferences(
    pool: &Pool<Sqlite>,
    group_resource_profile_id: &str,
) -> Result<Vec<GroupComputeResourcePreference>> {
    let rows = sqlx::query_as::<_, GroupComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, group_resource_profile_id, resource_type, override_by_airavata,
               login_user_name, preferred_job_submission_protocol, preferred_data_movement_protocol,
               scratch_location, resource_specific_credential_store_token
        FROM group_compute_preferences
        WHERE group_resource_profile_id = ?
        ORDER BY compute_resource_id
        "#,
    )
    .bind(group_resource_profile_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list group compute preferences")?;

    let mut prefs = Vec::with_capacity(rows.len());
    for row in rows {
        prefs.push(load_preference(pool, row).await?);
    }
    Ok(prefs)
}

#[instrument(skip(pool))]
pub async fn is_group_compute_resource_preference_exists(
    pool: &Pool<Sqlite>,
    compute_resource_id: &str,
    group_resource_profile_id: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM group_compute_preferences WHERE compute_resource_id = ? AND group_resource_profile_id = ?",
    )
    .bind(compute_resource_id)
    .bind(group_resource_profile_id)
    .fetch_one(pool)
    .await
    .db_context("Failed to check group compute preference")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_group_compute_resource_preference(
    pool: &Pool<Sqlite>,
    compute_resource_id: &str,
    group_resource_profile_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM group_compute_preferences WHERE compute_resource_id = ? AND group_resource_profile_id = ?",
    )
    .bind(compute_resource_id)
    .bind(group_resource_profile_id)
    .execute(pool)
    .await
    .db_context("Failed to delete group compute preference")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "Group compute resource preference",
            preference_key(compute_resource_id, group_resource_profile_id),
        ));
    }
    Ok(())
}

async fn load_compute_resource_policy(
    pool: &Pool<Sqlite>,
    row: ComputeResourcePolicyRow,
) -> Result<ComputeResourcePolicy> {
    let allowed_batch_queues: Vec<String> = sqlx::query_scalar(
        "SELECT queue_name FROM compute_resource_policy_queues WHERE resource_policy_id = ? ORDER BY queue_name",
    )
    .bind(&row.resource_policy_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to get policy queues")?;

    Ok(ComputeResourcePolicy {
        resource_policy_id: row.resource_policy_id,
        compute_resource_id: row.compute_resource_id,
        group_resource_profile_id: row.group_resource_profile_id,
        allowed_batch_queues,
    })
}

#[instrument(skip(pool))]
pub async fn get_compute_resource_policy(pool: &Pool<Sqlite>, policy_id: &str) -> Result<ComputeResourcePolicy> {
    let row = sqlx::query_as::<_, ComputeResourcePolicyRow>(
        r#"
        SELECT resource_policy_id, compute_resource_id, group_resource_profile_id
        FROM compute_resource_policies
        WHERE resource_policy_id = ?
        "#,
    )
    .bind(policy_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get compute resource policy")?
    .ok_or_else(|| Error::not_found("Compute resource policy", policy_id))?;
    load_compute_resource_policy(pool, row).await
}

#[instrument(skip(pool))]
pub async fn get_all_group_compute_resource_policies(
    pool: &Pool<Sqlite>,
    group_resource_profile_id: &str,
) -> Result<Vec<ComputeResourcePolicy>> {
    let rows = sqlx::query_as::<_, ComputeResourcePolicyRow>(
        r#"
        SELECT resource_policy_id, compute_resource_id, group_resource_profile_id
        FROM compute_resource_policies
        WHERE group_resource_profile_id = ?
        ORDER BY compute_resource_id, resource_policy_id
        "#,
    )
    .bind(group_resource_profile_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list compute resource policies")?;

    let mut policies = Vec::with_capacity(rows.len());
    for row in rows {
        policies.push(load_compute_resource_policy(pool, row).await?);
    }
    Ok(policies)
}

#[instrument(skip(pool))]
pub async fn remove_compute_resource_policy(pool: &Pool<Sqlite>, policy_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM compute_resource_policies WHERE resource_policy_id = ?")
        .bind(policy_id)
        .execute(pool)
        .await
        .db_context("Failed to delete compute resource policy")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Compute resource policy", policy_id));
    }
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_batch_queue_resource_policy(
    pool: &Pool<Sqlite>,
    policy_id: &str,
) -> Result<BatchQueueResourcePolicy> {
    let row = sqlx::query_as::<_, BatchQueuePolicyRow>(
        r#"
        SELECT resource_policy_id, compute_resource_id, group_resource_profile_id, queuename,
               max_allowed_nodes, max_allowed_cores, max_allowed_walltime
        FROM batch_queue_resource_policies
        WHERE resource_policy_id = ?
        "#,
    )
    .bind(policy_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get batch queue policy")?
    .ok_or_else(|| Error::not_found("Batch queue resource policy", policy_id))?;
    Ok(row.into())
}

#[instrument(skip(pool))]
pub async fn get_all_group_batch_queue_resource_policies(
    pool: &Pool<Sqlite>,
    group_resource_profile_id: &str,
) -> Result<Vec<BatchQueueResourcePolicy>> {
    let rows = sqlx::query_as::<_, BatchQueuePolicyRow>(
        r#"
        SELECT resource_policy_id, compute_resource_id, group_resource_profile_id, queuename,
               max_allowed_nodes, max_allowed_cores, max_allowed_walltime
        FROM batch_queue_resource_policies
        WHERE group_resource_profile_id = ?
        ORDER BY compute_resource_id, queuename
        "#,
    )
    .bind(group_resource_profile_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list batch queue policies")?;
    Ok(rows.into_iter().map(BatchQueueResourcePolicy::from).collect())
}

#[instrument(skip(pool))]
pub async fn remove_batch_queue_resource_policy(pool: &Pool<Sqlite>, policy_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM batch_queue_resource_policies WHERE resource_policy_id = ?")
        .bind(policy_id)
        .execute(pool)
        .await
        .db_context("Failed to delete batch queue policy")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Batch queue resource policy", policy_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{add_compute_resource, remove_compute_resource};
    use crate::test_pool;
    use appcatalog_core::{AwsComputeResourcePreference, ComputeResourceDescription, JobSubmissionProtocol};

    const GATEWAY: &str = "seagrid";

    async fn compute(pool: &Pool<Sqlite>, id: &str) -> String {
        let mut desc = ComputeResourceDescription::new(format!("{}.example.org", id));
        desc.compute_resource_id = id.to_string();
        add_compute_resource(pool, &desc).await.unwrap()
    }

    fn slurm_pref(compute_id: &str) -> GroupComputeResourcePreference {
        GroupComputeResourcePreference {
            compute_resource_id: compute_id.to_string(),
            override_by_airavata: true,
            login_user_name: Some("gwuser".to_string()),
            preferred_job_submission_protocol: Some(JobSubmissionProtocol::Ssh),
            specific_preferences: Some(SpecificPreferences::Slurm(SlurmComputeResourcePreference {
                allocation_project_number: Some("TG-CHE0001".to_string()),
                preferred_batch_queue: Some("compute".to_string()),
                ssh_account_provisioner: Some("IULdapSSHAccountProvisioner".to_string()),
                group_ssh_account_provisioner_configs: vec![GroupAccountSshProvisionerConfig {
                    config_name: "ldap-host".to_string(),
                    config_value: Some("ldap.example.org".to_string()),
                    ..Default::default()
                }],
                reservations: vec![ComputeResourceReservation {
                    reservation_name: "workshop".to_string(),
                    queue_names: vec!["compute".to_string(), "shared".to_string()],
                    start_time: 1_000,
                    end_time: 2_000,
                    ..Default::default()
                }],
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    fn aws_pref(compute_id: &str) -> GroupComputeResourcePreference {
        GroupComputeResourcePreference {
            compute_resource_id: compute_id.to_string(),
            specific_preferences: Some(SpecificPreferences::Aws(AwsComputeResourcePreference {
                region: Some("us-east-1".to_string()),
                preferred_ami_id: Some("ami-0abc".to_string()),
                preferred_instance_type: Some("t3.large".to_string()),
            })),
            ..Default::default()
        }
    }

    fn profile(comet: &str, ec2: &str) -> GroupResourceProfile {
        GroupResourceProfile {
            gateway_id: GATEWAY.to_string(),
            group_resource_profile_name: "Default".to_string(),
            compute_preferences: vec![slurm_pref(comet), aws_pref(ec2)],
            compute_resource_policies: vec![ComputeResourcePolicy {
                compute_resource_id: comet.to_string(),
                allowed_batch_queues: vec!["compute".to_string()],
                ..Default::default()
            }],
            batch_queue_resource_policies: vec![BatchQueueResourcePolicy {
                compute_resource_id: comet.to_string(),
                queuename: "compute".to_string(),
                max_allowed_nodes: Some(4),
                max_allowed_walltime: Some(120),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_variants_round_trip() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let ec2 = compute(&pool, "ec2").await;

        let id = add_group_resource_profile(&pool, &profile(&comet, &ec2)).await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());

        let stored = get_group_resource_profile(&pool, &id).await.unwrap();
        assert_eq!(stored.group_resource_profile_id, id);
        assert!(stored.creation_time.is_some());
        assert_eq!(stored.compute_preferences.len(), 2);

        let comet_pref = get_group_compute_resource_preference(&pool, &comet, &id).await.unwrap();
        assert_eq!(comet_pref.group_resource_profile_id, id);
        let slurm = comet_pref.slurm().unwrap();
        assert_eq!(slurm.allocation_project_number.as_deref(), Some("TG-CHE0001"));
        assert_eq!(slurm.group_ssh_account_provisioner_configs.len(), 1);
        assert_eq!(slurm.group_ssh_account_provisioner_configs[0].resource_id, comet);
        assert_eq!(slurm.reservations.len(), 1);
        assert!(!is_unset_id(&slurm.reservations[0].reservation_id));
        assert_eq!(slurm.reservations[0].queue_names, vec!["compute", "shared"]);

        let ec2_pref = get_group_compute_resource_preference(&pool, &ec2, &id).await.unwrap();
        assert_eq!(ec2_pref.resource_type(), ResourceType::Aws);
        assert_eq!(ec2_pref.aws().unwrap().preferred_instance_type.as_deref(), Some("t3.large"));

        let policies = get_all_group_compute_resource_policies(&pool, &id).await.unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].allowed_batch_queues, vec!["compute"]);
        let policy = get_compute_resource_policy(&pool, &policies[0].resource_policy_id)
            .await
            .unwrap();
        assert_eq!(policy.group_resource_profile_id, id);

        let bq = get_all_group_batch_queue_resource_policies(&pool, &id).await.unwrap();
        assert_eq!(bq[0].max_allowed_nodes, Some(4));
    }

    #[tokio::test]
    async fn test_update_replaces_preferences() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let ec2 = compute(&pool, "ec2").await;
        let id = add_group_resource_profile(&pool, &profile(&comet, &ec2)).await.unwrap();

        let mut changed = get_group_resource_profile(&pool, &id).await.unwrap();
        changed.group_resource_profile_name = "Renamed".to_string();
        changed.compute_preferences.retain(|p| p.compute_resource_id == ec2);
        changed.batch_queue_resource_policies.clear();
        update_group_resource_profile(&pool, &changed).await.unwrap();

        let stored = get_group_resource_profile(&pool, &id).await.unwrap();
        assert_eq!(stored.group_resource_profile_name, "Renamed");
        assert_eq!(stored.compute_preferences.len(), 1);
        assert!(stored.batch_queue_resource_policies.is_empty());
        assert_eq!(stored.compute_resource_policies.len(), 1);
        assert!(!is_group_compute_resource_preference_exists(&pool, &comet, &id)
            .await
            .unwrap());

        let reservations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM compute_resource_reservations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(reservations, 0);
    }

    #[tokio::test]
    async fn test_accessible_listing() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let ec2 = compute(&pool, "ec2").await;
        let first = add_group_resource_profile(&pool, &profile(&comet, &ec2)).await.unwrap();
        let second = add_group_resource_profile(&pool, &profile(&comet, &ec2)).await.unwrap();

        assert!(get_all_group_resource_profiles(&pool, GATEWAY, &[]).await.unwrap().is_empty());
        let visible = get_all_group_resource_profiles(&pool, GATEWAY, &[second.clone()])
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].group_resource_profile_id, second);

        let both = vec![first, second];
        let all = get_all_group_resource_profiles(&pool, GATEWAY, &both).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(get_all_group_resource_profiles(&pool, "other", &both)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_removals() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let ec2 = compute(&pool, "ec2").await;
        let id = add_group_resource_profile(&pool, &profile(&comet, &ec2)).await.unwrap();

        let policy_id = get_all_group_compute_resource_policies(&pool, &id).await.unwrap()[0]
            .resource_policy_id
            .clone();
        remove_compute_resource_policy(&pool, &policy_id).await.unwrap();
        assert!(get_compute_resource_policy(&pool, &policy_id)
            .await
            .unwrap_err()
            .is_not_found());

        let bq_id = get_all_group_batch_queue_resource_policies(&pool, &id).await.unwrap()[0]
            .resource_policy_id
            .clone();
        remove_batch_queue_resource_policy(&pool, &bq_id).await.unwrap();
        assert!(get_batch_queue_resource_policy(&pool, &bq_id).await.is_err());

        remove_group_compute_resource_preference(&pool, &ec2, &id).await.unwrap();
        remove_compute_resource(&pool, &comet).await.unwrap();
        assert!(get_all_group_compute_resource_preferences(&pool, &id)
            .await
            .unwrap()
            .is_empty());

        remove_group_resource_profile(&pool, &id).await.unwrap();
        assert!(!is_group_resource_profile_exists(&pool, &id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_unknown_profile() {
        let pool = test_pool().await;
        let mut profile = GroupResourceProfile {
            gateway_id: GATEWAY.to_string(),
            group_resource_profile_name: "Ghost".to_string(),
            ..Default::default()
        };
        profile.group_resource_profile_id = "missing".to_string();
        assert!(update_group_resource_profile(&pool, &profile)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
