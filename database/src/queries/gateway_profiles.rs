//! Gateway resource profile queries

use appcatalog_core::{
    now_millis, ComputeResourcePreference, Error, GatewayResourceProfile, Result,
    StoragePreference,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::DbResultExt;
use crate::models::{GatewayComputePreferenceRow, GatewayProfileRow, StoragePreferenceRow};

async fn upsert_compute_preference(
    conn: &mut SqliteConnection,
    gateway_id: &str,
    pref: &ComputeResourcePreference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gateway_compute_preferences (
            gateway_id, compute_resource_id, override_by_airavata, login_user_name,
            preferred_job_submission_protocol, preferred_data_movement_protocol,
            preferred_batch_queue, scratch_location, allocation_project_number,
            resource_specific_credential_store_token, usage_reporting_gateway_id,
            quality_of_service, reservation, reservation_start_time, reservation_end_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(gateway_id, compute_resource_id) DO UPDATE SET
            override_by_airavata = excluded.override_by_airavata,
            login_user_name = excluded.login_user_name,
            preferred_job_submission_protocol = excluded.preferred_job_submission_protocol,
            preferred_data_movement_protocol = excluded.preferred_data_movement_protocol,
            preferred_batch_queue = excluded.preferred_batch_queue,
            scratch_location = excluded.scratch_location,
            allocation_project_number = excluded.allocation_project_number,
            resource_specific_credential_store_token = excluded.resource_specific_credential_store_token,
            usage_reporting_gateway_id = excluded.usage_reporting_gateway_id,
            quality_of_service = excluded.quality_of_service,
            reservation = excluded.reservation,
            reservation_start_time = excluded.reservation_start_time,
            reservation_end_time = excluded.reservation_end_time
        "#,
    )
    .bind(gateway_id)
    .bind(&pref.compute_resource_id)
    .bind(pref.override_by_airavata)
    .bind(&pref.login_user_name)
    .bind(pref.preferred_job_submission_protocol.map(|p| p.as_str()))
    .bind(pref.preferred_data_movement_protocol.map(|p| p.as_str()))
    .bind(&pref.preferred_batch_queue)
    .bind(&pref.scratch_location)
    .bind(&pref.allocation_project_number)
    .bind(&pref.resource_specific_credential_store_token)
    .bind(&pref.usage_reporting_gateway_id)
    .bind(&pref.quality_of_service)
    .bind(&pref.reservation)
    .bind(pref.reservation_start_time)
    .bind(pref.reservation_end_time)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save gateway compute preference")?;
    Ok(())
}

async fn upsert_storage_preference(
    conn: &mut SqliteConnection,
    gateway_id: &str,
    pref: &StoragePreference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gateway_storage_preferences (
            gateway_id, storage_resource_id, login_user_name, file_system_root_location,
            resource_specific_credential_store_token
        )
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(gateway_id, storage_resource_id) DO UPDATE SET
            login_user_name = excluded.login_user_name,
            file_system_root_location = excluded.file_system_root_location,
            resource_specific_credential_store_token = excluded.resource_specific_credential_store_token
        "#,
    )
    .bind(gateway_id)
    .bind(&pref.storage_resource_id)
    .bind(&pref.login_user_name)
    .bind(&pref.file_system_root_location)
    .bind(&pref.resource_specific_credential_store_token)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save gateway storage preference")?;
    Ok(())
}

async fn save_gateway_profile(
    conn: &mut SqliteConnection,
    gateway_id: &str,
    profile: &GatewayResourceProfile,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO gateway_profiles (
            gateway_id, credential_store_token, identity_server_tenant,
            identity_server_pwd_cred_token, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(gateway_id) DO UPDATE SET
            credential_store_token = excluded.credential_store_token,
            identity_server_tenant = excluded.identity_server_tenant,
            identity_server_pwd_cred_token = excluded.identity_server_pwd_cred_token,
            update_time = excluded.update_time
        "#,
    )
    .bind(gateway_id)
    .bind(&profile.credential_store_token)
    .bind(&profile.identity_server_tenant)
    .bind(&profile.identity_server_pwd_cred_token)
    .bind(profile.creation_time.unwrap_or(now))
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save gateway profile")?;

    sqlx::query("DELETE FROM gateway_compute_preferences WHERE gateway_id = ?")
        .bind(gateway_id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear gateway compute preferences")?;
    sqlx::query("DELETE FROM gateway_storage_preferences WHERE gateway_id = ?")
        .bind(gateway_id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear gateway storage preferences")?;

    for pref in &profile.compute_resource_preferences {
        upsert_compute_preference(&mut *conn, gateway_id, pref).await?;
    }
    for pref in &profile.storage_preferences {
        upsert_storage_preference(&mut *conn, gateway_id, pref).await?;
    }
    Ok(())
}

/// Register a gateway profile with its preferences, returning the gateway id
#[instrument(skip(pool, profile), fields(gateway_id = %profile.gateway_id))]
pub async fn add_gateway_resource_profile(
    pool: &Pool<Sqlite>,
    profile: &GatewayResourceProfile,
) -> Result<String> {
    if profile.gateway_id.trim().is_empty() {
        return Err(Error::ValidationError("Gateway id cannot be empty".to_string()));
    }

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_gateway_profile(&mut tx, &profile.gateway_id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit gateway profile")?;

    info!("Gateway resource profile added");
    Ok(profile.gateway_id.clone())
}

/// Replace a gateway profile's fields and both preference lists
#[instrument(skip(pool, profile))]
pub async fn update_gateway_resource_profile(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    profile: &GatewayResourceProfile,
) -> Result<()> {
    if !is_gateway_resource_profile_exists(pool, gateway_id).await? {
        return Err(Error::not_found("Gateway resource profile", gateway_id));
    }
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_gateway_profile(&mut tx, gateway_id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit gateway profile")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_gateway_profile(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<GatewayResourceProfile> {
    let row = sqlx::query_as::<_, GatewayProfileRow>(
        r#"
        SELECT gateway_id, credential_store_token, identity_server_tenant,
               identity_server_pwd_cred_token, creation_time, update_time
        FROM gateway_profiles
        WHERE gateway_id = ?
        "#,
    )
    .bind(gateway_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get gateway profile")?
    .ok_or_else(|| Error::not_found("Gateway resource profile", gateway_id))?;

    let mut profile = row.into_profile();
    profile.compute_resource_preferences = get_all_compute_resource_preferences(pool, gateway_id).await?;
    profile.storage_preferences = get_all_storage_preferences(pool, gateway_id).await?;
    Ok(profile)
}

#[instrument(skip(pool))]
pub async fn get_all_gateway_profiles(pool: &Pool<Sqlite>) -> Result<Vec<GatewayResourceProfile>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT gateway_id FROM gateway_profiles ORDER BY gateway_id")
        .fetch_all(pool)
        .await
        .db_context("Failed to list gateway profiles")?;

    let mut profiles = Vec::with_capacity(ids.len());
    for id in ids {
        profiles.push(get_gateway_profile(pool, &id).await?);
    }
    Ok(profiles)
}

#[instrument(skip(pool))]
pub async fn is_gateway_resource_profile_exists(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gateway_profiles WHERE gateway_id = ?")
        .bind(gateway_id)
        .fetch_one(pool)
        .await
        .db_context("Failed to check gateway profile")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_gateway_resource_profile(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM gateway_profiles WHERE gateway_id = ?")
        .bind(gateway_id)
        .execute(pool)
        .await
        .db_context("Failed to delete gateway profile")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("Gateway resource profile", gateway_id));
    }
    info!(gateway_id = %gateway_id, "Gateway resource profile removed");
    Ok(())
}

/// Add a compute preference to an existing gateway profile
#[instrument(skip(pool, pref), fields(compute_resource_id = %pref.compute_resource_id))]
pub async fn add_gateway_compute_resource_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    pref: &ComputeResourcePreference,
) -> Result<()> {
    if !is_gateway_resource_profile_exists(pool, gateway_id).await? {
        return Err(Error::not_found("Gateway resource profile", gateway_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_compute_preference(&mut conn, gateway_id, pref).await
}

#[instrument(skip(pool, pref))]
pub async fn update_gateway_compute_resource_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    compute_resource_id: &str,
    pref: &ComputeResourcePreference,
) -> Result<()> {
    // Confirms the preference exists
    get_gateway_compute_resource_preference(pool, gateway_id, compute_resource_id).await?;

    let mut pref = pref.clone();
    pref.compute_resource_id = compute_resource_id.to_string();
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_compute_preference(&mut conn, gateway_id, &pref).await
}

#[instrument(skip(pool))]
pub async fn get_gateway_compute_resource_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    compute_resource_id: &str,
) -> Result<ComputeResourcePreference> {
    sqlx::query_as::<_, GatewayComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, override_by_airavata, login_user_name,
               preferred_job_submission_protocol, preferred_data_movement_protocol,
               preferred_batch_queue, scratch_location, allocation_project_number,
               resource_specific_credential_store_token, usage_reporting_gateway_id,
               quality_of_service, reservation, reservation_start_time, reservation_end_time
        FROM gateway_compute_preferences
        WHERE gateway_id = ? AND compute_resource_id = ?
        "#,
    )
    .bind(gateway_id)
    .bind(compute_resource_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get gateway compute preference")?
    .ok_or_else(|| {
        Error::not_found(
            "Compute resource preference",
            format!("{}/{}", gateway_id, compute_resource_id),
        )
    })?
    .into_preference()
}

#[instrument(skip(pool))]
pub async fn get_all_compute_resource_preferences(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<Vec<ComputeResourcePreference>> {
    sqlx::query_as::<_, GatewayComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, override_by_airavata, login_user_name,
               preferred_job_submission_protocol, preferred_data_movement_protocol,
               preferred_batch_queue, scratch_location, allocation_project_number,
               resource_specific_credential_store_token, usage_reporting_gateway_id,
               quality_of_service, reservation, reservation_start_time, reservation_end_time
        FROM gateway_compute_preferences
        WHERE gateway_id = ?
        ORDER BY compute_resource_id
        "#,
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list gateway compute preferences")?
    .into_iter()
    .map(GatewayComputePreferenceRow::into_preference)
    .collect()
}

#[instrument(skip(pool))]
pub async fn remove_gateway_compute_resource_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    compute_resource_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM gateway_compute_preferences WHERE gateway_id = ? AND compute_resource_id = ?",
    )
    .bind(gateway_id)
    .bind(compute_resource_id)
    .execute(pool)
    .await
    .db_context("Failed to delete gateway compute preference")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "Compute resource preference",
            format!("{}/{}", gateway_id, compute_resource_id),
        ));
    }
    Ok(())
}

/// Add a storage preference to an existing gateway profile
#[instrument(skip(pool, pref), fields(storage_resource_id = %pref.storage_resource_id))]
pub async fn add_gateway_storage_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    pref: &StoragePreference,
) -> Result<()> {
    if !is_gateway_resource_profile_exists(pool, gateway_id).await? {
        return Err(Error::not_found("Gateway resource profile", gateway_id));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_storage_preference(&mut conn, gateway_id, pref).await
}

#[instrument(skip(pool, pref))]
pub async fn update_gateway_storage_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    storage_resource_id: &str,
    pref: &StoragePreference,
) -> Result<()> {
    get_gateway_storage_preference(pool, gateway_id, storage_resource_id).await?;

    let mut pref = pref.clone();
    pref.storage_resource_id = storage_resource_id.to_string();
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_storage_preference(&mut conn, gateway_id, &pref).await
}

#[instrument(skip(pool))]
pub async fn get_gateway_storage_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    storage_resource_id: &str,
) -> Result<StoragePreference> {
    let row = sqlx::query_as::<_, StoragePreferenceRow>(
        r#"
        SELECT storage_resource_id, login_user_name, file_system_root_location,
               resource_specific_credential_store_token
        FROM gateway_storage_preferences
        WHERE gateway_id = ? AND storage_resource_id = ?
        "#,
    )
    .bind(gateway_id)
    .bind(storage_resource_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get gateway storage preference")?
    .ok_or_else(|| {
        Error::not_found(
            "Storage preference",
            format!("{}/{}", gateway_id, storage_resource_id),
        )
    })?;
    Ok(row.into())
}

#[instrument(skip(pool))]
pub async fn get_all_storage_preferences(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
) -> Result<Vec<StoragePreference>> {
    let rows = sqlx::query_as::<_, StoragePreferenceRow>(
        r#"
        SELECT storage_resource_id, login_user_name, file_system_root_location,
               resource_specific_credential_store_token
        FROM gateway_storage_preferences
        WHERE gateway_id = ?
        ORDER BY storage_resource_id
        "#,
    )
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list gateway storage preferences")?;
    Ok(rows.into_iter().map(StoragePreference::from).collect())
}

#[instrument(skip(pool))]
pub async fn remove_gateway_storage_preference(
    pool: &Pool<Sqlite>,
    gateway_id: &str,
    storage_resource_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM gateway_storage_preferences WHERE gateway_id = ? AND storage_resource_id = ?",
    )
    .bind(gateway_id)
    .bind(storage_resource_id)
    .execute(pool)
    .await
    .db_context("Failed to delete gateway storage preference")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "Storage preference",
            format!("{}/{}", gateway_id, storage_resource_id),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::add_compute_resource;
    use crate::test_pool;
    use appcatalog_core::{ComputeResourceDescription, JobSubmissionProtocol};

    async fn compute(pool: &Pool<Sqlite>, id: &str) -> String {
        let mut desc = ComputeResourceDescription::new(format!("{}.example.org", id));
        desc.compute_resource_id = id.to_string();
        add_compute_resource(pool, &desc).await.unwrap()
    }

    fn profile(compute_id: &str) -> GatewayResourceProfile {
        let mut pref = ComputeResourcePreference::new(compute_id);
        pref.login_user_name = Some("gwuser".to_string());
        pref.preferred_job_submission_protocol = Some(JobSubmissionProtocol::Ssh);
        pref.preferred_batch_queue = Some("normal".to_string());

        let mut profile = GatewayResourceProfile::new("seagrid");
        profile.credential_store_token = Some("token-1".to_string());
        profile.compute_resource_preferences.push(pref);
        profile.storage_preferences.push(StoragePreference {
            storage_resource_id: "data".to_string(),
            file_system_root_location: Some("/data/gateway".to_string()),
            ..Default::default()
        });
        profile
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let pool = test_pool().await;
        let compute_id = compute(&pool, "comet").await;
        let profile = profile(&compute_id);

        let id = add_gateway_resource_profile(&pool, &profile).await.unwrap();
        assert_eq!(id, "seagrid");

        let stored = get_gateway_profile(&pool, &id).await.unwrap();
        assert_eq!(stored.credential_store_token.as_deref(), Some("token-1"));
        assert_eq!(stored.compute_resource_preferences, profile.compute_resource_preferences);
        assert_eq!(stored.storage_preferences, profile.storage_preferences);
        assert!(stored.creation_time.is_some());
        assert_eq!(get_all_gateway_profiles(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_gateway_id_rejected() {
        let pool = test_pool().await;
        let err = add_gateway_resource_profile(&pool, &GatewayResourceProfile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_preferences() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let stampede = compute(&pool, "stampede").await;
        add_gateway_resource_profile(&pool, &profile(&comet)).await.unwrap();

        let mut changed = get_gateway_profile(&pool, "seagrid").await.unwrap();
        changed.compute_resource_preferences = vec![ComputeResourcePreference::new(&stampede)];
        changed.storage_preferences.clear();
        update_gateway_resource_profile(&pool, "seagrid", &changed).await.unwrap();

        let stored = get_gateway_profile(&pool, "seagrid").await.unwrap();
        assert_eq!(stored.compute_resource_preferences.len(), 1);
        assert_eq!(stored.compute_resource_preferences[0].compute_resource_id, stampede);
        assert!(stored.storage_preferences.is_empty());
    }

    #[tokio::test]
    async fn test_individual_preferences() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        let stampede = compute(&pool, "stampede").await;
        add_gateway_resource_profile(&pool, &profile(&comet)).await.unwrap();

        add_gateway_compute_resource_preference(&pool, "seagrid", &ComputeResourcePreference::new(&stampede))
            .await
            .unwrap();
        assert_eq!(get_all_compute_resource_preferences(&pool, "seagrid").await.unwrap().len(), 2);

        let mut pref = get_gateway_compute_resource_preference(&pool, "seagrid", &stampede)
            .await
            .unwrap();
        pref.scratch_location = Some("/scratch/seagrid".to_string());
        update_gateway_compute_resource_preference(&pool, "seagrid", &stampede, &pref)
            .await
            .unwrap();
        let stored = get_gateway_compute_resource_preference(&pool, "seagrid", &stampede)
            .await
            .unwrap();
        assert_eq!(stored.scratch_location.as_deref(), Some("/scratch/seagrid"));

        remove_gateway_compute_resource_preference(&pool, "seagrid", &stampede)
            .await
            .unwrap();
        assert!(get_gateway_compute_resource_preference(&pool, "seagrid", &stampede)
            .await
            .unwrap_err()
            .is_not_found());

        let mut storage = get_gateway_storage_preference(&pool, "seagrid", "data").await.unwrap();
        storage.login_user_name = Some("archive".to_string());
        update_gateway_storage_preference(&pool, "seagrid", "data", &storage)
            .await
            .unwrap();
        assert_eq!(
            get_all_storage_preferences(&pool, "seagrid").await.unwrap()[0]
                .login_user_name
                .as_deref(),
            Some("archive")
        );
        remove_gateway_storage_preference(&pool, "seagrid", "data").await.unwrap();
        assert!(get_all_storage_preferences(&pool, "seagrid").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_cascades() {
        let pool = test_pool().await;
        let comet = compute(&pool, "comet").await;
        add_gateway_resource_profile(&pool, &profile(&comet)).await.unwrap();

        remove_gateway_resource_profile(&pool, "seagrid").await.unwrap();
        assert!(!is_gateway_resource_profile_exists(&pool, "seagrid").await.unwrap());
        assert!(get_all_compute_resource_preferences(&pool, "seagrid")
            .await
            .unwrap()
            .is_empty());
    }
}
