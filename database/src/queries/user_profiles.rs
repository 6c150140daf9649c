//! User resource profile queries
//!
//! Profiles are keyed by `(user_id, gateway_id)`; preferences hang off that
//! pair and are dropped with the profile.

use appcatalog_core::{
    now_millis, Error, Result, UserComputeResourcePreference, UserResourceProfile,
    UserStoragePreference,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{validation, DbResultExt};
use crate::models::{StoragePreferenceRow, UserComputePreferenceRow, UserProfileRow};

fn profile_key(user_id: &str, gateway_id: &str) -> String {
    format!("{}@{}", user_id, gateway_id)
}

async fn upsert_compute_preference(
    conn: &mut SqliteConnection,
    user_id: &str,
    gateway_id: &str,
    pref: &UserComputeResourcePreference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_compute_preferences (
            user_id, gateway_id, compute_resource_id, login_user_name, preferred_batch_queue,
            scratch_location, allocation_project_number, resource_specific_credential_store_token,
            quality_of_service, reservation, reservation_start_time, reservation_end_time, validated
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, gateway_id, compute_resource_id) DO UPDATE SET
            login_user_name = excluded.login_user_name,
            preferred_batch_queue = excluded.preferred_batch_queue,
            scratch_location = excluded.scratch_location,
            allocation_project_number = excluded.allocation_project_number,
            resource_specific_credential_store_token = excluded.resource_specific_credential_store_token,
            quality_of_service = excluded.quality_of_service,
            reservation = excluded.reservation,
            reservation_start_time = excluded.reservation_start_time,
            reservation_end_time = excluded.reservation_end_time,
            validated = excluded.validated
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(&pref.compute_resource_id)
    .bind(&pref.login_user_name)
    .bind(&pref.preferred_batch_queue)
    .bind(&pref.scratch_location)
    .bind(&pref.allocation_project_number)
    .bind(&pref.resource_specific_credential_store_token)
    .bind(&pref.quality_of_service)
    .bind(&pref.reservation)
    .bind(pref.reservation_start_time)
    .bind(pref.reservation_end_time)
    .bind(pref.validated)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save user compute preference")?;
    Ok(())
}

async fn upsert_storage_preference(
    conn: &mut SqliteConnection,
    user_id: &str,
    gateway_id: &str,
    pref: &UserStoragePreference,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_storage_preferences (
            user_id, gateway_id, storage_resource_id, login_user_name,
            file_system_root_location, resource_specific_credential_store_token
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, gateway_id, storage_resource_id) DO UPDATE SET
            login_user_name = excluded.login_user_name,
            file_system_root_location = excluded.file_system_root_location,
            resource_specific_credential_store_token = excluded.resource_specific_credential_store_token
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(&pref.storage_resource_id)
    .bind(&pref.login_user_name)
    .bind(&pref.file_system_root_location)
    .bind(&pref.resource_specific_credential_store_token)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save user storage preference")?;
    Ok(())
}

async fn save_user_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
    gateway_id: &str,
    profile: &UserResourceProfile,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_resource_profiles (
            user_id, gateway_id, credential_store_token, identity_server_tenant,
            identity_server_pwd_cred_token, is_null_user, creation_time, update_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, gateway_id) DO UPDATE SET
            credential_store_token = excluded.credential_store_token,
            identity_server_tenant = excluded.identity_server_tenant,
            identity_server_pwd_cred_token = excluded.identity_server_pwd_cred_token,
            is_null_user = excluded.is_null_user,
            update_time = excluded.update_time
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(&profile.credential_store_token)
    .bind(&profile.identity_server_tenant)
    .bind(&profile.identity_server_pwd_cred_token)
    .bind(profile.is_null_user)
    .bind(profile.creation_time.unwrap_or(now))
    .bind(now)
    .execute(&mut *conn)
    .await
    .db_context("Failed to save user resource profile")?;

    for table in ["user_compute_preferences", "user_storage_preferences"] {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ? AND gateway_id = ?",
            table
        ))
        .bind(user_id)
        .bind(gateway_id)
        .execute(&mut *conn)
        .await
        .db_context("Failed to clear user preferences")?;
    }

    for pref in &profile.user_compute_resource_preferences {
        upsert_compute_preference(&mut *conn, user_id, gateway_id, pref).await?;
    }
    for pref in &profile.user_storage_preferences {
        upsert_storage_preference(&mut *conn, user_id, gateway_id, pref).await?;
    }
    Ok(())
}

/// Register a user profile with its preferences, returning the user id
#[instrument(skip(pool, profile), fields(user_id = %profile.user_id, gateway_id = %profile.gateway_id))]
pub async fn add_user_resource_profile(pool: &Pool<Sqlite>, profile: &UserResourceProfile) -> Result<String> {
    validation(profile.validate())?;

    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_user_profile(&mut tx, &profile.user_id, &profile.gateway_id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit user resource profile")?;

    info!("User resource profile added");
    Ok(profile.user_id.clone())
}

/// Replace a user profile's fields and both preference lists
#[instrument(skip(pool, profile))]
pub async fn update_user_resource_profile(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    profile: &UserResourceProfile,
) -> Result<()> {
    if !is_user_resource_profile_exists(pool, user_id, gateway_id).await? {
        return Err(Error::not_found("User resource profile", profile_key(user_id, gateway_id)));
    }
    let mut tx = pool.begin().await.db_context("Failed to begin transaction")?;
    save_user_profile(&mut tx, user_id, gateway_id, profile, now_millis()).await?;
    tx.commit().await.db_context("Failed to commit user resource profile")?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_user_resource_profile(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
) -> Result<UserResourceProfile> {
    let row = sqlx::query_as::<_, UserProfileRow>(
        r#"
        SELECT user_id, gateway_id, credential_store_token, identity_server_tenant,
               identity_server_pwd_cred_token, is_null_user, creation_time, update_time
        FROM user_resource_profiles
        WHERE user_id = ? AND gateway_id = ?
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get user resource profile")?
    .ok_or_else(|| Error::not_found("User resource profile", profile_key(user_id, gateway_id)))?;

    let mut profile = row.into_profile();
    profile.user_compute_resource_preferences =
        get_all_user_compute_resource_preferences(pool, user_id, gateway_id).await?;
    profile.user_storage_preferences =
        get_all_user_storage_preferences(pool, user_id, gateway_id).await?;
    Ok(profile)
}

#[instrument(skip(pool))]
pub async fn get_all_user_resource_profiles(pool: &Pool<Sqlite>) -> Result<Vec<UserResourceProfile>> {
    let keys: Vec<(String, String)> = sqlx::query_as(
        "SELECT user_id, gateway_id FROM user_resource_profiles ORDER BY gateway_id, user_id",
    )
    .fetch_all(pool)
    .await
    .db_context("Failed to list user resource profiles")?;

    let mut profiles = Vec::with_capacity(keys.len());
    for (user_id, gateway_id) in keys {
        profiles.push(get_user_resource_profile(pool, &user_id, &gateway_id).await?);
    }
    Ok(profiles)
}

/// User ids with a profile in the gateway
#[instrument(skip(pool))]
pub async fn get_gateway_profile_ids(pool: &Pool<Sqlite>, gateway_id: &str) -> Result<Vec<String>> {
    sqlx::query_scalar("SELECT user_id FROM user_resource_profiles WHERE gateway_id = ? ORDER BY user_id")
        .bind(gateway_id)
        .fetch_all(pool)
        .await
        .db_context("Failed to list gateway user ids")
}

#[instrument(skip(pool))]
pub async fn is_user_resource_profile_exists(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_resource_profiles WHERE user_id = ? AND gateway_id = ?",
    )
    .bind(user_id)
    .bind(gateway_id)
    .fetch_one(pool)
    .await
    .db_context("Failed to check user resource profile")?;
    Ok(count > 0)
}

#[instrument(skip(pool))]
pub async fn remove_user_resource_profile(pool: &Pool<Sqlite>, user_id: &str, gateway_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM user_resource_profiles WHERE user_id = ? AND gateway_id = ?")
        .bind(user_id)
        .bind(gateway_id)
        .execute(pool)
        .await
        .db_context("Failed to delete user resource profile")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("User resource profile", profile_key(user_id, gateway_id)));
    }
    info!(user_id = %user_id, gateway_id = %gateway_id, "User resource profile removed");
    Ok(())
}

/// Add or replace one compute preference on an existing profile
#[instrument(skip(pool, pref), fields(compute_resource_id = %pref.compute_resource_id))]
pub async fn add_user_compute_resource_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    pref: &UserComputeResourcePreference,
) -> Result<()> {
    if !is_user_resource_profile_exists(pool, user_id, gateway_id).await? {
        return Err(Error::not_found("User resource profile", profile_key(user_id, gateway_id)));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_compute_preference(&mut conn, user_id, gateway_id, pref).await
}

#[instrument(skip(pool))]
pub async fn get_user_compute_resource_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    compute_resource_id: &str,
) -> Result<UserComputeResourcePreference> {
    let row = sqlx::query_as::<_, UserComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, login_user_name, preferred_batch_queue, scratch_location,
               allocation_project_number, resource_specific_credential_store_token,
               quality_of_service, reservation, reservation_start_time, reservation_end_time,
               validated
        FROM user_compute_preferences
        WHERE user_id = ? AND gateway_id = ? AND compute_resource_id = ?
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(compute_resource_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get user compute preference")?
    .ok_or_else(|| {
        Error::not_found(
            "User compute resource preference",
            format!("{}/{}", profile_key(user_id, gateway_id), compute_resource_id),
        )
    })?;
    Ok(row.into())
}

#[instrument(skip(pool))]
pub async fn get_all_user_compute_resource_preferences(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
) -> Result<Vec<UserComputeResourcePreference>> {
    let rows = sqlx::query_as::<_, UserComputePreferenceRow>(
        r#"
        SELECT compute_resource_id, login_user_name, preferred_batch_queue, scratch_location,
               allocation_project_number, resource_specific_credential_store_token,
               quality_of_service, reservation, reservation_start_time, reservation_end_time,
               validated
        FROM user_compute_preferences
        WHERE user_id = ? AND gateway_id = ?
        ORDER BY compute_resource_id
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list user compute preferences")?;
    Ok(rows.into_iter().map(UserComputeResourcePreference::from).collect())
}

#[instrument(skip(pool))]
pub async fn remove_user_compute_resource_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    compute_resource_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM user_compute_preferences WHERE user_id = ? AND gateway_id = ? AND compute_resource_id = ?",
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(compute_resource_id)
    .execute(pool)
    .await
    .db_context("Failed to delete user compute preference")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "User compute resource preference",
            format!("{}/{}", profile_key(user_id, gateway_id), compute_resource_id),
        ));
    }
    Ok(())
}

/// Add or replace one storage preference on an existing profile
#[instrument(skip(pool, pref), fields(storage_resource_id = %pref.storage_resource_id))]
pub async fn add_user_storage_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    pref: &UserStoragePreference,
) -> Result<()> {
    if !is_user_resource_profile_exists(pool, user_id, gateway_id).await? {
        return Err(Error::not_found("User resource profile", profile_key(user_id, gateway_id)));
    }
    let mut conn = pool.acquire().await.db_context("Failed to acquire connection")?;
    upsert_storage_preference(&mut conn, user_id, gateway_id, pref).await
}

#[instrument(skip(pool))]
pub async fn get_user_storage_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    storage_resource_id: &str,
) -> Result<UserStoragePreference> {
    let row = sqlx::query_as::<_, StoragePreferenceRow>(
        r#"
        SELECT storage_resource_id, login_user_name, file_system_root_location,
               resource_specific_credential_store_token
        FROM user_storage_preferences
        WHERE user_id = ? AND gateway_id = ? AND storage_resource_id = ?
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(storage_resource_id)
    .fetch_optional(pool)
    .await
    .db_context("Failed to get user storage preference")?
    .ok_or_else(|| {
        Error::not_found(
            "User storage preference",
            format!("{}/{}", profile_key(user_id, gateway_id), storage_resource_id),
        )
    })?;
    Ok(row.into())
}

#[instrument(skip(pool))]
pub async fn get_all_user_storage_preferences(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
) -> Result<Vec<UserStoragePreference>> {
    let rows = sqlx::query_as::<_, StoragePreferenceRow>(
        r#"
        SELECT storage_resource_id, login_user_name, file_system_root_location,
               resource_specific_credential_store_token
        FROM user_storage_preferences
        WHERE user_id = ? AND gateway_id = ?
        ORDER BY storage_resource_id
        "#,
    )
    .bind(user_id)
    .bind(gateway_id)
    .fetch_all(pool)
    .await
    .db_context("Failed to list user storage preferences")?;
    Ok(rows.into_iter().map(UserStoragePreference::from).collect())
}

#[instrument(skip(pool))]
pub async fn remove_user_storage_preference(
    pool: &Pool<Sqlite>,
    user_id: &str,
    gateway_id: &str,
    storage_resource_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM user_storage_preferences WHERE user_id = ? AND gateway_id = ? AND storage_resource_id = ?",
    )
    .bind(user_id)
    .bind(gateway_id)
    .bind(storage_resource_id)
    .execute(pool)
    .await
    .db_context("Failed to delete user storage preference")?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "User storage preference",
            format!("{}/{}", profile_key(user_id, gateway_id), storage_resource_id),
        ));
    }
    Ok(())
}
