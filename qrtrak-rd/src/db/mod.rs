//! Database queries for redirect resolution
//!
//! All functions take a `&mut SqliteConnection` rather than the pool
//! so the resolver can compose them inside a single transaction.

use chrono::{DateTime, Utc};
use qrtrak_common::db::models::{QrCode, User};
use sqlx::SqliteConnection;

use crate::resolver::policy::ScanQuota;

/// Scan event fields supplied by the resolver
#[derive(Debug)]
pub struct NewScanEvent<'a> {
    pub qr_code_id: i64,
    pub scanned_at: DateTime<Utc>,
    pub user_agent: Option<&'a str>,
    pub device_type: &'a str,
    pub ip_address: Option<&'a str>,
    pub referrer: Option<&'a str>,
}

/// Fetch a QR code row by id
pub async fn fetch_qr_code(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<QrCode>> {
    sqlx::query_as::<_, QrCode>(
        r#"
        SELECT id, owner_id, label, destination_url, is_active, scan_count,
               created_at, updated_at
        FROM qr_codes
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

/// Fetch the owning user row
pub async fn fetch_owner(conn: &mut SqliteConnection, owner_id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, subscription_plan, monthly_scans_used,
               scan_reset_date, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Zero the monthly usage counter and advance the reset anchor
pub async fn reset_monthly_usage(
    conn: &mut SqliteConnection,
    user_id: i64,
    reset_date: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET monthly_scans_used = 0, scan_reset_date = ? WHERE id = ?")
        .bind(reset_date)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Claim one scan slot for the user, if the quota permits.
///
/// The check and the increment are one conditional UPDATE so the
/// claim stays atomic under concurrent scans. Returns false when the
/// ceiling was already reached (no row modified).
pub async fn claim_scan_slot(
    conn: &mut SqliteConnection,
    user_id: i64,
    quota: ScanQuota,
) -> sqlx::Result<bool> {
    let result = match quota {
        ScanQuota::Unlimited => {
            sqlx::query("UPDATE users SET monthly_scans_used = monthly_scans_used + 1 WHERE id = ?")
                .bind(user_id)
                .execute(&mut *conn)
                .await?
        }
        ScanQuota::Limited(ceiling) => {
            sqlx::query(
                r#"
                UPDATE users
                SET monthly_scans_used = monthly_scans_used + 1
                WHERE id = ? AND monthly_scans_used < ?
                "#,
            )
            .bind(user_id)
            .bind(ceiling)
            .execute(&mut *conn)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

/// Bump the per-code lifetime scan counter
pub async fn increment_scan_count(conn: &mut SqliteConnection, qr_code_id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE qr_codes SET scan_count = scan_count + 1 WHERE id = ?")
        .bind(qr_code_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Append one scan analytics row
pub async fn insert_scan_event(
    conn: &mut SqliteConnection,
    event: &NewScanEvent<'_>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scan_events (qr_code_id, scanned_at, user_agent, device_type, ip_address, referrer)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.qr_code_id)
    .bind(event.scanned_at)
    .bind(event.user_agent)
    .bind(event.device_type)
    .bind(event.ip_address)
    .bind(event.referrer)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
