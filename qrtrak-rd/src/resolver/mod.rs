//! Redirect resolution core
//!
//! Translates a QR code identifier into its destination URL, subject
//! to the owner's monthly scan quota, recording one scan event per
//! permitted redirect.
//!
//! Per user and calendar month the quota moves through three states:
//! fresh (usage 0), within quota, exhausted. There is no background
//! timer; the reset back to fresh happens lazily on the first scan
//! after a month boundary, before the quota is evaluated, so a user
//! who has been idle for months starts from zero usage.

use chrono::{DateTime, Utc};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::db::{self, NewScanEvent};

pub mod device;
pub mod policy;

pub use device::DeviceType;
pub use policy::{Plan, ScanQuota};

/// Request metadata captured at scan time
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}

/// Successful resolution outcome
#[derive(Debug, Clone)]
pub struct Resolution {
    pub destination_url: String,
    pub device_type: DeviceType,
}

/// Terminal resolution failures
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Unknown or deactivated QR code
    #[error("QR code {0} not found or inactive")]
    NotFound(i64),

    /// Owner's monthly scan quota is exhausted
    #[error("monthly scan quota exhausted on {plan} plan")]
    QuotaExceeded { plan: Plan },

    /// Persistence failure; the transaction was rolled back
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Redirect resolver; owns a pool handle, injected at construction
#[derive(Clone)]
pub struct RedirectResolver {
    db: SqlitePool,
}

impl RedirectResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Resolve a scan against the current wall clock
    pub async fn resolve(
        &self,
        code_id: i64,
        request: &ScanRequest,
    ) -> Result<Resolution, ResolveError> {
        self.resolve_at(code_id, request, qrtrak_common::time::now())
            .await
    }

    /// Resolve a scan at an explicit instant.
    ///
    /// The whole contract runs inside one BEGIN IMMEDIATE transaction:
    /// the immediate lock serializes concurrent scans, so the lazy
    /// monthly reset plus the conditional slot claim can never hand
    /// out more slots than the plan ceiling. Commit only happens once
    /// every side effect (both counters and the scan event) succeeded;
    /// any failure rolls all of them back.
    pub async fn resolve_at(
        &self,
        code_id: i64,
        request: &ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<Resolution, ResolveError> {
        let mut conn = self.db.acquire().await?;

        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match resolve_in_tx(&mut *conn, code_id, request, now).await {
            Ok(resolution) => match sqlx::query("COMMIT").execute(&mut *conn).await {
                Ok(_) => Ok(resolution),
                Err(commit_err) => {
                    // A connection with an open transaction must not
                    // go back to the pool
                    let _ = conn.detach().close().await;
                    Err(commit_err.into())
                }
            },
            Err(err) => {
                if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    debug!("Rollback after failed resolution failed: {}", rollback_err);
                    let _ = conn.detach().close().await;
                }
                Err(err)
            }
        }
    }
}

async fn resolve_in_tx(
    conn: &mut SqliteConnection,
    code_id: i64,
    request: &ScanRequest,
    now: DateTime<Utc>,
) -> Result<Resolution, ResolveError> {
    // Unknown and deactivated codes are indistinguishable to scanners
    let code = db::fetch_qr_code(conn, code_id)
        .await?
        .filter(|c| c.is_active)
        .ok_or(ResolveError::NotFound(code_id))?;

    // A code without its owner row means external corruption (the
    // schema's foreign key forbids it); surface as a database error
    let owner = db::fetch_owner(conn, code.owner_id)
        .await?
        .ok_or(ResolveError::Database(sqlx::Error::RowNotFound))?;

    // Lazy monthly reset, applied before the quota is evaluated
    if qrtrak_common::time::whole_months_between(owner.scan_reset_date, now) >= 1 {
        debug!(
            "Resetting monthly scan usage for user {} (anchor {})",
            owner.id, owner.scan_reset_date
        );
        db::reset_monthly_usage(conn, owner.id, now).await?;
    }

    let plan = Plan::parse(&owner.subscription_plan);
    if !db::claim_scan_slot(conn, owner.id, plan.scan_quota()).await? {
        return Err(ResolveError::QuotaExceeded { plan });
    }

    db::increment_scan_count(conn, code.id).await?;

    let device_type = device::classify(request.user_agent.as_deref().unwrap_or(""));
    db::insert_scan_event(
        conn,
        &NewScanEvent {
            qr_code_id: code.id,
            scanned_at: now,
            user_agent: request.user_agent.as_deref(),
            device_type: device_type.as_str(),
            ip_address: request.ip_address.as_deref(),
            referrer: request.referrer.as_deref(),
        },
    )
    .await?;

    Ok(Resolution {
        destination_url: code.destination_url,
        device_type,
    })
}
