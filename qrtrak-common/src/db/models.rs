//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account row; `subscription_plan` is the canonical plan indicator
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub subscription_plan: String,
    pub monthly_scans_used: i64,
    pub scan_reset_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Dynamic QR code row; soft-deactivated via `is_active`, never hard-deleted
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QrCode {
    pub id: i64,
    pub owner_id: i64,
    pub label: Option<String>,
    pub destination_url: String,
    pub is_active: bool,
    pub scan_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only analytics row, one per permitted redirect
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanEvent {
    pub id: i64,
    pub qr_code_id: i64,
    pub scanned_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}
