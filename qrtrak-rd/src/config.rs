//! qrtrak-rd specific configuration

use clap::Parser;
use qrtrak_common::config::{ensure_data_folder, resolve_data_folder};
use qrtrak_common::Result;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "qrtrak-rd", about = "qrtrak Redirector service", version)]
pub struct Args {
    /// Data folder holding qrtrak.db (overrides QRTRAK_DATA_FOLDER and config file)
    #[arg(long)]
    pub data_folder: Option<String>,

    /// Address to listen on
    #[arg(long, env = "QRTRAK_RD_BIND", default_value = "0.0.0.0:7242")]
    pub bind: String,

    /// Upgrade page linked from the quota-exceeded response
    #[arg(long, env = "QRTRAK_UPGRADE_URL", default_value = "https://qrtrak.app/upgrade")]
    pub upgrade_url: String,
}

/// Redirector configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_folder: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub upgrade_url: String,
}

impl ServiceConfig {
    /// Resolve full configuration from parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let data_folder = resolve_data_folder(args.data_folder.as_deref(), "QRTRAK_DATA_FOLDER");
        let db_path = ensure_data_folder(&data_folder)?;

        Ok(Self {
            data_folder,
            db_path,
            bind_addr: args.bind.clone(),
            upgrade_url: args.upgrade_url.clone(),
        })
    }
}
