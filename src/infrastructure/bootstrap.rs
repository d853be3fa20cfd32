use std::error::Error;

use actix_web::web;
use tracing::{error, info};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connection::init_equipment_db;
use crate::infrastructure::storage::ensure_db_parent_dir;
use crate::interfaces::http::HttpState;

/// Open storage and assemble the shared HTTP state
pub async fn setup(config: &AppConfig) -> Result<web::Data<HttpState>, Box<dyn Error>> {
    let db_path = ensure_db_parent_dir(&config.database.path).map_err(|err| {
        error!(
            error = %err,
            db_path = %config.database.path.display(),
            "Failed to create database dir"
        );
        err
    })?;

    let pool = init_equipment_db(&db_path, config.database.max_connections)
        .await
        .map_err(|err| {
            error!(error = %err, db_path = %db_path.display(), "Failed to open database");
            err
        })?;

    info!(
        retention_keep = config.retention.keep,
        report_max_records = config.report.max_records,
        "Services ready"
    );

    Ok(web::Data::new(HttpState::new(pool, config)))
}
