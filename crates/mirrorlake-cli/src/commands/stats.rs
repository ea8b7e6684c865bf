//! Stats command - Cache row counts

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatsCommand {}

impl StatsCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        let stats = repo.stats().await?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "profiles": stats.profiles,
                "buckets": stats.buckets,
                "objects": stats.objects,
                "sync_metadata": stats.sync_metadata,
            }));
            return Ok(());
        }

        formatter.success("Cache statistics");
        formatter.info(&format!("Profiles:      {}", stats.profiles));
        formatter.info(&format!("Buckets:       {}", stats.buckets));
        formatter.info(&format!("Objects:       {}", stats.objects));
        formatter.info(&format!("Sync metadata: {}", stats.sync_metadata));
        Ok(())
    }
}
