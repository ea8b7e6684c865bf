//! Buckets command - List cached buckets of a profile

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct BucketsCommand {
    /// Profile id
    pub profile: i64,
}

impl BucketsCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        if repo.get_profile(self.profile).await?.is_none() {
            formatter.error(&format!("No profile with id {}", self.profile));
            return Ok(());
        }

        let buckets = repo.list_buckets(self.profile).await?;

        if matches!(format, OutputFormat::Json) {
            let json: Vec<_> = buckets
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "name": b.name,
                        "creation_date": b.creation_date.map(|d| d.to_rfc3339()),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "buckets": json }));
            return Ok(());
        }

        if buckets.is_empty() {
            formatter.info("No cached buckets. The profile has not been synced yet.");
            return Ok(());
        }
        formatter.success(&format!("{} cached bucket(s)", buckets.len()));
        for bucket in &buckets {
            let created = bucket
                .creation_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            formatter.info(&format!("{:<40} {}", bucket.name, created));
        }
        Ok(())
    }
}
