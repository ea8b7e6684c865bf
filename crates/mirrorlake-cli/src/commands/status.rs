//! Status command - Show sync status per cached scope

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use mirrorlake_core::domain::SyncStatus;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Profile id
    pub profile: i64,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        let Some(profile) = repo.get_profile(self.profile).await? else {
            formatter.error(&format!("No profile with id {}", self.profile));
            return Ok(());
        };

        let entries = repo.list_sync_metadata(self.profile).await?;

        if matches!(format, OutputFormat::Json) {
            let json: Vec<_> = entries
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "scope": m.scope.key(),
                        "status": m.status.as_str(),
                        "last_sync_at": m.last_sync_at.map(|d| d.to_rfc3339()),
                        "error": m.error_message,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "profile": profile.name,
                "scopes": json,
            }));
            return Ok(());
        }

        formatter.success(&format!("Sync status for profile '{}'", profile.name));
        if entries.is_empty() {
            formatter.info("No scope has been synced yet.");
            return Ok(());
        }

        for meta in &entries {
            let when = meta
                .last_sync_at
                .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            let line = match meta.status {
                SyncStatus::Error => format!(
                    "{:<50} {:<10} {} ({})",
                    meta.scope.key(),
                    meta.status,
                    when,
                    meta.error_message.as_deref().unwrap_or("unknown error")
                ),
                _ => format!("{:<50} {:<10} {}", meta.scope.key(), meta.status, when),
            };
            formatter.info(&line);
        }
        Ok(())
    }
}
