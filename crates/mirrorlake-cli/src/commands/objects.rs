//! Objects command - List cached objects of one listing scope

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ObjectsCommand {
    /// Profile id
    pub profile: i64,

    /// Bucket name
    pub bucket: String,

    /// Listing prefix (omit for the bucket root)
    #[arg(long)]
    pub prefix: Option<String>,
}

impl ObjectsCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        let objects = repo
            .list_objects(self.profile, &self.bucket, self.prefix.as_deref())
            .await?;

        if matches!(format, OutputFormat::Json) {
            let json: Vec<_> = objects
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "key": o.key,
                        "size": o.size,
                        "last_modified": o.last_modified.map(|d| d.to_rfc3339()),
                        "etag": o.etag,
                        "storage_class": o.storage_class,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "objects": json }));
            return Ok(());
        }

        if objects.is_empty() {
            formatter.info("No cached objects for this scope.");
            return Ok(());
        }
        formatter.success(&format!(
            "{} cached object(s) in {}{}",
            objects.len(),
            self.bucket,
            self.prefix.as_deref().unwrap_or("")
        ));
        for object in &objects {
            let size = object
                .size
                .map(format_size)
                .unwrap_or_else(|| "-".to_string());
            let modified = object
                .last_modified
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            formatter.info(&format!("{:<60} {:>10} {}", object.key, size, modified));
        }
        Ok(())
    }
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
