// Loads AntiSpamOptions from a JSON file on disk.

use crate::core::moderation::AntiSpamOptions;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read options from `path`. Keys missing from the file keep their defaults.
pub fn load_options(path: impl AsRef<Path>) -> Result<AntiSpamOptions> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open anti-spam options at {}", path.display()))?;

    let options: AntiSpamOptions = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid anti-spam options in {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        ignored_members = options.ignored_members.len(),
        ignored_guilds = options.ignored_guilds.len(),
        delete_spam = options.delete_spam,
        "Loaded anti-spam options"
    );
    Ok(options)
}
