//! CSV import and export of virtual host configurations.
//!
//! One row per rewrite rule, in the column order: host URL, original path,
//! rewrite path, skin (empty when unset), skin enforcement (`on`/`off`).
//! Rows of the same host must be contiguous. Aliases have no column and are
//! not exported.

use crate::config::{HostConfig, RewriteConfig};
use crate::errors::ConfigError;
use crate::path_key::trim_trailing_slash;
use std::io;

const COLUMNS: usize = 5;

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

pub fn export_csv<'a, I, W>(hosts: I, writer: W) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = &'a HostConfig>,
    W: io::Write,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for host in hosts {
        for rewrite in &host.rewrites {
            writer.write_record([
                host.canonical_url(),
                rewrite.original.as_str(),
                rewrite.rewrite.as_str(),
                rewrite.skin.as_deref().unwrap_or(""),
                on_off(rewrite.skin_enforce),
            ])?;
        }
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Reads host configurations back. A row with the wrong number of columns
/// rejects the whole input. Blank lines are skipped, line numbers in errors
/// are file lines starting at 0.
pub fn import_csv<R: io::Read>(reader: R) -> Result<Vec<HostConfig>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut hosts: Vec<HostConfig> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != COLUMNS {
            let line = record
                .position()
                .map_or(0, |position| position.line().saturating_sub(1));
            return Err(ConfigError::InvalidCsvRow {
                line: line as usize,
                columns: record.len(),
            });
        }

        let url = &record[0];
        let rewrite = RewriteConfig {
            original: record[1].to_string(),
            rewrite: record[2].to_string(),
            skin: Some(&record[3])
                .filter(|skin| !skin.is_empty())
                .map(str::to_string),
            skin_enforce: &record[4] == "on",
        };

        match hosts.last_mut() {
            Some(host) if host.canonical_url() == trim_trailing_slash(url) => {
                host.rewrites.push(rewrite)
            }
            _ => hosts.push(HostConfig::new(url, Vec::new(), vec![rewrite])),
        }
    }

    tracing::debug!(hosts = hosts.len(), "Read virtual hosts from csv");
    Ok(hosts)
}
