// ContainerInfo: one line of `docker ps --format '{{json .}}'`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use nodevin_common::constants::MANAGED_IMAGE_PREFIX;

/// IPv4 host binding in front of a published port, e.g. `0.0.0.0:`.
static IPV4_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:\.\d{1,3}){3}:?").expect("Invalid IPv4 regex"));

/// A port number or a `start-end` range.
static PORT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:-\d+)?").expect("Invalid port regex"));

/// Read-only snapshot of a container as reported by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInfo {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub running_for: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ports: String,
    #[serde(default)]
    pub names: String,
}

impl ContainerInfo {
    /// Parse `{{json .}}` output, one object per line. Lines that fail to
    /// parse are skipped.
    pub fn parse_lines(stdout: &str) -> Vec<ContainerInfo> {
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<ContainerInfo>(line) {
                Ok(info) => Some(info),
                Err(e) => {
                    tracing::debug!(target: "docker", "Skipping unparsable ps line: {e}");
                    None
                }
            })
            .collect()
    }

    /// First container name, without a leading slash.
    pub fn name(&self) -> &str {
        self.names
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_start_matches('/')
    }

    /// Whether the image belongs to the managed namespace.
    pub fn is_managed(&self) -> bool {
        self.image.starts_with(MANAGED_IMAGE_PREFIX)
    }

    /// Image reference split into repository and tag (`latest` when absent).
    pub fn image_and_tag(&self) -> (&str, &str) {
        split_image(&self.image)
    }

    /// Repository name without the managed namespace prefix.
    pub fn display_image(&self) -> &str {
        let (repo, _) = self.image_and_tag();
        repo.strip_prefix(MANAGED_IMAGE_PREFIX).unwrap_or(repo)
    }

    /// Whole days since the container was created.
    pub fn uptime_days(&self, now: DateTime<Utc>) -> Option<i64> {
        let created = parse_created_at(&self.created_at)?;
        Some((now - created).num_days().max(0))
    }
}

/// Split `repo[:tag]`, ignoring a registry port such as `host:5000/repo`.
pub fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, tag),
        _ => (image, "latest"),
    }
}

/// Parse docker's `2024-01-15 10:30:00 +0000 UTC` timestamps.
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let trimmed: Vec<&str> = value.split_whitespace().take(3).collect();
    if trimmed.len() < 3 {
        return DateTime::parse_from_rfc3339(value.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc));
    }
    DateTime::parse_from_str(&trimmed.join(" "), "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Reduce a docker `Ports` column to the distinct port numbers and ranges it
/// mentions, dropping `0`. Applying it to its own output is a no-op.
pub fn compact_ports(ports: &str) -> String {
    let without_ips = IPV4_PREFIX.replace_all(ports, "");
    let mut seen: Vec<&str> = Vec::new();
    for m in PORT_NUMBER.find_iter(&without_ips) {
        let port = m.as_str();
        if port == "0" || seen.contains(&port) {
            continue;
        }
        seen.push(port);
    }
    seen.join(", ")
}
