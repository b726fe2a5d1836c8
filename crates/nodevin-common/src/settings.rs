// Layered settings: defaults, then `config.yaml` in the working directory,
// then `NODEVIN_*` environment variables, then command-line flags.

use crate::constants::paths;
use crate::error::{NodevinError, Result};
use nodevin_sdk::StringUtil;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment variables that override `config.yaml` keys.
pub const ENV_PREFIX: &str = "NODEVIN_";

/// Resolved, immutable configuration handed to every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Host port for the node's RPC endpoint.
    pub port: Option<u16>,
    /// Host directory bound over the node's chain-data mount.
    pub data_dir: Option<String>,
    /// Extra arguments appended to the node command.
    pub args: String,
    pub cpu_limit: String,
    pub mem_limit: String,
    pub cpu_reservation: String,
    pub mem_reservation: String,
    /// Use the node's cookie file instead of `-rpcuser`/`-rpcpassword`.
    pub cookie_auth: bool,
    pub rpc_user: String,
    pub rpc_pass: String,
    pub ipfs_cluster_peername: String,
    pub ipfs_cluster_secret: String,
    pub ipfs_cluster_bootstrap: String,
    /// Content identifier of a chain snapshot to bootstrap from.
    pub snapshot_cid: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            data_dir: None,
            args: String::new(),
            cpu_limit: String::new(),
            mem_limit: String::new(),
            cpu_reservation: String::new(),
            mem_reservation: String::new(),
            cookie_auth: false,
            rpc_user: "user".to_string(),
            rpc_pass: "fiftysix".to_string(),
            ipfs_cluster_peername: String::new(),
            ipfs_cluster_secret: String::new(),
            ipfs_cluster_bootstrap: String::new(),
            snapshot_cid: String::new(),
        }
    }
}

/// Values supplied on the command line. `None` leaves the layered value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub port: Option<u16>,
    pub data_dir: Option<String>,
    pub args: Option<String>,
    pub cpu_limit: Option<String>,
    pub mem_limit: Option<String>,
    pub cpu_reservation: Option<String>,
    pub mem_reservation: Option<String>,
    pub cookie_auth: Option<bool>,
    pub rpc_user: Option<String>,
    pub rpc_pass: Option<String>,
}

impl Settings {
    /// Load settings for a command run from `cwd`, using the process environment.
    pub fn load(cwd: &Path, overrides: &SettingsOverrides) -> Result<Self> {
        let mut settings = Self::from_file(&cwd.join(paths::CONFIG_FILE))?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    /// Read a YAML settings file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        let text =
            std::fs::read_to_string(path).map_err(|e| NodevinError::io(path, e))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&text)?;
        tracing::debug!("Loaded settings from '{}'", path.display());
        Ok(settings)
    }

    /// Apply `NODEVIN_<KEY>` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));

        if let Some(port) = get("PORT") {
            let parsed = port.trim().parse::<u16>().map_err(|_| {
                NodevinError::Serialization(format!("{ENV_PREFIX}PORT is not a port: '{port}'"))
            })?;
            self.port = Some(parsed);
        }
        if let Some(dir) = get("DATA_DIR") {
            self.data_dir = Some(dir);
        }
        if let Some(cookie) = get("COOKIE_AUTH") {
            self.cookie_auth = StringUtil::convert_to_bool(&cookie).ok_or_else(|| {
                NodevinError::Serialization(format!(
                    "{ENV_PREFIX}COOKIE_AUTH is not a boolean: '{cookie}'"
                ))
            })?;
        }

        let strings: [(&str, &mut String); 11] = [
            ("ARGS", &mut self.args),
            ("CPU_LIMIT", &mut self.cpu_limit),
            ("MEM_LIMIT", &mut self.mem_limit),
            ("CPU_RESERVATION", &mut self.cpu_reservation),
            ("MEM_RESERVATION", &mut self.mem_reservation),
            ("RPC_USER", &mut self.rpc_user),
            ("RPC_PASS", &mut self.rpc_pass),
            ("IPFS_CLUSTER_PEERNAME", &mut self.ipfs_cluster_peername),
            ("IPFS_CLUSTER_SECRET", &mut self.ipfs_cluster_secret),
            ("IPFS_CLUSTER_BOOTSTRAP", &mut self.ipfs_cluster_bootstrap),
            ("SNAPSHOT_CID", &mut self.snapshot_cid),
        ];
        for (key, field) in strings {
            if let Some(value) = get(key) {
                *field = value;
            }
        }
        Ok(())
    }

    /// Apply command-line values on top of the file and environment layers.
    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(port) = overrides.port {
            self.port = Some(port);
        }
        if let Some(ref dir) = overrides.data_dir {
            self.data_dir = Some(dir.clone());
        }
        if let Some(cookie) = overrides.cookie_auth {
            self.cookie_auth = cookie;
        }
        let strings = [
            (&overrides.args, &mut self.args),
            (&overrides.cpu_limit, &mut self.cpu_limit),
            (&overrides.mem_limit, &mut self.mem_limit),
            (&overrides.cpu_reservation, &mut self.cpu_reservation),
            (&overrides.mem_reservation, &mut self.mem_reservation),
            (&overrides.rpc_user, &mut self.rpc_user),
            (&overrides.rpc_pass, &mut self.rpc_pass),
        ];
        for (value, field) in strings {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
    }

    /// Default `config.yaml` written by `nodevin init`.
    pub fn default_file_contents() -> String {
        let defaults = Settings::default();
        format!(
            "# nodevin configuration\n\
             # Every key can also be set through NODEVIN_<KEY> (e.g. NODEVIN_RPC_USER).\n\
             # Command-line flags take precedence over both.\n\
             \n\
             rpc-user: {}\n\
             rpc-pass: {}\n\
             cookie-auth: false\n\
             \n\
             # port: 8332\n\
             # data-dir: /mnt/chain\n\
             # args: \"-dbcache=450\"\n\
             # cpu-limit: \"2\"\n\
             # mem-limit: 4g\n\
             # cpu-reservation: \"1\"\n\
             # mem-reservation: 2g\n\
             # ipfs-cluster-peername: my-peer\n\
             # ipfs-cluster-secret: \"\"\n\
             # ipfs-cluster-bootstrap: \"\"\n\
             # snapshot-cid: \"\"\n",
            defaults.rpc_user, defaults.rpc_pass
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.rpc_user, "user");
        assert_eq!(settings.rpc_pass, "fiftysix");
    }

    #[test]
    fn file_keys_are_kebab_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "rpc-user: alice\ncookie-auth: true\nport: 18000\nipfs-cluster-peername: peer1\n",
        )
        .unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.rpc_user, "alice");
        assert!(settings.cookie_auth);
        assert_eq!(settings.port, Some(18000));
        assert_eq!(settings.ipfs_cluster_peername, "peer1");
        assert_eq!(settings.rpc_pass, "fiftysix");
    }

    #[test]
    fn malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: [not, a, port]\n").unwrap();
        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, NodevinError::Serialization(_)));
    }

    #[test]
    fn default_file_contents_parse_back_to_defaults() {
        let parsed: Settings = serde_yaml::from_str(&Settings::default_file_contents()).unwrap();
        assert_eq!(parsed, Settings::default());
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let env: HashMap<String, String> = [
            ("NODEVIN_RPC_USER", "envuser"),
            ("NODEVIN_RPC_PASS", "envpass"),
            ("NODEVIN_COOKIE_AUTH", "1"),
            ("NODEVIN_PORT", "9000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut settings = Settings {
            rpc_user: "fileuser".into(),
            ..Settings::default()
        };
        settings.apply_env(|key| env.get(key).cloned()).unwrap();
        assert_eq!(settings.rpc_user, "envuser");
        assert_eq!(settings.rpc_pass, "envpass");
        assert!(settings.cookie_auth);
        assert_eq!(settings.port, Some(9000));

        settings.apply_overrides(&SettingsOverrides {
            rpc_user: Some("flaguser".into()),
            cookie_auth: Some(false),
            ..SettingsOverrides::default()
        });
        assert_eq!(settings.rpc_user, "flaguser");
        assert_eq!(settings.rpc_pass, "envpass");
        assert!(!settings.cookie_auth);
    }

    #[test]
    fn bad_env_port_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|key| (key == "NODEVIN_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("NODEVIN_PORT"));
    }
}
