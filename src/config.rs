// src/config.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_ENDPOINT: &str =
    "https://pgoccampaign.share.zrok.io/api/v1/campaign/create-campaigns";

/// Settings for a submission run. Every key is optional in the YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: String,
    pub user_id: u64,
    /// Campaigns per request. 1 sends one request per record.
    pub batch_size: usize,
    pub bypass_header: BypassHeader,
    pub timeout_secs: u64,
}

/// Extra header that gets the request past the tunnel's interstitial page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BypassHeader {
    pub name: String,
    pub value: String,
}

impl Default for BypassHeader {
    fn default() -> Self {
        Self {
            name: "skip_zrok_interstitial".to_string(),
            value: "true".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_id: 1,
            batch_size: 1,
            bypass_header: BypassHeader::default(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Defaults when `path` is `None`, otherwise the YAML file on top of
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Config::default(),
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&raw).with_context(|| format!("parsing config {}", p.display()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.bypass_header.name.trim().is_empty() {
            bail!("bypass_header.name must not be empty");
        }
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).with_context(|| format!("invalid endpoint {:?}", self.endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_without_file() {
        let c = Config::load(None).unwrap();
        assert_eq!(c, Config::default());
        assert_eq!(c.user_id, 1);
        assert_eq!(c.batch_size, 1);
        assert_eq!(c.bypass_header.name, "skip_zrok_interstitial");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "endpoint: http://localhost:9000/create\nbatch_size: 5").unwrap();
        let c = Config::load(Some(tmp.path())).unwrap();
        assert_eq!(c.endpoint, "http://localhost:9000/create");
        assert_eq!(c.batch_size, 5);
        assert_eq!(c.user_id, 1);
        assert_eq!(c.timeout_secs, 60);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_yaml("batch_size: 0").unwrap().validate().is_err());
        assert!(Config::from_yaml("endpoint: not a url").unwrap().validate().is_err());
        assert!(Config::from_yaml("unknown_key: 1").is_err());
        assert!(Config::load(Some(Path::new("/no/such/config.yaml"))).is_err());
    }

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(Config::from_yaml("\n").unwrap(), Config::default());
    }
}
