//! Declarative contexts loaded from YAML
//!
//! ```yaml
//! cwd: /srv/app
//! sudo: true
//! user: deploy
//! hostname: app1.example.com
//! ssh_options:
//!   identity_file: ~/.ssh/deploy
//!   port: 2222
//! env:
//!   PATH: /usr/local/bin:/usr/bin:/bin
//! src: /srv/app/.env
//! logging: false
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::SshConfig;
use crate::context::Context;
use crate::error::{Error, Result};

/// Serializable form of a [`Context`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSettings {
    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Privilege elevation
    #[serde(default)]
    pub sudo: bool,

    /// Effective user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Remote host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Raw `ssh` options, validated on conversion
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ssh_options: IndexMap<String, serde_yaml::Value>,

    /// Replacement environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<IndexMap<String, String>>,

    /// File to source first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<PathBuf>,

    /// Log command lines before running them
    #[serde(default = "default_logging")]
    pub logging: bool,
}

fn default_logging() -> bool {
    true
}

impl ContextSettings {
    /// Parse settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Validate the settings and build a [`Context`]
    ///
    /// Unknown or non-scalar `ssh_options`, a missing `src` file and a
    /// missing local `cwd` are rejected here.
    pub fn into_context(self) -> Result<Context> {
        let ssh_config = if self.ssh_options.is_empty() {
            None
        } else {
            let pairs = self
                .ssh_options
                .iter()
                .map(|(key, value)| Ok((key.clone(), scalar_to_string(key, value)?)))
                .collect::<Result<Vec<_>>>()?;
            Some(SshConfig::new(pairs)?)
        };

        let context = Context {
            cwd: self.cwd,
            sudo: self.sudo,
            user: self.user,
            hostname: self.hostname,
            ssh_config,
            env: self.env,
            src: self.src,
            logging: self.logging,
        };
        context.validate()?;
        Ok(context)
    }
}

fn scalar_to_string(key: &str, value: &serde_yaml::Value) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::config(format!(
            "ssh option '{}' must be a string, number or boolean",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let yaml = r#"
cwd: /srv/app
sudo: true
user: deploy
hostname: app1.example.com
ssh_options:
  identity_file: /keys/deploy
  port: 2222
env:
  PATH: /usr/bin
logging: false
"#;
        let settings = ContextSettings::from_yaml_str(yaml).unwrap();
        assert!(settings.sudo);
        assert!(!settings.logging);

        let context = settings.into_context().unwrap();
        assert_eq!(context.hostname.as_deref(), Some("app1.example.com"));
        assert_eq!(
            context.ssh_config.unwrap().to_string(),
            "-i /keys/deploy -p 2222"
        );
        assert_eq!(context.env.unwrap()["PATH"], "/usr/bin");
    }

    #[test]
    fn test_defaults() {
        let settings = ContextSettings::from_yaml_str("{}").unwrap();
        assert!(settings.logging);
        let context = settings.into_context().unwrap();
        assert_eq!(context, Context::default());
    }

    #[test]
    fn test_unknown_ssh_option_rejected() {
        let yaml = "hostname: h.com\nssh_options:\n  timeout: 10\n";
        let err = ContextSettings::from_yaml_str(yaml)
            .unwrap()
            .into_context()
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_non_scalar_ssh_option_rejected() {
        for yaml in [
            "hostname: h.com\nssh_options:\n  port: [22, 2222]\n",
            "hostname: h.com\nssh_options:\n  identity_file:\n    path: /keys/id\n",
            "hostname: h.com\nssh_options:\n  port: ~\n",
        ] {
            let err = ContextSettings::from_yaml_str(yaml)
                .unwrap()
                .into_context()
                .unwrap_err();
            assert!(err.is_config_error());
            assert!(err.to_string().contains("must be a string"));
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ContextSettings::from_yaml_str("workdir: /tmp\n").is_err());
    }

    #[test]
    fn test_missing_src_rejected() {
        let err = ContextSettings::from_yaml_str("src: /no/such/file.sh\n")
            .unwrap()
            .into_context()
            .unwrap_err();
        assert!(err.is_config_error());
    }
}
