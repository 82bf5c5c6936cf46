//! Validated parameter sets rendered into command-line flags
//!
//! A [`ConfigSchema`] lists the parameters a tool understands, each with the
//! flag it renders as and whether it must be supplied. [`ValidatedConfig`]
//! checks supplied values against a schema once, at construction, so an
//! invalid set never reaches rendering.

use indexmap::IndexMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{Error, Result};

/// How one parameter is rendered and whether it is mandatory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// The flag written before the value, e.g. `-p`
    pub shorthand: &'static str,
    /// Whether the parameter has to be supplied
    pub required: bool,
}

/// The recognised parameters of a structured config
pub trait ConfigSchema {
    /// Name used in error messages
    const NAME: &'static str;

    /// Parameter name to spec
    const PARAMS: &'static [(&'static str, ParamSpec)];

    /// Look up a parameter by name
    fn param(key: &str) -> Option<&'static ParamSpec> {
        Self::PARAMS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, spec)| spec)
    }
}

/// Check `supplied` against schema `S`
///
/// Fails when a required key is missing or when a key is not recognised.
pub fn validate<S: ConfigSchema>(supplied: &IndexMap<String, String>) -> Result<()> {
    for (key, spec) in S::PARAMS {
        if spec.required && !supplied.contains_key(*key) {
            return Err(Error::config(format!(
                "required {} parameter '{}' was not provided",
                S::NAME,
                key
            )));
        }
    }

    for key in supplied.keys() {
        if S::param(key).is_none() {
            return Err(Error::config(format!(
                "'{}' is not a recognised {} parameter",
                key,
                S::NAME
            )));
        }
    }

    Ok(())
}

/// A parameter set that passed validation against `S`
pub struct ValidatedConfig<S> {
    values: IndexMap<String, String>,
    _schema: PhantomData<S>,
}

impl<S: ConfigSchema> ValidatedConfig<S> {
    /// Validate the given key/value pairs
    pub fn new<I, K, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let values: IndexMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        validate::<S>(&values)?;
        Ok(Self {
            values,
            _schema: PhantomData,
        })
    }

    /// An empty set; only valid when the schema has no required parameters
    pub fn empty() -> Result<Self> {
        Self::new(std::iter::empty::<(String, String)>())
    }

    /// Set one more parameter, re-validating the set
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Result<Self> {
        self.values.insert(key.into(), value.to_string());
        validate::<S>(&self.values)?;
        Ok(self)
    }

    /// Get a supplied value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether nothing was supplied
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The supplied values in insertion order
    pub fn values(&self) -> &IndexMap<String, String> {
        &self.values
    }
}

// Manual impls so `S` itself does not need to be Clone/Debug/PartialEq
impl<S> Clone for ValidatedConfig<S> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            _schema: PhantomData,
        }
    }
}

impl<S: ConfigSchema> fmt::Debug for ValidatedConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(S::NAME).field("values", &self.values).finish()
    }
}

impl<S> PartialEq for ValidatedConfig<S> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

/// Renders `<shorthand> <value>` pairs, space-joined, in insertion order
impl<S: ConfigSchema> fmt::Display for ValidatedConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.values {
            // validated on construction
            let Some(spec) = S::param(key) else { continue };
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", spec.shorthand, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Options understood by the external `ssh` client
#[derive(Debug, Clone, Copy)]
pub struct SshSchema;

impl ConfigSchema for SshSchema {
    const NAME: &'static str = "SSH";

    const PARAMS: &'static [(&'static str, ParamSpec)] = &[
        (
            "identity_file",
            ParamSpec {
                shorthand: "-i",
                required: false,
            },
        ),
        (
            "port",
            ParamSpec {
                shorthand: "-p",
                required: false,
            },
        ),
    ];
}

/// Validated `ssh` options (`identity_file`, `port`)
pub type SshConfig = ValidatedConfig<SshSchema>;

impl ValidatedConfig<SshSchema> {
    /// Set the identity file (private key)
    pub fn with_identity_file(self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        self.set("identity_file", path.as_ref().display())
    }

    /// Set the SSH port
    pub fn with_port(self, port: u16) -> Result<Self> {
        self.set("port", port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StrictSchema;

    impl ConfigSchema for StrictSchema {
        const NAME: &'static str = "strict";
        const PARAMS: &'static [(&'static str, ParamSpec)] = &[
            (
                "host",
                ParamSpec {
                    shorthand: "-h",
                    required: true,
                },
            ),
            (
                "verbose",
                ParamSpec {
                    shorthand: "-v",
                    required: false,
                },
            ),
        ];
    }

    #[test]
    fn test_ssh_config_rendering() {
        let config = SshConfig::new([("identity_file", "/home/alice/.ssh/id_rsa"), ("port", "2222")])
            .unwrap();
        assert_eq!(config.to_string(), "-i /home/alice/.ssh/id_rsa -p 2222");

        let config = SshConfig::new([("port", "2222"), ("identity_file", "key.pem")]).unwrap();
        assert_eq!(config.to_string(), "-p 2222 -i key.pem");
    }

    #[test]
    fn test_ssh_config_builders() {
        let config = SshConfig::empty()
            .unwrap()
            .with_port(2200)
            .unwrap()
            .with_identity_file("/keys/deploy")
            .unwrap();
        assert_eq!(config.get("port"), Some("2200"));
        assert_eq!(config.to_string(), "-p 2200 -i /keys/deploy");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SshConfig::new([("timeout", "10")]).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_required_key_enforced() {
        let err = ValidatedConfig::<StrictSchema>::new([("verbose", "1")]).unwrap_err();
        assert!(err.to_string().contains("host"));

        let config = ValidatedConfig::<StrictSchema>::new([("host", "db1")]).unwrap();
        assert_eq!(config.to_string(), "-h db1");
        assert!(ValidatedConfig::<StrictSchema>::empty().is_err());
    }

    #[test]
    fn test_empty_ssh_config_renders_nothing() {
        let config = SshConfig::empty().unwrap();
        assert!(config.is_empty());
        assert_eq!(config.to_string(), "");
    }
}
