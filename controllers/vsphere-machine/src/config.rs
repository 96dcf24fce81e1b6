//! Controller configuration.
//!
//! All settings come from environment variables and are read once at startup.

use crate::error::ControllerError;
use std::time::Duration;

const DEFAULT_IP_WAIT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_IP_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_CONTROLLER_NAME: &str = "vsphere-machine-controller";

/// Runtime configuration for the controller
#[derive(Clone)]
pub struct ControllerConfig {
    /// Default vCenter endpoint (a Cluster's provider spec may override it)
    pub vsphere_server: String,
    /// SSO user name
    pub vsphere_username: String,
    /// SSO password
    pub vsphere_password: String,
    /// Accept self-signed vCenter certificates
    pub vsphere_insecure: bool,
    /// Lifetime of each reconciliation pass's context
    pub ip_wait_timeout: Duration,
    /// Interval between guest identity reads while waiting for an IP
    pub ip_poll_interval: Duration,
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Reporting component name on published events
    pub controller_name: String,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("vsphere_server", &self.vsphere_server)
            .field("vsphere_username", &self.vsphere_username)
            .field("vsphere_password", &"<redacted>")
            .field("vsphere_insecure", &self.vsphere_insecure)
            .field("ip_wait_timeout", &self.ip_wait_timeout)
            .field("ip_poll_interval", &self.ip_poll_interval)
            .field("namespace", &self.namespace)
            .field("controller_name", &self.controller_name)
            .finish()
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ControllerError::InvalidConfig(format!(
                    "{} environment variable is required",
                    key
                )))
        };

        let vsphere_server = required("VSPHERE_SERVER")?;
        let vsphere_username = required("VSPHERE_USERNAME")?;
        let vsphere_password = required("VSPHERE_PASSWORD")?;

        let vsphere_insecure = match lookup("VSPHERE_INSECURE") {
            None => false,
            Some(value) => parse_bool("VSPHERE_INSECURE", &value)?,
        };

        let ip_wait_timeout = parse_secs(&lookup, "IP_WAIT_TIMEOUT_SECS", DEFAULT_IP_WAIT_TIMEOUT_SECS)?;
        let ip_poll_interval = parse_secs(&lookup, "IP_POLL_INTERVAL_SECS", DEFAULT_IP_POLL_INTERVAL_SECS)?;

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let controller_name = lookup("CONTROLLER_NAME")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTROLLER_NAME.to_string());

        Ok(Self {
            vsphere_server,
            vsphere_username,
            vsphere_password,
            vsphere_insecure,
            ip_wait_timeout,
            ip_poll_interval,
            namespace,
            controller_name,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        None => default,
        Some(value) => value.trim().parse::<u64>().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} must be a number of seconds: {}", key, e))
        })?,
    };
    if secs == 0 {
        return Err(ControllerError::InvalidConfig(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("VSPHERE_SERVER", "vcenter.lab.local"),
        ("VSPHERE_USERNAME", "administrator@vsphere.local"),
        ("VSPHERE_PASSWORD", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.vsphere_server, "vcenter.lab.local");
        assert!(!config.vsphere_insecure);
        assert_eq!(config.ip_wait_timeout, Duration::from_secs(600));
        assert_eq!(config.ip_poll_interval, Duration::from_secs(5));
        assert_eq!(config.namespace, None);
        assert_eq!(config.controller_name, "vsphere-machine-controller");
    }

    #[test]
    fn test_missing_password() {
        let err = ControllerConfig::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("VSPHERE_PASSWORD"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("VSPHERE_INSECURE", "true"),
            ("IP_WAIT_TIMEOUT_SECS", "30"),
            ("IP_POLL_INTERVAL_SECS", "2"),
            ("WATCH_NAMESPACE", "capi-system"),
            ("CONTROLLER_NAME", "capv"),
        ]);
        let config = ControllerConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.vsphere_insecure);
        assert_eq!(config.ip_wait_timeout, Duration::from_secs(30));
        assert_eq!(config.ip_poll_interval, Duration::from_secs(2));
        assert_eq!(config.namespace.as_deref(), Some("capi-system"));
        assert_eq!(config.controller_name, "capv");
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("IP_WAIT_TIMEOUT_SECS", "ten"));
        assert!(ControllerConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("IP_POLL_INTERVAL_SECS", "0"));
        assert!(ControllerConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ControllerConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
    }
}
