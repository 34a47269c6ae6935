//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable replacing the listener port.
pub const APP_PORT_ENV: &str = "APP_PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}: {reason}")]
    Env { var: String, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document. Missing sections take their defaults.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply `APP_PORT` and `<NAME>_SERVICE_URL` overrides.
pub fn apply_env_overrides<I>(config: &mut GatewayConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if key == APP_PORT_ENV {
            let port: u16 = value.trim().parse().map_err(|_| ConfigError::Env {
                var: key.clone(),
                reason: format!("{:?} is not a port number", value),
            })?;
            config.listener.bind_address = replace_port(&config.listener.bind_address, port);
            tracing::debug!(port, "Listener port overridden from environment");
            continue;
        }

        if let Some(dependency) = config
            .dependencies
            .iter_mut()
            .find(|d| d.url_env_var() == key)
        {
            tracing::debug!(dependency = %dependency.name, url = %value, "Dependency URL overridden from environment");
            dependency.base_url = value;
        }
    }
    Ok(())
}

fn replace_port(bind_address: &str, port: u16) -> String {
    let host = bind_address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .filter(|host| !host.is_empty())
        .unwrap_or("0.0.0.0");
    format!("{}:{}", host, port)
}

/// Process environment, minus pairs that are not valid UTF-8.
fn utf8_env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some((key, value)),
        _ => None,
    })
}

/// Load configuration: file (or defaults), then environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, utf8_env_vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::upstream::PayloadKind;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_document() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:4000"

            [[dependencies]]
            name = "products"
            base_url = "http://products:8080"
            path = "/products"
            timeout_ms = 1500
            expect = "array"

            [timeouts]
            request_ms = 5000

            [chaos]
            enabled = true
            [chaos.routes.aggregate]
            failure_probability = 0.25
            min_latency_ms = 10
            max_latency_ms = 40

            [observability]
            log_format = "json"
            sample_ratio = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.dependencies.len(), 1);
        assert_eq!(config.dependencies[0].expect, PayloadKind::Array);
        assert_eq!(config.timeouts.request_ms, 5000);

        let policy = config.chaos.policy_for("aggregate");
        assert_eq!(policy.failure_probability, 0.25);
        assert_eq!((policy.min_latency_ms, policy.max_latency_ms), (10, 40));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        // Unset fields keep their defaults.
        assert_eq!(config.observability.log_level, "info");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config("").unwrap();
        let names: Vec<&str> = config.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["categories", "pricing"]);
        assert_eq!(config.dependencies[0].path, "/categories");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_config("[listener\nbind_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            vars(&[
                ("APP_PORT", "3100"),
                ("PRICING_SERVICE_URL", "http://sales-java:8080"),
                ("UNRELATED", "x"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:3100");
        assert_eq!(config.dependencies[0].base_url, "http://localhost:8081");
        assert_eq!(config.dependencies[1].base_url, "http://sales-java:8080");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, vars(&[("APP_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::NoDependencies,
            ValidationError::SampleRatio(2.0),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: at least one dependency must be configured, observability.sample_ratio 2 is outside [0, 1]"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_environment_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("AGGREGATION_GATEWAY_TEST_RAW", OsStr::from_bytes(b"\xff\xfe"));
        let vars: Vec<(String, String)> = utf8_env_vars().collect();
        std::env::remove_var("AGGREGATION_GATEWAY_TEST_RAW");

        assert!(vars.iter().all(|(key, _)| key != "AGGREGATION_GATEWAY_TEST_RAW"));
    }

    #[test]
    fn test_replace_port() {
        assert_eq!(replace_port("127.0.0.1:3000", 80), "127.0.0.1:80");
        assert_eq!(replace_port("[::1]:3000", 80), "[::1]:80");
        assert_eq!(replace_port("garbage", 80), "0.0.0.0:80");
    }
}
