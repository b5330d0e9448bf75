//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (prefixes non-empty, target ports valid)
//! - Reject a metrics address that cannot be bound
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Duplicate listen ports are left to the OS bind, which fails at startup

use crate::config::schema::RouterConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no listeners configured under `router`")]
    NoListeners,

    #[error("listener {listen_port}: route #{index} has an empty path prefix")]
    EmptyPathPrefix { listen_port: u16, index: usize },

    #[error("listener {listen_port}: route `{path_prefix}` targets port 0")]
    InvalidTargetPort { listen_port: u16, path_prefix: String },

    #[error("observability.metrics_address `{address}` is not a socket address")]
    InvalidMetricsAddress { address: String },
}

/// Check a parsed configuration, collecting every error found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
    }

    for listener in &config.listeners {
        for (index, route) in listener.routes.iter().enumerate() {
            if route.path_prefix.is_empty() {
                errors.push(ValidationError::EmptyPathPrefix {
                    listen_port: listener.listen_port,
                    index,
                });
            }
            if route.target_port == 0 {
                errors.push(ValidationError::InvalidTargetPort {
                    listen_port: listener.listen_port,
                    path_prefix: route.path_prefix.clone(),
                });
            }
        }
    }

    if config.observability.metrics_socket_addr().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress {
            address: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ListenerSpec, RouteEntry};

    fn listener(port: u16, routes: Vec<RouteEntry>) -> ListenerSpec {
        ListenerSpec {
            listen_port: port,
            routes,
        }
    }

    #[test]
    fn accepts_valid_config() {
        let config = RouterConfig {
            listeners: vec![listener(8080, vec![RouteEntry::new("/", None, 3000)])],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_empty_listener_set() {
        let errors = validate_config(&RouterConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoListeners]);
    }

    #[test]
    fn collects_all_errors() {
        let config = RouterConfig {
            listeners: vec![listener(
                8080,
                vec![RouteEntry::new("", None, 3000), RouteEntry::new("/api", None, 0)],
            )],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            ValidationError::EmptyPathPrefix {
                listen_port: 8080,
                index: 0
            }
        );
        assert!(errors[1].to_string().contains("/api"));
    }

    #[test]
    fn rejects_unparseable_metrics_address() {
        let mut config = RouterConfig {
            listeners: vec![listener(8080, vec![RouteEntry::new("/", None, 3000)])],
            ..Default::default()
        };
        config.observability.metrics_address = "localhost:not-a-port".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidMetricsAddress {
                address: "localhost:not-a-port".to_string()
            }]
        );
    }

    #[test]
    fn duplicate_ports_are_not_a_validation_error() {
        let route = RouteEntry::new("/", None, 3000);
        let config = RouterConfig {
            listeners: vec![listener(8080, vec![route.clone()]), listener(8080, vec![route])],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
