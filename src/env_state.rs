//! # Imagery service environment
//!
//! This module defines [`crate::env_state::ImageryEnv`], the **shared environment object** used to
//! talk to the remote imagery service. It provides:
//!
//! - A persistent blocking **HTTP client** with a global request timeout.
//! - The **project / account identifier** under which the service is queried.
//! - The **base endpoint** of the service.
//!
//! ## Overview
//!
//! ```text
//! ImageryEnv
//! ├── http_client (reqwest::blocking::Client)
//! ├── project     (TREEMETRICS_PROJECT)
//! └── endpoint    (TREEMETRICS_ENDPOINT)
//! ```
//!
//! Authentication is handled outside of this crate; the service is expected to accept requests
//! scoped by project identifier.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use treemetrics::env_state::ImageryEnv;
//!
//! let env = ImageryEnv::from_env().unwrap();
//! println!("{}", env.url("scenes:search"));
//! ```
//!
//! ## See also
//!
//! - [`HttpImageryClient`](crate::imagery::http_client::HttpImageryClient) – The client built on top of this environment.
use std::{env, time::Duration};

use reqwest::blocking::Client;

use crate::treemetrics_errors::TreeMetricsError;

/// Environment variable holding the project / account identifier
pub const PROJECT_VAR: &str = "TREEMETRICS_PROJECT";
/// Environment variable holding the base URL of the imagery service
pub const ENDPOINT_VAR: &str = "TREEMETRICS_ENDPOINT";
/// Environment variable holding the request timeout, in seconds
pub const TIMEOUT_VAR: &str = "TREEMETRICS_TIMEOUT_SECS";

const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// This object is passed to the imagery client to provide access to the remote service
///
/// # Fields
///
/// * `http_client` - A blocking reqwest client reused across every request
/// * `project` - The project identifier scoping every query
/// * `endpoint` - The base URL of the service, without trailing slash
#[derive(Debug, Clone)]
pub struct ImageryEnv {
    pub http_client: Client,
    pub project: String,
    pub endpoint: String,
}

impl ImageryEnv {
    /// Create a new environment with an explicit project, endpoint and timeout.
    ///
    /// Arguments
    /// -----------------
    /// * `project`: The project / account identifier.
    /// * `endpoint`: Base URL of the imagery service (a trailing `/` is stripped).
    /// * `timeout`: Global timeout applied to every request.
    ///
    /// Return
    /// ----------
    /// * A new [`ImageryEnv`], or a [`TreeMetricsError::ReqwestError`] if the client cannot be built.
    pub fn new(
        project: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TreeMetricsError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("treemetrics/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ImageryEnv {
            http_client,
            project: project.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the environment from the process environment.
    ///
    /// `TREEMETRICS_PROJECT` is required; `TREEMETRICS_ENDPOINT` and `TREEMETRICS_TIMEOUT_SECS`
    /// fall back to `http://localhost:8080` and 30 seconds.
    pub fn from_env() -> Result<Self, TreeMetricsError> {
        let project = env::var(PROJECT_VAR)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| TreeMetricsError::MissingEnvironment(PROJECT_VAR.to_string()))?;

        let endpoint = env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let timeout_secs = match env::var(TIMEOUT_VAR) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                TreeMetricsError::InvalidParameter(format!(
                    "{TIMEOUT_VAR} must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self::new(project, endpoint, Duration::from_secs(timeout_secs))
    }

    /// Full URL of a project-scoped service method.
    pub fn url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.endpoint,
            self.project,
            method.trim_start_matches('/')
        )
    }
}
