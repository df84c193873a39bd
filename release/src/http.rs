//! Shared HTTP agent for artifact downloads and CI API requests.

use crate::error::ReleaseError;
use std::sync::OnceLock;
use std::time::Duration;

/// Global timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared `ureq` agent with request timeout configuration.
pub(crate) fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`ReleaseError::Network`].
pub(crate) fn map_ureq_error(url: &str, err: &ureq::Error) -> ReleaseError {
    let reason = match err {
        ureq::Error::StatusCode(code) => format!("HTTP status {code}"),
        other => other.to_string(),
    };
    ReleaseError::Network {
        url: url.to_owned(),
        reason,
    }
}
