use reqwest::Client;

use crate::domain::DomainError;
use crate::infrastructure::config::HttpConfig;

/// One client shared by every outbound integration. Every request carries
/// the configured timeout; redirects are followed.
pub fn build_client(config: &HttpConfig) -> Result<Client, DomainError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| DomainError::internal(format!("http client: {e}")))
}

pub(crate) fn transport_error(err: reqwest::Error) -> DomainError {
    if err.is_timeout() {
        DomainError::transport(format!("request timed out: {err}"))
    } else {
        DomainError::transport(err.to_string())
    }
}
