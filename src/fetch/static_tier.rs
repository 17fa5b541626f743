//! Static fetch tier: a plain HTTP GET
//!
//! Error mapping:
//!
//! | Condition | Error | Transient |
//! |-----------|-------|-----------|
//! | Timeout | `FetchError::Timeout` | yes |
//! | Connection / body failure | `FetchError::Network` | yes |
//! | HTTP 429 / 5xx | `FetchError::Http` | yes |
//! | Other non-2xx | `FetchError::Http` | no |

use crate::config::Config;
use crate::fetch::{FetchedPage, Tier};
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds the HTTP client shared by the static tier and the robots gate
///
/// # Arguments
///
/// * `config` - The harvester configuration (user agent and static timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_millis(config.fetch.static_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL over plain HTTP
pub async fn fetch_static(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let content = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(url, e))?;

    Ok(FetchedPage {
        final_url,
        content,
        tier: Tier::Static,
    })
}

fn classify_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            tier: Tier::Static,
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
