pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use tracing::debug;

/// Desktop Chrome identity sent for every render. Third-party review pages
/// serve degraded or blocked markup to obvious bot user agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// A step the rendering service runs inside the page before returning the
/// DOM. Platform quirks (cookie walls, lazy-loaded review lists) live here
/// so callers stay generic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    /// Click the element matching the selector if present (cookie banners).
    Click { selector: String },
    /// Scroll to the bottom of the page to trigger lazy loading.
    ScrollToBottom,
    /// Wait a fixed delay for client-side content to settle.
    WaitMs(u64),
}

impl PageAction {
    fn to_json(&self) -> serde_json::Value {
        match self {
            PageAction::Click { selector } => serde_json::json!({
                "type": "click",
                "selector": selector,
                "optional": true,
            }),
            PageAction::ScrollToBottom => serde_json::json!({ "type": "scrollToBottom" }),
            PageAction::WaitMs(ms) => serde_json::json!({ "type": "wait", "ms": ms }),
        }
    }
}

/// Per-request rendering options.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub actions: Vec<PageAction>,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            actions: Vec::new(),
        }
    }
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint, running the requested page actions first. The timeout in
    /// `options` is a hard cap on the whole render.
    pub async fn content(&self, url: &str, options: &ContentOptions) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "userAgent": options.user_agent,
            "gotoOptions": {
                "timeout": options.timeout.as_millis() as u64,
                "waitUntil": "networkidle2",
            },
            "actions": options.actions.iter().map(|a| a.to_json()).collect::<Vec<_>>(),
        });

        debug!(url, actions = options.actions.len(), "Browserless content request");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout {
                        timeout_ms: options.timeout.as_millis() as u64,
                    }
                } else {
                    BrowserlessError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_actions_are_marked_optional() {
        let action = PageAction::Click {
            selector: "#accept-cookies".to_string(),
        };
        let json = action.to_json();
        assert_eq!(json["type"], "click");
        assert_eq!(json["optional"], true);
    }

    #[test]
    fn default_options_carry_a_browser_identity() {
        let options = ContentOptions::default();
        assert!(options.user_agent.contains("Chrome"));
        assert_eq!(options.timeout, Duration::from_secs(20));
        assert!(options.actions.is_empty());
    }
}
