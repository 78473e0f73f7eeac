use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Slack,
    Notion,
    Jira,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Slack, Service::Notion, Service::Jira];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Notion => "notion",
            Self::Jira => "jira",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which third-party services the tenant has connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    #[serde(default)]
    pub slack: bool,
    #[serde(default)]
    pub notion: bool,
    #[serde(default)]
    pub jira: bool,
}

impl IntegrationStatus {
    pub fn is_connected(&self, service: Service) -> bool {
        match service {
            Service::Slack => self.slack,
            Service::Notion => self.notion,
            Service::Jira => self.jira,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DisconnectReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// Url the browser must open to start the OAuth connect flow:
/// `<base>/auth/<service>/<tenant>?userId=<id>`.
pub fn connect_url(
    base_url: &str,
    service: Service,
    tenant_slug: &str,
    user_id: Option<&str>,
) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base_url).map_err(|_| ConfigError::Value {
        name: "api_base_url",
        value: base_url.to_string(),
    })?;
    url.path_segments_mut()
        .map_err(|()| ConfigError::Value {
            name: "api_base_url",
            value: base_url.to_string(),
        })?
        .pop_if_empty()
        .extend(["auth", service.as_str(), tenant_slug]);
    url.query_pairs_mut()
        .append_pair("userId", user_id.unwrap_or_default());
    Ok(url)
}
