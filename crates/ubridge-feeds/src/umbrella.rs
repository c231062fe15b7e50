//! Cisco Umbrella API client — OAuth token, identity listing, and paginated
//! activity reports.

use crate::error::{read_json, FeedError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use ubridge_core::config::UmbrellaConfig;
use ubridge_core::identity::identity_key;
use ubridge_core::RawRecord;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Management API listings folded into the identity cache, with the field
/// holding each item's ID and the field holding its display name.
const IDENTITY_LISTINGS: &[(&str, &str, &str)] = &[("roamingcomputers", "originId", "name")];

/// Reporting API activity endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEndpoint {
    Dns,
    Proxy,
    Firewall,
}

impl ActivityEndpoint {
    /// Endpoints in the order a cycle fetches them.
    pub const ALL: [ActivityEndpoint; 3] = [
        ActivityEndpoint::Dns,
        ActivityEndpoint::Proxy,
        ActivityEndpoint::Firewall,
    ];

    pub fn path(self) -> &'static str {
        match self {
            ActivityEndpoint::Dns => "/activity",
            ActivityEndpoint::Proxy => "/activity/proxy",
            ActivityEndpoint::Firewall => "/activity/firewall",
        }
    }
}

impl std::fmt::Display for ActivityEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityEndpoint::Dns => write!(f, "DNS"),
            ActivityEndpoint::Proxy => write!(f, "Proxy"),
            ActivityEndpoint::Firewall => write!(f, "Firewall"),
        }
    }
}

/// Half-open time range queried from the reporting API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ActivityWindow {
    /// The `length` immediately preceding `to`.
    pub fn ending_at(to: DateTime<Utc>, length: Duration) -> Self {
        let length = chrono::Duration::from_std(length).unwrap_or(chrono::Duration::zero());
        Self {
            from: to - length,
            to,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct ActivityPage {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Deserialize, Default)]
struct PageMeta {
    #[serde(rename = "hasMoreData", default)]
    has_more_data: bool,
    #[serde(rename = "nextPage", default)]
    next_page: Option<String>,
}

/// Client for the Umbrella auth, management, and reporting APIs.
#[derive(Debug, Clone)]
pub struct UmbrellaClient {
    http: reqwest::Client,
    config: UmbrellaConfig,
}

impl UmbrellaClient {
    pub fn new(config: UmbrellaConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Exchange the API key and secret for a bearer token.
    pub async fn fetch_token(&self) -> Result<String, FeedError> {
        tracing::info!("requesting new auth token from Cisco Umbrella");
        let response = self
            .http
            .post(&self.config.auth_url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let body: TokenResponse = read_json(response).await?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(FeedError::MissingToken)?;
        tracing::info!("obtained new auth token");
        Ok(token)
    }

    /// Build the identity ID → display name map from the management API.
    ///
    /// A listing that fails part-way keeps the entries read so far.
    pub async fn fetch_identities(&self, token: &str) -> HashMap<String, String> {
        let mut identities = HashMap::new();
        for &(listing, id_key, name_key) in IDENTITY_LISTINGS {
            if let Err(err) = self
                .collect_identities(token, listing, id_key, name_key, &mut identities)
                .await
            {
                tracing::error!(listing, %err, "error fetching identities");
            }
        }
        tracing::info!(entries = identities.len(), "identity cache built");
        identities
    }

    async fn collect_identities(
        &self,
        token: &str,
        listing: &str,
        id_key: &str,
        name_key: &str,
        out: &mut HashMap<String, String>,
    ) -> Result<(), FeedError> {
        let mut url = Some(format!(
            "{}/{}",
            self.config.management_api_url.trim_end_matches('/'),
            listing
        ));
        while let Some(next) = url.take() {
            tracing::debug!(url = %next, "fetching identity page");
            let body: Value = read_json(self.http.get(&next).bearer_auth(token).send().await?).await?;
            let items = match &body {
                Value::Array(items) => items.as_slice(),
                other => other
                    .get("data")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            };
            for item in items {
                let id = item.get(id_key).and_then(identity_key);
                let name = item.get(name_key).and_then(Value::as_str);
                if let (Some(id), Some(name)) = (id, name) {
                    out.insert(id, name.to_string());
                }
            }
            url = body
                .get("meta")
                .and_then(|meta| meta.get("next"))
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_owned);
        }
        Ok(())
    }

    /// Fetch every record of one activity type inside `window`.
    ///
    /// Pages are followed while the API reports more data. If a page fails,
    /// the error is logged and the records already read are returned.
    pub async fn fetch_activity(
        &self,
        token: &str,
        endpoint: ActivityEndpoint,
        window: &ActivityWindow,
    ) -> Vec<RawRecord> {
        tracing::info!(
            kind = %endpoint,
            from = %window.from.to_rfc3339(),
            to = %window.to.to_rfc3339(),
            "fetching activity logs"
        );
        let mut records = Vec::new();
        if let Err(err) = self.collect_pages(token, endpoint, window, &mut records).await {
            tracing::error!(kind = %endpoint, %err, "error fetching activity logs");
        }
        tracing::info!(kind = %endpoint, count = records.len(), "activity logs found in window");
        records
    }

    async fn collect_pages(
        &self,
        token: &str,
        endpoint: ActivityEndpoint,
        window: &ActivityWindow,
        out: &mut Vec<RawRecord>,
    ) -> Result<(), FeedError> {
        let mut request = self
            .http
            .get(self.activity_url(endpoint))
            .bearer_auth(token)
            .query(&self.window_params(window));
        let mut page = 1usize;

        loop {
            tracing::debug!(kind = %endpoint, page, "fetching activity page");
            let body: ActivityPage = read_json(request.send().await?).await?;
            out.extend(body.data.unwrap_or_default().into_iter().filter_map(|record| {
                match record {
                    Value::Object(record) => Some(record),
                    _ => None,
                }
            }));

            let meta = body.meta.unwrap_or_default();
            match meta.next_page.filter(|next| meta.has_more_data && !next.is_empty()) {
                Some(next) => {
                    request = self.http.get(next).bearer_auth(token);
                    page += 1;
                }
                None => return Ok(()),
            }
        }
    }

    fn activity_url(&self, endpoint: ActivityEndpoint) -> String {
        format!(
            "{}/organizations/{}{}",
            self.config.reports_api_url.trim_end_matches('/'),
            self.config.organization_id,
            endpoint.path()
        )
    }

    fn window_params(&self, window: &ActivityWindow) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("from", window.from.timestamp_millis().to_string()),
            ("to", window.to.timestamp_millis().to_string()),
            ("limit", self.config.page_limit.to_string()),
        ];
        if let Some(categories) = self.config.category_ids.as_deref().filter(|c| !c.is_empty()) {
            tracing::debug!(categories, "applying category filter");
            params.push(("categories", categories.to_string()));
        }
        params
    }
}
