// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::Publisher;
use crate::error::PublishError;

/// Statuses are always posted publicly and without a content warning
const VISIBILITY: &str = "public";
const SENSITIVE: &str = "false";

/// Publishes statuses to a Mastodon account
pub struct MastodonClient {
    client: reqwest::Client,
    statuses_url: Url,
    access_token: SecretString,
}

impl MastodonClient {
    /// Create a client for the instance at `api_url`
    pub fn new(
        client: reqwest::Client,
        api_url: &str,
        access_token: SecretString,
    ) -> Result<Self, PublishError> {
        if access_token.expose_secret().trim().is_empty() {
            return Err(PublishError::EmptySecret);
        }

        let statuses_url = Url::parse(&format!(
            "{}/api/v1/statuses",
            api_url.trim().trim_end_matches('/')
        ))?;

        Ok(Self {
            client,
            statuses_url,
            access_token,
        })
    }
}

impl std::fmt::Debug for MastodonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonClient")
            .field("statuses_url", &self.statuses_url.as_str())
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Publisher for MastodonClient {
    async fn post(&self, content: &str) -> Result<(), PublishError> {
        let url = self.statuses_url.as_str();

        let form = [
            ("status", content),
            ("visibility", VISIBILITY),
            ("sensitive", SENSITIVE),
        ];

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| PublishError::HttpFailed {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(url, "Status published");
        Ok(())
    }
}

/// Turn a configured secret into an access token
///
/// The secret is either the token itself or the path of a file whose first
/// non-empty line is the token.
pub fn resolve_access_token(secret: &str) -> Result<SecretString, PublishError> {
    let secret = secret.trim();
    let path = Path::new(secret);

    let token = if !secret.is_empty() && path.is_file() {
        let content = std::fs::read_to_string(path).map_err(|e| PublishError::SecretReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        secret.to_string()
    };

    if token.is_empty() {
        return Err(PublishError::EmptySecret);
    }

    Ok(SecretString::from(token))
}
