// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod mastodon;

use async_trait::async_trait;

pub use mastodon::{MastodonClient, resolve_access_token};

use crate::error::PublishError;

/// Outbound social transport
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one post
    async fn post(&self, content: &str) -> Result<(), PublishError>;
}
