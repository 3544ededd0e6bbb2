// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod html;
mod template;

use std::path::Path;

pub use html::html_to_text;
pub use template::{DEFAULT_TEMPLATE, Placeholder, PostTemplate};

use crate::dedup::NewEpisode;
use crate::error::TemplateError;

/// Default character budget for the rendered description
pub const DEFAULT_DESCRIPTION_MAX_LENGTH: usize = 275;

/// Turns new episodes into post text
#[derive(Debug, Clone)]
pub struct PostFormatter {
    template: PostTemplate,
    description_max_length: usize,
}

impl PostFormatter {
    pub fn new(template: PostTemplate, description_max_length: usize) -> Self {
        Self {
            template,
            description_max_length,
        }
    }

    /// Build a formatter from a template file, using the default template if it is absent
    pub fn from_template_file(path: &Path, description_max_length: usize) -> Result<Self, TemplateError> {
        Ok(Self::new(PostTemplate::load(path)?, description_max_length))
    }

    /// Render one episode as a post
    pub fn format(&self, episode: &NewEpisode, podcast_name: Option<&str>) -> String {
        let title = unsmart_quotes(&episode.title);
        let description = truncate_description(
            &html_to_text(&unsmart_quotes(&episode.description)),
            self.description_max_length,
        );

        self.template.render(|placeholder| match placeholder {
            Placeholder::PodcastName => podcast_name.unwrap_or_default().to_string(),
            Placeholder::Title => title.clone(),
            Placeholder::Description => description.clone(),
            Placeholder::Url => episode.url.clone().unwrap_or_default(),
        })
    }
}

impl Default for PostFormatter {
    fn default() -> Self {
        Self::new(PostTemplate::default(), DEFAULT_DESCRIPTION_MAX_LENGTH)
    }
}

/// Replace typographic quotes with plain ones
pub fn unsmart_quotes(text: &str) -> String {
    text.replace('\u{2019}', "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Cut a description to `max_chars` characters, marking the cut with `...`
///
/// The result always ends with exactly one newline.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...\n", cut.trim())
    } else {
        format!("{}\n", text.trim())
    }
}
