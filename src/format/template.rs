// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use crate::error::TemplateError;

/// Template used when no template file is configured or present
pub const DEFAULT_TEMPLATE: &str = "New {{ podcast_name }} episode: {{ title }}\n\n{{ description }}\n{{ url }}\n";

/// Values a post template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    PodcastName,
    Title,
    Description,
    Url,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "podcast_name" => Some(Self::PodcastName),
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value(Placeholder),
}

/// A parsed post template with `{{ name }}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTemplate {
    segments: Vec<Segment>,
}

impl PostTemplate {
    /// Parse template source, validating every placeholder
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let inner = &rest[start + 2..];
            let end = inner.find("}}").ok_or(TemplateError::Unclosed {
                offset: offset + start,
            })?;

            let name = inner[..end].trim();
            let placeholder = Placeholder::from_name(name).ok_or_else(|| {
                TemplateError::UnknownPlaceholder {
                    name: name.to_string(),
                }
            })?;
            segments.push(Segment::Value(placeholder));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Load a template file, falling back to [`DEFAULT_TEMPLATE`] when it does not exist
    ///
    /// The fallback is logged as a warning.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::parse(&source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Post template not found, using built-in default");
                Self::parse(DEFAULT_TEMPLATE)
            }
            Err(e) => Err(TemplateError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Substitute placeholder values
    pub fn render(&self, lookup: impl Fn(Placeholder) -> String) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Value(placeholder) => lookup(*placeholder),
            })
            .collect()
    }
}

impl Default for PostTemplate {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Text("New ".to_string()),
                Segment::Value(Placeholder::PodcastName),
                Segment::Text(" episode: ".to_string()),
                Segment::Value(Placeholder::Title),
                Segment::Text("\n\n".to_string()),
                Segment::Value(Placeholder::Description),
                Segment::Text("\n".to_string()),
                Segment::Value(Placeholder::Url),
                Segment::Text("\n".to_string()),
            ],
        }
    }
}
