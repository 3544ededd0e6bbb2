// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain-text rendering of episode show notes.

/// Render width large enough that show notes are never wrapped
const UNWRAPPED_WIDTH: usize = 10_000;

/// Render HTML as plain text
///
/// Emphasis and link markers are not emitted, link footnotes are off and
/// tables have no borders. Lines are never wrapped. If the markup cannot
/// be rendered, the input is returned with its entities decoded.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::config::plain_no_decorate()
        .no_table_borders()
        .link_footnotes(false)
        .string_from_read(html.as_bytes(), UNWRAPPED_WIDTH);

    match rendered {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not render show notes, using raw text");
            html_escape::decode_html_entities(html.trim()).into_owned()
        }
    }
}
