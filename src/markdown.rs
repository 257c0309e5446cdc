//! The Markdown collaborator: converts a body buffer to HTML. Conversion is
//! infallible, so Markdown can never fail a page's render; the worst a bad
//! body can do is produce ugly output.

use pulldown_cmark::{html, Options, Parser};

/// Renders `markdown` to an HTML string.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}
