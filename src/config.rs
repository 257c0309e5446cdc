//! The run configuration: one immutable struct, populated from the command
//! line in `main` and passed by reference to every component. There is no
//! other configuration state.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Generates a site: walks the source tree, stacks scoped metadata along
/// each page's directory path, resolves a template per page from the
/// template tree, renders, and mirrors the result into the output tree.
#[derive(Parser, Debug, Clone)]
#[command(name = "pagestack", version, about)]
pub struct Config {
    /// Directory containing the site source
    #[arg(long, default_value = "_source")]
    pub source_dir: PathBuf,

    /// Directory containing templates, mirroring the source tree
    #[arg(long, default_value = "_templates")]
    pub template_dir: PathBuf,

    /// Directory of static assets copied verbatim into the output root
    #[arg(long, default_value = "_static")]
    pub static_dir: PathBuf,

    /// Directory where the site will be written
    #[arg(long, default_value = "_output")]
    pub output_dir: PathBuf,

    /// Output subdirectory for date-named entries
    #[arg(long, default_value = "blog")]
    pub blog_dir: String,

    /// Line separating front matter from body content
    #[arg(long, default_value = "---")]
    pub delimiter: String,

    /// Metadata key naming a page's template, overriding the search
    #[arg(long, default_value = "template")]
    pub template_key: String,

    /// Metadata key overriding a page's deduced output path
    #[arg(long, default_value = "output")]
    pub output_key: String,

    /// Context key the rendered body content is injected under
    #[arg(long, default_value = "content")]
    pub content_key: String,

    /// Metadata key requesting the content index (count or `true`), also
    /// read as a mapping of index-tuple overrides
    #[arg(long, default_value = "index")]
    pub index_key: String,

    /// Index-tuple field name used for ordering
    #[arg(long, default_value = "sortkey")]
    pub sort_key: String,

    /// Default index bucket for date-named entries
    #[arg(long, default_value = "blog")]
    pub index_type: String,

    /// Extension given to rendered output files
    #[arg(long, default_value = "html")]
    pub output_extension: String,

    /// Extension identifying template files
    #[arg(long, default_value = "html")]
    pub template_extension: String,

    /// Absolute base URL of the published site; enables the Atom feed
    #[arg(long)]
    pub site_url: Option<Url>,

    /// File name of the Atom feed, relative to the output root
    #[arg(long, default_value = "feed.atom")]
    pub feed_file: String,

    /// Write redirect stubs for date-named entries
    #[arg(long)]
    pub redirects: bool,

    /// Log one line per processed file
    #[arg(short, long)]
    pub verbose: bool,

    /// Log resolution decisions
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
impl Config {
    /// A configuration with every knob at its CLI default, for tests to
    /// adjust.
    pub fn for_tests() -> Config {
        Config::parse_from(["pagestack"])
    }
}
