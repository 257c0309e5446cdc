//! The build pipeline. Three sequential passes over one sorted walk of the
//! source tree:
//!
//! 1. Gather config: every fragment file merges into the stack at its
//!    containing directory (fragments at the source root are global).
//! 2. Gather content: every page file parses into a [`SourceFile`]; its
//!    metadata (plus derived output/URL/date keys) lands in the stack at the
//!    page's own path, and date-named entries contribute to the index.
//! 3. Render: every page resolves a template and a context, renders, and is
//!    written to the mirrored output path; everything unrecognized copies
//!    byte-for-byte.
//!
//! Per-file errors are logged and that file is skipped; only setup errors
//! abort the run. Re-running over an unchanged tree rewrites the same bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use url::Url;

use crate::config::Config;
use crate::feed::{self, FeedConfig};
use crate::index::Index;
use crate::path;
use crate::source::{self, Parser, SourceFile};
use crate::stack::{Context, Stack};
use crate::template::{self, Resolver};
use crate::value;
use crate::write;

/// What a run accomplished, for the closing summary line.
#[derive(Debug, Default)]
pub struct Stats {
    pub fragments: usize,
    pub rendered: usize,
    pub copied: usize,
    pub redirects: usize,
    pub failed: usize,
}

/// How the pipeline treats one discovered file.
enum FileKind {
    Fragment,
    Page,
    Static,
}

fn classify(file: &Path) -> FileKind {
    match path::extension(file).as_deref() {
        Some("json") | Some("yaml") | Some("yml") => FileKind::Fragment,
        Some("md") | Some("html") => FileKind::Page,
        _ => FileKind::Static,
    }
}

/// Builds the site described by `config`. Returns the run's [`Stats`];
/// errors only for setup problems, never for an individual file.
pub fn build_site(config: &Config) -> Result<Stats> {
    if !config.source_dir.is_dir() {
        return Err(Error::MissingSourceDir(config.source_dir.clone()));
    }
    if !config.template_dir.is_dir() {
        return Err(Error::MissingTemplateDir(config.template_dir.clone()));
    }
    fs::create_dir_all(&config.output_dir).map_err(|err| Error::CreateOutputDir {
        path: config.output_dir.clone(),
        err,
    })?;

    let files = path::files_under(&config.source_dir);
    let mut stats = Stats::default();

    // Phase 1: gather config fragments.
    let mut stack = Stack::new();
    for file in &files {
        if !matches!(classify(file), FileKind::Fragment) {
            continue;
        }
        let rel = path::relative(&config.source_dir, file);
        match read_fragment(file) {
            Ok(fragment) => {
                let dir = rel.parent().unwrap_or_else(|| Path::new(""));
                stack.add(dir, fragment);
                stats.fragments += 1;
                log::info!("{}: fragment added", rel.display());
            }
            Err(err) => {
                log::warn!("{}: {}", rel.display(), err);
                stats.failed += 1;
            }
        }
    }

    // Phase 2: gather content and build the index.
    let parser = Parser::new(config);
    let mut index = Index::new();
    let mut pages: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();
    for file in &files {
        if !matches!(classify(file), FileKind::Page) {
            continue;
        }
        let rel = path::relative(&config.source_dir, file);
        match parser.parse(&rel) {
            Ok(page) => {
                stack.add(&rel, derived_metadata(config, &page));
                if let Some(tuple) = &page.tuple {
                    index.contribute(tuple.clone());
                }
                pages.insert(rel, page);
            }
            Err(err) => {
                log::warn!("{}", err);
                stats.failed += 1;
            }
        }
    }

    // Phase 3: render pages, mirror everything else.
    let resolver = Resolver::new(
        &config.source_dir,
        &config.template_dir,
        &config.template_extension,
    );
    for file in &files {
        let rel = path::relative(&config.source_dir, file);
        match classify(file) {
            FileKind::Fragment => {} // consumed in phase 1
            FileKind::Page => {
                let page = match pages.get(&rel) {
                    Some(page) => page,
                    None => continue, // parse failed; already counted
                };
                match render_page(config, &stack, &index, &resolver, file, page) {
                    Ok(target) => {
                        stats.rendered += 1;
                        log::info!(
                            "{}: rendered to {}",
                            rel.display(),
                            target.display(),
                        );
                    }
                    Err(err) => {
                        log::warn!("{}: {}", rel.display(), err);
                        stats.failed += 1;
                        continue;
                    }
                }
                if config.redirects {
                    if let Some(entry) = &page.blog_entry {
                        stats.redirects += write::write_blog_redirects(
                            &config.output_dir,
                            &config.blog_dir,
                            entry,
                            &config.output_extension,
                            &page.url(&config.output_extension),
                        );
                    }
                }
            }
            FileKind::Static => {
                let target = config.output_dir.join(&rel);
                match write::copy_file(file, &target) {
                    Ok(()) => {
                        stats.copied += 1;
                        log::info!(
                            "{}: copied to {}",
                            rel.display(),
                            target.display(),
                        );
                    }
                    Err(err) => {
                        log::warn!("{}: {}", rel.display(), err);
                        stats.failed += 1;
                    }
                }
            }
        }
    }

    // The static-assets tree lands directly under the output root.
    if config.static_dir.is_dir() {
        stats.copied += write::copy_tree(&config.static_dir, &config.output_dir);
    }

    if let Some(site_url) = &config.site_url {
        match write_site_feed(config, &stack, &index, site_url) {
            Ok(true) => log::info!("wrote feed {}", config.feed_file),
            Ok(false) => log::debug!("no '{}' entries; feed skipped", config.index_type),
            Err(err) => {
                log::warn!("writing feed: {}", err);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

fn read_fragment(file: &Path) -> source::Result<Context> {
    let text = fs::read_to_string(file)?;
    Ok(Context::from_yaml(&text)?)
}

/// The fragment a page contributes to the stack at its own path: its front
/// matter plus derived keys: output path, URL, and (for blog entries) the
/// date fields, display title, and sort key. Derived keys never overwrite
/// author-written ones.
fn derived_metadata(config: &Config, page: &SourceFile) -> Context {
    let mut metadata = page.metadata.clone();
    metadata.insert_absent(
        config.output_key.as_str(),
        Value::String(page.output_file.clone()),
    );
    metadata.insert_absent(
        "url",
        Value::String(page.url(&config.output_extension)),
    );
    if let Some(entry) = &page.blog_entry {
        metadata.insert_absent("year", Value::String(entry.year.clone()));
        metadata.insert_absent("month", Value::String(entry.month.clone()));
        metadata.insert_absent("day", Value::String(entry.day.clone()));
        if !entry.title.is_empty() {
            metadata.insert_absent("title", Value::String(entry.title.clone()));
        }
        if let Some(tuple) = &page.tuple {
            metadata.insert_absent(
                config.sort_key.as_str(),
                Value::String(tuple.sort_key.clone()),
            );
        }
    }
    metadata
}

/// Renders one page: template selection (explicit key first, best-match
/// search second), composition, context resolution and injection, template
/// execution, output write. Returns the written target path.
fn render_page(
    config: &Config,
    stack: &Stack,
    index: &Index,
    resolver: &Resolver,
    file: &Path,
    page: &SourceFile,
) -> std::result::Result<PathBuf, PageError> {
    let mut context = stack.get(&page.source_path);

    let template_file = match context.get_string(&config.template_key) {
        name if !name.is_empty() => name,
        _ => {
            let found = resolver.resolve(file)?;
            path::tokenize(path::relative(&config.template_dir, &found)).join("/")
        }
    };
    let composed = template::compose(&config.template_dir, &template_file)?;

    context.insert(
        config.content_key.as_str(),
        Value::String(page.content.clone()),
    );
    if let Some(count) = context.get_count(&config.index_key) {
        if count > 0 {
            context.insert(config.index_key.as_str(), index.render_value(count));
        }
    }

    let mut template = gtmpl::Template::default();
    template.parse(composed.as_str()).map_err(PageError::Render)?;
    let dot = gtmpl::Context::from(value::context_value(&context))
        .map_err(|err| PageError::Render(err.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &dot).map_err(PageError::Render)?;

    let target = config.output_dir.join(page.url(&config.output_extension));
    write::write_output(&target, &out).map_err(PageError::Write)?;
    Ok(target)
}

/// Writes the Atom feed for the default bucket. `Ok(false)` means the bucket
/// was empty and no feed was written.
fn write_site_feed(
    config: &Config,
    stack: &Stack,
    index: &Index,
    site_url: &Url,
) -> feed::Result<bool> {
    let entries = match index.bucket(&config.index_type) {
        Some(entries) => entries,
        None => return Ok(false),
    };
    let global = stack.get("");
    let title = match global.get_string("title") {
        title if title.is_empty() => site_url.to_string(),
        title => title,
    };
    let author = match global.get_string("author") {
        author if author.is_empty() => None,
        author => Some(author),
    };
    let out = File::create(config.output_dir.join(&config.feed_file))?;
    feed::write_feed(
        &FeedConfig {
            title,
            author,
            site_url,
        },
        entries,
        out,
    )?;
    Ok(true)
}

pub type Result<T> = std::result::Result<T, Error>;

/// A setup error: the only fatal kind. Everything after setup is per-file
/// recoverable.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source directory doesn't exist.
    MissingSourceDir(PathBuf),

    /// Returned when the template directory doesn't exist.
    MissingTemplateDir(PathBuf),

    /// Returned when the output root can't be created.
    CreateOutputDir { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingSourceDir(path) => {
                write!(f, "source directory '{}' not found", path.display())
            }
            Error::MissingTemplateDir(path) => {
                write!(f, "template directory '{}' not found", path.display())
            }
            Error::CreateOutputDir { path, err } => {
                write!(f, "creating output directory '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CreateOutputDir { path: _, err } => Some(err),
            _ => None,
        }
    }
}

/// An error rendering one page. Always recoverable: the page is skipped and
/// the run continues.
#[derive(Debug)]
enum PageError {
    /// Template resolution or composition failed.
    Resolve(template::Error),

    /// The template engine rejected the template or its execution.
    Render(String),

    /// The output file couldn't be written.
    Write(io::Error),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PageError::Resolve(err) => err.fmt(f),
            PageError::Render(err) => err.fmt(f),
            PageError::Write(err) => err.fmt(f),
        }
    }
}

impl From<template::Error> for PageError {
    /// Converts a [`template::Error`] into a [`PageError`]. It allows us to
    /// use the `?` operator for resolution and composition.
    fn from(err: template::Error) -> PageError {
        PageError::Resolve(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write_file(root: &Path, name: &str, body: &str) {
        let full = root.join(name);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, body).unwrap();
    }

    /// A site exercising every phase: a global fragment, a scoped fragment,
    /// blog entries, an index page, an explicit template key, and a static
    /// file.
    fn fixture(root: &Path) -> Config {
        let mut config = Config::for_tests();
        config.source_dir = root.join("src");
        config.template_dir = root.join("templates");
        config.static_dir = root.join("static");
        config.output_dir = root.join("out");
        config.redirects = true;

        write_file(root, "src/site.yaml", "title: Site\nauthor: Author\n");
        write_file(root, "src/docs/section.yaml", "section: Docs\n");
        write_file(
            root,
            "src/2013-01-01-first.md",
            "---\nThe **first** post.\n",
        );
        write_file(root, "src/2013-06-01-second.md", "---\nThe second post.\n");
        write_file(root, "src/front.md", "index: true\n---\nFront page.\n");
        write_file(
            root,
            "src/special.md",
            "template: special.html\n---\nSpecial.\n",
        );
        write_file(root, "src/docs/about.md", "---\nAbout text.\n");
        write_file(root, "src/style.css", "body {}\n");

        write_file(root, "templates/_.html", "<t>{{.title}}</t>{{.content}}");
        write_file(
            root,
            "templates/front.html",
            "{{range .index.blog}}[{{.url}}]{{end}}",
        );
        write_file(root, "templates/special.html", "S:{{.content}}");
        write_file(
            root,
            "templates/docs/about.html",
            "{{.section}}|{{.content}}",
        );
        write_file(root, "static/logo.png", "PNG");

        config
    }

    fn read(config: &Config, rel: &str) -> String {
        fs::read_to_string(config.output_dir.join(rel)).unwrap()
    }

    #[test]
    fn test_build_site() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let stats = build_site(&config).unwrap();

        assert_eq!(stats.failed, 0);
        assert_eq!(stats.fragments, 2);
        assert_eq!(stats.rendered, 5);
        assert_eq!(stats.copied, 2); // style.css + static/logo.png
        assert!(stats.redirects > 0);

        // Blog entries land under the blog directory, fall back to the
        // global template, and see the global fragment plus their derived
        // title.
        let first = read(&config, "blog/2013-01-01-first.html");
        assert_eq!(first, "<t>First</t><p>The <strong>first</strong> post.</p>");

        // The index page renders every blog entry, newest first.
        let front = read(&config, "front.html");
        assert_eq!(
            front,
            "[blog/2013-06-01-second.html][blog/2013-01-01-first.html]",
        );

        // The explicit template key beats the search.
        assert_eq!(read(&config, "special.html"), "S:Special.");

        // A scoped fragment is visible to pages in its directory, and the
        // exact-match template beats the fallback.
        assert_eq!(read(&config, "docs/about.html"), "Docs|About text.");

        // Static files mirror; the assets tree lands at the output root.
        assert_eq!(read(&config, "style.css"), "body {}\n");
        assert_eq!(read(&config, "logo.png"), "PNG");

        // Redirect stubs for blog entries, but never over the canonical
        // output.
        assert!(config
            .output_dir
            .join("blog/2013/01/01/index.html")
            .is_file());
        assert!(config.output_dir.join("blog/2013/1/1/index.html").is_file());
        let stub = read(&config, "blog/2013-01-01.html");
        assert!(stub.contains("url=../blog/2013-01-01-first.html"), "{}", stub);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        build_site(&config).unwrap();
        let first: BTreeMap<PathBuf, Vec<u8>> = snapshot(&config.output_dir);
        build_site(&config).unwrap();
        let second = snapshot(&config.output_dir);

        assert_eq!(first, second);
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        path::files_under(root)
            .into_iter()
            .map(|file| {
                let bytes = fs::read(&file).unwrap();
                (path::relative(root, &file), bytes)
            })
            .collect()
    }

    #[test]
    fn test_bad_file_skipped_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        write_file(dir.path(), "src/broken.md", "not: [valid\n---\nbody\n");

        let stats = build_site(&config).unwrap();
        assert_eq!(stats.failed, 1);
        assert!(!config.output_dir.join("broken.html").exists());
        // Everyone else still rendered.
        assert!(config.output_dir.join("docs/about.html").is_file());
    }

    #[test]
    fn test_page_without_template_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        // No exact match and no fallback reachable from deep/.
        write_file(dir.path(), "src/deep/orphan.md", "---\nbody\n");
        fs::remove_file(dir.path().join("templates/_.html")).unwrap();

        let stats = build_site(&config).unwrap();
        assert!(stats.failed >= 1);
        assert!(!config.output_dir.join("deep/orphan.html").exists());
    }

    #[test]
    fn test_missing_source_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests();
        config.source_dir = dir.path().join("nope");
        config.template_dir = dir.path().to_path_buf();
        config.output_dir = dir.path().join("out");

        assert!(matches!(
            build_site(&config),
            Err(Error::MissingSourceDir(_)),
        ));
    }

    #[test]
    fn test_feed_written_when_site_url_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture(dir.path());
        config.site_url = Some(Url::parse("https://example.org/").unwrap());

        build_site(&config).unwrap();
        let xml = read(&config, "feed.atom");
        assert!(xml.contains("Site"));
        assert!(xml.contains("https://example.org/blog/2013-06-01-second.html"));
    }
}
