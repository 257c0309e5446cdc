//! Parses one source file: splits the front-matter block from the body,
//! renders Markdown bodies to HTML, detects date-named blog entries, and
//! deduces the output path. See [`Parser::parse`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::config::Config;
use crate::index::IndexTuple;
use crate::markdown;
use crate::path;
use crate::stack::Context;

/// The blog-entry naming convention: a strictly zero-padded date, optionally
/// followed by a hyphen-joined title. `2013-1-2-x` is not a blog entry; the
/// padding is load-bearing for lexicographic sort keys.
static BLOG_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})(?:-([0-9A-Za-z_\-.]+))?$")
        .expect("blog entry pattern")
});

/// The date and title derived from a blog entry's file name. Components stay
/// strings, zero-padded exactly as they appeared in the name.
#[derive(Clone, Debug, PartialEq)]
pub struct BlogEntry {
    pub year: String,
    pub month: String,
    pub day: String,

    /// Display form of the title suffix: separators become spaces and the
    /// first letter is capitalized. Empty for date-only names.
    pub title: String,
}

/// One parsed source file.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Path relative to the source root.
    pub source_path: PathBuf,

    /// `source_path` with the extension stripped, `/`-joined.
    pub basename: String,

    /// The front-matter metadata, empty when the file has none.
    pub metadata: Context,

    /// The body after the delimiter, Markdown-rendered for `.md` sources and
    /// trimmed.
    pub content: String,

    /// Date fields when the file name follows the blog convention.
    pub blog_entry: Option<BlogEntry>,

    /// Extension-less output path relative to the output root.
    pub output_file: String,

    /// The index contribution, present exactly when the file is indexable.
    pub tuple: Option<IndexTuple>,
}

impl SourceFile {
    /// Whether this file contributes to the content index.
    pub fn indexable(&self) -> bool {
        self.tuple.is_some()
    }

    /// The page's site-relative URL: the output path plus the output
    /// extension.
    pub fn url(&self, output_extension: &str) -> String {
        format!("{}.{}", self.output_file, output_extension)
    }
}

/// Parses [`SourceFile`]s from disk, driven by the run's [`Config`] (source
/// root, delimiter, key names, blog output directory).
pub struct Parser<'a> {
    config: &'a Config,
}

impl<'a> Parser<'a> {
    pub fn new(config: &'a Config) -> Parser<'a> {
        Parser { config }
    }

    /// Parses the source file at `relative_path` (relative to the source
    /// root). Errors carry the file's path for the run log.
    pub fn parse(&self, relative_path: &Path) -> Result<SourceFile> {
        match self.parse_inner(relative_path) {
            Ok(file) => Ok(file),
            Err(err) => Err(Error::Annotated(
                format!("parsing {}", relative_path.display()),
                Box::new(err),
            )),
        }
    }

    fn parse_inner(&self, relative_path: &Path) -> Result<SourceFile> {
        let config = self.config;
        let raw = fs::read_to_string(config.source_dir.join(relative_path))?;
        let (metadata_block, body) = split_front_matter(&raw, &config.delimiter);

        let metadata = Context::from_yaml(metadata_block)?;

        let mut content = body.to_owned();
        if path::extension(relative_path).as_deref() == Some("md") {
            content = markdown::to_html(&content);
        }
        let content = content.trim().to_owned();

        let basename = path::tokenize(path::strip_extension(relative_path)).join("/");
        let blog_entry = parse_blog_entry(&basename);

        let output_file = match metadata.get(&config.output_key) {
            Some(Value::String(explicit)) => explicit.clone(),
            Some(_) => return Err(Error::BadKeyType(config.output_key.clone())),
            None => match &blog_entry {
                Some(_) => format!("{}/{}", config.blog_dir, basename),
                None => basename.clone(),
            },
        };

        let url = format!("{}.{}", output_file, config.output_extension);
        let tuple = blog_entry.as_ref().map(|entry| {
            let mut tuple = IndexTuple {
                kind: config.index_type.clone(),
                sort_key: basename.clone(),
                year: entry.year.clone(),
                month: entry.month.clone(),
                day: entry.day.clone(),
                title: entry.title.clone(),
                url,
            };
            apply_tuple_overrides(&mut tuple, &metadata, config);
            tuple
        });

        Ok(SourceFile {
            source_path: relative_path.to_path_buf(),
            basename,
            metadata,
            content,
            blog_entry,
            output_file,
            tuple,
        })
    }
}

/// Splits `input` at the first line equal to `delimiter` (ignoring trailing
/// whitespace). Everything before the delimiter line is the metadata block;
/// everything after it is the body. A file with no delimiter line is all
/// body.
pub fn split_front_matter<'a>(input: &'a str, delimiter: &str) -> (&'a str, &'a str) {
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            return (&input[..offset], &input[offset + line.len()..]);
        }
        offset += line.len();
    }
    ("", input)
}

/// Matches `basename`'s file-name segment against the blog convention and
/// derives the date fields and display title.
pub fn parse_blog_entry(basename: &str) -> Option<BlogEntry> {
    let name = basename.rsplit('/').next().unwrap_or(basename);
    let captures = BLOG_ENTRY.captures(name)?;
    Some(BlogEntry {
        year: captures[1].to_owned(),
        month: captures[2].to_owned(),
        day: captures[3].to_owned(),
        title: captures
            .get(4)
            .map(|title| display_title(title.as_str()))
            .unwrap_or_default(),
    })
}

/// Turns a file-name title into display form: `-` and `_` become spaces and
/// the first letter is capitalized. `foo-bar` becomes `Foo bar`.
pub fn display_title(name: &str) -> String {
    let title = name.replace('-', " ").replace('_', " ");
    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => title,
    }
}

/// Copies string fields from a mapping under the index key onto the tuple,
/// so a page can relabel its bucket, sort key, or display fields from front
/// matter. Non-string values are ignored.
fn apply_tuple_overrides(tuple: &mut IndexTuple, metadata: &Context, config: &Config) {
    let overrides = match metadata.get(&config.index_key) {
        Some(Value::Mapping(overrides)) => overrides.clone(),
        _ => return,
    };
    for (key, value) in overrides.iter() {
        let (key, value) = match (key.as_str(), value.as_str()) {
            (Some(key), Some(value)) => (key.to_lowercase(), value.to_owned()),
            _ => continue,
        };
        if key == config.sort_key {
            tuple.sort_key = value;
            continue;
        }
        match key.as_str() {
            "type" => tuple.kind = value,
            "year" => tuple.year = value,
            "month" => tuple.month = value,
            "day" => tuple.day = value,
            "title" => tuple.title = value,
            "url" => tuple.url = value,
            _ => {}
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing one source file. All variants are
/// per-file-recoverable: the pipeline logs them and moves on.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source file can't be read.
    Io(std::io::Error),

    /// Returned when the front-matter block isn't valid YAML (or JSON).
    Metadata(serde_yaml::Error),

    /// Returned when a reserved metadata key holds the wrong type.
    BadKeyType(String),

    /// An error with file context attached.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Metadata(err) => err.fmt(f),
            Error::BadKeyType(key) => write!(f, "'{}' is not a string", key),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Metadata(err) => Some(err),
            Error::BadKeyType(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for metadata deserialization.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Metadata(err)
    }
}

#[cfg(test)]
mod test {
    use std::fs::File;
    use std::io::Write;

    use super::*;

    fn test_config(source_dir: &Path) -> Config {
        let mut config = Config::for_tests();
        config.source_dir = source_dir.to_path_buf();
        config
    }

    fn write_source(dir: &Path, name: &str, body: &str) {
        let full = dir.join(name);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        let mut f = File::create(full).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_split_front_matter() {
        let cases = &[
            ("a: 1\n---\nbody\n", "a: 1\n", "body\n"),
            ("---\nbody", "", "body"),
            ("no delimiter at all", "", "no delimiter at all"),
            ("a: 1\n--- \nbody", "a: 1\n", "body"),
            ("a: 1\n----\nbody", "", "a: 1\n----\nbody"),
        ];
        for (input, metadata, body) in cases {
            assert_eq!(
                split_front_matter(input, "---"),
                (*metadata, *body),
                "split_front_matter({:?})",
                input
            );
        }
    }

    #[test]
    fn test_parse_blog_entry() {
        let entry = parse_blog_entry("2013-01-01-foo-bar").unwrap();
        assert_eq!(entry.year, "2013");
        assert_eq!(entry.month, "01");
        assert_eq!(entry.day, "01");
        assert_eq!(entry.title, "Foo bar");

        // Subdirectories are fine; the file-name segment is what matters.
        assert!(parse_blog_entry("posts/2013-01-01-foo").is_some());
        // Date-only names have an empty title.
        assert_eq!(parse_blog_entry("2013-01-01").unwrap().title, "");
        // Zero-padding is strict.
        assert!(parse_blog_entry("2013-1-2-x").is_none());
        // Junk before the date is not a blog entry.
        assert!(parse_blog_entry("x2013-01-01-foo").is_none());
        assert!(parse_blog_entry("plain-page").is_none());
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title("foo-bar-baz"), "Foo bar baz");
        assert_eq!(display_title("foo_bar-baz"), "Foo bar baz");
        assert_eq!(display_title("x"), "X");
        assert_eq!(display_title(""), "");
    }

    #[test]
    fn test_parse_markdown_page() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "about.md",
            "title: About\n---\nHi **there**!\n",
        );

        let config = test_config(dir.path());
        let file = Parser::new(&config).parse(Path::new("about.md")).unwrap();
        assert_eq!(file.basename, "about");
        assert_eq!(file.metadata.get_string("title"), "About");
        assert_eq!(file.content, "<p>Hi <strong>there</strong>!</p>");
        assert_eq!(file.output_file, "about");
        assert_eq!(file.url("html"), "about.html");
        assert!(!file.indexable());
    }

    #[test]
    fn test_parse_html_body_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "raw.html", "---\n<b>kept as-is</b>\n");

        let config = test_config(dir.path());
        let file = Parser::new(&config).parse(Path::new("raw.html")).unwrap();
        assert_eq!(file.content, "<b>kept as-is</b>");
        assert!(file.metadata.is_empty());
    }

    #[test]
    fn test_parse_without_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "page.html", "<p>all body</p>\n");

        let config = test_config(dir.path());
        let file = Parser::new(&config).parse(Path::new("page.html")).unwrap();
        assert!(file.metadata.is_empty());
        assert_eq!(file.content, "<p>all body</p>");
    }

    #[test]
    fn test_parse_blog_page() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "2013-06-01-hello-world.md",
            "---\nHello.\n",
        );

        let config = test_config(dir.path());
        let file = Parser::new(&config)
            .parse(Path::new("2013-06-01-hello-world.md"))
            .unwrap();
        assert!(file.indexable());
        assert_eq!(file.output_file, "blog/2013-06-01-hello-world");

        let tuple = file.tuple.unwrap();
        assert_eq!(tuple.kind, "blog");
        assert_eq!(tuple.sort_key, "2013-06-01-hello-world");
        assert_eq!(tuple.title, "Hello world");
        assert_eq!(tuple.url, "blog/2013-06-01-hello-world.html");
    }

    #[test]
    fn test_explicit_output_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "2013-06-01-post.md",
            "output: elsewhere/post\n---\nbody\n",
        );

        let config = test_config(dir.path());
        let file = Parser::new(&config)
            .parse(Path::new("2013-06-01-post.md"))
            .unwrap();
        assert_eq!(file.output_file, "elsewhere/post");
        assert_eq!(file.tuple.unwrap().url, "elsewhere/post.html");
    }

    #[test]
    fn test_tuple_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "2013-06-01-post.md",
            "index:\n  type: project\n  sortkey: zzz\n  title: Renamed\n---\nbody\n",
        );

        let config = test_config(dir.path());
        let file = Parser::new(&config)
            .parse(Path::new("2013-06-01-post.md"))
            .unwrap();
        let tuple = file.tuple.unwrap();
        assert_eq!(tuple.kind, "project");
        assert_eq!(tuple.sort_key, "zzz");
        assert_eq!(tuple.title, "Renamed");
        // Fields without overrides keep their derived values.
        assert_eq!(tuple.year, "2013");
    }

    #[test]
    fn test_bad_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "bad.md", "not: [valid\n---\nbody\n");

        let config = test_config(dir.path());
        let err = Parser::new(&config)
            .parse(Path::new("bad.md"))
            .unwrap_err();
        // The error names the file.
        assert!(err.to_string().contains("bad.md"), "{}", err);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert!(Parser::new(&config).parse(Path::new("absent.md")).is_err());
    }
}
