//! Support for creating an Atom feed from the default index bucket.

use std::fmt;
use std::io::Write;

use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person};
use chrono::{
    FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, ParseError, TimeZone, Utc,
};
use url::Url;

use crate::index::IndexTuple;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    /// The feed's title, typically the site title from the global context.
    pub title: String,

    /// The feed author's name, if the global context names one.
    pub author: Option<String>,

    /// The absolute base URL of the published site. Entry links join onto
    /// this; it also serves as the feed's id and alternate link.
    pub site_url: &'a Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and the sorted
/// entries of an index bucket, and writes the result to a
/// [`std::io::Write`].
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    entries: &[IndexTuple],
    w: W,
) -> Result<()> {
    feed(config, entries)?.write_to(w)?;
    Ok(())
}

fn feed(config: &FeedConfig, entries: &[IndexTuple]) -> Result<Feed> {
    use std::collections::BTreeMap;
    Ok(Feed {
        entries: feed_entries(config, entries)?,
        title: config.title.clone().into(),
        id: config.site_url.to_string(),
        updated: FixedOffset::east(0).from_utc_datetime(&Utc::now().naive_utc()),
        authors: author_to_people(config.author.as_deref()),
        categories: Vec::new(),
        contributors: Vec::new(),
        generator: None,
        icon: None,
        logo: None,
        rights: None,
        subtitle: None,
        base: None,
        lang: None,
        extensions: BTreeMap::new(),
        namespaces: BTreeMap::new(),
        links: vec![Link {
            href: config.site_url.to_string(),
            rel: "alternate".to_owned(),
            title: None,
            hreflang: None,
            mime_type: None,
            length: None,
        }],
    })
}

fn feed_entries(config: &FeedConfig, tuples: &[IndexTuple]) -> Result<Vec<Entry>> {
    use std::collections::BTreeMap;
    let mut entries: Vec<Entry> = Vec::with_capacity(tuples.len());

    for tuple in tuples {
        let naive_date = NaiveDate::parse_from_str(
            &format!("{}-{}-{}", tuple.year, tuple.month, tuple.day),
            "%Y-%m-%d",
        )?;
        let naive_time = NaiveTime::from_hms(0, 0, 0);
        let naive_date_time = NaiveDateTime::new(naive_date, naive_time);
        let date = FixedOffset::east(0).from_utc_datetime(&naive_date_time);

        let href = config.site_url.join(&tuple.url)?.to_string();
        let title = if tuple.title.is_empty() {
            tuple.sort_key.clone()
        } else {
            tuple.title.clone()
        };

        entries.push(Entry {
            id: href.clone(),
            title: title.into(),
            updated: date,
            authors: author_to_people(config.author.as_deref()),
            links: vec![Link {
                href,
                rel: "alternate".to_owned(),
                title: None,
                mime_type: None,
                hreflang: None,
                length: None,
            }],
            rights: None,
            summary: None,
            categories: Vec::new(),
            contributors: Vec::new(),
            published: Some(date),
            source: None,
            content: None,
            extensions: BTreeMap::new(),
        })
    }
    Ok(entries)
}

fn author_to_people(author: Option<&str>) -> Vec<Person> {
    match author {
        Some(name) => vec![Person {
            name: name.to_owned(),
            email: None,
            uri: None,
        }],
        None => Vec::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, Atom, URL,
/// and date parsing issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when there is an issue parsing an entry's date.
    DateTimeParse(ParseError),

    /// Returned when an entry URL can't join onto the site URL.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
            Error::DateTimeParse(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::DateTimeParse(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: ParseError) -> Error {
        Error::DateTimeParse(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use
    /// the `?` operator when joining entry URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tuple(sort_key: &str, y: &str, m: &str, d: &str, title: &str, url: &str) -> IndexTuple {
        IndexTuple {
            kind: "blog".to_owned(),
            sort_key: sort_key.to_owned(),
            year: y.to_owned(),
            month: m.to_owned(),
            day: d.to_owned(),
            title: title.to_owned(),
            url: url.to_owned(),
        }
    }

    #[test]
    fn test_write_feed() {
        let site_url = Url::parse("https://example.org/").unwrap();
        let config = FeedConfig {
            title: "A site".to_owned(),
            author: Some("An author".to_owned()),
            site_url: &site_url,
        };
        let entries = vec![
            tuple(
                "2013-06-01-b",
                "2013",
                "06",
                "01",
                "B post",
                "blog/2013-06-01-b.html",
            ),
            tuple("2013-01-01-a", "2013", "01", "01", "", "blog/2013-01-01-a.html"),
        ];

        let mut out: Vec<u8> = Vec::new();
        write_feed(&config, &entries, &mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("A site"));
        assert!(xml.contains("https://example.org/blog/2013-06-01-b.html"));
        assert!(xml.contains("B post"));
        // A title-less entry falls back to its sort key.
        assert!(xml.contains("2013-01-01-a"));
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let site_url = Url::parse("https://example.org/").unwrap();
        let config = FeedConfig {
            title: "A site".to_owned(),
            author: None,
            site_url: &site_url,
        };
        let entries = vec![tuple("x", "not", "a", "date", "", "x.html")];

        let mut out: Vec<u8> = Vec::new();
        assert!(matches!(
            write_feed(&config, &entries, &mut out),
            Err(Error::DateTimeParse(_)),
        ));
    }
}
