//! The library code for the `pagestack` static site generator. A run is
//! three passes over one walk of the source tree:
//!
//! 1. Gathering scoped config fragments into the metadata stack
//!    ([`crate::stack`])
//! 2. Parsing content files and building the content index
//!    ([`crate::source`], [`crate::index`])
//! 3. Rendering each page and mirroring everything else into the output
//!    tree ([`crate::build`])
//!
//! Of the three, the interesting machinery is in how a page's context and
//! template are found. The stack merges every metadata fragment on the
//! page's directory lineage (global first, then each prefix root-to-leaf,
//! deeper fragments winning key collisions) so a page sees its site's,
//! section's, and own metadata as one mapping. The template resolver
//! ([`crate::template`]) mirrors the page's path into the template tree and
//! walks only its ancestor directories, preferring an exact path match over
//! the reserved `_` fallback.
//!
//! Rendering itself is delegated: Markdown bodies go through
//! [`crate::markdown`], and template substitution happens in `gtmpl` against
//! a value tree built by [`crate::value`] from the resolved context.

pub mod build;
pub mod config;
pub mod feed;
pub mod index;
pub mod markdown;
pub mod path;
pub mod source;
pub mod stack;
pub mod template;
pub mod value;
pub mod write;
