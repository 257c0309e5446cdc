//! Path helpers shared by the stack, the template resolver, and the build
//! pipeline: tokenizing paths into clean segment lists, stripping extensions,
//! relativizing against a root, rehoming a page into the template tree, and
//! the directory-descent test that bounds template searches.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Splits a path into its normal components, in root-to-leaf order. Leading
/// separators, `.` segments, and duplicate separators disappear; `..` pops
/// the previous segment. `"/a/b/c"` tokenizes to `["a", "b", "c"]` and both
/// `""` and `"."` tokenize to the empty list.
pub fn tokenize<P: AsRef<Path>>(path: P) -> Vec<String> {
    let mut tokens = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(part) => {
                tokens.push(part.to_string_lossy().into_owned())
            }
            Component::ParentDir => {
                tokens.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    tokens
}

/// Returns `path` with its final extension removed. Paths without an
/// extension come back unchanged.
pub fn strip_extension(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Returns the lowercased final extension of `path`, if it has one.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Computes `path` relative to `root`, tolerating redundant separators and
/// `.` segments on either side. A `path` equal to `root` yields the empty
/// path; a `path` not under `root` comes back unchanged.
pub fn relative(root: &Path, path: &Path) -> PathBuf {
    let root_tokens = tokenize(root);
    let path_tokens = tokenize(path);
    if path_tokens.len() >= root_tokens.len()
        && path_tokens[..root_tokens.len()] == root_tokens[..]
    {
        path_tokens[root_tokens.len()..].iter().collect()
    } else {
        path.to_path_buf()
    }
}

/// Returns `path` relative to `root` with its extension stripped, joined
/// with `/`. This is the canonical name a source file is known by: the key
/// it occupies in the stack and the default stem of its output file.
pub fn basename(root: &Path, path: &Path) -> String {
    tokenize(strip_extension(&relative(root, path))).join("/")
}

/// Maps a page under `source_root` to the path it would occupy under
/// `template_root`. A page that is not under `source_root` comes back
/// unchanged.
pub fn rehome(page: &Path, source_root: &Path, template_root: &Path) -> PathBuf {
    let rel = relative(source_root, page);
    if rel.as_path() == page {
        page.to_path_buf()
    } else {
        template_root.join(rel)
    }
}

/// Reports whether a template-tree walk should descend into `dir` while
/// searching for `page_file`: true iff `dir`'s tokens are a strict,
/// length-respecting prefix of the page's tokens, i.e. `dir` is an ancestor
/// of the page, not a sibling or a deeper path.
pub fn should_descend(dir: &Path, page_file: &Path) -> bool {
    let dir_tokens = tokenize(dir);
    let page_tokens = tokenize(page_file);
    dir_tokens.len() < page_tokens.len()
        && dir_tokens[..] == page_tokens[..dir_tokens.len()]
}

/// Walks `root` and returns every file under it, in a stable lexicographic
/// order. Unreadable entries are logged and skipped; the walk continues.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Err(err) => log::warn!("walking {}: {}", root.display(), err),
        }
    }
    files
}
