//! Output-side filesystem helpers: writing rendered pages (creating
//! intermediate directories), mirroring static files, copying the assets
//! tree, and emitting meta-refresh redirect stubs for date-named entries.

use std::fs;
use std::io;
use std::path::Path;

use crate::path;
use crate::source::BlogEntry;

/// Writes `bytes` to `target`, creating intermediate directories as needed.
pub fn write_output(target: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, bytes)
}

/// Copies `src` to `dst` byte-for-byte, creating intermediate directories as
/// needed.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Recursively copies every file under `src` to the mirrored location under
/// `dst`. Individual failures are logged and skipped; returns the number of
/// files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> usize {
    let mut copied = 0;
    for file in path::files_under(src) {
        let target = dst.join(path::relative(src, &file));
        match copy_file(&file, &target) {
            Ok(()) => copied += 1,
            Err(err) => log::warn!("copying {}: {}", file.display(), err),
        }
    }
    copied
}

/// The body of a redirect stub: an immediate meta-refresh to `url`.
pub fn redirect_html(url: &str) -> String {
    format!(
        "<html><head>\n<meta http-equiv=\"refresh\" content=\"0;url={}\">\n</head><body></body></html>\n",
        url,
    )
}

/// Writes one redirect stub at `stub` (relative to `output_dir`) pointing at
/// `target` (also relative to `output_dir`). The stub climbs back to the
/// output root with `../` segments, so the result works from any depth.
pub fn write_redirect(output_dir: &Path, stub: &str, target: &str) -> io::Result<()> {
    let ups = stub.matches('/').count();
    let url = format!("{}{}", "../".repeat(ups), target);
    write_output(&output_dir.join(stub), redirect_html(&url).as_bytes())
}

/// The redirect stub paths for a blog entry: the date-only name, the
/// `Y/M/D/index` directory form, and (where the month or day has a leading
/// zero) the unpadded directory variants people actually type, in both
/// slugged-title and `index` forms. All lowercase. The canonical path itself
/// is never in the list.
pub fn redirect_stubs(
    blog_dir: &str,
    entry: &BlogEntry,
    output_extension: &str,
    canonical: &str,
) -> Vec<String> {
    let (year, month, day) = match (
        entry.year.parse::<u32>(),
        entry.month.parse::<u32>(),
        entry.day.parse::<u32>(),
    ) {
        (Ok(y), Ok(m), Ok(d)) => (y, m, d),
        _ => return Vec::new(),
    };
    let title = slug::slugify(&entry.title);
    let ext = output_extension;

    let mut stubs = vec![
        format!("{}/{:04}-{:02}-{:02}.{}", blog_dir, year, month, day, ext),
        format!("{}/{:04}/{:02}/{:02}/index.{}", blog_dir, year, month, day, ext),
    ];
    if !title.is_empty() {
        stubs.push(format!(
            "{}/{:04}-{:02}-{:02}-{}.{}",
            blog_dir, year, month, day, title, ext,
        ));
    }

    let mut directory_variants = |y: String, m: String, d: String| {
        stubs.push(format!("{}/{}/{}/{}/index.{}", blog_dir, y, m, d, ext));
        if !title.is_empty() {
            stubs.push(format!("{}/{}/{}/{}/{}.{}", blog_dir, y, m, d, title, ext));
        }
    };
    if month < 10 {
        directory_variants(format!("{:04}", year), format!("{}", month), format!("{:02}", day));
    }
    if day < 10 {
        directory_variants(format!("{:04}", year), format!("{:02}", month), format!("{}", day));
    }
    if month < 10 && day < 10 {
        directory_variants(format!("{:04}", year), format!("{}", month), format!("{}", day));
    }

    stubs
        .into_iter()
        .map(|stub| stub.to_lowercase())
        .filter(|stub| stub != canonical)
        .collect()
}

/// Writes every redirect stub for `entry`, pointing at the canonical page at
/// `canonical` (relative to `output_dir`). Failures are logged and skipped;
/// returns the number of stubs written.
pub fn write_blog_redirects(
    output_dir: &Path,
    blog_dir: &str,
    entry: &BlogEntry,
    output_extension: &str,
    canonical: &str,
) -> usize {
    let mut written = 0;
    for stub in redirect_stubs(blog_dir, entry, output_extension, canonical) {
        match write_redirect(output_dir, &stub, canonical) {
            Ok(()) => written += 1,
            Err(err) => log::warn!("writing redirect {}: {}", stub, err),
        }
    }
    written
}
