//! Repository-relative path utilities for monobuild
//!
//! Paths inside a tree state are always `/`-separated strings relative to the
//! repository root. The root itself is the empty string.

/// Normalize a repository-relative path.
///
/// Converts `\` to `/`, drops `.` segments and empty segments, so that
/// `./app-a/`, `app-a` and `app-a//` all become `app-a`.
pub fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns `true` if `file` lies at or below the directory `dir`.
///
/// The empty directory is the repository root and contains every path.
pub fn is_under(file: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    match file.strip_prefix(dir) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strip `dir` from the front of `file`, returning the path relative to `dir`.
///
/// Returns `None` if `file` is not under `dir`.
pub fn relative_to<'a>(file: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(file);
    }
    if !is_under(file, dir) {
        return None;
    }
    Some(file[dir.len()..].trim_start_matches('/'))
}

/// The directory containing `file`; the root for top-level files.
pub fn parent_dir(file: &str) -> &str {
    file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// The final segment of `file`.
pub fn file_name(file: &str) -> &str {
    file.rsplit_once('/').map(|(_, name)| name).unwrap_or(file)
}

/// Pick the directory among `dirs` that owns `file`.
///
/// Module directories do not nest: a file belongs to the deepest directory
/// that contains it, so a nested module hides its files from the enclosing one.
pub fn owning_dir<'a, I>(file: &str, dirs: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    dirs.into_iter()
        .filter(|dir| is_under(file, dir))
        .max_by_key(|dir| dir.len())
}
