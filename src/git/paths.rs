//! Helpers for repository-relative paths (always `/`-separated, no leading
//! slash, `""` for the root).

/// Strips surrounding slashes; `"."` and `"/"` become the root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Splits `a/b/c` into (`a/b`, `c`); a top-level name has an empty dir.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

/// Resolves a symlink target relative to the directory holding the link.
///
/// Returns `None` for absolute targets and for targets that climb above the
/// repository root.
pub fn resolve_link(link_path: &str, target: &str) -> Option<String> {
    if target.starts_with('/') {
        return None;
    }

    let (dir, _) = split_path(link_path);
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();

    for component in target.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            name => parts.push(name),
        }
    }

    Some(parts.join("/"))
}
