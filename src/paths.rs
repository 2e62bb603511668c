//! Host path resolution against the project root.
//!
//! Every host path in the configuration (home, cache, build context, mount
//! sources) is either absolute, `~`-relative, or relative to the project
//! root. Resolution is lexical so that paths which do not exist yet (the
//! state directories before the first `up`) still resolve.

use std::path::{Component, Path, PathBuf};

/// Resolve a configured host path into an absolute, normalized path.
///
/// `~` and `~/...` expand to the user's home directory. Relative paths are
/// joined onto `project_dir`.
pub(crate) fn resolve_host_path(project_dir: &Path, path: &str) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&project_dir.join(expanded))
    }
}

/// Expand ~ to home directory
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. Never climbs above the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Normalize an in-container path for comparison (`/workspace/` and
/// `/workspace` name the same target).
pub(crate) fn container_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Join `child` onto the in-container directory `base`.
pub(crate) fn join_container(base: &str, child: &str) -> String {
    match container_path(base).as_str() {
        "/" => format!("/{child}"),
        base => format!("{base}/{child}"),
    }
}

/// Create `path` and any missing parents, readable only by the owner.
/// An existing directory is left as it is.
pub(crate) fn create_private_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}
