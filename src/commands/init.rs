//! Initialize airlock files in a project directory.
//!
//! This module separates pure logic from IO by accepting closures for
//! filesystem operations, making the core logic easily testable.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{LOCAL_CONFIG_FILE, STATE_DIR};
use crate::paths::create_private_dir;
use crate::templates;

/// Project name used when none is given and the directory has no name.
const DEFAULT_NAME: &str = "my-project";

/// Line that keeps the state directory out of version control.
const GITIGNORE_ENTRY: &str = ".airlock/";

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Runs the init command, creating airlock project files.
pub fn run(name: Option<String>, force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let name = project_name(name.as_deref(), &cwd);

    info!("Initializing airlock project {} in {}", name, cwd.display());

    let files = init_files(&name);
    let results = init_project(
        &files,
        force,
        |path| cwd.join(path).exists(),
        |path| {
            create_private_dir(&cwd.join(path))
                .with_context(|| format!("Failed to create directory: {}", path.display()))
        },
        |path, content| {
            fs::write(cwd.join(path), content)
                .with_context(|| format!("Failed to write {}", path.display()))
        },
    )?;

    let gitignore = cwd.join(".gitignore");
    let existing = match fs::read_to_string(&gitignore) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e).context("Failed to read .gitignore"),
    };
    let gitignore_updated = match ensure_gitignore_entry(existing.as_deref()) {
        Some(text) => {
            fs::write(&gitignore, text).context("Failed to write .gitignore")?;
            true
        }
        None => false,
    };

    print!("{}", format_results(&name, &results, &files, gitignore_updated));

    Ok(())
}

// -----------------------------------------------------------------------------
// Internal types
// -----------------------------------------------------------------------------

/// File to be written during init, with its relative path and content.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InitFile {
    /// Relative path for the file.
    path: PathBuf,
    /// File content.
    content: String,
    /// Human-readable description.
    description: &'static str,
}

/// Result of attempting to write a file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteResult {
    /// File was created.
    Created,
    /// File was overwritten.
    Overwritten,
    /// File was skipped (already exists).
    Skipped,
}

// -----------------------------------------------------------------------------
// Helper functions
// -----------------------------------------------------------------------------

/// The explicit name, else the directory's basename.
fn project_name(explicit: Option<&str>, cwd: &Path) -> String {
    explicit
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| cwd.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

/// Returns the list of files to initialize in an airlock project.
fn init_files(name: &str) -> Vec<InitFile> {
    vec![
        InitFile {
            path: PathBuf::from("airlock.yaml"),
            content: templates::airlock_yaml(name),
            description: "Project configuration",
        },
        InitFile {
            path: PathBuf::from("Containerfile"),
            content: templates::CONTAINERFILE.to_string(),
            description: "Sandbox image definition",
        },
        InitFile {
            path: Path::new(STATE_DIR).join(LOCAL_CONFIG_FILE),
            content: templates::AIRLOCK_LOCAL_YAML.to_string(),
            description: "Local overrides (not versioned)",
        },
    ]
}

/// Host state directories created alongside the files.
fn state_dirs() -> Vec<PathBuf> {
    vec![
        Path::new(STATE_DIR).join("home"),
        Path::new(STATE_DIR).join("cache"),
    ]
}

/// Core init logic: determines what files to write and writes them.
///
/// Takes closures for IO operations to enable testing:
/// - `exists`: checks if a path exists
/// - `create_dir`: creates a directory (and parents)
/// - `write_file`: writes content to a path
fn init_project<E, D, W>(
    files: &[InitFile],
    force: bool,
    exists: E,
    create_dir: D,
    mut write_file: W,
) -> Result<Vec<(PathBuf, WriteResult)>>
where
    E: Fn(&Path) -> bool,
    D: Fn(&Path) -> Result<()>,
    W: FnMut(&Path, &str) -> Result<()>,
{
    for dir in state_dirs() {
        create_dir(&dir)?;
    }

    let mut results = Vec::new();
    for file in files {
        let existed = exists(&file.path);
        let result = if existed && !force {
            WriteResult::Skipped
        } else {
            write_file(&file.path, &file.content)?;
            if existed {
                WriteResult::Overwritten
            } else {
                WriteResult::Created
            }
        };
        results.push((file.path.clone(), result));
    }

    Ok(results)
}

/// New `.gitignore` contents if the state directory is not ignored yet.
fn ensure_gitignore_entry(existing: Option<&str>) -> Option<String> {
    let existing = existing.unwrap_or_default();
    let ignored = existing.lines().map(str::trim).any(|line| {
        matches!(line, ".airlock" | ".airlock/" | "/.airlock" | "/.airlock/")
    });
    if ignored {
        return None;
    }

    let mut text = existing.to_string();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(GITIGNORE_ENTRY);
    text.push('\n');
    Some(text)
}

/// Formats init results for display with colored output.
fn format_results(
    name: &str,
    results: &[(PathBuf, WriteResult)],
    files: &[InitFile],
    gitignore_updated: bool,
) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n{} airlock project {} initialized\n",
        "✓".green().bold(),
        name.cyan()
    );
    let _ = writeln!(out, "Files:");

    for (path, result) in results {
        let desc = files
            .iter()
            .find(|f| &f.path == path)
            .map_or("", |f| f.description);

        let _ = match result {
            WriteResult::Created => writeln!(
                out,
                "  {} - {}",
                path.display().to_string().cyan(),
                desc
            ),
            WriteResult::Overwritten => {
                writeln!(out, "  {} {} (overwritten)", "↻".blue(), path.display())
            }
            WriteResult::Skipped => writeln!(
                out,
                "  {} {} (already exists, use --force to overwrite)",
                "⊘".yellow(),
                path.display()
            ),
        };
    }
    if gitignore_updated {
        let _ = writeln!(out, "  {} - added {}", ".gitignore".cyan(), GITIGNORE_ENTRY);
    }

    let _ = writeln!(out, "\n{}", "Next steps:".yellow().bold());
    let _ = writeln!(out, "  1. Edit {} and {}", "airlock.yaml".cyan(), "Containerfile".cyan());
    let _ = writeln!(out, "  2. Run {} to build and start the sandbox", "airlock up".green());
    let _ = writeln!(out, "  3. Run {} to open a shell in it", "airlock enter".green());

    out
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_init_files_render_name() {
        let files = init_files("demo");
        assert_eq!(files.len(), 3);
        assert!(files[0].content.starts_with("name: demo\n"));
        assert_eq!(files[2].path, PathBuf::from(".airlock/airlock.local.yaml"));
    }

    #[test]
    fn test_project_name() {
        assert_eq!(project_name(Some("api"), Path::new("/srv/demo")), "api");
        assert_eq!(project_name(Some("  "), Path::new("/srv/demo")), "demo");
        assert_eq!(project_name(None, Path::new("/srv/demo")), "demo");
        assert_eq!(project_name(None, Path::new("/")), DEFAULT_NAME);
    }

    #[test]
    fn test_init_project_creates_files() {
        let files = init_files("demo");
        let written = RefCell::new(HashMap::new());
        let dirs_created = RefCell::new(HashSet::new());

        let results = init_project(
            &files,
            false,
            |_| false, // Nothing exists
            |path| {
                dirs_created.borrow_mut().insert(path.to_path_buf());
                Ok(())
            },
            |path, content| {
                written
                    .borrow_mut()
                    .insert(path.to_path_buf(), content.to_string());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(results.len(), files.len());
        for (_, result) in &results {
            assert_eq!(*result, WriteResult::Created);
        }
        assert_eq!(written.borrow().len(), files.len());

        let dirs = dirs_created.borrow();
        assert!(dirs.contains(&PathBuf::from(".airlock/home")));
        assert!(dirs.contains(&PathBuf::from(".airlock/cache")));
    }

    #[test]
    fn test_init_project_skips_existing_without_force() {
        let files = init_files("demo");
        let written = RefCell::new(HashMap::new());

        let results = init_project(
            &files,
            false,
            |_| true, // Everything exists
            |_| Ok(()),
            |path, content| {
                written
                    .borrow_mut()
                    .insert(path.to_path_buf(), content.to_string());
                Ok(())
            },
        )
        .unwrap();

        for (_, result) in &results {
            assert_eq!(*result, WriteResult::Skipped);
        }
        assert!(written.borrow().is_empty());
    }

    #[test]
    fn test_init_project_overwrites_with_force() {
        let files = init_files("demo");
        let written = RefCell::new(HashMap::new());

        let results = init_project(
            &files,
            true,
            |path| path == Path::new("airlock.yaml"),
            |_| Ok(()),
            |path, content| {
                written
                    .borrow_mut()
                    .insert(path.to_path_buf(), content.to_string());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            results[0],
            (PathBuf::from("airlock.yaml"), WriteResult::Overwritten)
        );
        assert_eq!(results[1], (PathBuf::from("Containerfile"), WriteResult::Created));
        assert_eq!(written.borrow().len(), files.len());
    }

    #[test]
    fn test_init_project_propagates_write_errors() {
        let files = init_files("demo");
        let err = init_project(
            &files,
            false,
            |_| false,
            |_| Ok(()),
            |path, _| anyhow::bail!("disk full writing {}", path.display()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("airlock.yaml"));
    }

    #[test]
    fn test_gitignore_created_when_missing() {
        assert_eq!(ensure_gitignore_entry(None).as_deref(), Some(".airlock/\n"));
    }

    #[test]
    fn test_gitignore_appended_with_newline() {
        assert_eq!(
            ensure_gitignore_entry(Some("target")).as_deref(),
            Some("target\n.airlock/\n")
        );
        assert_eq!(
            ensure_gitignore_entry(Some("target\n")).as_deref(),
            Some("target\n.airlock/\n")
        );
    }

    #[test]
    fn test_gitignore_left_alone_when_present() {
        assert_eq!(ensure_gitignore_entry(Some("target\n.airlock/\n")), None);
        assert_eq!(ensure_gitignore_entry(Some("/.airlock\n")), None);
    }

    #[test]
    fn test_format_results() {
        let files = init_files("demo");
        let results = vec![
            (PathBuf::from("airlock.yaml"), WriteResult::Created),
            (PathBuf::from("Containerfile"), WriteResult::Skipped),
            (PathBuf::from(".airlock/airlock.local.yaml"), WriteResult::Overwritten),
        ];

        let output = format_results("demo", &results, &files, true);
        assert!(output.contains("initialized"));
        assert!(output.contains("Project configuration"));
        assert!(output.contains("already exists"));
        assert!(output.contains("--force"));
        assert!(output.contains("overwritten"));
        assert!(output.contains(".gitignore"));
        assert!(output.contains("Next steps"));
    }
}
