//! Project configuration.
//!
//! A project is described by `airlock.yaml` (versioned) and an optional
//! `.airlock/airlock.local.yaml` (not versioned, for secrets and local
//! tweaks). Both are parsed into [`ConfigLayer`]s, reduced local-over-base,
//! and then defaulted once into an immutable [`ProjectConfig`].

mod error;
mod layer;

pub use error::ConfigError;
pub use layer::{BuildLayer, ConfigLayer, Mount, MountMode, UserLayer};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine::Engine;
use crate::paths::resolve_host_path;

/// Base configuration file names, in lookup order.
pub(crate) const CONFIG_FILES: [&str; 2] = ["airlock.yaml", "airlock.yml"];

/// Local state directory under the project root.
pub(crate) const STATE_DIR: &str = ".airlock";

/// Local override file name inside [`STATE_DIR`].
pub(crate) const LOCAL_CONFIG_FILE: &str = "airlock.local.yaml";

/// Prefix of every managed container name.
pub(crate) const CONTAINER_PREFIX: &str = "airlock-";

/// Working directory used when neither config nor image declares one.
pub(crate) const DEFAULT_WORKDIR: &str = "/workspace";

/// Published image used when the project has no image source at all.
pub(crate) const FALLBACK_IMAGE: &str = "docker.io/library/ubuntu:24.04";

/// Command that keeps a plain base image alive in the background.
const KEEP_ALIVE: [&str; 2] = ["sleep", "infinity"];

/// Fully-resolved project configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProjectConfig {
    /// Project name.
    pub name: String,
    /// Absolute project root; relative host paths resolve against it.
    pub project_dir: PathBuf,
    /// In-container working directory. `None` defers to the image's
    /// `WorkingDir`, then [`DEFAULT_WORKDIR`].
    pub work_dir: Option<String>,
    /// Where the sandbox image comes from.
    pub source: ImageSource,
    /// Preferred engine; `None` autodetects.
    pub engine: Option<Engine>,
    /// Host directory mounted as the sandbox home.
    pub home_dir: PathBuf,
    /// Host directory mounted as `~/.cache`.
    pub cache_dir: PathBuf,
    /// Explicit bind mounts, sources resolved.
    pub mounts: Vec<Mount>,
    /// Merged environment from both layers.
    pub env: BTreeMap<String, String>,
    /// Explicit user identity overrides.
    pub user: UserLayer,
    /// Command appended after the image when creating the container.
    pub command: Vec<String>,
}

/// Exactly one image source per project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImageSource {
    /// A prebuilt image reference.
    Image(String),
    /// An image built from a Containerfile.
    Build(BuildSpec),
}

/// Resolved `build` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildSpec {
    /// Absolute build context directory.
    pub context: PathBuf,
    /// Absolute path of the Containerfile.
    pub containerfile: PathBuf,
    /// Tag applied to the built image.
    pub tag: String,
}

impl ProjectConfig {
    /// Load `path` and its local override, then apply defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        let base = ConfigLayer::from_yaml(&text).map_err(|e| ConfigError::parse(path, e))?;

        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let config_dir =
            fs::canonicalize(config_dir).map_err(|e| ConfigError::read(config_dir, e))?;

        let local_path = config_dir.join(STATE_DIR).join(LOCAL_CONFIG_FILE);
        let layer = match fs::read_to_string(&local_path) {
            Ok(text) => {
                debug!("Merging local overrides from {}", local_path.display());
                let local = ConfigLayer::from_yaml(&text)
                    .map_err(|e| ConfigError::parse(&local_path, e))?;
                base.merge(local)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => base,
            Err(e) => return Err(ConfigError::read(&local_path, e)),
        };

        resolve(layer, &config_dir, Path::is_file)
    }

    /// Name of this project's container.
    pub fn container_name(&self) -> String {
        format!("{CONTAINER_PREFIX}{}", self.name)
    }

    /// Image reference the container runs.
    pub fn image_ref(&self) -> &str {
        match &self.source {
            ImageSource::Image(image) => image,
            ImageSource::Build(build) => &build.tag,
        }
    }

    /// The build section, when the image is built locally.
    pub fn build(&self) -> Option<&BuildSpec> {
        match &self.source {
            ImageSource::Build(build) => Some(build),
            ImageSource::Image(_) => None,
        }
    }
}

/// Apply defaults to a merged layer.
///
/// `config_dir` is the absolute directory of the base file. `exists`
/// probes for files when choosing a default image source.
pub(crate) fn resolve<E>(
    layer: ConfigLayer,
    config_dir: &Path,
    exists: E,
) -> Result<ProjectConfig, ConfigError>
where
    E: Fn(&Path) -> bool,
{
    let ConfigLayer {
        name,
        project_dir,
        work_dir,
        image,
        build,
        engine,
        home_dir,
        cache_dir,
        mounts,
        env,
        user,
        command,
    } = layer;

    let name = non_empty(name)
        .or_else(|| {
            config_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .filter(|n| !n.is_empty())
        .ok_or(ConfigError::MissingName)?;

    let project_dir = match non_empty(project_dir) {
        Some(dir) => resolve_host_path(config_dir, &dir),
        None => config_dir.to_path_buf(),
    };

    let engine = non_empty(engine)
        .map(|e| e.parse::<Engine>().map_err(|_| ConfigError::UnknownEngine(e)))
        .transpose()?;

    let image = non_empty(image);
    if image.is_some() && build.is_some() {
        return Err(ConfigError::ImageAndBuild);
    }
    let build = build.or_else(|| detect_containerfile(&project_dir, &exists));

    let mut command = command.unwrap_or_default();
    let source = match (image, build) {
        (Some(image), _) => ImageSource::Image(image),
        (None, Some(build)) => ImageSource::Build(resolve_build(build, &name, &project_dir)),
        (None, None) => {
            debug!("No image or Containerfile configured, using {}", FALLBACK_IMAGE);
            if command.is_empty() {
                command = KEEP_ALIVE.iter().map(|s| (*s).to_string()).collect();
            }
            ImageSource::Image(FALLBACK_IMAGE.to_string())
        }
    };

    let home_dir = non_empty(home_dir).unwrap_or_else(|| format!("./{STATE_DIR}/home"));
    let cache_dir = non_empty(cache_dir).unwrap_or_else(|| format!("./{STATE_DIR}/cache"));

    let mounts = mounts
        .unwrap_or_default()
        .into_iter()
        .map(|m| Mount {
            source: resolve_host_path(&project_dir, &m.source)
                .to_string_lossy()
                .to_string(),
            ..m
        })
        .collect();

    let work_dir = resolve_work_dir(work_dir)?;

    Ok(ProjectConfig {
        name,
        work_dir,
        source,
        engine,
        home_dir: resolve_host_path(&project_dir, &home_dir),
        cache_dir: resolve_host_path(&project_dir, &cache_dir),
        mounts,
        env: env.unwrap_or_default(),
        user: user.unwrap_or_default(),
        command,
        project_dir,
    })
}

/// Default build section when a Containerfile sits in a known location.
fn detect_containerfile<E>(project_dir: &Path, exists: E) -> Option<BuildLayer>
where
    E: Fn(&Path) -> bool,
{
    let candidates = [
        (".", "Containerfile"),
        ("./env", "./env/Containerfile"),
    ];
    candidates
        .into_iter()
        .find(|(_, file)| exists(&project_dir.join(file)))
        .map(|(context, file)| {
            debug!("Found {}, building image from it", file);
            BuildLayer {
                context: Some(context.to_string()),
                containerfile: Some(file.to_string()),
                tag: None,
            }
        })
}

fn resolve_build(build: BuildLayer, name: &str, project_dir: &Path) -> BuildSpec {
    let context = non_empty(build.context).unwrap_or_else(|| ".".to_string());
    let containerfile = non_empty(build.containerfile).unwrap_or_else(|| "Containerfile".to_string());
    BuildSpec {
        context: resolve_host_path(project_dir, &context),
        containerfile: resolve_host_path(project_dir, &containerfile),
        tag: non_empty(build.tag).unwrap_or_else(|| format!("airlock:{}", sanitize_name(name))),
    }
}

/// `.` defers to the image like an unset value; anything else must be
/// absolute.
fn resolve_work_dir(work_dir: Option<String>) -> Result<Option<String>, ConfigError> {
    match non_empty(work_dir) {
        Some(dir) if matches!(dir.trim(), "." | "./") => Ok(None),
        Some(dir) if !dir.trim().starts_with('/') => Err(ConfigError::RelativeWorkdir(dir)),
        other => Ok(other),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Lowercase `name`, replacing anything but ASCII letters and digits
/// with `-`, for use as an image tag component.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Find the base configuration file in `start` or its nearest ancestor.
pub(crate) fn find_config_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|candidate| candidate.is_file())
    })
}
