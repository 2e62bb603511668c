//! Image metadata: the declared user, working directory and environment.

use serde::Deserialize;
use tracing::debug;

use crate::config::UserLayer;
use crate::engine::{display_command, CommandRunner};

use super::SandboxError;

/// User assumed when the image does not declare one.
pub(crate) const DEFAULT_USER: &str = "1000";

/// What an image says about how it expects to be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageMetadata {
    /// Declared user, or [`DEFAULT_USER`].
    pub user: String,
    /// Home directory derived from `user`.
    pub home: String,
    /// Declared working directory, if any.
    pub work_dir: Option<String>,
    /// Declared default environment, in image order.
    pub env: Vec<(String, String)>,
}

/// The identity the sandbox runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SandboxUser {
    pub name: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub home: String,
}

impl SandboxUser {
    /// Value passed to `--user`.
    pub fn user_arg(&self) -> String {
        match (self.uid, self.gid) {
            (Some(uid), Some(gid)) => format!("{uid}:{gid}"),
            (Some(uid), None) => uid.to_string(),
            _ => self.name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct InspectRecord {
    #[serde(rename = "Config")]
    config: ImageConfig,
}

#[derive(Deserialize)]
struct ImageConfig {
    #[serde(rename = "User", default)]
    user: Option<String>,
    #[serde(rename = "WorkingDir", default)]
    working_dir: Option<String>,
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
}

/// Inspect `image` through the engine.
pub(crate) async fn inspect_image<R>(runner: &R, image: &str) -> Result<ImageMetadata, SandboxError>
where
    R: CommandRunner + ?Sized,
{
    let args: Vec<String> = ["image", "inspect", "--format", "json", image]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let output = runner.capture(&args).await?;
    if !output.success {
        return Err(SandboxError::command_failed(
            display_command(runner.engine(), &args),
            output.code,
            output.stderr,
        ));
    }
    parse_image_inspect(image, &output.stdout)
}

/// Parse `image inspect --format json` output.
pub(crate) fn parse_image_inspect(image: &str, json: &str) -> Result<ImageMetadata, SandboxError> {
    let records: Vec<InspectRecord> =
        serde_json::from_str(json).map_err(|e| SandboxError::metadata_parse(image, e.to_string()))?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| SandboxError::metadata_parse(image, "no records returned"))?;

    let config = record.config;
    let user = config
        .user
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    let env = config
        .env
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect();

    let metadata = ImageMetadata {
        home: home_for(&user),
        user,
        work_dir: config.working_dir.filter(|w| !w.trim().is_empty()),
        env,
    };
    debug!(
        "Image {} runs as {} (home {}, workdir {:?})",
        image, metadata.user, metadata.home, metadata.work_dir
    );
    Ok(metadata)
}

/// Home directory convention for a user spec. `name:group` uses `name`.
///
/// This is a heuristic: the image's passwd database is not consulted.
pub(crate) fn home_for(user: &str) -> String {
    let name = user.split(':').next().unwrap_or(user);
    if name == "root" || name == "0" {
        "/root".to_string()
    } else {
        format!("/home/{name}")
    }
}

/// Apply explicit `user` settings on top of the image's declared user.
pub(crate) fn resolve_user(image: &ImageMetadata, explicit: &UserLayer) -> SandboxUser {
    let name = explicit.name.clone().unwrap_or_else(|| image.user.clone());
    let home = match (&explicit.home, &explicit.name) {
        (Some(home), _) => home.clone(),
        (None, Some(name)) => home_for(name),
        (None, None) => image.home.clone(),
    };
    SandboxUser {
        name,
        uid: explicit.uid,
        gid: explicit.gid,
        home,
    }
}
