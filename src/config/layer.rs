//! One configuration file, as written.
//!
//! Every field is optional so that "absent" and "explicitly set" stay
//! distinguishable through the merge; defaults are applied only once both
//! layers have been reduced into one.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed `airlock.yaml` or `airlock.local.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigLayer {
    /// Project name; drives the container name and default image tag.
    #[serde(default)]
    pub name: Option<String>,

    /// Project root override, relative to the config file's directory.
    #[serde(default, rename = "projectDir")]
    pub project_dir: Option<String>,

    /// In-container working directory.
    #[serde(default, rename = "workdir")]
    pub work_dir: Option<String>,

    /// Prebuilt image reference.
    #[serde(default)]
    pub image: Option<String>,

    /// Build the image from a Containerfile instead.
    #[serde(default)]
    pub build: Option<BuildLayer>,

    /// Preferred engine: "podman" or "docker".
    #[serde(default)]
    pub engine: Option<String>,

    /// Host directory backing the sandbox home.
    #[serde(default, rename = "home")]
    pub home_dir: Option<String>,

    /// Host directory backing `~/.cache` inside the sandbox.
    #[serde(default, rename = "cache")]
    pub cache_dir: Option<String>,

    /// Additional bind mounts.
    #[serde(default)]
    pub mounts: Option<Vec<Mount>>,

    /// Environment variables, as a mapping or a list of `KEY=value`.
    #[serde(default, deserialize_with = "deserialize_env")]
    pub env: Option<BTreeMap<String, String>>,

    /// Explicit sandbox user identity.
    #[serde(default)]
    pub user: Option<UserLayer>,

    /// Command appended after the image in `run`.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// The `build` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildLayer {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub containerfile: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// The `user` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserLayer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uid: Option<u32>,
    #[serde(default)]
    pub gid: Option<u32>,
    #[serde(default)]
    pub home: Option<String>,
}

/// A bind mount declared in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mount {
    /// Host path, relative to the project root unless absolute.
    pub source: String,
    /// Path inside the sandbox.
    pub target: String,
    #[serde(default)]
    pub mode: MountMode,
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    #[default]
    Rw,
    Ro,
}

impl std::fmt::Display for MountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rw => write!(f, "rw"),
            Self::Ro => write!(f, "ro"),
        }
    }
}

impl ConfigLayer {
    /// Parse one layer from YAML text. A document holding only comments
    /// is an empty layer.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let blank = text.lines().map(str::trim).all(|line| {
            line.is_empty() || line.starts_with('#') || line == "---"
        });
        if blank {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Option<Self>>(text).map(Option::unwrap_or_default)
    }

    /// Reduce `over` onto `self`: fields present in `over` win, `env`
    /// merges key by key, `build` and `user` merge field by field, and
    /// sequences are replaced wholesale.
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            name: over.name.or(self.name),
            project_dir: over.project_dir.or(self.project_dir),
            work_dir: over.work_dir.or(self.work_dir),
            image: over.image.or(self.image),
            build: merge_nested(self.build, over.build, BuildLayer::merge),
            engine: over.engine.or(self.engine),
            home_dir: over.home_dir.or(self.home_dir),
            cache_dir: over.cache_dir.or(self.cache_dir),
            mounts: over.mounts.or(self.mounts),
            env: merge_nested(self.env, over.env, |mut base, over| {
                base.extend(over);
                base
            }),
            user: merge_nested(self.user, over.user, UserLayer::merge),
            command: over.command.or(self.command),
        }
    }
}

impl BuildLayer {
    #[must_use]
    fn merge(self, over: Self) -> Self {
        Self {
            context: over.context.or(self.context),
            containerfile: over.containerfile.or(self.containerfile),
            tag: over.tag.or(self.tag),
        }
    }
}

impl UserLayer {
    #[must_use]
    fn merge(self, over: Self) -> Self {
        Self {
            name: over.name.or(self.name),
            uid: over.uid.or(self.uid),
            gid: over.gid.or(self.gid),
            home: over.home.or(self.home),
        }
    }
}

fn merge_nested<T>(base: Option<T>, over: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(merge(base, over)),
        (base, over) => over.or(base),
    }
}

/// The `env` section in either of its two forms.
///
/// Values are read as plain strings so scalars keep the text the user
/// wrote (`3.10` stays `3.10`, not `3.1`).
struct EnvVars(BTreeMap<String, String>);

impl<'de> Deserialize<'de> for EnvVars {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(EnvVisitor)
    }
}

struct EnvVisitor;

impl<'de> Visitor<'de> for EnvVisitor {
    type Value = EnvVars;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of variables or a list of KEY=value entries")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut vars = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Option<String>>()?;
            vars.insert(key, value.unwrap_or_default());
        }
        Ok(EnvVars(vars))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut vars = BTreeMap::new();
        while let Some(item) = seq.next_element::<String>()? {
            match item.split_once('=') {
                Some((k, v)) => vars.insert(k.to_string(), v.to_string()),
                None => vars.insert(item, String::new()),
            };
        }
        Ok(EnvVars(vars))
    }
}

fn deserialize_env<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<EnvVars>::deserialize(deserializer)?.map(|vars| vars.0))
}
