//! Embedded templates written by `airlock init`.

use crate::config::sanitize_name;

/// Placeholder replaced with the project name.
pub(crate) const NAME_PLACEHOLDER: &str = "{name}";

/// Default `airlock.yaml`.
pub(crate) const AIRLOCK_YAML: &str = include_str!("airlock.yaml");

/// Default `.airlock/airlock.local.yaml`.
pub(crate) const AIRLOCK_LOCAL_YAML: &str = include_str!("airlock.local.yaml");

/// Default `Containerfile`.
pub(crate) const CONTAINERFILE: &str = include_str!("Containerfile");

/// Render `airlock.yaml` for `name`.
///
/// The `name:` value is quoted when YAML would otherwise read it as
/// something else; the commented tag example shows the sanitized name.
pub(crate) fn airlock_yaml(name: &str) -> String {
    let scalar = serde_yaml::to_string(name)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{name:?}"));
    AIRLOCK_YAML
        .replacen(NAME_PLACEHOLDER, &scalar, 1)
        .replace(NAME_PLACEHOLDER, &sanitize_name(name))
}
