use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{BumpKind, VersionTemplate};
use crate::error::{PipelineError, Result};

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = "bem-pipeline.toml";

/// Represents the complete configuration for bem-pipeline.
///
/// Contains directory layout, external tool invocations, the ordered
/// concatenation list, version-sync targets, release templates and watch globs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub dir: DirConfig,

    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub sass: SassConfig,

    #[serde(default)]
    pub assertions: AssertionsConfig,

    #[serde(default)]
    pub concat: ConcatConfig,

    #[serde(default)]
    pub version: VersionConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

fn default_src_dir() -> String {
    "stylesheets".to_string()
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

/// Source and output directories, available to other settings as `{src}` and `{dist}`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DirConfig {
    #[serde(default = "default_src_dir")]
    pub src: String,

    #[serde(default = "default_dist_dir")]
    pub dist: String,
}

impl Default for DirConfig {
    fn default() -> Self {
        DirConfig {
            src: default_src_dir(),
            dist: default_dist_dir(),
        }
    }
}

fn default_manifest() -> String {
    "package.json".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PackageConfig {
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        PackageConfig {
            manifest: default_manifest(),
        }
    }
}

fn default_sass_program() -> String {
    "sass".to_string()
}

fn default_sass_input() -> String {
    "test/tests.scss".to_string()
}

fn default_sass_output() -> String {
    "tmp/results.css".to_string()
}

fn default_load_paths() -> Vec<String> {
    vec![
        "node_modules/bootcamp/dist".to_string(),
        "{src}".to_string(),
    ]
}

/// How the test stylesheet is compiled.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SassConfig {
    #[serde(default = "default_sass_program")]
    pub program: String,

    #[serde(default = "default_sass_input")]
    pub input: String,

    #[serde(default = "default_sass_output")]
    pub output: String,

    #[serde(default = "default_load_paths")]
    pub load_paths: Vec<String>,
}

impl Default for SassConfig {
    fn default() -> Self {
        SassConfig {
            program: default_sass_program(),
            input: default_sass_input(),
            output: default_sass_output(),
            load_paths: default_load_paths(),
        }
    }
}

fn default_assertions_program() -> String {
    "bootcamp".to_string()
}

fn default_assertions_args() -> Vec<String> {
    vec!["{css}".to_string()]
}

/// How assertions are run over the compiled stylesheet. `{css}` in `args`
/// is replaced by the compiled output path.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AssertionsConfig {
    #[serde(default = "default_assertions_program")]
    pub program: String,

    #[serde(default = "default_assertions_args")]
    pub args: Vec<String>,
}

impl Default for AssertionsConfig {
    fn default() -> Self {
        AssertionsConfig {
            program: default_assertions_program(),
            args: default_assertions_args(),
        }
    }
}

fn default_destination() -> String {
    "{dist}/_{name}.scss".to_string()
}

fn default_banner() -> String {
    "/*! {name} - version: {version} - {date} */\n".to_string()
}

/// Ordered concatenation of the library partials into the distributable file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConcatConfig {
    /// Declared order is output order; it is never sorted.
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default = "default_destination")]
    pub destination: String,

    #[serde(default = "default_banner")]
    pub banner: String,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        ConcatConfig {
            sources: Vec::new(),
            destination: default_destination(),
            banner: default_banner(),
        }
    }
}

/// Files that mirror the manifest version. The manifest itself is always synced.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct VersionConfig {
    #[serde(default)]
    pub targets: Vec<String>,
}

fn default_commit_message() -> String {
    "Release v%VERSION%".to_string()
}

fn default_tag_name() -> String {
    "v%VERSION%".to_string()
}

fn default_tag_message() -> String {
    "Version %VERSION%".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_push() -> bool {
    true
}

/// Release templates and the push target.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub default_bump: BumpKind,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_push")]
    pub push: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            default_bump: BumpKind::default(),
            commit_message: default_commit_message(),
            tag_name: default_tag_name(),
            tag_message: default_tag_message(),
            remote: default_remote(),
            push: default_push(),
        }
    }
}

fn default_watch_files() -> Vec<String> {
    vec!["test/**/*.scss".to_string(), "{src}/**/*.scss".to_string()]
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    #[serde(default = "default_watch_files")]
    pub files: Vec<String>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            files: default_watch_files(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Substitute `{src}` and `{dist}` in a configured path.
    pub fn expand(&self, value: &str) -> String {
        value
            .replace("{src}", &self.dir.src)
            .replace("{dist}", &self.dir.dist)
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, root: &Path, value: &str) -> PathBuf {
        root.join(self.expand(value))
    }

    /// Destination of the concatenated artifact for a package name.
    pub fn destination(&self, root: &Path, package_name: &str) -> PathBuf {
        let expanded = self.expand(&self.concat.destination);
        root.join(expanded.replace("{name}", package_name))
    }

    /// Manifest first, then every configured target not already listed.
    pub fn version_targets(&self, root: &Path, package_name: &str) -> Vec<PathBuf> {
        let mut targets = vec![self.resolve(root, &self.package.manifest)];
        for target in &self.version.targets {
            let path = root.join(self.expand(target).replace("{name}", package_name));
            if !targets.contains(&path) {
                targets.push(path);
            }
        }
        targets
    }

    pub fn commit_message(&self) -> VersionTemplate {
        VersionTemplate::new(&self.release.commit_message)
    }

    pub fn tag_name(&self) -> VersionTemplate {
        VersionTemplate::new(&self.release.tag_name)
    }

    pub fn tag_message(&self) -> VersionTemplate {
        VersionTemplate::new(&self.release.tag_message)
    }

    /// Checks that do not depend on the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.concat.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(PipelineError::config(
                "concat.sources contains an empty entry",
            ));
        }
        if self.concat.destination.trim().is_empty() {
            return Err(PipelineError::config("concat.destination is empty"));
        }
        if self.release.remote.trim().is_empty() {
            return Err(PipelineError::config("release.remote is empty"));
        }
        self.tag_name().require_placeholder("release.tag_name")?;
        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `bem-pipeline.toml` in the project root
/// 3. `bem-pipeline/config.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<Config> {
    let local = root.join(CONFIG_FILE_NAME);
    let source = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if local.exists() {
        Some(local)
    } else {
        dirs::config_dir()
            .map(|dir| dir.join("bem-pipeline").join("config.toml"))
            .filter(|path| path.exists())
    };

    let config = match source {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            let text = fs::read_to_string(&path).map_err(|e| {
                PipelineError::config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            parse_config(&text)
                .map_err(|e| PipelineError::config(format!("{}: {}", path.display(), e)))?
        }
        None => {
            tracing::debug!("no configuration file found, using defaults");
            Config::default()
        }
    };

    config.validate()?;
    Ok(config)
}

/// Parse configuration text without validating it.
pub fn parse_config(text: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_library_layout() {
        let config = Config::default();
        assert_eq!(config.dir.src, "stylesheets");
        assert_eq!(config.dir.dist, "dist");
        assert_eq!(config.sass.output, "tmp/results.css");
        assert_eq!(config.release.default_bump, BumpKind::Minor);
        assert_eq!(config.release.remote, "origin");
        assert!(config.release.push);
    }

    #[test]
    fn test_expand_placeholders() {
        let config = Config::default();
        assert_eq!(config.expand("{src}/**/*.scss"), "stylesheets/**/*.scss");
        assert_eq!(config.expand("{dist}/x.scss"), "dist/x.scss");
    }

    #[test]
    fn test_destination_uses_package_name() {
        let config = Config::default();
        let dest = config.destination(Path::new("/proj"), "bem-constructor");
        assert_eq!(dest, PathBuf::from("/proj/dist/_bem-constructor.scss"));
    }

    #[test]
    fn test_version_targets_start_with_manifest_and_dedupe() {
        let mut config = Config::default();
        config.version.targets = vec![
            "bower.json".to_string(),
            "package.json".to_string(),
            "{dist}/_{name}.scss".to_string(),
        ];
        let targets = config.version_targets(Path::new("/p"), "lib");
        assert_eq!(
            targets,
            vec![
                PathBuf::from("/p/package.json"),
                PathBuf::from("/p/bower.json"),
                PathBuf::from("/p/dist/_lib.scss"),
            ]
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
[dir]
src = "scss"

[release]
default_bump = "patch"
"#,
        )
        .unwrap();
        assert_eq!(config.dir.src, "scss");
        assert_eq!(config.dir.dist, "dist");
        assert_eq!(config.release.default_bump, BumpKind::Patch);
        assert_eq!(config.release.commit_message, "Release v%VERSION%");
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(parse_config("[uglify]\nfiles = []\n").is_err());
    }

    #[test]
    fn test_validate_rejects_constant_tag_name() {
        let mut config = Config::default();
        config.release.tag_name = "latest".to_string();
        assert!(config.validate().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_validate_rejects_empty_source_entry() {
        let mut config = Config::default();
        config.concat.sources = vec!["a.scss".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }
}
