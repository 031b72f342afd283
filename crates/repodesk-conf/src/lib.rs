use camino::Utf8Path;
use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

/// Settings for one workspace, merged from user and workspace config files.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub walk: WalkSettings,
    pub editor: EditorSettings,
}

/// How directory listings traverse the workspace.
///
/// Listings include every entry by default. Set `hidden = false` or
/// `no_ignore = false` to filter.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalkSettings {
    /// List hidden files and directories (names starting with `.`).
    pub hidden: bool,
    /// Ignore `.gitignore`, `.ignore` and friends inside the workspace.
    pub no_ignore: bool,
    /// Descend into symlinked directories that stay inside the workspace.
    pub follow_links: bool,
    pub max_depth: Option<usize>,
    /// Gitignore-style override globs, `!` prefix excludes.
    pub globs: Vec<String>,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            hidden: true,
            no_ignore: true,
            follow_links: false,
            max_depth: None,
            globs: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorSettings {
    /// File extensions the editor offers for editing, without the dot.
    pub extensions: Vec<String>,
    /// Pretty-print valid JSON before writing it.
    pub format_on_save: bool,
    /// Refuse to save over a file that changed on disk since it was loaded.
    pub detect_conflicts: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            format_on_save: false,
            detect_conflicts: false,
        }
    }
}

impl Settings {
    pub fn new(workspace_root: &Utf8Path) -> Result<Self, ConfigError> {
        let user_config_file = user_config_path();
        Self::load_from_paths(workspace_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        workspace_root: &Utf8Path,
        user_config_path: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            tracing::debug!(%path, "adding user config source");
            builder = builder
                .add_source(File::from(path.as_std_path()).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(workspace_root.join(".repodesk.toml").as_std_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(workspace_root.join("repodesk.toml").as_std_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }
}

fn user_config_path() -> Option<Utf8PathBuf> {
    let dirs = ProjectDirs::from("dev", "repodesk", "repodesk")?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().join("repodesk.toml")).ok()
}
