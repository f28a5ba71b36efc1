use std::io;
use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::profile::Profile;
use crate::shared::ValidationError;

/// Directory searched by [`load_config`], relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration file.
const FILE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

const BASE_FILE_STEM: &str = "base";

/// Environment overrides look like `APP_BULK__POLL_INTERVAL_MS`.
const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_NESTING_SEPARATOR: &str = "__";

/// A configuration tree that can be loaded by [`load_config_from`].
///
/// Validation runs once every source has been merged, so an override may fix a value that
/// would be invalid in a file on its own.
pub trait Config: DeserializeOwned {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Errors raised while assembling a configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("no base configuration in `{directory}`, expected one of: {expected}")]
    MissingBaseFile { directory: PathBuf, expected: String },

    #[error("failed to read `{path}`: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("failed to apply environment overrides: {0}")]
    InvalidEnvironment(#[source] config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Loads the configuration of `profile` from `./configuration`.
pub fn load_config<T: Config>(profile: Profile) -> Result<T, LoadConfigError> {
    let cwd = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    load_config_from(&cwd.join(CONFIGURATION_DIR), profile)
}

/// Loads and validates the configuration of `profile` from `directory`.
///
/// Sources are layered in this order, later ones winning:
///
/// 1. `base.{yaml,yml,json}`, which must exist;
/// 2. `{profile}.{yaml,yml,json}`, if present;
/// 3. `APP_` prefixed environment variables, with `__` separating nested keys.
pub fn load_config_from<T: Config>(directory: &Path, profile: Profile) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingDirectory(directory.to_path_buf()));
    }

    let Some(base_file) = find_file(directory, BASE_FILE_STEM) else {
        return Err(LoadConfigError::MissingBaseFile {
            directory: directory.to_path_buf(),
            expected: candidates(directory, BASE_FILE_STEM).join(", "),
        });
    };

    let mut builder = add_file(config::Config::builder(), &base_file)?;
    if let Some(profile_file) = find_file(directory, profile.as_str()) {
        builder = add_file(builder, &profile_file)?;
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_PREFIX_SEPARATOR)
                .separator(ENV_NESTING_SEPARATOR),
        )
        .build()
        .map_err(LoadConfigError::InvalidEnvironment)?;

    let config: T = settings
        .try_deserialize()
        .map_err(LoadConfigError::Deserialization)?;
    config.validate()?;

    Ok(config)
}

fn candidates(directory: &Path, stem: &str) -> Vec<String> {
    FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")).display().to_string())
        .collect()
}

fn find_file(directory: &Path, stem: &str) -> Option<PathBuf> {
    FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
}

/// Adds `path` as a source, failing early so that a broken file is named in the error.
fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, LoadConfigError> {
    let builder = builder.add_source(config::File::from(path));
    builder
        .build_cloned()
        .map_err(|source| LoadConfigError::InvalidFile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(builder)
}
