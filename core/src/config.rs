use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::report::OutputFormat;
use crate::serdable::GlobPattern;
use crate::testing::{CommandTable, ErrorKinds, RunCommandEntry, TestRunner};

pub const APP_NAME: &str = "tst";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub test: TestConfig,
    pub run: Vec<RunCommandEntry>,
    /// Extra runtime error kinds, `Name = "c"`.
    pub errors: BTreeMap<String, char>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Seconds.
    pub timeout: f64,
    pub output: OutputFormat,
    pub jobs: Option<usize>,
    pub include: GlobPattern,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_config_file: None,
            test: TestConfig::default(),
            run: Vec::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout: TestRunner::DEFAULT_TIMEOUT.as_secs_f64(),
            output: OutputFormat::default(),
            jobs: None,
            include: GlobPattern::parse("*.py").unwrap(),
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "tst.toml";

    pub fn example_toml() -> String {
        let file = Asset::get(Self::FILENAME).unwrap();
        std::str::from_utf8(file.data.as_ref()).unwrap().to_owned()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    pub fn user_config_file() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(Self::FILENAME))
            .filter(|path| path.is_file())
    }

    /// Loads the nearest `tst.toml`, falling back to the user's config dir and
    /// then to built-in defaults.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(cur_dir).or_else(Self::user_config_file) {
            Some(path) => {
                log::debug!("Using config {}", path.display());
                Self::from_toml_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn command_table(&self) -> CommandTable {
        CommandTable::builtin().with_entries(self.run.iter().cloned())
    }

    pub fn error_kinds(&self) -> ErrorKinds {
        ErrorKinds::builtin().extend(&self.errors)
    }
}

impl TestConfig {
    pub fn timeout_duration(&self) -> anyhow::Result<Duration> {
        ensure!(
            self.timeout.is_finite() && self.timeout > 0.0,
            "Timeout must be a positive number of seconds (given: {})",
            self.timeout
        );
        Ok(Duration::from_secs_f64(self.timeout))
    }

    pub fn jobs_or_default(&self) -> usize {
        self.jobs.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
