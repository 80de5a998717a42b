use crate::{controller::AlertSeverity, gallery::Dispatch};
use anyhow::{Context, Result, bail};
use log::debug;
use once_cell::sync::Lazy;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub db_path: PathBuf,

    #[serde(skip)]
    pub app_name: String,

    #[serde(default)]
    pub preference: Preference,

    #[serde(default)]
    pub gallery: Gallery,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Preference {
    #[serde(default)]
    pub severity: AlertSeverity,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct Gallery {
    #[serde(default)]
    pub dispatch: Dispatch,

    #[serde(default = "thumbnail_size_default")]
    #[derivative(Default(value = "thumbnail_size_default()"))]
    pub thumbnail_size: u32,

    #[serde(default = "workers_default")]
    #[derivative(Default(value = "workers_default()"))]
    pub workers: usize,
}

impl Config {
    /// Initializes the configuration
    ///
    /// Creates the platform directories and loads the configuration file.
    pub fn init(&mut self) -> Result<()> {
        self.app_name = env!("CARGO_PKG_NAME").to_string();

        let app_dirs = AppDirs::new(Some(&self.app_name), true)
            .context("no platform directories for this user")?;
        self.crate_dirs(&app_dirs.config_dir, &app_dirs.data_dir)?;

        self.load().with_context(|| "load config file failed")?;
        debug!("{:?}", self);

        Ok(())
    }

    fn crate_dirs(&mut self, config_dir: &Path, data_dir: &Path) -> Result<()> {
        self.db_path = data_dir.join(format!("{}.db", self.app_name));
        self.config_path = config_dir.join(format!("{}.toml", self.app_name));

        fs::create_dir_all(data_dir)?;
        fs::create_dir_all(config_dir)?;

        Ok(())
    }

    /// Loads configuration from file or writes the defaults when it is
    /// missing or unreadable. An unreadable file is kept as `<name>.bak`.
    fn load(&mut self) -> Result<()> {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => match toml::from_str::<Config>(&text) {
                Ok(mut c) => {
                    c.config_path = self.config_path.clone();
                    c.db_path = self.db_path.clone();
                    c.app_name = self.app_name.clone();
                    *self = c;
                    Ok(())
                }
                Err(e) => {
                    log::warn!("broken config {}: {e}", self.config_path.display());
                    let mut bak_file = self.config_path.clone().into_os_string();
                    bak_file.push(".bak");
                    _ = fs::copy(&self.config_path, bak_file);
                    self.save()
                }
            },
            Err(_) => self.save(),
        }
    }

    fn save(&self) -> Result<()> {
        match toml::to_string_pretty(self) {
            Ok(text) => Ok(fs::write(&self.config_path, text)
                .with_context(|| "save config failed".to_string())?),
            Err(e) => bail!(format!("convert config to toml format failed. {e:?}")),
        }
    }
}

fn thumbnail_size_default() -> u32 {
    96
}

fn workers_default() -> usize {
    4
}

/// Initializes the global configuration
///
/// This should be called once at application startup.
pub fn init() -> Result<()> {
    CONFIG.lock().unwrap().init()
}

/// Returns a clone of the current configuration
pub fn all() -> Config {
    CONFIG.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config {
            app_name: "filterview".to_string(),
            ..Default::default()
        };
        config
            .crate_dirs(&dir.join("config"), &dir.join("data"))
            .unwrap();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.preference.severity, AlertSeverity::Surface);
        assert_eq!(config.gallery.dispatch, Dispatch::Sequential);
        assert_eq!(config.gallery.thumbnail_size, 96);
        assert_eq!(config.gallery.workers, 4);
    }

    #[test]
    fn test_first_run_writes_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config_in(dir.path());
        config.load()?;

        assert!(config.config_path.exists());
        assert!(dir.path().join("data").is_dir());
        let text = fs::read_to_string(&config.config_path)?;
        assert!(text.contains("[gallery]"));
        assert_eq!(config.db_path, dir.path().join("data").join("filterview.db"));
        Ok(())
    }

    #[test]
    fn test_load_saved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config_in(dir.path());
        config.gallery.dispatch = Dispatch::Concurrent;
        config.preference.severity = AlertSeverity::Log;
        config.save()?;

        let mut loaded = config_in(dir.path());
        loaded.load()?;
        assert_eq!(loaded.gallery.dispatch, Dispatch::Concurrent);
        assert_eq!(loaded.preference.severity, AlertSeverity::Log);
        assert_eq!(loaded.gallery.thumbnail_size, 96);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config_in(dir.path());
        fs::write(&config.config_path, "[gallery]\nworkers = 2\n")?;

        config.load()?;
        assert_eq!(config.gallery.workers, 2);
        assert_eq!(config.gallery.thumbnail_size, 96);
        assert_eq!(config.preference.severity, AlertSeverity::Surface);
        Ok(())
    }

    #[test]
    fn test_broken_file_backed_up() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config_in(dir.path());
        fs::write(&config.config_path, "gallery = [[[")?;

        config.load()?;
        assert_eq!(config.gallery.workers, 4);

        let bak = dir.path().join("config").join("filterview.toml.bak");
        assert_eq!(fs::read_to_string(bak)?, "gallery = [[[");

        let text = fs::read_to_string(&config.config_path)?;
        assert!(toml::from_str::<Config>(&text).is_ok());
        Ok(())
    }
}
