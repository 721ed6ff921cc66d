//! `toolweave init`: write a default config file.

use std::path::{Path, PathBuf};

use toolweave_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    match write_default_config(&config_dir, force)? {
        Some(path) => println!("Created {}", path.display()),
        None => println!(
            "Config already exists at {}; pass --force to overwrite it.",
            config_dir.join("config.toml").display()
        ),
    }
    Ok(())
}

/// Write the default `config.toml` into `dir`, creating the directory.
/// An existing file is left alone unless `force` is set; `None` means it was
/// kept.
pub fn write_default_config(dir: &Path, force: bool) -> std::io::Result<Option<PathBuf>> {
    let path = dir.join("config.toml");
    if path.exists() && !force {
        tracing::debug!(path = %path.display(), "Keeping existing config");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, AppConfig::default_toml())?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join(".toolweave");

        let path = write_default_config(&nested, false).unwrap().unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn existing_config_is_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "dialect = \"qwen3\"\n").unwrap();

        assert!(write_default_config(dir.path(), false).unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dialect = \"qwen3\"\n");

        assert!(write_default_config(dir.path(), true).unwrap().is_some());
        assert!(std::fs::read_to_string(&path).unwrap().contains("llama3.1"));
    }
}
