use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub relocate_attachments: Option<bool>,
    pub delete_source: Option<bool>,
    pub format: Option<String>,
}

/// Load `path`, or `./upgrader.yaml` when no path is given and that file exists.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("upgrader.yaml");
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path)?;
    let cfg = serde_yaml::from_str(&s)?;
    log::debug!("loaded config from {}", path.display());
    Ok(Some(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("upgrader.yaml");
        fs::write(&path, "relocate_attachments: false\nformat: json\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(cfg.relocate_attachments, Some(false));
        assert_eq!(cfg.delete_source, None);
        assert_eq!(cfg.format.as_deref(), Some("json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
