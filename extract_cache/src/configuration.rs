use serde::Deserialize;

use crate::Config;

#[derive(Deserialize)]
struct RawConfig {
    index_path: Option<String>,
    download_catalog: Option<String>,
    extract_dir: Option<String>,
    size_threshold_bytes: Option<u64>,
    osmconvert: Option<String>,
}

/// Reads a TOML configuration file. A missing file or a missing field falls
/// back to the defaults; an unparseable file is reported and ignored.
pub fn load_configuration(path: &str) -> Config {
    match fs_err::read_to_string(path) {
        Ok(text) => match toml::from_str::<RawConfig>(&text) {
            Ok(raw) => fill_in_defaults(raw),
            Err(err) => {
                warn!("Ignoring unparseable {}: {}", path, err);
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

fn fill_in_defaults(raw: RawConfig) -> Config {
    let defaults = Config::default();
    Config {
        index_path: raw.index_path.map(Some).unwrap_or(defaults.index_path),
        download_catalog: raw.download_catalog.unwrap_or(defaults.download_catalog),
        extract_dir: raw.extract_dir.unwrap_or(defaults.extract_dir),
        size_threshold_bytes: raw
            .size_threshold_bytes
            .unwrap_or(defaults.size_threshold_bytes),
        osmconvert: raw.osmconvert.unwrap_or(defaults.osmconvert),
    }
}
