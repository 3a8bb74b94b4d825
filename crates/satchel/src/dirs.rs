use std::path::PathBuf;

use etcetera::BaseStrategy;

/// Name of the configuration file, both per user and per project
pub const CONFIG_FILE_NAME: &str = "satchel.toml";

/// `<config_dir>/satchel`, e.g. `~/.config/satchel` on Linux
pub fn user_satchel_config_dir() -> Option<PathBuf> {
    etcetera::choose_base_strategy()
        .map(|dirs| dirs.config_dir().join("satchel"))
        .ok()
}

/// The user configuration file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_satchel_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_file_lives_in_satchel_dir() {
        if let Some(file) = user_config_file() {
            assert!(file.ends_with("satchel/satchel.toml"));
        }
    }
}
