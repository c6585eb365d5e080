//! Home directory resolution for global marker configuration
//!
//! # Precedence
//!
//! 1. `JOLT_HOME` environment variable (if set and non-empty)
//! 2. `dirs::home_dir()` platform default
//!
//! Tests point `JOLT_HOME` at a temp directory so a developer's real
//! `~/.config/jolt/marker.toml` never leaks into results.

use std::path::PathBuf;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "JOLT_HOME";

/// Get the home directory used to locate global configuration.
///
/// Returns `None` when `JOLT_HOME` is unset and the platform home directory
/// cannot be determined; callers then skip the global config layer.
pub fn get_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    dirs::home_dir()
}

/// Path of the global config file under `home`.
pub fn global_config_path(home: &std::path::Path) -> PathBuf {
    home.join(".config").join("jolt").join("marker.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_jolt_home_set() {
        let original = env::var(HOME_ENV).ok();
        unsafe { env::set_var(HOME_ENV, "/custom/home") };

        assert_eq!(get_home_dir(), Some(PathBuf::from("/custom/home")));

        unsafe {
            match original {
                Some(v) => env::set_var(HOME_ENV, v),
                None => env::remove_var(HOME_ENV),
            }
        }
    }

    #[test]
    #[serial]
    fn test_jolt_home_blank_falls_back() {
        let original = env::var(HOME_ENV).ok();
        unsafe { env::set_var(HOME_ENV, "   ") };

        assert_eq!(get_home_dir(), dirs::home_dir());

        unsafe {
            match original {
                Some(v) => env::set_var(HOME_ENV, v),
                None => env::remove_var(HOME_ENV),
            }
        }
    }

    #[test]
    fn test_global_config_path() {
        let path = global_config_path(std::path::Path::new("/home/dev"));
        assert_eq!(path, PathBuf::from("/home/dev/.config/jolt/marker.toml"));
    }
}
