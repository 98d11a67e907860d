use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PROVISION_DIR: &str = ".provision";
pub const CONFIG_FILE: &str = ".provision/config.yaml";
pub const DB_FILE: &str = ".provision/provision.db";
pub const CONTENT_DIR: &str = "content";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn provision_dir(root: &Path) -> PathBuf {
    root.join(PROVISION_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

/// Resolve the content repository directory. Relative paths in the config
/// are taken relative to the project root.
pub fn content_root(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_content_root_is_joined() {
        let root = Path::new("/srv/project");
        assert_eq!(
            content_root(root, Path::new("content")),
            PathBuf::from("/srv/project/content")
        );
        assert_eq!(
            content_root(root, Path::new("/data/content")),
            PathBuf::from("/data/content")
        );
    }

    #[test]
    fn db_lives_under_provision_dir() {
        let root = Path::new("/tmp/p");
        assert!(db_path(root).starts_with(provision_dir(root)));
        assert!(config_path(root).starts_with(provision_dir(root)));
    }
}
