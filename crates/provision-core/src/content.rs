//! Content repository: where campaigns, their localities and the keyword
//! phrases for each locality come from.
//!
//! The filesystem layout read by [`FsContentRepository`] is:
//!
//! ```text
//! <root>/
//!   5/                 ← campaign id (directory name must be numeric)
//!     CityA.txt        ← locality "CityA", one phrase per line
//!     CityB.txt
//!   7/
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};
use crate::model::CampaignId;

const PHRASE_EXT: &str = "txt";

/// The external content source behind the work item source.
pub trait ContentRepository {
    /// Campaign ids this repository exposes, in no particular order.
    fn list_accessible_campaigns(&self) -> Result<Vec<CampaignId>>;

    /// Locality names available for one campaign, in no particular order.
    fn list_localities(&self, campaign_id: CampaignId) -> Result<Vec<String>>;

    /// Raw phrase lines for one locality. May be empty.
    fn list_phrases(&self, campaign_id: CampaignId, locality: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// FsContentRepository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FsContentRepository {
    root: PathBuf,
}

impl FsContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn campaign_dir(&self, campaign_id: CampaignId) -> PathBuf {
        self.root.join(campaign_id.to_string())
    }

    fn read_dir(&self, dir: &Path) -> Result<std::fs::ReadDir> {
        std::fs::read_dir(dir).map_err(|e| {
            ProvisionError::ContentRepository(format!("cannot list {}: {e}", dir.display()))
        })
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn validate_locality(locality: &str) -> Result<()> {
    if locality.is_empty()
        || is_hidden(locality)
        || locality.contains(['/', '\\'])
        || locality == ".."
    {
        return Err(ProvisionError::invalid(
            "locality",
            format!("'{locality}' is not a valid locality name"),
        ));
    }
    Ok(())
}

impl ContentRepository for FsContentRepository {
    fn list_accessible_campaigns(&self) -> Result<Vec<CampaignId>> {
        let mut ids = Vec::new();
        for entry in self.read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|n| n.parse::<CampaignId>().ok()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn list_localities(&self, campaign_id: CampaignId) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.read_dir(&self.campaign_dir(campaign_id))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PHRASE_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if is_hidden(stem) || stem.is_empty() {
                continue;
            }
            names.push(stem.to_string());
        }
        Ok(names)
    }

    fn list_phrases(&self, campaign_id: CampaignId, locality: &str) -> Result<Vec<String>> {
        validate_locality(locality)?;
        let path = self
            .campaign_dir(campaign_id)
            .join(format!("{locality}.{PHRASE_EXT}"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ProvisionError::ContentRepository(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn lists_numeric_campaign_dirs_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "5/CityA.txt", "a");
        write(dir.path(), "12/CityB.txt", "b");
        write(dir.path(), "drafts/CityC.txt", "c");
        write(dir.path(), "README.md", "ignore me");

        let repo = FsContentRepository::new(dir.path());
        let mut ids = repo.list_accessible_campaigns().unwrap();
        ids.sort();
        assert_eq!(ids, vec![5, 12]);
    }

    #[test]
    fn localities_are_txt_stems() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "5/CityA.txt", "a");
        write(dir.path(), "5/City B.txt", "b");
        write(dir.path(), "5/notes.md", "x");
        write(dir.path(), "5/.hidden.txt", "x");

        let repo = FsContentRepository::new(dir.path());
        let mut names = repo.list_localities(5).unwrap();
        names.sort();
        assert_eq!(names, vec!["City B".to_string(), "CityA".to_string()]);
    }

    #[test]
    fn phrases_are_raw_lines() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "5/CityA.txt", "\"plumber near me\"\n\nemergency plumber\n");

        let repo = FsContentRepository::new(dir.path());
        let phrases = repo.list_phrases(5, "CityA").unwrap();
        assert_eq!(
            phrases,
            vec![
                "\"plumber near me\"".to_string(),
                String::new(),
                "emergency plumber".to_string()
            ]
        );
    }

    #[test]
    fn missing_phrase_file_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("5")).unwrap();
        let repo = FsContentRepository::new(dir.path());
        assert!(repo.list_phrases(5, "Nowhere").unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_repository_error() {
        let dir = TempDir::new().unwrap();
        let repo = FsContentRepository::new(dir.path().join("absent"));
        assert!(matches!(
            repo.list_accessible_campaigns(),
            Err(ProvisionError::ContentRepository(_))
        ));
    }

    #[test]
    fn path_like_locality_is_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = FsContentRepository::new(dir.path());
        assert!(repo.list_phrases(5, "../secrets").is_err());
    }
}
