use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: i64,
    pub title: String,
    pub feed: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub storage_path: Option<PathBuf>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Podcast {
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Location of a downloaded episode file inside this podcast's storage.
    ///
    /// Only bare file names are accepted, anything else could point outside
    /// the storage directory.
    pub fn episode_path(&self, file_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                log::warn!(target: "library", "ignoring stored file name {file_name:?}");
                return None;
            }
        }
        self.storage_path().map(|dir| dir.join(file_name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPodcast {
    pub title: String,
    pub feed: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub storage_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn podcast() -> Podcast {
        Podcast {
            storage_path: Some(PathBuf::from("/srv/podcasts/night-shift")),
            ..Default::default()
        }
    }

    #[test]
    fn episode_path_joins_a_bare_name() {
        assert_eq!(
            podcast().episode_path("12-pilot.mp3"),
            Some(PathBuf::from("/srv/podcasts/night-shift/12-pilot.mp3"))
        );
    }

    #[test]
    fn episode_path_refuses_names_that_leave_storage() {
        let podcast = podcast();
        for name in ["", "/etc/passwd", "../other/ep.mp3", "..", ".", "sub/ep.mp3"] {
            assert_eq!(podcast.episode_path(name), None, "{name:?}");
        }
    }

    #[test]
    fn episode_path_needs_a_storage_directory() {
        assert_eq!(Podcast::default().episode_path("ep.mp3"), None);
    }
}
