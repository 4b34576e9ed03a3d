use super::download;
use crate::{
    database::Database,
    domain::{Episode, LoadError, MediaSource, NewEpisode, NewPodcast, Podcast},
    player::EpisodeStore,
    sanitize_file_name,
};
use anyhow::{Context, Result, anyhow};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use url::Url;

/// Podcasts and episodes backed by SQLite.
///
/// Cloning is cheap and every clone shares the same connection, so the
/// player thread and the message loop can hold their own copy.
#[derive(Clone)]
pub struct Library {
    db: Arc<Mutex<Database>>,
    storage_root: PathBuf,
}

impl Library {
    pub fn open(path: &Path, storage_root: impl Into<PathBuf>) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::with_database(db, storage_root))
    }

    pub fn in_memory(storage_root: impl Into<PathBuf>) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, storage_root))
    }

    fn with_database(db: Database, storage_root: impl Into<PathBuf>) -> Self {
        Library {
            db: Arc::new(Mutex::new(db)),
            storage_root: storage_root.into(),
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("Library database lock was poisoned"))
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

// ================
//    PODCASTS
// ================
impl Library {
    pub fn podcasts(&self) -> Result<Vec<Podcast>> {
        self.db()?.get_podcasts()
    }

    pub fn podcast(&self, id: i64) -> Result<Option<Podcast>> {
        self.db()?.get_podcast(id)
    }

    pub fn load_podcast(&self, id: i64) -> Result<Podcast> {
        self.podcast(id)?
            .ok_or_else(|| anyhow!("Podcast {id} does not exist"))
    }

    /// Store a new podcast. Without an explicit storage path the podcast gets
    /// a directory named after its title under the storage root.
    pub fn add_podcast(&self, podcast: NewPodcast) -> Result<Podcast> {
        let db = self.db()?;
        let id = db.insert_podcast(&podcast)?;

        if podcast.storage_path.is_none() {
            let dir = self.storage_root.join(sanitize_file_name(&podcast.title));
            db.set_podcast_storage(id, &dir)?;
        }

        log::info!(target: "library", "added podcast {id} '{}'", podcast.title);

        db.get_podcast(id)?
            .ok_or_else(|| anyhow!("Podcast {id} vanished after insert"))
    }

    /// Remove a podcast and its episodes. A permanent unsubscribe also deletes
    /// the downloaded episode files.
    pub fn unsubscribe(&self, id: i64, permanent: bool) -> Result<()> {
        let podcast = self.load_podcast(id)?;

        if permanent {
            let episodes = self.episodes(Some(id))?;
            for file in episodes
                .iter()
                .filter_map(|e| e.file_name.as_deref())
                .filter_map(|name| podcast.episode_path(name))
            {
                match std::fs::remove_file(&file) {
                    Ok(()) => log::info!(target: "library", "deleted {}", file.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        log::warn!(target: "library", "could not delete {}: {e}", file.display())
                    }
                }
            }

            // Only succeeds once the directory is empty
            if let Some(dir) = podcast.storage_path() {
                let _ = std::fs::remove_dir(dir);
            }
        }

        match self.db()?.delete_podcast(id)? {
            true => Ok(()),
            false => Err(anyhow!("Podcast {id} does not exist")),
        }
    }

    pub fn mark_podcast_all_played(&self, podcast_id: i64, played: bool) -> Result<usize> {
        self.load_podcast(podcast_id)?;
        self.db()?.set_podcast_played(podcast_id, played)
    }
}

// ================
//    EPISODES
// ================
impl Library {
    pub fn episode(&self, id: i64) -> Result<Option<Episode>> {
        self.db()?.get_episode(id)
    }

    pub fn load_episode(&self, id: i64) -> Result<Episode> {
        self.episode(id)?
            .ok_or_else(|| anyhow!(LoadError::EpisodeNotFound(id)))
    }

    pub fn episodes(&self, podcast_id: Option<i64>) -> Result<Vec<Episode>> {
        self.db()?.get_episodes(podcast_id)
    }

    pub fn add_episode(&self, episode: NewEpisode) -> Result<Episode> {
        self.load_podcast(episode.podcast_id)?;

        let db = self.db()?;
        let id = db.insert_episode(&episode)?;

        db.get_episode(id)?
            .ok_or_else(|| anyhow!("Episode {id} vanished after insert"))
    }

    /// Write playback progress without touching the episode's other columns.
    pub fn save_progress(&self, episode: &Episode) -> Result<()> {
        let saved = self.db()?.save_episode_progress(
            episode.id,
            episode.play_position,
            episode.duration,
            episode.played,
        )?;
        match saved {
            true => Ok(()),
            false => Err(anyhow!(LoadError::EpisodeNotFound(episode.id))),
        }
    }

    pub fn mark_episode_played(&self, id: i64, played: bool) -> Result<()> {
        match self.db()?.set_episode_played(id, played)? {
            true => Ok(()),
            false => Err(anyhow!(LoadError::EpisodeNotFound(id))),
        }
    }

    pub fn mark_episode_favourite(&self, id: i64, favourite: bool) -> Result<()> {
        match self.db()?.set_episode_favourite(id, favourite)? {
            true => Ok(()),
            false => Err(anyhow!(LoadError::EpisodeNotFound(id))),
        }
    }

    /// The file a downloaded episode lives in.
    pub fn episode_file(&self, id: i64) -> Result<PathBuf> {
        let episode = self.load_episode(id)?;
        let podcast = self.podcast(episode.podcast_id)?;

        match MediaSource::resolve(&episode, podcast.as_ref())? {
            MediaSource::Local(path) => Ok(path),
            MediaSource::Remote(url) => Err(anyhow!(
                "Episode {id} is not downloaded, it streams from {url}"
            )),
        }
    }

    /// Fetch the enclosure into the podcast's storage directory and mark the
    /// episode downloaded.
    pub fn download_episode(&self, id: i64) -> Result<PathBuf> {
        let episode = self.load_episode(id)?;
        let podcast = self.load_podcast(episode.podcast_id)?;

        let raw = episode
            .enclosure_url
            .as_deref()
            .ok_or(LoadError::MissingEnclosure(id))?;
        let url = Url::parse(raw).map_err(|e| LoadError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        let dir = podcast
            .storage_path()
            .ok_or_else(|| anyhow!("Podcast {} has no storage directory", podcast.id))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let file_name = download::file_name_for(&episode, &url);
        let dest = dir.join(&file_name);

        log::info!(target: "library", "downloading episode {id} from {url}");
        let bytes = download::fetch_to(&url, &dest)?;
        log::info!(target: "library", "downloaded {bytes} bytes to {}", dest.display());

        self.db()?.set_episode_downloaded(id, Some(&file_name))?;
        Ok(dest)
    }
}

impl EpisodeStore for Library {
    fn episode(&self, id: i64) -> Result<Option<Episode>> {
        Library::episode(self, id)
    }

    fn podcast(&self, id: i64) -> Result<Option<Podcast>> {
        Library::podcast(self, id)
    }

    fn save_progress(&self, episode: &Episode) -> Result<()> {
        Library::save_progress(self, episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> (Library, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::in_memory(dir.path()).unwrap();
        (lib, dir)
    }

    fn seed(lib: &Library) -> (Podcast, Episode) {
        let podcast = lib
            .add_podcast(NewPodcast {
                title: String::from("Night Shift"),
                feed: String::from("https://example.com/feed.xml"),
                ..Default::default()
            })
            .unwrap();

        let episode = lib
            .add_episode(NewEpisode {
                podcast_id: podcast.id,
                title: String::from("Episode One"),
                enclosure_url: Some(String::from("https://example.com/one.mp3")),
                ..Default::default()
            })
            .unwrap();

        (podcast, episode)
    }

    #[test]
    fn new_podcast_gets_storage_under_root() {
        let (lib, dir) = library();
        let (podcast, _) = seed(&lib);
        assert_eq!(podcast.storage_path(), Some(dir.path().join("Night Shift").as_path()));
    }

    #[test]
    fn saved_progress_round_trips() {
        let (lib, _dir) = library();
        let (_, mut episode) = seed(&lib);

        episode.record_progress(120, 600);
        lib.save_progress(&episode).unwrap();

        let stored = lib.load_episode(episode.id).unwrap();
        assert_eq!(stored.play_position, 120);
        assert_eq!(stored.duration, 600);
        assert!(!stored.played);
    }

    #[test]
    fn progress_write_leaves_other_columns_alone() {
        let (lib, _dir) = library();
        let (_, mut stale) = seed(&lib);

        // Another thread finishes a download and favourites the episode
        // after the tracker read its copy.
        lib.db()
            .unwrap()
            .set_episode_downloaded(stale.id, Some("1-one.mp3"))
            .unwrap();
        lib.mark_episode_favourite(stale.id, true).unwrap();
        lib.mark_episode_played(stale.id, true).unwrap();

        stale.record_progress(30, 600);
        lib.save_progress(&stale).unwrap();

        let stored = lib.load_episode(stale.id).unwrap();
        assert_eq!((stored.play_position, stored.duration), (30, 600));
        assert!(stored.downloaded);
        assert_eq!(stored.file_name.as_deref(), Some("1-one.mp3"));
        assert!(stored.favourite);
        assert!(stored.played);
    }

    #[test]
    fn saving_a_missing_episode_fails() {
        let (lib, _dir) = library();
        let ghost = Episode {
            id: 99,
            ..Default::default()
        };
        assert!(lib.save_progress(&ghost).is_err());
    }

    #[test]
    fn favourite_and_played_flags() {
        let (lib, _dir) = library();
        let (_, episode) = seed(&lib);

        lib.mark_episode_favourite(episode.id, true).unwrap();
        lib.mark_episode_played(episode.id, true).unwrap();
        let stored = lib.load_episode(episode.id).unwrap();
        assert!(stored.favourite);
        assert!(stored.played);

        lib.mark_episode_played(episode.id, false).unwrap();
        assert!(!lib.load_episode(episode.id).unwrap().played);
        assert!(lib.mark_episode_played(404, true).is_err());
    }

    #[test]
    fn mark_whole_podcast_played() {
        let (lib, _dir) = library();
        let (podcast, _) = seed(&lib);
        lib.add_episode(NewEpisode {
            podcast_id: podcast.id,
            title: String::from("Episode Two"),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(lib.mark_podcast_all_played(podcast.id, true).unwrap(), 2);
        assert!(lib.episodes(Some(podcast.id)).unwrap().iter().all(|e| e.played));
    }

    #[test]
    fn episode_needs_an_existing_podcast() {
        let (lib, _dir) = library();
        let result = lib.add_episode(NewEpisode {
            podcast_id: 42,
            title: String::from("Orphan"),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn permanent_unsubscribe_removes_downloads() {
        let (lib, _dir) = library();
        let (podcast, episode) = seed(&lib);

        let storage = podcast.storage_path().unwrap().to_path_buf();
        std::fs::create_dir_all(&storage).unwrap();
        std::fs::write(storage.join("1-one.mp3"), b"audio").unwrap();
        lib.db()
            .unwrap()
            .set_episode_downloaded(episode.id, Some("1-one.mp3"))
            .unwrap();

        assert_eq!(lib.episode_file(episode.id).unwrap(), storage.join("1-one.mp3"));

        lib.unsubscribe(podcast.id, true).unwrap();
        assert!(!storage.exists());
        assert!(lib.podcast(podcast.id).unwrap().is_none());
        assert!(lib.episode(episode.id).unwrap().is_none());
    }

    #[test]
    fn permanent_unsubscribe_stays_inside_storage() {
        let (lib, dir) = library();
        let (podcast, episode) = seed(&lib);

        let outside = dir.path().join("notes.txt");
        std::fs::write(&outside, b"keep me").unwrap();
        lib.db()
            .unwrap()
            .set_episode_downloaded(episode.id, Some("../notes.txt"))
            .unwrap();

        lib.unsubscribe(podcast.id, true).unwrap();
        assert!(outside.exists());
        assert!(lib.podcast(podcast.id).unwrap().is_none());
    }

    #[test]
    fn plain_unsubscribe_leaves_files() {
        let (lib, _dir) = library();
        let (podcast, _) = seed(&lib);

        let storage = podcast.storage_path().unwrap().to_path_buf();
        std::fs::create_dir_all(&storage).unwrap();
        std::fs::write(storage.join("keep.mp3"), b"audio").unwrap();

        lib.unsubscribe(podcast.id, false).unwrap();
        assert!(storage.join("keep.mp3").exists());
    }

    #[test]
    fn streaming_episode_has_no_file() {
        let (lib, _dir) = library();
        let (_, episode) = seed(&lib);
        assert!(lib.episode_file(episode.id).is_err());
    }
}
