use super::{EpisodeStore, MediaBackend, MediaStatus};
use crate::domain::{Episode, MediaSource, Podcast};
use anyhow::{Result, anyhow};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

/// Backend state a test can reach into while the core owns the backend.
pub(crate) struct Script {
    pub status: MediaStatus,
    /// Local sources report ready straight from `open`
    pub ready_on_open: bool,
    pub fail_open: bool,

    pub opened: Vec<MediaSource>,
    pub closed: usize,
    pub seeks: Vec<Duration>,

    pub playing: bool,
    pub position: Duration,
    pub buffered: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub artwork: Option<Arc<[u8]>>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            status: MediaStatus::Idle,
            ready_on_open: true,
            fail_open: false,
            opened: Vec::new(),
            closed: 0,
            seeks: Vec::new(),
            playing: false,
            position: Duration::ZERO,
            buffered: Duration::ZERO,
            duration: None,
            volume: 1.0,
            artwork: None,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend(Arc<Mutex<Script>>);

impl ScriptedBackend {
    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap()
    }

    pub fn boxed(&self) -> Box<dyn MediaBackend> {
        Box::new(self.clone())
    }
}

impl MediaBackend for ScriptedBackend {
    fn open(&mut self, source: &MediaSource) -> Result<()> {
        let mut s = self.script();
        if s.fail_open {
            return Err(anyhow!("no decoder for {source}"));
        }
        s.opened.push(source.clone());
        s.status = match s.ready_on_open {
            true => MediaStatus::Ready,
            false => MediaStatus::Loading,
        };
        s.playing = false;
        s.position = Duration::ZERO;
        Ok(())
    }

    fn poll(&mut self) -> MediaStatus {
        self.script().status.clone()
    }

    fn close(&mut self) {
        let mut s = self.script();
        s.status = MediaStatus::Idle;
        s.playing = false;
        s.closed += 1;
    }

    fn play(&mut self) {
        let mut s = self.script();
        if s.status == MediaStatus::Ready {
            s.playing = true;
        }
    }

    fn pause(&mut self) {
        self.script().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.script().playing
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let mut s = self.script();
        s.seeks.push(position);
        s.position = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.script().position
    }

    fn duration(&self) -> Option<Duration> {
        self.script().duration
    }

    fn buffered(&self) -> Duration {
        self.script().buffered
    }

    fn set_volume(&mut self, volume: f32) {
        self.script().volume = volume;
    }

    fn artwork(&self) -> Option<Arc<[u8]>> {
        self.script().artwork.clone()
    }
}

/// Episode storage that can be told to reject writes.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub podcasts: Mutex<HashMap<i64, Podcast>>,
    pub episodes: Mutex<HashMap<i64, Episode>>,
    pub fail_saves: Mutex<bool>,
}

impl MemoryStore {
    pub fn with(podcast: Podcast, episodes: impl IntoIterator<Item = Episode>) -> Arc<Self> {
        let store = MemoryStore::default();
        store.podcasts.lock().unwrap().insert(podcast.id, podcast);
        store
            .episodes
            .lock()
            .unwrap()
            .extend(episodes.into_iter().map(|e| (e.id, e)));
        Arc::new(store)
    }

    pub fn get(&self, id: i64) -> Episode {
        self.episodes.lock().unwrap()[&id].clone()
    }
}

impl EpisodeStore for MemoryStore {
    fn episode(&self, id: i64) -> Result<Option<Episode>> {
        Ok(self.episodes.lock().unwrap().get(&id).cloned())
    }

    fn podcast(&self, id: i64) -> Result<Option<Podcast>> {
        Ok(self.podcasts.lock().unwrap().get(&id).cloned())
    }

    fn save_progress(&self, episode: &Episode) -> Result<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(anyhow!("disk full"));
        }
        let mut episodes = self.episodes.lock().unwrap();
        let stored = episodes
            .get_mut(&episode.id)
            .ok_or_else(|| anyhow!("no episode {}", episode.id))?;
        stored.play_position = episode.play_position;
        stored.duration = episode.duration;
        stored.played |= episode.played;
        Ok(())
    }
}
