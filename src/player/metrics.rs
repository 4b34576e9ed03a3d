use super::LoadStatus;
use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, AtomicU8, AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

const NO_EPISODE: i64 = -1;

/// Latest playback numbers, written by the player thread and read by anyone
/// holding a [`super::PlayerHandle`].
pub struct PlaybackMetrics {
    episode_id: AtomicI64,
    status: AtomicU8,
    playing: AtomicBool,
    position_ms: AtomicU64,
    buffered_ms: AtomicU64,
    duration_ms: AtomicU64,
    volume: AtomicU32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub episode_id: Option<i64>,
    pub status: LoadStatus,
    pub playing: bool,
    /// Seconds
    pub position: f64,
    pub buffered: f64,
    pub duration: f64,
    pub volume: f32,
}

impl PlaybackMetrics {
    pub fn new(volume: f32) -> Arc<Self> {
        Arc::new(PlaybackMetrics {
            episode_id: AtomicI64::new(NO_EPISODE),
            status: AtomicU8::new(LoadStatus::None.into()),
            playing: AtomicBool::new(false),
            position_ms: AtomicU64::new(0),
            buffered_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            volume: AtomicU32::new(volume.to_bits()),
        })
    }

    pub fn get_status(&self) -> LoadStatus {
        self.status
            .load(Ordering::Relaxed)
            .try_into()
            .unwrap_or(LoadStatus::None)
    }

    pub fn get_episode_id(&self) -> Option<i64> {
        match self.episode_id.load(Ordering::Relaxed) {
            NO_EPISODE => None,
            id => Some(id),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn get_position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::Relaxed))
    }

    pub fn get_buffered(&self) -> Duration {
        Duration::from_millis(self.buffered_ms.load(Ordering::Relaxed))
    }

    pub fn get_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms.load(Ordering::Relaxed))
    }

    pub fn get_volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn set_status(&self, status: LoadStatus) {
        self.status.store(status.into(), Ordering::Relaxed);
    }

    pub fn set_episode(&self, id: Option<i64>) {
        self.episode_id
            .store(id.unwrap_or(NO_EPISODE), Ordering::Relaxed);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub fn set_times(&self, position: Duration, buffered: Duration, duration: Duration) {
        self.position_ms
            .store(position.as_millis() as u64, Ordering::Relaxed);
        self.buffered_ms
            .store(buffered.as_millis() as u64, Ordering::Relaxed);
        self.duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.set_episode(None);
        self.set_status(LoadStatus::None);
        self.set_playing(false);
        self.set_times(Duration::ZERO, Duration::ZERO, Duration::ZERO);
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            episode_id: self.get_episode_id(),
            status: self.get_status(),
            playing: self.is_playing(),
            position: self.get_position().as_secs_f64(),
            buffered: self.get_buffered().as_secs_f64(),
            duration: self.get_duration().as_secs_f64(),
            volume: self.get_volume(),
        }
    }
}
