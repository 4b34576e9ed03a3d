mod backend_rodio;
mod core;
mod devices;
mod handle;
mod metrics;
mod session;

#[cfg(test)]
pub(crate) mod scripted;

use crate::domain::{Episode, LoadError, Podcast};
use anyhow::Result;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::{sync::Arc, time::Duration};

pub use backend_rodio::RodioBackend;
pub use self::core::PlayerCore;
pub use devices::{DeviceError, OutputDevice, output_devices};
pub use handle::PlayerHandle;
pub use metrics::{PlaybackMetrics, PlaybackSnapshot};
pub use session::{PlaybackSession, skip_ahead_target, skip_back_target};

pub const SKIP_DURATION: Duration = Duration::from_secs(30);

/// In-memory position refresh for the UI.
pub const FINE_INTERVAL: Duration = Duration::from_millis(500);

/// Progress is written back to the library on this cadence.
pub const COARSE_INTERVAL: Duration = Duration::from_secs(5);

/// Storage the tracker reads episodes from and writes progress into.
pub trait EpisodeStore: Send + Sync {
    fn episode(&self, id: i64) -> Result<Option<Episode>>;
    fn podcast(&self, id: i64) -> Result<Option<Podcast>>;
    /// Persist position, duration and the played flag only.
    fn save_progress(&self, episode: &Episode) -> Result<()>;
}

/// What the platform media layer reports about the currently opened media.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// The platform media subsystem: decoding, output and position reporting.
pub trait MediaBackend {
    /// Start opening `source`, replacing whatever was open before.
    /// Remote sources may finish loading later, see [`MediaBackend::poll`].
    fn open(&mut self, source: &crate::domain::MediaSource) -> Result<()>;
    fn poll(&mut self) -> MediaStatus;
    fn close(&mut self);

    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn seek(&mut self, position: Duration) -> Result<()>;

    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    fn buffered(&self) -> Duration;

    fn set_volume(&mut self, volume: f32);
    fn artwork(&self) -> Option<Arc<[u8]>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LoadStatus {
    None = 0,
    Loading = 1,
    Playing = 2,
}

impl From<LoadStatus> for u8 {
    fn from(status: LoadStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for LoadStatus {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LoadStatus::None),
            1 => Ok(LoadStatus::Loading),
            2 => Ok(LoadStatus::Playing),
            _ => Err(()),
        }
    }
}

pub enum PlayerCommand {
    Load(Box<Episode>),
    Play,
    Pause,
    TogglePlayback,
    SkipAhead,
    SkipBack,
    Seek(f64),
    SetVolume(f32),
    Stop,
    Subscribe(Sender<PlayerEvent>),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Position, buffer or duration moved
    Progress(PlaybackSnapshot),
    StatusChanged {
        episode_id: Option<i64>,
        status: LoadStatus,
    },
    EpisodeUpdated(Episode),
    LoadFailed {
        episode_id: i64,
        error: LoadError,
    },
    Error(String),
}
