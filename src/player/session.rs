use super::{LoadStatus, SKIP_DURATION};
use crate::domain::{Episode, MediaSource};
use std::time::Duration;

/// State of the episode currently open in the player.
///
/// Only one exists at a time. Loading another episode replaces it, which is
/// what keeps samples from the old media out of the new session.
pub struct PlaybackSession {
    pub episode: Episode,
    pub source: MediaSource,
    pub status: LoadStatus,

    pub position: Duration,
    pub buffered: Duration,
    pub duration: Duration,

    /// Applied once the media reports ready
    pub pending_seek: Option<Duration>,
    /// (position, duration) in whole seconds at the last write to storage
    pub last_persisted: Option<(u32, u32)>,
}

impl PlaybackSession {
    pub fn new(episode: Episode, source: MediaSource) -> Self {
        PlaybackSession {
            pending_seek: episode.resume_at(),
            episode,
            source,
            status: LoadStatus::Loading,
            position: Duration::ZERO,
            buffered: Duration::ZERO,
            duration: Duration::ZERO,
            last_persisted: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.episode.id
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Playing
    }

    pub fn duration_known(&self) -> bool {
        !self.duration.is_zero()
    }

    /// Keep a sampled position inside `[0, duration]` once the duration is known.
    pub fn clamp(&self, position: Duration) -> Duration {
        match self.duration_known() {
            true => position.min(self.duration),
            false => position,
        }
    }

    /// Whole seconds as stored in the library.
    pub fn progress_secs(&self) -> (u32, u32) {
        (secs(self.position), secs(self.duration))
    }

    pub fn needs_persisting(&self) -> bool {
        self.last_persisted != Some(self.progress_secs())
    }
}

fn secs(d: Duration) -> u32 {
    d.as_secs().min(u64::from(u32::MAX)) as u32
}

/// Target for a forward skip.
///
/// The target is clamped to `duration - SKIP_DURATION` so a skip never lands
/// inside the last stretch of the episode. Returns `None` when the duration is
/// not known yet or the clamp would not move the playhead forward.
pub fn skip_ahead_target(position: Duration, duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        return None;
    }

    let limit = duration.saturating_sub(SKIP_DURATION);
    let target = (position + SKIP_DURATION).min(limit);

    (target > position).then_some(target)
}

/// Target for a backward skip, never before the start.
pub fn skip_back_target(position: Duration) -> Duration {
    position.saturating_sub(SKIP_DURATION)
}
