use super::PLAYED_THRESHOLD;
use crate::get_readable_duration;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub podcast_id: i64,
    pub title: String,
    pub guid: Option<String>,
    pub enclosure_url: Option<String>,
    pub file_name: Option<String>,
    pub downloaded: bool,
    /// Seconds
    pub play_position: u32,
    /// Seconds, zero until the media has reported one
    pub duration: u32,
    pub played: bool,
    pub favourite: bool,
    pub pub_date: Option<i64>,

    // Cover art pulled from the media tags, never stored
    #[serde(skip)]
    pub artwork: Option<Arc<[u8]>>,
}

impl Episode {
    /// Record progress reported by the player.
    ///
    /// `played` flips to true once `position / duration` exceeds
    /// [`PLAYED_THRESHOLD`], and is never cleared here. Returns true only on
    /// the call that flipped it.
    pub fn record_progress(&mut self, position: u32, duration: u32) -> bool {
        self.play_position = position;
        self.duration = duration;

        if self.played || duration == 0 {
            return false;
        }

        if f64::from(position) / f64::from(duration) > PLAYED_THRESHOLD {
            self.played = true;
            return true;
        }

        false
    }

    pub fn progress(&self) -> f64 {
        match self.duration {
            0 => 0.0,
            d => (f64::from(self.play_position) / f64::from(d)).min(1.0),
        }
    }

    pub fn resume_at(&self) -> Option<Duration> {
        (self.play_position > 0).then(|| Duration::from_secs(u64::from(self.play_position)))
    }

    pub fn get_duration_str(&self) -> String {
        get_readable_duration(Duration::from_secs(u64::from(self.duration)))
    }
}

/// Fields accepted when adding an episode to the library.
#[derive(Debug, Clone, Default)]
pub struct NewEpisode {
    pub podcast_id: i64,
    pub title: String,
    pub guid: Option<String>,
    pub enclosure_url: Option<String>,
    pub duration: u32,
    pub pub_date: Option<i64>,
}
