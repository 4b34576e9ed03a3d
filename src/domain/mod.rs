mod episode;
mod podcast;
mod source;

pub use episode::{Episode, NewEpisode};
pub use podcast::{NewPodcast, Podcast};
pub use source::{LoadError, MediaSource};

/// Fraction of an episode past which it counts as played.
pub const PLAYED_THRESHOLD: f64 = 0.9;
