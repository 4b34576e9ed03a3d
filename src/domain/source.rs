use super::{Episode, Podcast};
use std::{fmt::Display, path::PathBuf};
use thiserror::Error;
use url::Url;

/// Where the media for an episode is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Local(PathBuf),
    Remote(Url),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Episode {0} does not exist")]
    EpisodeNotFound(i64),

    #[error("Episode {0} does not belong to a known podcast")]
    MissingPodcast(i64),

    #[error("Episode {episode} is marked downloaded but {} is missing, and it has no enclosure url", describe(.path))]
    MissingFile {
        episode: i64,
        path: Option<PathBuf>,
    },

    #[error("Episode {0} has no enclosure url")]
    MissingEnclosure(i64),

    #[error("Invalid enclosure url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

fn describe(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => String::from("its file"),
    }
}

impl MediaSource {
    /// Pick the media location for an episode.
    ///
    /// A downloaded episode plays from its file inside the podcast's storage
    /// directory. When that file is gone, the enclosure url is used instead.
    pub fn resolve(episode: &Episode, podcast: Option<&Podcast>) -> Result<Self, LoadError> {
        let podcast = podcast.ok_or(LoadError::MissingPodcast(episode.id))?;

        let mut missing = None;
        if episode.downloaded {
            let path = episode
                .file_name
                .as_deref()
                .and_then(|name| podcast.episode_path(name));

            match path {
                Some(p) if p.is_file() => return Ok(MediaSource::Local(p)),
                other => {
                    log::warn!(
                        target: "player",
                        "episode {} is marked downloaded but its file is missing ({:?})",
                        episode.id,
                        other
                    );
                    missing = Some(other);
                }
            }
        }

        let raw = match episode.enclosure_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                return Err(match missing {
                    Some(path) => LoadError::MissingFile {
                        episode: episode.id,
                        path,
                    },
                    None => LoadError::MissingEnclosure(episode.id),
                });
            }
        };

        let url = Url::parse(raw).map_err(|e| LoadError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(MediaSource::Remote(url)),
            "file" => url
                .to_file_path()
                .map(MediaSource::Local)
                .map_err(|_| LoadError::InvalidUrl {
                    url: raw.to_string(),
                    reason: String::from("not a usable file path"),
                }),
            scheme => Err(LoadError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            }),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Remote(_))
    }
}

impl Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::Local(p) => write!(f, "{}", p.display()),
            MediaSource::Remote(u) => write!(f, "{u}"),
        }
    }
}
