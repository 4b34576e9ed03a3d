//! Line-delimited JSON messages exchanged with the front end.
//!
//! Every line is an [`Envelope`] naming a channel plus a plain-data argument.
//! Inbound envelopes parse into an [`IpcMessage`], and player events leave as
//! envelopes built by [`Envelope::from_event`].

use crate::{player::PlayerEvent, settings::Settings};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub channel: String,
    #[serde(default)]
    pub arg: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IpcMessage {
    PlayerToggle,
    PlayerPlay,
    PlayerPause,
    PlayerSeek(f64),
    PlayerSkipAhead,
    PlayerSkipBack,
    PlayerVolume(f32),
    PlayerStop,

    EpisodePlay(i64),
    EpisodeDownload(i64),
    EpisodeFavourite(i64),
    EpisodeUnfavourite(i64),
    EpisodePlayed(i64),
    EpisodeUnplayed(i64),
    EpisodeReveal(i64),

    PodcastPlayed(i64),
    PodcastUnplayed(i64),
    PodcastUnsubscribe { id: i64, permanent: bool },

    SettingsSave(Settings),
    DevicesList,
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("Invalid argument for '{channel}': {reason}")]
    InvalidArgument { channel: String, reason: String },
}

#[derive(Deserialize)]
struct IdArg {
    id: i64,
}

#[derive(Deserialize)]
struct UnsubscribeArg {
    id: i64,
    #[serde(default)]
    permanent: bool,
}

impl IpcMessage {
    pub fn parse(line: &str) -> Result<Self, IpcError> {
        let envelope: Envelope = serde_json::from_str(line)?;
        Self::from_envelope(&envelope)
    }

    #[rustfmt::skip]
    pub fn from_envelope(env: &Envelope) -> Result<Self, IpcError> {
        let msg = match env.channel.as_str() {
            "player:toggle"       => IpcMessage::PlayerToggle,
            "player:play"         => IpcMessage::PlayerPlay,
            "player:pause"        => IpcMessage::PlayerPause,
            "player:seek"         => IpcMessage::PlayerSeek(arg(env)?),
            "player:skip-ahead"   => IpcMessage::PlayerSkipAhead,
            "player:skip-back"    => IpcMessage::PlayerSkipBack,
            "player:volume"       => IpcMessage::PlayerVolume(arg(env)?),
            "player:stop"         => IpcMessage::PlayerStop,

            "episode:play"        => IpcMessage::EpisodePlay(id(env)?),
            "episode:download"    => IpcMessage::EpisodeDownload(id(env)?),
            "episode:favourite"   => IpcMessage::EpisodeFavourite(id(env)?),
            "episode:unfavourite" => IpcMessage::EpisodeUnfavourite(id(env)?),
            "episode:played"      => IpcMessage::EpisodePlayed(id(env)?),
            "episode:unplayed"    => IpcMessage::EpisodeUnplayed(id(env)?),
            "episode:reveal"      => IpcMessage::EpisodeReveal(id(env)?),

            "podcast:played"      => IpcMessage::PodcastPlayed(id(env)?),
            "podcast:unplayed"    => IpcMessage::PodcastUnplayed(id(env)?),
            "podcast:unsubscribe" => {
                let UnsubscribeArg { id, permanent } = arg(env)?;
                IpcMessage::PodcastUnsubscribe { id, permanent }
            }

            "settings:save"       => IpcMessage::SettingsSave(arg(env)?),
            "devices:list"        => IpcMessage::DevicesList,

            other => return Err(IpcError::UnknownChannel(other.to_string())),
        };

        Ok(msg)
    }
}

fn arg<T: DeserializeOwned>(env: &Envelope) -> Result<T, IpcError> {
    serde_json::from_value(env.arg.clone()).map_err(|e| IpcError::InvalidArgument {
        channel: env.channel.clone(),
        reason: e.to_string(),
    })
}

fn id(env: &Envelope) -> Result<i64, IpcError> {
    arg::<IdArg>(env).map(|a| a.id)
}

impl Envelope {
    pub fn new(channel: &str, arg: impl Serialize) -> Self {
        Envelope {
            channel: channel.to_string(),
            arg: serde_json::to_value(arg).unwrap_or(Value::Null),
        }
    }

    pub fn from_event(event: &PlayerEvent) -> Self {
        match event {
            PlayerEvent::Progress(snapshot) => Envelope::new("player:state", snapshot),
            PlayerEvent::StatusChanged { episode_id, status } => Envelope::new(
                "player:status",
                json!({ "episode_id": episode_id, "status": status }),
            ),
            PlayerEvent::EpisodeUpdated(episode) => Envelope::new("episode:updated", episode),
            PlayerEvent::LoadFailed { episode_id, error } => Envelope::new(
                "player:error",
                json!({ "episode_id": episode_id, "message": error.to_string() }),
            ),
            PlayerEvent::Error(message) => {
                Envelope::new("player:error", json!({ "message": message }))
            }
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
