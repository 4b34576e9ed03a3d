use crate::{
    domain::Episode,
    player::{
        EpisodeStore, LoadStatus, MediaBackend, PlaybackMetrics, PlaybackSnapshot, PlayerCommand,
        PlayerCore, PlayerEvent, RodioBackend,
    },
    settings::{DEFAULT_VOLUME, SettingsStore},
};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use std::{sync::Arc, thread::JoinHandle, time::Duration};

/// Front end to the player thread. Dropping it shuts the thread down after
/// flushing progress for the open episode.
pub struct PlayerHandle {
    commands: Sender<PlayerCommand>,
    events: Receiver<PlayerEvent>,
    metrics: Arc<PlaybackMetrics>,
    thread: Option<JoinHandle<()>>,
}

impl PlayerHandle {
    pub fn spawn(store: Arc<dyn EpisodeStore>, settings: Box<dyn SettingsStore>) -> Result<Self> {
        Self::spawn_with(store, settings, || {
            let backend = RodioBackend::new()?;
            Ok(Box::new(backend) as Box<dyn MediaBackend>)
        })
    }

    pub fn spawn_with<F>(
        store: Arc<dyn EpisodeStore>,
        settings: Box<dyn SettingsStore>,
        make_backend: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn MediaBackend>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (evt_tx, evt_rx) = crossbeam_channel::unbounded();
        let metrics = PlaybackMetrics::new(DEFAULT_VOLUME);

        // Queued ahead of everything else, so no event is missed
        cmd_tx.send(PlayerCommand::Subscribe(evt_tx))?;

        let thread = PlayerCore::spawn(make_backend, cmd_rx, store, settings, Arc::clone(&metrics))?;

        Ok(PlayerHandle {
            commands: cmd_tx,
            events: evt_rx,
            metrics,
            thread: Some(thread),
        })
    }

    pub fn metrics(&self) -> Arc<PlaybackMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Events from the player thread. Every clone shares one queue.
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.events.clone()
    }

    /// An independent event stream.
    pub fn subscribe(&self) -> Result<Receiver<PlayerEvent>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.commands.send(PlayerCommand::Subscribe(tx))?;
        Ok(rx)
    }

    pub fn poll_events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }
}

// =====================
//    COMMAND HANDLER
// =====================
impl PlayerHandle {
    pub fn play_episode(&self, episode: Episode) -> Result<()> {
        self.commands.send(PlayerCommand::Load(Box::new(episode)))?;
        Ok(())
    }

    pub fn play(&self) -> Result<()> {
        self.commands.send(PlayerCommand::Play)?;
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.commands.send(PlayerCommand::Pause)?;
        Ok(())
    }

    pub fn toggle_playback(&self) -> Result<()> {
        self.commands.send(PlayerCommand::TogglePlayback)?;
        Ok(())
    }

    pub fn seek(&self, secs: f64) -> Result<()> {
        self.commands.send(PlayerCommand::Seek(secs))?;
        Ok(())
    }

    pub fn skip_ahead(&self) -> Result<()> {
        self.commands.send(PlayerCommand::SkipAhead)?;
        Ok(())
    }

    pub fn skip_back(&self) -> Result<()> {
        self.commands.send(PlayerCommand::SkipBack)?;
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.commands.send(PlayerCommand::SetVolume(volume))?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.commands.send(PlayerCommand::Stop)?;
        Ok(())
    }
}

// ===============
//    ACCESSORS
// ===============
impl PlayerHandle {
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.metrics.snapshot()
    }

    pub fn status(&self) -> LoadStatus {
        self.metrics.get_status()
    }

    pub fn episode_id(&self) -> Option<i64> {
        self.metrics.get_episode_id()
    }

    pub fn position(&self) -> Duration {
        self.metrics.get_position()
    }

    pub fn is_playing(&self) -> bool {
        self.metrics.is_playing()
    }

    pub fn volume(&self) -> f32 {
        self.metrics.get_volume()
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!(target: "player", "player thread panicked");
            }
        }
    }
}
