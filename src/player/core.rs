use crate::{
    REFRESH_RATE,
    domain::{Episode, MediaSource},
    player::{
        COARSE_INTERVAL, EpisodeStore, FINE_INTERVAL, LoadStatus, MediaBackend, MediaStatus,
        PlaybackMetrics, PlaybackSession, PlayerCommand, PlayerEvent, skip_ahead_target,
        skip_back_target,
    },
    settings::{DEFAULT_VOLUME, SettingsStore, clamp_volume},
};
use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

struct Cadence {
    interval: Duration,
    next: Instant,
}

impl Cadence {
    fn new(interval: Duration, now: Instant) -> Self {
        Cadence {
            interval,
            next: now + interval,
        }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.interval;
        true
    }
}

/// Owns the media backend and the active [`PlaybackSession`].
///
/// Every command, status poll and sample runs on the one thread driving
/// [`PlayerCore::run`], so position and duration are never mutated
/// concurrently.
pub struct PlayerCore {
    backend: Box<dyn MediaBackend>,
    commands: Receiver<PlayerCommand>,
    subscribers: Vec<Sender<PlayerEvent>>,
    metrics: Arc<PlaybackMetrics>,
    store: Arc<dyn EpisodeStore>,
    settings: Box<dyn SettingsStore>,

    session: Option<PlaybackSession>,
    volume: f32,

    fine: Cadence,
    coarse: Cadence,
}

impl PlayerCore {
    pub fn new(
        backend: Box<dyn MediaBackend>,
        commands: Receiver<PlayerCommand>,
        store: Arc<dyn EpisodeStore>,
        settings: Box<dyn SettingsStore>,
        metrics: Arc<PlaybackMetrics>,
    ) -> Self {
        let volume = match settings.load() {
            Ok(s) => clamp_volume(s.volume),
            Err(e) => {
                log::warn!(target: "player", "could not read settings, using default volume: {e:#}");
                DEFAULT_VOLUME
            }
        };
        metrics.set_volume(volume);

        let now = Instant::now();
        PlayerCore {
            backend,
            commands,
            subscribers: Vec::new(),
            metrics,
            store,
            settings,

            session: None,
            volume,

            fine: Cadence::new(FINE_INTERVAL, now),
            coarse: Cadence::new(COARSE_INTERVAL, now),
        }
    }

    /// Start the player thread. The backend is built on that thread, and this
    /// returns once it either came up or failed to.
    pub fn spawn<F>(
        make_backend: F,
        commands: Receiver<PlayerCommand>,
        store: Arc<dyn EpisodeStore>,
        settings: Box<dyn SettingsStore>,
        metrics: Arc<PlaybackMetrics>,
    ) -> Result<JoinHandle<()>>
    where
        F: FnOnce() -> Result<Box<dyn MediaBackend>> + Send + 'static,
    {
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name(String::from("player"))
            .spawn(move || {
                let backend = match make_backend() {
                    Ok(backend) => {
                        let _ = ready_tx.send(Ok(()));
                        backend
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut core = PlayerCore::new(backend, commands, store, settings, metrics);
                core.run();
            })?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("Player thread exited during startup"))??;

        Ok(handle)
    }

    fn run(&mut self) {
        log::debug!(target: "player", "player thread started");

        while self.process_commands() {
            self.poll_backend();

            let now = Instant::now();
            if self.fine.due(now) {
                self.sample_fine();
            }
            if self.coarse.due(now) {
                self.sample_coarse();
            }

            thread::sleep(REFRESH_RATE);
        }

        log::debug!(target: "player", "player thread exiting");
    }

    /// Drain pending commands. Returns false once the thread should exit.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(PlayerCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    self.stop();
                    return false;
                }
                Ok(cmd) => self.handle(cmd),
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    pub fn handle(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::Load(episode) => self.load(*episode),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlayback => self.toggle_playback(),
            PlayerCommand::SkipAhead => self.skip_ahead(),
            PlayerCommand::SkipBack => self.skip_back(),
            PlayerCommand::Seek(secs) => self.seek(secs),
            PlayerCommand::SetVolume(v) => self.set_volume(v),
            PlayerCommand::Stop | PlayerCommand::Shutdown => self.stop(),
            PlayerCommand::Subscribe(tx) => self.subscribers.push(tx),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PlayerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

// ==================
//    LOADING
// ==================
impl PlayerCore {
    fn load(&mut self, episode: Episode) {
        let podcast = self
            .store
            .podcast(episode.podcast_id)
            .unwrap_or_else(|e| {
                log::warn!(target: "player", "could not read podcast {}: {e:#}", episode.podcast_id);
                None
            });

        // A bad selection leaves the current session alone
        let source = match MediaSource::resolve(&episode, podcast.as_ref()) {
            Ok(source) => source,
            Err(error) => {
                log::warn!(target: "player", "cannot load episode {}: {error}", episode.id);
                self.emit(PlayerEvent::LoadFailed {
                    episode_id: episode.id,
                    error,
                });
                return;
            }
        };

        self.teardown();

        // Reloading the same episode must see the progress just flushed
        let id = episode.id;
        let episode = match self.store.episode(id) {
            Ok(Some(stored)) => stored,
            _ => episode,
        };
        log::info!(target: "player", "loading episode {id} from {source}");

        if let Err(e) = self.backend.open(&source) {
            log::warn!(target: "player", "could not open {source}: {e:#}");
            self.emit(PlayerEvent::Error(format!("Could not open {source}: {e}")));
            self.emit(PlayerEvent::StatusChanged {
                episode_id: Some(id),
                status: LoadStatus::None,
            });
            return;
        }
        self.backend.set_volume(self.volume);

        self.session = Some(PlaybackSession::new(episode.clone(), source));
        self.metrics.set_episode(Some(id));
        self.metrics.set_status(LoadStatus::Loading);

        self.emit(PlayerEvent::StatusChanged {
            episode_id: Some(id),
            status: LoadStatus::Loading,
        });
        self.emit(PlayerEvent::EpisodeUpdated(episode));
        self.emit_progress();

        // Local files are usually ready straight away
        self.poll_backend();
    }

    /// Flush progress and drop the active session.
    fn teardown(&mut self) {
        self.persist_progress();

        if self.session.take().is_some() {
            self.backend.close();
        }
        self.metrics.reset();
    }

    pub(super) fn poll_backend(&mut self) {
        let Some(current) = self.session.as_ref().map(|s| s.status) else {
            return;
        };

        match (current, self.backend.poll()) {
            (LoadStatus::Loading, MediaStatus::Ready) => self.on_ready(),
            (LoadStatus::None, _) => {}
            (_, MediaStatus::Failed(reason)) => {
                let message = match self.session.as_ref() {
                    Some(session) => format!("Could not play {}: {reason}", session.source),
                    None => reason,
                };
                log::warn!(target: "player", "{message}");
                self.emit(PlayerEvent::Error(message));
                self.transition(LoadStatus::None);
            }
            (_, MediaStatus::Idle) => self.transition(LoadStatus::None),
            (LoadStatus::Loading, MediaStatus::Loading) | (LoadStatus::Playing, _) => {}
        }
    }

    fn on_ready(&mut self) {
        let pending = self.session.as_mut().and_then(|s| s.pending_seek.take());

        if let Some(target) = pending {
            let target = match self.backend.duration() {
                Some(d) if !d.is_zero() => target.min(d),
                _ => target,
            };
            if let Err(e) = self.backend.seek(target) {
                log::warn!(target: "player", "could not resume at {target:?}: {e:#}");
            }
        }

        self.backend.set_volume(self.volume);
        self.backend.play();
        self.transition(LoadStatus::Playing);

        if let Some(session) = self.session.as_ref() {
            let origin = if session.source.is_remote() { "stream" } else { "file" };
            log::info!(
                target: "player",
                "playing episode {} from {origin} {}",
                session.id(),
                session.source
            );
        }

        let artwork = self.backend.artwork();
        let updated = match (self.session.as_mut(), artwork) {
            (Some(session), Some(art)) => {
                session.episode.artwork = Some(art);
                Some(session.episode.clone())
            }
            _ => None,
        };
        if let Some(episode) = updated {
            self.emit(PlayerEvent::EpisodeUpdated(episode));
        }

        self.sample_fine();
    }

    fn transition(&mut self, status: LoadStatus) {
        let episode_id = match self.session.as_mut() {
            Some(session) if session.status == status => return,
            Some(session) => {
                session.status = status;
                Some(session.id())
            }
            None => None,
        };

        log::debug!(target: "player", "status -> {status:?} for {episode_id:?}");
        self.metrics.set_status(status);
        if status != LoadStatus::Playing {
            self.metrics.set_playing(false);
        }
        self.emit(PlayerEvent::StatusChanged { episode_id, status });
    }
}

// ==================
//    SAMPLING
// ==================
impl PlayerCore {
    /// In-memory refresh of position, buffer and duration.
    pub(super) fn sample_fine(&mut self) {
        let position = self.backend.position();
        let buffered = self.backend.buffered();
        let duration = self.backend.duration().unwrap_or_default();
        let playing = self.backend.is_playing();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_loaded() {
            return;
        }

        session.duration = duration;
        session.position = session.clamp(position);
        session.buffered = session.clamp(buffered);

        self.metrics
            .set_times(session.position, session.buffered, session.duration);
        self.metrics.set_playing(playing);
        self.emit_progress();
    }

    /// Write progress back to storage when it moved since the last write.
    pub(super) fn sample_coarse(&mut self) {
        let due = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_loaded() && s.needs_persisting());
        if due {
            self.persist_progress();
        }
    }

    /// Best effort: a failed write is logged and in-memory state is kept.
    fn persist_progress(&mut self) {
        let (id, position, duration) = match &self.session {
            Some(session) if session.is_loaded() => {
                let (position, duration) = session.progress_secs();
                (session.id(), position, duration)
            }
            _ => return,
        };

        let mut episode = match self.store.episode(id) {
            Ok(Some(episode)) => episode,
            Ok(None) => {
                log::warn!(target: "player", "episode {id} is no longer in the library");
                return;
            }
            Err(e) => {
                log::warn!(target: "player", "could not read episode {id}: {e:#}");
                return;
            }
        };

        if episode.record_progress(position, duration) {
            log::info!(target: "player", "episode {id} marked played");
        }

        let saved = match self.store.save_progress(&episode) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(target: "player", "could not save progress for episode {id}: {e:#}");
                false
            }
        };

        // Pick up flags the library changed while we were writing.
        if saved {
            if let Ok(Some(fresh)) = self.store.episode(id) {
                episode = fresh;
            }
        }

        if let Some(session) = self.session.as_mut() {
            episode.artwork = session.episode.artwork.clone();
            session.episode = episode.clone();
            if saved {
                session.last_persisted = Some((position, duration));
            }
        }

        self.emit(PlayerEvent::EpisodeUpdated(episode));
    }
}

// ==================
//    TRANSPORT
// ==================
impl PlayerCore {
    fn loaded_session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref().filter(|s| s.is_loaded())
    }

    fn play(&mut self) {
        if self.loaded_session().is_none() {
            log::debug!(target: "player", "play ignored, nothing loaded");
            return;
        }
        self.backend.play();
        self.metrics.set_playing(self.backend.is_playing());
        self.emit_progress();
    }

    fn pause(&mut self) {
        if self.loaded_session().is_none() {
            return;
        }
        self.backend.pause();
        self.metrics.set_playing(self.backend.is_playing());
        self.emit_progress();
    }

    fn toggle_playback(&mut self) {
        match self.backend.is_playing() {
            true => self.pause(),
            false => self.play(),
        }
    }

    fn skip_ahead(&mut self) {
        let Some(session) = self.loaded_session() else {
            return;
        };

        let duration = self.backend.duration().unwrap_or(session.duration);
        if let Some(target) = skip_ahead_target(self.backend.position(), duration) {
            self.seek_to(target);
        }
    }

    fn skip_back(&mut self) {
        if self.loaded_session().is_none() {
            return;
        }
        let target = skip_back_target(self.backend.position());
        self.seek_to(target);
    }

    fn seek(&mut self, secs: f64) {
        let target = match secs.is_finite() && secs > 0.0 {
            true => Duration::from_secs_f64(secs.min(f64::from(u32::MAX))),
            false => Duration::ZERO,
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.status {
            // Applied together with the resume position once ready
            LoadStatus::Loading => session.pending_seek = Some(target),
            LoadStatus::Playing => {
                let duration = self.backend.duration().unwrap_or(session.duration);
                let target = match duration.is_zero() {
                    true => target,
                    false => target.min(duration),
                };
                self.seek_to(target);
            }
            LoadStatus::None => {}
        }
    }

    fn seek_to(&mut self, target: Duration) {
        if let Err(e) = self.backend.seek(target) {
            log::warn!(target: "player", "seek to {target:?} failed: {e:#}");
            self.emit(PlayerEvent::Error(format!("Seek failed: {e}")));
            return;
        }
        self.sample_fine();
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.volume = volume;
        self.backend.set_volume(volume);
        self.metrics.set_volume(volume);

        match self.settings.load() {
            Ok(mut settings) => {
                settings.set_volume(volume);
                if let Err(e) = self.settings.save(&settings) {
                    log::warn!(target: "player", "could not persist volume: {e:#}");
                }
            }
            Err(e) => log::warn!(target: "player", "could not read settings: {e:#}"),
        }

        self.emit_progress();
    }

    fn stop(&mut self) {
        if self.session.is_none() {
            return;
        }

        self.teardown();
        self.emit(PlayerEvent::StatusChanged {
            episode_id: None,
            status: LoadStatus::None,
        });
        self.emit_progress();
    }
}

impl PlayerCore {
    fn emit(&mut self, event: PlayerEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn emit_progress(&mut self) {
        let snapshot = self.metrics.snapshot();
        self.emit(PlayerEvent::Progress(snapshot));
    }
}
