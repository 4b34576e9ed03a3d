use crate::{
    cli::Command,
    domain::{NewEpisode, NewPodcast},
    get_readable_duration,
    ipc::{Envelope, IpcMessage},
    library::Library,
    player::{PlayerEvent, PlayerHandle, output_devices},
    settings::{FileSettings, Settings, SettingsStore},
    truncate,
};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, select};
use serde_json::json;
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

type DownloadResult = (i64, Result<PathBuf>);

/// The running host: owns the library, settings and player, and answers
/// IPC envelopes read from the front end.
pub struct Doughnut<W: Write> {
    library: Library,
    settings: Box<dyn SettingsStore>,
    player: PlayerHandle,
    events: Receiver<PlayerEvent>,
    downloads: (Sender<DownloadResult>, Receiver<DownloadResult>),
    out: W,
}

impl<W: Write> Doughnut<W> {
    pub fn new(
        library: Library,
        settings: Box<dyn SettingsStore>,
        player: PlayerHandle,
        out: W,
    ) -> Self {
        let events = player.events();
        Doughnut {
            library,
            settings,
            player,
            events,
            downloads: crossbeam_channel::unbounded(),
            out,
        }
    }

    pub fn start<S>(library: Library, settings: S, out: W) -> Result<Self>
    where
        S: SettingsStore + Clone + 'static,
    {
        let player = PlayerHandle::spawn(
            std::sync::Arc::new(library.clone()),
            Box::new(settings.clone()),
        )
        .context("Failed to start the player")?;

        Ok(Self::new(library, Box::new(settings), player, out))
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    /// Answer messages until `input` closes.
    pub fn serve(&mut self, input: Receiver<String>) -> Result<()> {
        let events = self.events.clone();
        let finished = self.downloads.1.clone();

        loop {
            select! {
                recv(input) -> line => match line {
                    Ok(line) => self.handle_line(&line)?,
                    Err(_) => break,
                },
                recv(events) -> event => match event {
                    Ok(event) => self.send(&Envelope::from_event(&event))?,
                    Err(_) => break,
                },
                recv(finished) -> done => if let Ok((id, result)) = done {
                    self.download_finished(id, result)?;
                },
            }
        }

        log::info!(target: "ipc", "input closed, shutting down");
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let outcome = IpcMessage::parse(line)
            .map_err(anyhow::Error::from)
            .and_then(|msg| self.handle_message(msg));

        if let Err(e) = outcome {
            log::warn!(target: "ipc", "{e:#}");
            self.send(&Envelope::new("app:error", json!({ "message": format!("{e:#}") })))?;
        }
        Ok(())
    }

    #[rustfmt::skip]
    fn handle_message(&mut self, msg: IpcMessage) -> Result<()> {
        match msg {
            // Player
            IpcMessage::PlayerToggle        => self.player.toggle_playback()?,
            IpcMessage::PlayerPlay          => self.player.play()?,
            IpcMessage::PlayerPause         => self.player.pause()?,
            IpcMessage::PlayerSeek(s)       => self.player.seek(s)?,
            IpcMessage::PlayerSkipAhead     => self.player.skip_ahead()?,
            IpcMessage::PlayerSkipBack      => self.player.skip_back()?,
            IpcMessage::PlayerVolume(v)     => self.player.set_volume(v)?,
            IpcMessage::PlayerStop          => self.player.stop()?,

            // Episodes
            IpcMessage::EpisodePlay(id)     => self.play_episode(id)?,
            IpcMessage::EpisodeDownload(id) => self.download(id),
            IpcMessage::EpisodeFavourite(id)   => self.favourite(id, true)?,
            IpcMessage::EpisodeUnfavourite(id) => self.favourite(id, false)?,
            IpcMessage::EpisodePlayed(id)   => self.mark_played(id, true)?,
            IpcMessage::EpisodeUnplayed(id) => self.mark_played(id, false)?,
            IpcMessage::EpisodeReveal(id)   => self.reveal(id)?,

            // Podcasts
            IpcMessage::PodcastPlayed(id)   => self.mark_podcast(id, true)?,
            IpcMessage::PodcastUnplayed(id) => self.mark_podcast(id, false)?,
            IpcMessage::PodcastUnsubscribe { id, permanent } => self.unsubscribe(id, permanent)?,

            // Ops
            IpcMessage::SettingsSave(s)     => self.save_settings(s)?,
            IpcMessage::DevicesList         => self.list_devices()?,
        }
        Ok(())
    }

    fn send(&mut self, envelope: &Envelope) -> Result<()> {
        writeln!(self.out, "{}", envelope.to_line()?)?;
        self.out.flush()?;
        Ok(())
    }

    fn send_episode(&mut self, id: i64) -> Result<()> {
        let episode = self.library.load_episode(id)?;
        self.send(&Envelope::new("episode:updated", &episode))
    }
}

// ===================
//    MESSAGE HANDLERS
// ===================
impl<W: Write> Doughnut<W> {
    fn play_episode(&mut self, id: i64) -> Result<()> {
        let episode = self.library.load_episode(id)?;
        log::info!(target: "ipc", "play episode {id} '{}'", episode.title);
        self.player.play_episode(episode)
    }

    /// Runs on its own thread, the result comes back through `serve`.
    fn download(&mut self, id: i64) {
        let library = self.library.clone();
        let tx = self.downloads.0.clone();

        let spawned = thread::Builder::new()
            .name(format!("download-{id}"))
            .spawn(move || {
                let _ = tx.send((id, library.download_episode(id)));
            });

        if let Err(e) = spawned {
            let _ = self.downloads.0.send((id, Err(e.into())));
        }
    }

    fn download_finished(&mut self, id: i64, result: Result<PathBuf>) -> Result<()> {
        match result {
            Ok(path) => {
                log::info!(target: "ipc", "episode {id} downloaded to {}", path.display());
                self.send_episode(id)
            }
            Err(e) => {
                log::warn!(target: "ipc", "download of episode {id} failed: {e:#}");
                self.send(&Envelope::new(
                    "app:error",
                    json!({ "episode_id": id, "message": format!("Download failed: {e:#}") }),
                ))
            }
        }
    }

    fn favourite(&mut self, id: i64, favourite: bool) -> Result<()> {
        self.library.mark_episode_favourite(id, favourite)?;
        self.send_episode(id)
    }

    fn mark_played(&mut self, id: i64, played: bool) -> Result<()> {
        self.library.mark_episode_played(id, played)?;
        self.send_episode(id)
    }

    fn reveal(&mut self, id: i64) -> Result<()> {
        let path = self.library.episode_file(id)?;
        self.send(&Envelope::new("episode:reveal", json!({ "id": id, "path": path })))
    }

    fn mark_podcast(&mut self, id: i64, played: bool) -> Result<()> {
        let changed = self.library.mark_podcast_all_played(id, played)?;
        log::info!(target: "ipc", "marked {changed} episodes of podcast {id}");

        for episode in self.library.episodes(Some(id))? {
            self.send(&Envelope::new("episode:updated", &episode))?;
        }
        Ok(())
    }

    fn unsubscribe(&mut self, id: i64, permanent: bool) -> Result<()> {
        if let Some(playing) = self.player.episode_id() {
            let belongs = self
                .library
                .episode(playing)?
                .is_some_and(|e| e.podcast_id == id);
            if belongs {
                self.player.stop()?;
            }
        }

        self.library.unsubscribe(id, permanent)?;
        self.send(&Envelope::new("podcast:removed", json!({ "id": id })))
    }

    fn save_settings(&mut self, mut settings: Settings) -> Result<()> {
        settings.set_volume(settings.volume);
        self.settings.save(&settings)?;
        self.player.set_volume(settings.volume)?;
        self.send(&Envelope::new("settings:updated", &settings))
    }

    fn list_devices(&mut self) -> Result<()> {
        let devices = output_devices()?;
        self.send(&Envelope::new("devices:list", &devices))
    }
}

/// Lines from stdin, delivered until it closes.
pub fn stdin_lines() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();

    thread::Builder::new()
        .name(String::from("stdin"))
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!(target: "ipc", "stdin read failed: {e}");
                        break;
                    }
                }
            }
        })?;

    Ok(rx)
}

pub fn settings_store(config: Option<&Path>) -> Result<FileSettings> {
    match config {
        Some(path) => Ok(FileSettings::at(path)),
        None => FileSettings::default_location(),
    }
}

pub fn run(command: Option<Command>, store: FileSettings, settings: Settings) -> Result<()> {
    let library_file = settings.library_file()?;
    let library = Library::open(&library_file, settings.storage_root()?)
        .with_context(|| format!("Failed to open library at {}", library_file.display()))?;

    match command.unwrap_or(Command::Serve) {
        Command::Play { id } => {
            let episode = library.load_episode(id)?;
            let mut app = Doughnut::start(library, store, io::stdout())?;
            app.player().play_episode(episode)?;
            app.serve(stdin_lines()?)
        }
        Command::Serve => {
            let mut app = Doughnut::start(library, store, io::stdout())?;
            app.serve(stdin_lines()?)
        }
        Command::List { podcast } => {
            for e in library.episodes(podcast)? {
                let progress = match e.duration {
                    0 => String::from("--:--"),
                    _ => format!(
                        "{}/{}",
                        get_readable_duration(Duration::from_secs(u64::from(e.play_position))),
                        e.get_duration_str()
                    ),
                };
                let flags = format!(
                    "{}{}{}",
                    if e.downloaded { 'D' } else { '-' },
                    if e.played { 'P' } else { '-' },
                    if e.favourite { '*' } else { '-' },
                );
                println!("{:>6}  {flags}  {:>15}  {}", e.id, progress, truncate(&e.title, 60));
            }
            Ok(())
        }
        Command::Podcasts => {
            for p in library.podcasts()? {
                println!("{:>6}  {}", p.id, truncate(&p.title, 60));
            }
            Ok(())
        }
        Command::AddPodcast {
            title,
            feed,
            storage,
        } => {
            let podcast = library.add_podcast(NewPodcast {
                title,
                feed,
                storage_path: storage,
                ..Default::default()
            })?;
            println!("{}", podcast.id);
            Ok(())
        }
        Command::AddEpisode {
            podcast,
            title,
            url,
        } => {
            let episode = library.add_episode(NewEpisode {
                podcast_id: podcast,
                title,
                enclosure_url: url,
                ..Default::default()
            })?;
            println!("{}", episode.id);
            Ok(())
        }
        Command::Download { id } => {
            let path = library.download_episode(id)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Devices => {
            for d in output_devices()? {
                let marker = if d.is_default { '*' } else { ' ' };
                println!("{marker} {} ({} ch, {} Hz)", d.name, d.channels, d.sample_rate);
            }
            Ok(())
        }
    }
}
