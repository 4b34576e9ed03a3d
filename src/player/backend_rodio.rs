use crate::{
    domain::MediaSource,
    library::download::fetch_bytes,
    player::{MediaBackend, MediaStatus},
};
use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, TryRecvError};
use lofty::{
    file::{AudioFile, TaggedFile, TaggedFileExt},
    probe::Probe,
};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
    sync::Arc,
    thread,
    time::Duration,
};
use url::Url;

/// Media backend on top of the default rodio output stream.
///
/// Local files decode straight from disk. Remote episodes are fetched whole
/// on a worker thread and decoded from memory once they arrive, so until then
/// the backend reports [`MediaStatus::Loading`].
pub struct RodioBackend {
    sink: Sink,
    _stream: OutputStream,

    status: MediaStatus,
    fetch: Option<Fetch>,

    duration: Option<Duration>,
    buffered: Duration,
    artwork: Option<Arc<[u8]>>,
}

struct Fetch {
    hint: Option<String>,
    rx: Receiver<Result<Vec<u8>>>,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        let stream = OutputStreamBuilder::open_default_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();

        Ok(Self {
            sink,
            _stream: stream,
            status: MediaStatus::Idle,
            fetch: None,
            duration: None,
            buffered: Duration::ZERO,
            artwork: None,
        })
    }

    fn open_file(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        match lofty::read_from_path(path) {
            Ok(tagged) => self.take_tags(&tagged),
            Err(e) => log::debug!(target: "player", "no tags for {}: {e}", path.display()),
        }

        let decoder = decode(BufReader::new(file), len, extension_of(path.to_str()))?;
        self.start(decoder);
        Ok(())
    }

    fn open_remote(&mut self, url: &Url) -> Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let target = url.clone();

        thread::Builder::new()
            .name(String::from("fetch"))
            .spawn(move || {
                // The receiver is gone once another episode was opened
                let _ = tx.send(fetch_bytes(&target));
            })?;

        self.fetch = Some(Fetch {
            hint: extension_of(url.path_segments().and_then(|mut s| s.next_back())),
            rx,
        });
        self.status = MediaStatus::Loading;
        Ok(())
    }

    fn finish_fetch(&mut self, bytes: Vec<u8>, hint: Option<String>) -> Result<()> {
        match Probe::new(Cursor::new(bytes.as_slice()))
            .guess_file_type()
            .map_err(lofty::error::LoftyError::from)
            .and_then(|p| p.read())
        {
            Ok(tagged) => self.take_tags(&tagged),
            Err(e) => log::debug!(target: "player", "no tags in fetched media: {e}"),
        }

        let len = bytes.len() as u64;
        let decoder = decode(Cursor::new(bytes), len, hint)?;
        self.start(decoder);
        Ok(())
    }

    fn take_tags(&mut self, tagged: &TaggedFile) {
        let duration = tagged.properties().duration();
        if !duration.is_zero() {
            self.duration = Some(duration);
        }

        self.artwork = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .and_then(|tag| tag.pictures().first())
            .map(|picture| Arc::from(picture.data()));
    }

    fn start<R>(&mut self, decoder: Decoder<R>)
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        if self.duration.is_none() {
            self.duration = decoder.total_duration();
        }
        // Everything is on hand once decoding starts
        self.buffered = self.duration.unwrap_or_default();

        self.sink.append(decoder);
        self.status = MediaStatus::Ready;
    }
}

impl MediaBackend for RodioBackend {
    fn open(&mut self, source: &MediaSource) -> Result<()> {
        self.close();

        match source {
            MediaSource::Local(path) => self.open_file(path),
            MediaSource::Remote(url) => self.open_remote(url),
        }
    }

    fn poll(&mut self) -> MediaStatus {
        let Some(fetch) = &self.fetch else {
            return self.status.clone();
        };

        let received = match fetch.rx.try_recv() {
            Ok(received) => received,
            Err(TryRecvError::Empty) => return self.status.clone(),
            Err(TryRecvError::Disconnected) => Err(anyhow!("download stopped unexpectedly")),
        };

        let hint = self.fetch.take().and_then(|f| f.hint);
        if let Err(e) = received.and_then(|bytes| self.finish_fetch(bytes, hint)) {
            self.status = MediaStatus::Failed(format!("{e:#}"));
        }

        self.status.clone()
    }

    fn close(&mut self) {
        self.sink.clear();
        self.fetch = None;
        self.status = MediaStatus::Idle;
        self.duration = None;
        self.buffered = Duration::ZERO;
        self.artwork = None;
    }

    fn play(&mut self) {
        if self.status == MediaStatus::Ready {
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        self.status == MediaStatus::Ready && !self.sink.is_paused() && !self.sink.empty()
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        self.sink.try_seek(position).map_err(|e| anyhow!("{e}"))?;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn buffered(&self) -> Duration {
        self.buffered
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn artwork(&self) -> Option<Arc<[u8]>> {
        self.artwork.clone()
    }
}

fn extension_of(name: Option<&str>) -> Option<String> {
    name.map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

fn decode<R>(data: R, len: u64, ext: Option<String>) -> Result<Decoder<R>>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let mut builder = Decoder::builder()
        .with_data(data)
        .with_byte_len(len)
        .with_seekable(true);

    if let Some(ext) = ext.as_deref() {
        let hint = match ext {
            "adif" | "adts" => "aac",
            "m4a" | "m4b" | "m4p" | "m4r" | "mp4" => "audio/mp4",
            "bit" | "mpga" => "mp3",
            "oga" | "ogx" | "spx" => "audio/ogg",
            "wave" => "wav",
            _ => ext,
        };
        builder = builder.with_hint(hint);
    }

    Ok(builder.build()?)
}
