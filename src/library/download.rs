use super::LEGAL_EXTENSION;
use crate::{domain::Episode, sanitize_file_name};
use anyhow::{Context, Result, bail};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::Path,
};
use url::Url;

/// Name a downloaded episode after the last segment of its url.
///
/// The episode id is prefixed so two episodes publishing `episode.mp3`
/// do not overwrite each other.
pub(super) fn file_name_for(episode: &Episode, url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .map(sanitize_file_name);

    let legal = segment.as_deref().filter(|name| {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| LEGAL_EXTENSION.contains(ext.to_lowercase().as_str()))
            .unwrap_or(false)
    });

    match legal {
        Some(name) => format!("{}-{}", episode.id, name),
        None => format!("episode-{}.mp3", episode.id),
    }
}

/// Stream `url` into `dest`, going through a `.part` file so an interrupted
/// download never looks complete.
pub(super) fn fetch_to(url: &Url, dest: &Path) -> Result<u64> {
    let response = ureq::get(url.as_str())
        .call()
        .with_context(|| format!("request for {url} failed"))?;

    let partial = dest.with_extension("part");
    let written = {
        let file = File::create(&partial)
            .with_context(|| format!("failed to create {}", partial.display()))?;
        let mut writer = BufWriter::new(file);
        let written = io::copy(&mut response.into_reader(), &mut writer)
            .with_context(|| format!("failed while downloading {url}"))?;
        writer.flush()?;
        written
    };

    fs::rename(&partial, dest)
        .with_context(|| format!("failed to move download into {}", dest.display()))?;

    Ok(written)
}

// Largest remote episode held in memory for playback.
const MAX_STREAM_BYTES: u64 = 512 << 20;
// Content-Length is only a hint; never reserve more than this up front.
const PREALLOC_LIMIT: usize = 64 << 20;

/// Pull the whole body of `url` into memory.
pub(crate) fn fetch_bytes(url: &Url) -> Result<Vec<u8>> {
    fetch_bytes_limited(url, MAX_STREAM_BYTES)
}

fn fetch_bytes_limited(url: &Url, limit: u64) -> Result<Vec<u8>> {
    let response = ureq::get(url.as_str())
        .call()
        .with_context(|| format!("request for {url} failed"))?;

    let declared = response
        .header("Content-Length")
        .and_then(|len| len.parse::<u64>().ok());
    if let Some(len) = declared.filter(|&len| len > limit) {
        bail!("{url} declares {len} bytes, more than the {limit} byte limit");
    }

    let capacity = declared
        .and_then(|len| usize::try_from(len).ok())
        .map_or(0, |len| len.min(PREALLOC_LIMIT));
    let mut bytes = Vec::with_capacity(capacity);
    response
        .into_reader()
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed while downloading {url}"))?;

    if bytes.len() as u64 > limit {
        bail!("{url} is larger than the {limit} byte limit");
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{net::TcpListener, thread};

    fn episode(id: i64) -> Episode {
        Episode {
            id,
            ..Default::default()
        }
    }

    #[test]
    fn keeps_audio_file_names() {
        let url = Url::parse("https://cdn.example.com/shows/ep%2012.mp3?token=abc").unwrap();
        assert_eq!(file_name_for(&episode(12), &url), "12-ep%2012.mp3");
    }

    // Serve one canned response on a local port and hand back its url.
    fn serve_once(response: Vec<u8>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(&response);
            }
        });
        Url::parse(&format!("http://{addr}/episode.mp3")).unwrap()
    }

    #[test]
    fn fetches_a_small_body() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello".to_vec());
        assert_eq!(fetch_bytes(&url).unwrap(), b"hello");
    }

    #[test]
    fn huge_content_length_is_an_error_not_an_allocation() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 1000000000000000\r\n\r\nabc".to_vec(),
        );
        let err = fetch_bytes(&url).unwrap_err();
        assert!(format!("{err:#}").contains("1000000000000000"));
    }

    #[test]
    fn body_past_the_limit_without_a_length_is_rejected() {
        let mut response = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[7u8; 64]);
        let url = serve_once(response);

        assert!(fetch_bytes_limited(&url, 16).is_err());
    }

    #[test]
    fn falls_back_when_url_has_no_audio_name() {
        let url = Url::parse("https://feeds.example.com/redirect/").unwrap();
        assert_eq!(file_name_for(&episode(4), &url), "episode-4.mp3");

        let url = Url::parse("https://feeds.example.com/play?id=9").unwrap();
        assert_eq!(file_name_for(&episode(9), &url), "episode-9.mp3");
    }
}
