pub(crate) mod download;
mod library;

pub use library::Library;

// Extensions accepted when naming a downloaded file after its url
static LEGAL_EXTENSION: std::sync::LazyLock<std::collections::HashSet<&'static str>> =
    std::sync::LazyLock::new(|| {
        std::collections::HashSet::from(["mp3", "m4a", "aac", "mp4", "ogg", "opus", "flac", "wav"])
    });
