use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "doughnut",
    version,
    about = "Podcast player core: library, playback and progress tracking"
)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play an episode and accept messages on stdin until it closes
    Play { id: i64 },
    /// Accept messages on stdin without starting playback
    Serve,
    /// List episodes
    List {
        #[arg(long)]
        podcast: Option<i64>,
    },
    /// List subscribed podcasts
    Podcasts,
    AddPodcast {
        title: String,
        #[arg(long, default_value = "")]
        feed: String,
        #[arg(long)]
        storage: Option<PathBuf>,
    },
    AddEpisode {
        podcast: i64,
        title: String,
        /// Enclosure url of the audio
        #[arg(long)]
        url: Option<String>,
    },
    /// Download an episode into its podcast's storage directory
    Download { id: i64 },
    /// List audio output devices
    Devices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_with_global_flags() {
        let cli = Cli::try_parse_from(["doughnut", "play", "12", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Command::Play { id: 12 })));
    }

    #[test]
    fn parses_add_episode() {
        let cli = Cli::try_parse_from([
            "doughnut",
            "add-episode",
            "3",
            "Pilot",
            "--url",
            "https://example.com/pilot.mp3",
        ])
        .unwrap();

        match cli.command {
            Some(Command::AddEpisode { podcast, title, url }) => {
                assert_eq!(podcast, 3);
                assert_eq!(title, "Pilot");
                assert_eq!(url.as_deref(), Some("https://example.com/pilot.mp3"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["doughnut"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn rejects_a_non_numeric_id() {
        assert!(Cli::try_parse_from(["doughnut", "download", "latest"]).is_err());
    }
}
