// Applied in order, `PRAGMA user_version` records how many have run
pub const MIGRATIONS: &[&str] = &[
    // 1: Podcasts
    "
    CREATE TABLE podcasts (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        feed TEXT NOT NULL,
        description TEXT,
        link TEXT,
        author TEXT,
        image_url TEXT,
        storage_path TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    ",
    // 2: Episodes
    "
    CREATE TABLE episodes (
        id INTEGER PRIMARY KEY,
        podcast_id INTEGER NOT NULL REFERENCES podcasts(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        guid TEXT,
        enclosure_url TEXT,
        file_name TEXT,
        downloaded INTEGER NOT NULL DEFAULT 0,
        play_position INTEGER NOT NULL DEFAULT 0,
        duration INTEGER NOT NULL DEFAULT 0,
        played INTEGER NOT NULL DEFAULT 0,
        favourite INTEGER NOT NULL DEFAULT 0,
        pub_date INTEGER
    );
    CREATE INDEX idx_episodes_podcast ON episodes(podcast_id);
    ",
];

pub const GET_PODCAST: &str = "
    SELECT * FROM podcasts
    WHERE id = ?
";

pub const GET_PODCASTS: &str = "
    SELECT * FROM podcasts
    ORDER BY title COLLATE NOCASE ASC
";

pub const INSERT_PODCAST: &str = "
    INSERT INTO podcasts (
        title,
        feed,
        description,
        link,
        author,
        image_url,
        storage_path,
        created_at,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
";

pub const SET_PODCAST_STORAGE: &str = "
    UPDATE podcasts SET storage_path = ?2, updated_at = ?3
    WHERE id = ?1
";

pub const DELETE_PODCAST: &str = "
    DELETE FROM podcasts WHERE id = ?
";

pub const DELETE_PODCAST_EPISODES: &str = "
    DELETE FROM episodes WHERE podcast_id = ?
";

pub const GET_EPISODE: &str = "
    SELECT * FROM episodes
    WHERE id = ?
";

pub const GET_ALL_EPISODES: &str = "
    SELECT * FROM episodes
    ORDER BY pub_date DESC, id DESC
";

pub const GET_PODCAST_EPISODES: &str = "
    SELECT * FROM episodes
    WHERE podcast_id = ?
    ORDER BY pub_date DESC, id DESC
";

pub const INSERT_EPISODE: &str = "
    INSERT INTO episodes (
        podcast_id,
        title,
        guid,
        enclosure_url,
        duration,
        pub_date
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
";

// Only the tracker's columns; flags set elsewhere stay as they are and
// `played` never goes back to false here.
pub const SAVE_EPISODE_PROGRESS: &str = "
    UPDATE episodes SET
        play_position = ?2,
        duration = ?3,
        played = played OR ?4
    WHERE id = ?1
";

pub const SET_EPISODE_PLAYED: &str = "
    UPDATE episodes SET played = ?2
    WHERE id = ?1
";

pub const SET_EPISODE_FAVOURITE: &str = "
    UPDATE episodes SET favourite = ?2
    WHERE id = ?1
";

pub const SET_EPISODE_DOWNLOADED: &str = "
    UPDATE episodes SET file_name = ?2, downloaded = ?3
    WHERE id = ?1
";

pub const SET_PODCAST_PLAYED: &str = "
    UPDATE episodes SET played = ?2
    WHERE podcast_id = ?1
";
