use super::{
    Database,
    queries::{
        GET_ALL_EPISODES, GET_EPISODE, GET_PODCAST_EPISODES, INSERT_EPISODE,
        SET_EPISODE_DOWNLOADED, SET_EPISODE_FAVOURITE, SET_EPISODE_PLAYED, SET_PODCAST_PLAYED,
        SAVE_EPISODE_PROGRESS,
    },
};
use crate::domain::{Episode, NewEpisode};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

fn episode_from_row(r: &Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: r.get("id")?,
        podcast_id: r.get("podcast_id")?,
        title: r.get("title")?,
        guid: r.get("guid")?,
        enclosure_url: r.get("enclosure_url")?,
        file_name: r.get("file_name")?,
        downloaded: r.get("downloaded")?,
        play_position: r.get("play_position")?,
        duration: r.get("duration")?,
        played: r.get("played")?,
        favourite: r.get("favourite")?,
        pub_date: r.get("pub_date")?,
        artwork: None,
    })
}

impl Database {
    pub fn get_episode(&self, id: i64) -> Result<Option<Episode>> {
        let episode = self
            .conn
            .query_row(GET_EPISODE, params![id], episode_from_row)
            .optional()?;

        Ok(episode)
    }

    pub fn get_episodes(&self, podcast_id: Option<i64>) -> Result<Vec<Episode>> {
        let mut stmt = match podcast_id {
            Some(_) => self.conn.prepare(GET_PODCAST_EPISODES)?,
            None => self.conn.prepare(GET_ALL_EPISODES)?,
        };

        let rows = match podcast_id {
            Some(id) => stmt.query_map(params![id], episode_from_row)?,
            None => stmt.query_map([], episode_from_row)?,
        };

        let mut episodes = vec![];
        for row in rows {
            episodes.push(row?);
        }

        Ok(episodes)
    }

    pub fn insert_episode(&self, episode: &NewEpisode) -> Result<i64> {
        self.conn.execute(
            INSERT_EPISODE,
            params![
                episode.podcast_id,
                episode.title,
                episode.guid,
                episode.enclosure_url,
                episode.duration,
                episode.pub_date,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Write every stored column of `episode`. Returns false if the row is gone.
    pub fn save_episode_progress(
        &self,
        id: i64,
        position: u32,
        duration: u32,
        played: bool,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            SAVE_EPISODE_PROGRESS,
            params![id, position, duration, played],
        )?;

        Ok(updated > 0)
    }

    pub fn set_episode_played(&self, id: i64, played: bool) -> Result<bool> {
        Ok(self.conn.execute(SET_EPISODE_PLAYED, params![id, played])? > 0)
    }

    pub fn set_episode_favourite(&self, id: i64, favourite: bool) -> Result<bool> {
        Ok(self
            .conn
            .execute(SET_EPISODE_FAVOURITE, params![id, favourite])?
            > 0)
    }

    pub fn set_episode_downloaded(&self, id: i64, file_name: Option<&str>) -> Result<bool> {
        let updated = self.conn.execute(
            SET_EPISODE_DOWNLOADED,
            params![id, file_name, file_name.is_some()],
        )?;
        Ok(updated > 0)
    }

    pub fn set_podcast_played(&self, podcast_id: i64, played: bool) -> Result<usize> {
        Ok(self
            .conn
            .execute(SET_PODCAST_PLAYED, params![podcast_id, played])?)
    }
}
