use super::{
    Database,
    queries::{
        DELETE_PODCAST, DELETE_PODCAST_EPISODES, GET_PODCAST, GET_PODCASTS, INSERT_PODCAST,
        SET_PODCAST_STORAGE,
    },
    unix_now,
};
use crate::domain::{NewPodcast, Podcast};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

fn podcast_from_row(r: &Row) -> rusqlite::Result<Podcast> {
    let storage: Option<String> = r.get("storage_path")?;

    Ok(Podcast {
        id: r.get("id")?,
        title: r.get("title")?,
        feed: r.get("feed")?,
        description: r.get("description")?,
        link: r.get("link")?,
        author: r.get("author")?,
        image_url: r.get("image_url")?,
        storage_path: storage.map(PathBuf::from),
        created_at: r.get("created_at")?,
        updated_at: r.get("updated_at")?,
    })
}

impl Database {
    pub fn get_podcast(&self, id: i64) -> Result<Option<Podcast>> {
        let podcast = self
            .conn
            .query_row(GET_PODCAST, params![id], podcast_from_row)
            .optional()?;

        Ok(podcast)
    }

    pub fn get_podcasts(&self) -> Result<Vec<Podcast>> {
        let mut stmt = self.conn.prepare(GET_PODCASTS)?;
        let rows = stmt.query_map([], podcast_from_row)?;

        let mut podcasts = vec![];
        for row in rows {
            podcasts.push(row?);
        }

        Ok(podcasts)
    }

    pub fn insert_podcast(&self, podcast: &NewPodcast) -> Result<i64> {
        let storage = podcast
            .storage_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        self.conn.execute(
            INSERT_PODCAST,
            params![
                podcast.title,
                podcast.feed,
                podcast.description,
                podcast.link,
                podcast.author,
                podcast.image_url,
                storage,
                unix_now(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_podcast_storage(&self, id: i64, path: &Path) -> Result<()> {
        self.conn.execute(
            SET_PODCAST_STORAGE,
            params![id, path.to_string_lossy(), unix_now()],
        )?;
        Ok(())
    }

    /// Remove a podcast and its episodes. Returns false if it did not exist.
    pub fn delete_podcast(&mut self, id: i64) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(DELETE_PODCAST_EPISODES, params![id])?;
        let removed = tx.execute(DELETE_PODCAST, params![id])?;
        tx.commit()?;

        Ok(removed > 0)
    }
}
