//! Relational store for user lists and the channels they contain.
//!
//! Only what the feed needs lives here: accounts (to resolve
//! `username + slug` URLs), lists, and list items pointing at channel IDs.
//! Ownership and visibility rules are enforced elsewhere.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::debug;

/// Accounts are looked up under this provider when resolving usernames.
pub const ACCOUNT_PROVIDER: &str = "google";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub id: String,
    pub user_id: String,
    pub slug: String,
    pub title: String,
}

/// Ways a caller may name a list. Tried in order: owner username + slug,
/// session user + slug, raw ID.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub id: Option<String>,
    pub username: Option<String>,
    pub slug: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedList {
    pub list: Option<ListSummary>,
    pub channel_ids: Vec<String>,
}

/// Cloneable handle that opens a short-lived connection per query, so it can
/// be shared across blocking tasks.
#[derive(Clone)]
pub struct ListStore {
    db_path: PathBuf,
}

impl ListStore {
    /// Opens (and if necessary creates) the DB and makes sure the schema
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating lists directory {}", parent.display()))?;
        }
        let store = Self { db_path };
        store.ensure_tables()?;
        Ok(store)
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening lists DB {}", self.db_path.display()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        f(&mut conn)
    }

    /// Wrapped in a transaction so a failure leaves the DB untouched.
    fn ensure_tables(&self) -> Result<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS accounts (
                    user_id TEXT NOT NULL,
                    provider TEXT NOT NULL,
                    username TEXT NOT NULL,
                    PRIMARY KEY (provider, username)
                );

                CREATE TABLE IF NOT EXISTS lists (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    slug TEXT NOT NULL,
                    title TEXT NOT NULL DEFAULT '',
                    UNIQUE (user_id, slug)
                );

                CREATE TABLE IF NOT EXISTS list_items (
                    list_id TEXT NOT NULL,
                    origin_id TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    PRIMARY KEY (list_id, origin_id),
                    FOREIGN KEY (list_id) REFERENCES lists(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_list_items_list ON list_items(list_id, position);
                "#,
            )?;
            tx.commit()?;
            Ok(())
        })
        .context("creating lists schema")
    }

    pub fn upsert_account(&self, user_id: &str, provider: &str, username: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO accounts (user_id, provider, username)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(provider, username) DO UPDATE SET
                    user_id = excluded.user_id
                "#,
                params![user_id, provider, username],
            )?;
            Ok(())
        })
    }

    pub fn insert_list(&self, list: &ListSummary) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO lists (id, user_id, slug, title) VALUES (?1, ?2, ?3, ?4)",
                params![list.id, list.user_id, list.slug, list.title],
            )?;
            Ok(())
        })
    }

    /// Appends a channel to the end of a list; re-adding a channel is a no-op.
    pub fn add_list_item(&self, list_id: &str, origin_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT OR IGNORE INTO list_items (list_id, origin_id, position)
                VALUES (
                    ?1, ?2,
                    (SELECT COALESCE(MAX(position), -1) + 1 FROM list_items WHERE list_id = ?1)
                )
                "#,
                params![list_id, origin_id],
            )?;
            Ok(())
        })
    }

    /// Resolves a list and its channel IDs. Unknown lists or accounts yield an
    /// empty result rather than an error.
    pub fn resolve(&self, query: &ListQuery) -> Result<ResolvedList> {
        self.with_connection(|conn| {
            let mut list = None;

            if let Some(username) = query.username.as_deref() {
                let owner: Option<String> = conn
                    .query_row(
                        "SELECT user_id FROM accounts WHERE provider = ?1 AND username = ?2",
                        params![ACCOUNT_PROVIDER, username],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(owner) = owner else {
                    debug!(username, "no account for username");
                    return Ok(ResolvedList::default());
                };
                if let Some(slug) = query.slug.as_deref() {
                    list = find_by_slug(conn, slug, &owner)?;
                }
            }

            if list.is_none()
                && let (Some(slug), Some(user_id)) = (query.slug.as_deref(), query.user_id.as_deref())
            {
                list = find_by_slug(conn, slug, user_id)?;
            }

            if list.is_none()
                && let Some(id) = query.id.as_deref()
            {
                list = find_by_id(conn, id)?;
            }

            let channel_ids = match &list {
                Some(summary) => channel_ids_for(conn, &summary.id)?,
                None => Vec::new(),
            };
            Ok(ResolvedList { list, channel_ids })
        })
    }

    /// Every channel referenced by any list, deduplicated and sorted.
    pub fn all_channel_ids(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT origin_id FROM list_items ORDER BY origin_id")?;
            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })
    }
}

fn find_by_slug(conn: &Connection, slug: &str, user_id: &str) -> Result<Option<ListSummary>> {
    conn.query_row(
        "SELECT id, user_id, slug, title FROM lists WHERE slug = ?1 AND user_id = ?2",
        params![slug, user_id],
        row_to_summary,
    )
    .optional()
    .context("looking up list by slug")
}

fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ListSummary>> {
    conn.query_row(
        "SELECT id, user_id, slug, title FROM lists WHERE id = ?1",
        params![id],
        row_to_summary,
    )
    .optional()
    .context("looking up list by id")
}

fn channel_ids_for(conn: &Connection, list_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT origin_id FROM list_items WHERE list_id = ?1 ORDER BY position ASC",
    )?;
    let mut rows = stmt.query([list_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<ListSummary> {
    Ok(ListSummary {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> Result<(tempfile::TempDir, ListStore)> {
        let dir = tempdir()?;
        let store = ListStore::open(dir.path().join("db").join("lists.db"))?;
        store.upsert_account("user-1", ACCOUNT_PROVIDER, "alice")?;
        store.insert_list(&ListSummary {
            id: "list-1".into(),
            user_id: "user-1".into(),
            slug: "music".into(),
            title: "Music".into(),
        })?;
        store.insert_list(&ListSummary {
            id: "list-2".into(),
            user_id: "user-2".into(),
            slug: "music".into(),
            title: "Other music".into(),
        })?;
        store.add_list_item("list-1", "UCb")?;
        store.add_list_item("list-1", "UCa")?;
        store.add_list_item("list-1", "UCb")?;
        store.add_list_item("list-2", "UCc")?;
        Ok((dir, store))
    }

    #[test]
    fn resolves_by_username_and_slug() -> Result<()> {
        let (_dir, store) = seeded()?;
        let resolved = store.resolve(&ListQuery {
            username: Some("alice".into()),
            slug: Some("music".into()),
            ..Default::default()
        })?;
        assert_eq!(resolved.list.unwrap().id, "list-1");
        assert_eq!(resolved.channel_ids, ["UCb", "UCa"]);
        Ok(())
    }

    #[test]
    fn unknown_username_is_empty_not_error() -> Result<()> {
        let (_dir, store) = seeded()?;
        let resolved = store.resolve(&ListQuery {
            username: Some("nobody".into()),
            slug: Some("music".into()),
            id: Some("list-1".into()),
            ..Default::default()
        })?;
        assert_eq!(resolved, ResolvedList::default());
        Ok(())
    }

    #[test]
    fn falls_back_to_session_user_then_id() -> Result<()> {
        let (_dir, store) = seeded()?;
        let by_session = store.resolve(&ListQuery {
            slug: Some("music".into()),
            user_id: Some("user-2".into()),
            ..Default::default()
        })?;
        assert_eq!(by_session.channel_ids, ["UCc"]);

        let by_id = store.resolve(&ListQuery {
            slug: Some("missing".into()),
            user_id: Some("user-2".into()),
            id: Some("list-1".into()),
            ..Default::default()
        })?;
        assert_eq!(by_id.list.unwrap().slug, "music");
        Ok(())
    }

    #[test]
    fn missing_list_resolves_empty() -> Result<()> {
        let (_dir, store) = seeded()?;
        let resolved = store.resolve(&ListQuery {
            id: Some("nope".into()),
            ..Default::default()
        })?;
        assert!(resolved.list.is_none());
        assert!(resolved.channel_ids.is_empty());
        Ok(())
    }

    #[test]
    fn all_channel_ids_dedupes() -> Result<()> {
        let (_dir, store) = seeded()?;
        assert_eq!(store.all_channel_ids()?, ["UCa", "UCb", "UCc"]);
        Ok(())
    }
}
