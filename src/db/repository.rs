use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{ArticleAnalysis, NewSource, NewSourceItem, Source, SourceItem};
use crate::store::Snapshot;

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn is_empty(&self) -> Result<bool> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count == 0)
    }

    /// Reads all three collections into one validated snapshot.
    pub async fn load_snapshot(&self) -> Result<Snapshot> {
        let (sources, items, raw_analyses) = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT uuid, title, url, image_url, last_build, pub_date FROM sources ORDER BY uuid",
                )?;
                let sources = stmt
                    .query_map([], source_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    r#"SELECT uuid, title, content, url, posted, updated, authors, source_uuid
                       FROM source_items
                       ORDER BY posted DESC, uuid"#,
                )?;
                let items = stmt
                    .query_map([], item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    "SELECT report FROM source_item_analyses ORDER BY source_item_uuid",
                )?;
                let analyses = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                Ok((sources, items, analyses))
            })
            .await?;

        let analyses = raw_analyses
            .iter()
            .map(|json| serde_json::from_str::<ArticleAnalysis>(json))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Snapshot::new(sources, items, analyses)
    }

    // Source operations

    pub async fn insert_source(&self, source: NewSource) -> Result<Source> {
        let now = Utc::now();
        let last_build = source.last_build.unwrap_or(now);
        let pub_date = source.pub_date.unwrap_or(now);

        let stored = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sources (title, url, image_url, last_build, pub_date) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        source.title,
                        source.url,
                        source.image_url,
                        last_build.to_rfc3339(),
                        pub_date.to_rfc3339(),
                    ],
                )?;
                Ok(Source {
                    uuid: conn.last_insert_rowid(),
                    title: source.title,
                    url: source.url,
                    image_url: source.image_url,
                    last_build,
                    pub_date,
                })
            })
            .await?;
        Ok(stored)
    }

    // Item operations

    /// Stores pulled items for a source. Items whose title is already known
    /// for that source are skipped; only the newly stored items are returned.
    pub async fn insert_items(
        &self,
        source_uuid: i64,
        items: Vec<NewSourceItem>,
    ) -> Result<Vec<SourceItem>> {
        let now = Utc::now();
        let rows = items
            .into_iter()
            .map(|item| {
                let authors = serde_json::to_string(&item.authors)?;
                Ok((item, authors))
            })
            .collect::<Result<Vec<_>>>()?;

        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = Vec::new();
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR IGNORE INTO source_items
                               (source_uuid, title, content, url, authors, posted, updated)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    )?;
                    for (item, authors) in rows {
                        let posted = item.posted.unwrap_or(now);
                        let updated = item.updated.unwrap_or(posted);
                        let changed = stmt.execute(params![
                            source_uuid,
                            item.title,
                            item.content,
                            item.url,
                            authors,
                            posted.to_rfc3339(),
                            updated.to_rfc3339(),
                        ])?;
                        if changed == 0 {
                            continue;
                        }
                        inserted.push(SourceItem {
                            uuid: tx.last_insert_rowid(),
                            title: item.title,
                            content: item.content,
                            url: item.url,
                            posted,
                            updated,
                            authors: item.authors,
                            source_uuid,
                        });
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        tracing::info!("Stored {} new items for source {}", inserted.len(), source_uuid);
        Ok(inserted)
    }

    // Analysis operations

    pub async fn save_analysis(&self, record: &ArticleAnalysis) -> Result<()> {
        let item_uuid = record.source_item_uuid;
        let report = serde_json::to_string(record)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO source_item_analyses (source_item_uuid, report)
                       VALUES (?1, ?2)
                       ON CONFLICT(source_item_uuid) DO UPDATE SET
                           report = excluded.report,
                           generated_at = datetime('now')"#,
                    params![item_uuid, report],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Writes a whole dataset, keeping its uuids. Rows with the same uuid are
    /// updated in place, so items pulled and analyses generated since are kept.
    pub async fn import_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let sources = snapshot.sources().to_vec();
        let items = snapshot
            .source_items()
            .iter()
            .map(|item| Ok((item.clone(), serde_json::to_string(&item.authors)?)))
            .collect::<Result<Vec<_>>>()?;
        let analyses = snapshot
            .analyses()
            .iter()
            .map(|record| Ok((record.source_item_uuid, serde_json::to_string(record)?)))
            .collect::<Result<Vec<_>>>()?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for source in &sources {
                    tx.execute(
                        r#"INSERT INTO sources (uuid, title, url, image_url, last_build, pub_date)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                           ON CONFLICT(uuid) DO UPDATE SET
                               title = excluded.title,
                               url = excluded.url,
                               image_url = excluded.image_url,
                               last_build = excluded.last_build,
                               pub_date = excluded.pub_date"#,
                        params![
                            source.uuid,
                            source.title,
                            source.url,
                            source.image_url,
                            source.last_build.to_rfc3339(),
                            source.pub_date.to_rfc3339(),
                        ],
                    )?;
                }
                for (item, authors) in &items {
                    // A pulled item with the same title gives way to the dataset's
                    tx.execute(
                        r#"DELETE FROM source_item_analyses WHERE source_item_uuid IN (
                               SELECT uuid FROM source_items
                               WHERE source_uuid = ?1 AND title = ?2 AND uuid <> ?3)"#,
                        params![item.source_uuid, item.title, item.uuid],
                    )?;
                    tx.execute(
                        r#"DELETE FROM source_items
                           WHERE source_uuid = ?1 AND title = ?2 AND uuid <> ?3"#,
                        params![item.source_uuid, item.title, item.uuid],
                    )?;
                    tx.execute(
                        r#"INSERT INTO source_items
                               (uuid, source_uuid, title, content, url, authors, posted, updated)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                           ON CONFLICT(uuid) DO UPDATE SET
                               source_uuid = excluded.source_uuid,
                               title = excluded.title,
                               content = excluded.content,
                               url = excluded.url,
                               authors = excluded.authors,
                               posted = excluded.posted,
                               updated = excluded.updated"#,
                        params![
                            item.uuid,
                            item.source_uuid,
                            item.title,
                            item.content,
                            item.url,
                            authors,
                            item.posted.to_rfc3339(),
                            item.updated.to_rfc3339(),
                        ],
                    )?;
                }
                for (item_uuid, report) in &analyses {
                    tx.execute(
                        "INSERT OR REPLACE INTO source_item_analyses (source_item_uuid, report) VALUES (?1, ?2)",
                        params![item_uuid, report],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        tracing::info!(
            "Imported {} sources, {} items, {} analyses",
            snapshot.sources().len(),
            snapshot.source_items().len(),
            snapshot.analyses().len()
        );
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row
        .get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now))
}

fn source_from_row(row: &Row) -> rusqlite::Result<Source> {
    Ok(Source {
        uuid: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        image_url: row.get(3)?,
        last_build: datetime_column(row, 4)?,
        pub_date: datetime_column(row, 5)?,
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<SourceItem> {
    let authors: String = row.get(6)?;
    Ok(SourceItem {
        uuid: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        url: row.get(3)?,
        posted: datetime_column(row, 4)?,
        updated: datetime_column(row, 5)?,
        authors: serde_json::from_str(&authors).unwrap_or_default(),
        source_uuid: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisReport;
    use crate::store::fixtures::analyzed;
    use crate::store::seed_snapshot;

    async fn test_repo() -> Repository {
        Repository::new(":memory:").await.unwrap()
    }

    fn new_source(url: &str) -> NewSource {
        NewSource {
            title: "Example".to_string(),
            url: url.to_string(),
            image_url: None,
            last_build: None,
            pub_date: None,
        }
    }

    fn new_item(title: &str) -> NewSourceItem {
        NewSourceItem {
            title: title.to_string(),
            content: "text".to_string(),
            url: format!("https://example.com/{title}"),
            posted: None,
            updated: None,
            authors: vec!["A. Writer".to_string()],
        }
    }

    #[tokio::test]
    async fn new_database_is_empty() {
        let repo = test_repo().await;
        assert!(repo.is_empty().await.unwrap());
        assert!(repo.load_snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserted_source_gets_a_uuid() {
        let repo = test_repo().await;
        let source = repo.insert_source(new_source("https://example.com/rss")).await.unwrap();
        assert!(source.uuid > 0);

        let snapshot = repo.load_snapshot().await.unwrap();
        assert_eq!(snapshot.sources(), &[source]);
    }

    #[tokio::test]
    async fn duplicate_source_url_is_rejected() {
        let repo = test_repo().await;
        repo.insert_source(new_source("https://example.com/rss")).await.unwrap();
        assert!(repo.insert_source(new_source("https://example.com/rss")).await.is_err());
    }

    #[tokio::test]
    async fn pulling_twice_stores_only_new_titles() {
        let repo = test_repo().await;
        let source = repo.insert_source(new_source("https://example.com/rss")).await.unwrap();

        let first = repo
            .insert_items(source.uuid, vec![new_item("a"), new_item("b")])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        let second = repo
            .insert_items(source.uuid, vec![new_item("b"), new_item("c")])
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "c");
        assert_eq!(second[0].source_uuid, source.uuid);

        let snapshot = repo.load_snapshot().await.unwrap();
        assert_eq!(snapshot.source_items().len(), 3);
        assert!(snapshot
            .source_items()
            .iter()
            .all(|i| i.authors == vec!["A. Writer".to_string()]));
    }

    #[tokio::test]
    async fn saved_analysis_replaces_previous_record() {
        let repo = test_repo().await;
        let source = repo.insert_source(new_source("https://example.com/rss")).await.unwrap();
        let item = repo.insert_items(source.uuid, vec![new_item("a")]).await.unwrap().remove(0);

        repo.save_analysis(&ArticleAnalysis::new(
            item.uuid,
            AnalysisReport::Failed {
                error: "timeout".to_string(),
            },
        ))
        .await
        .unwrap();
        repo.save_analysis(&analyzed(item.uuid, "Recovered")).await.unwrap();

        let snapshot = repo.load_snapshot().await.unwrap();
        assert_eq!(snapshot.analyses(), &[analyzed(item.uuid, "Recovered")]);
    }

    #[tokio::test]
    async fn seed_dataset_round_trips_through_import() {
        let repo = test_repo().await;
        let seed = seed_snapshot().unwrap();
        repo.import_snapshot(&seed).await.unwrap();

        let loaded = repo.load_snapshot().await.unwrap();
        assert_eq!(loaded.sources(), seed.sources());
        assert_eq!(loaded.analyses(), seed.analyses());
        assert_eq!(loaded.source_items().len(), seed.source_items().len());
        for item in seed.source_items() {
            assert_eq!(loaded.item(item.uuid), Some(item));
        }
    }

    #[tokio::test]
    async fn reimport_keeps_generated_analyses() {
        let repo = test_repo().await;
        let seed = seed_snapshot().unwrap();
        repo.import_snapshot(&seed).await.unwrap();

        let item_uuid = seed
            .source_items()
            .iter()
            .map(|i| i.uuid)
            .find(|uuid| seed.analysis_for(*uuid).is_none())
            .unwrap();
        repo.save_analysis(&analyzed(item_uuid, "Generated")).await.unwrap();

        repo.import_snapshot(&seed).await.unwrap();
        let loaded = repo.load_snapshot().await.unwrap();
        assert_eq!(
            loaded.analysis_for(item_uuid),
            Some(&analyzed(item_uuid, "Generated"))
        );
        assert_eq!(loaded.source_items().len(), seed.source_items().len());
    }

    #[tokio::test]
    async fn items_of_unknown_sources_are_imported() {
        let repo = test_repo().await;
        let dataset = Snapshot::from_json(
            r#"{
                "sources": [{"uuid": 77, "title": "Known", "url": "https://known.example/rss",
                             "lastBuildTimestamp": 0, "pubDateTimestamp": 0}],
                "sourceItems": [{"uuid": 900, "title": "Stray", "content": "", "url": "https://stray.example/a",
                                 "postedTimestamp": 0, "updatedTimestamp": 0, "authors": [], "source_uuid": 999}],
                "sourceItemAnalyses": []
            }"#,
        )
        .unwrap();
        repo.import_snapshot(&dataset).await.unwrap();

        let loaded = repo.load_snapshot().await.unwrap();
        let stray = loaded.item(900).unwrap();
        assert_eq!(stray.source_uuid, 999);
        assert!(loaded.source_for(stray).is_none());
    }
}
