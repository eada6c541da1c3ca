// No foreign keys: an item may point at a source that is not stored, and an
// analysis record at an item that is not stored.
pub const SCHEMA: &str = r#"
-- sources table
CREATE TABLE IF NOT EXISTS sources (
    uuid INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    image_url TEXT,
    last_build TEXT NOT NULL DEFAULT (datetime('now')),
    pub_date TEXT NOT NULL DEFAULT (datetime('now')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_sources_url ON sources(url);

-- source_items table
CREATE TABLE IF NOT EXISTS source_items (
    uuid INTEGER PRIMARY KEY AUTOINCREMENT,
    source_uuid INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    authors TEXT NOT NULL DEFAULT '[]',
    posted TEXT NOT NULL DEFAULT (datetime('now')),
    updated TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(source_uuid, title)
);

CREATE INDEX IF NOT EXISTS idx_source_items_source_uuid ON source_items(source_uuid);

-- source_item_analyses table (one record per item, flat JSON)
CREATE TABLE IF NOT EXISTS source_item_analyses (
    source_item_uuid INTEGER PRIMARY KEY,
    report TEXT NOT NULL,
    generated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
