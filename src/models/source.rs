use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed origin, such as a news outlet's RSS channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub uuid: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "lastBuildTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub last_build: DateTime<Utc>,
    #[serde(rename = "pubDateTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub pub_date: DateTime<Utc>,
}

/// Feed metadata returned by discovery, before the store assigns a uuid.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
    pub last_build: Option<DateTime<Utc>>,
    pub pub_date: Option<DateTime<Utc>>,
}

/// One article belonging to a [`Source`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub uuid: i64,
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(rename = "postedTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub posted: DateTime<Utc>,
    #[serde(rename = "updatedTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub source_uuid: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSourceItem {
    pub title: String,
    pub content: String,
    pub url: String,
    pub posted: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
}
