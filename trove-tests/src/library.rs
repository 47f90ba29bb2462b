use serde::{Deserialize, Serialize};
use time::Date;
use trove::{DynamicType, FromRow, PgComposite, PgEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PgEnum)]
pub enum ReadingStatus {
    Planned,
    ReadingNow,
    Finished,
    #[trove(name = "GAVE_UP")]
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, PgComposite)]
pub struct Platform {
    pub name: String,
    pub release_year: i32,
    pub regions: Vec<String>,
}

/// A specific release of a tracked item.
#[derive(Debug, Clone, PartialEq, PgComposite)]
pub struct Edition {
    pub status: ReadingStatus,
    pub platforms: Vec<Platform>,
    #[trove(name = "published_on")]
    pub published: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub pages: i32,
    pub chapter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playing {
    pub minutes: i32,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, DynamicType)]
pub enum Activity {
    Reading(Reading),
    #[trove(tag = "gaming")]
    Playing(Playing),
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TrackedItem {
    pub id: i64,
    pub title: String,
    pub status: ReadingStatus,
    pub edition: Option<Edition>,
    pub tags: Vec<String>,
    pub activity: Option<Activity>,
    /// Not a column, filled in by the application.
    #[trove(default)]
    pub note: String,
}
