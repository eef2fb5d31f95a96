#![allow(dead_code)]

pub mod patch_03_06;
pub mod patch_03_17;
pub mod patch_04_35;
pub mod patch_06_14;

use std::sync::atomic::{AtomicBool, Ordering};

use patchkit::snapshot::{snapshot, v1::V1, v2::V2, v3::V3, v4::V4};
use patchkit::{Patch, Session};
use sqlx::Sqlite;

/// Directory of the SQL patches shipped with the tests.
pub fn sql_directory() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/patches/sql")
}

snapshot! {
    pub struct NoteV2: V2 => "note" {
        pub body: String,
    }
}

snapshot! {
    pub struct NoteV3: V3 => "note" {
        pub body: String,
    }
}

/// Generation 2 patch writing a row through a generation 3 snapshot.
pub struct ReachesAhead {
    pub swallow_error: bool,
}

#[async_trait::async_trait]
impl Patch<Sqlite> for ReachesAhead {
    fn name(&self) -> &str {
        "patch-05-01"
    }

    fn generation(&self) -> u8 {
        2
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .execute_script("CREATE TABLE marker (id INTEGER PRIMARY KEY)")
            .await?;

        let created = session
            .create(NoteV3 {
                body: "ahead".to_owned(),
            })
            .await;

        match created {
            Err(_) if self.swallow_error => Ok(()),
            Err(err) => Err(err.into()),
            Ok(_) => Ok(()),
        }
    }
}

/// Fails on its first run only.
pub struct FailsOnce {
    pub name: &'static str,
    pub failed: AtomicBool,
}

impl FailsOnce {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            failed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl Patch<Sqlite> for FailsOnce {
    fn name(&self) -> &str {
        self.name
    }

    fn generation(&self) -> u8 {
        2
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .create(NoteV2 {
                body: self.name.to_owned(),
            })
            .await?;
        session.flush().await?;

        if !self.failed.swap(true, Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }

        Ok(())
    }
}

/// Never finishes, to be cancelled.
pub struct Stalls;

#[async_trait::async_trait]
impl Patch<Sqlite> for Stalls {
    fn name(&self) -> &str {
        "patch-07-01"
    }

    fn generation(&self) -> u8 {
        2
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .create(NoteV2 {
                body: "half done".to_owned(),
            })
            .await?;
        session.flush().await?;

        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;

        Ok(())
    }
}

snapshot! {
    pub struct CityV1: V1 => "city_location" {
        pub city: Option<String>,
        pub state: Option<String>,
    }
}

snapshot! {
    pub struct CityV2: V2 => "city_location" {
        pub city: Option<String>,
        pub state: Option<String>,
    }
}

snapshot! {
    pub struct CityV3: V3 => "city_location" {
        pub city: Option<String>,
        pub state: Option<String>,
    }
}

snapshot! {
    pub struct CityV4: V4 => "city_location" {
        pub city: Option<String>,
        pub state: Option<String>,
    }
}

/// Writes one city through the snapshot of its generation.
pub struct WritesCity {
    pub generation: u8,
}

#[async_trait::async_trait]
impl Patch<Sqlite> for WritesCity {
    fn name(&self) -> &str {
        "patch-08-01"
    }

    fn generation(&self) -> u8 {
        self.generation
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        let city = Some("Campinas".to_owned());
        let state = Some("SP".to_owned());

        match self.generation {
            1 => {
                session.create(CityV1 { city, state }).await?;
            }
            2 => {
                session.create(CityV2 { city, state }).await?;
            }
            3 => {
                session.create(CityV3 { city, state }).await?;
            }
            _ => {
                session.create(CityV4 { city, state }).await?;
            }
        }

        Ok(())
    }
}
