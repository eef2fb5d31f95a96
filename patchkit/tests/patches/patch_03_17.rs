//! Merges city locations spelled differently, keeping the oldest row.

use std::collections::HashMap;

use patchkit::snapshot::{snapshot, v1::V1};
use patchkit::{Patch, Session};
use sqlx::Sqlite;

snapshot! {
    pub struct CityLocation: V1 => "city_location" {
        pub city: Option<String>,
        pub state: Option<String>,
    }
}

/// Columns pointing at `city_location`.
const REFERENCES: [(&str, &str); 2] = [
    ("address", "city_location_id"),
    ("individual", "birth_location_id"),
];

pub fn normalize(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        })
        .collect()
}

pub struct MergeCities;

#[async_trait::async_trait]
impl Patch<Sqlite> for MergeCities {
    fn name(&self) -> &str {
        "patch-03-17"
    }

    fn generation(&self) -> u8 {
        1
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        let cities = session
            .find::<CityLocation>()
            .order_by("id")
            .all()
            .await?;

        let mut canonical = HashMap::new();

        for city in cities {
            let key = (
                normalize(city.state.as_deref()),
                normalize(city.city.as_deref()),
            );

            let Some(&target) = canonical.get(&key) else {
                canonical.insert(key, city.id());
                continue;
            };

            for (table, column) in REFERENCES {
                session
                    .execute_raw(
                        &format!("UPDATE {table} SET {column} = $1 WHERE {column} = $2"),
                        vec![target.into(), city.id().into()],
                    )
                    .await?;
            }

            session.delete(city)?;
        }

        Ok(())
    }
}
