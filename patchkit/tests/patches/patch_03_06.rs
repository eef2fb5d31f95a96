//! Moves product pictures into their own `image` table referenced by the
//! sellable.

use patchkit::snapshot::{snapshot, v1::V1};
use patchkit::{Patch, Session};
use sqlx::Sqlite;

snapshot! {
    pub struct Image: V1 => "image" {
        pub image: Option<Vec<u8>>,
        pub thumbnail: Option<Vec<u8>>,
        pub description: Option<String>,
    }
}

snapshot! {
    pub struct Sellable: V1 => "sellable" {
        pub description: Option<String>,
        pub image_id: Option<i64>,
    }
}

pub struct CreateImages;

#[async_trait::async_trait]
impl Patch<Sqlite> for CreateImages {
    fn name(&self) -> &str {
        "patch-03-06"
    }

    fn generation(&self) -> u8 {
        1
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .execute_script(
                r#"
                CREATE TABLE image (
                    id INTEGER PRIMARY KEY,
                    te_created_id INTEGER UNIQUE REFERENCES transaction_entry (id),
                    te_modified_id INTEGER UNIQUE REFERENCES transaction_entry (id),
                    image BLOB,
                    thumbnail BLOB,
                    description TEXT
                );
                ALTER TABLE sellable ADD COLUMN image_id INTEGER REFERENCES image (id);
                "#,
            )
            .await?;

        let products = session
            .fetch_raw(
                r#"SELECT sellable_id, image, full_image FROM product
                WHERE image IS NOT NULL AND length(image) > 0
                ORDER BY id"#,
                vec![],
            )
            .await?;

        for product in products {
            let sellable_id = product.get::<i64>("sellable_id")?;
            let thumbnail = product.get::<Vec<u8>>("image")?;
            let full_image = product.get::<Option<Vec<u8>>>("full_image")?;

            let mut sellable = session.get::<Sellable>(sellable_id).await?;
            let image = session
                .create(Image {
                    image: Some(full_image.unwrap_or_else(|| thumbnail.clone())),
                    thumbnail: Some(thumbnail),
                    description: sellable.description.clone(),
                })
                .await?;

            sellable.image_id = Some(image.id());
            session.save(&sellable)?;
        }

        session
            .execute_script(
                r#"
                ALTER TABLE product DROP COLUMN image;
                ALTER TABLE product DROP COLUMN full_image;
                "#,
            )
            .await?;

        Ok(())
    }
}
