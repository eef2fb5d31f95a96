//! Turns free text sale notes into sale comments.

use chrono::{DateTime, Utc};
use patchkit::snapshot::{snapshot, v3::V3};
use patchkit::{Patch, Session};
use sqlx::Sqlite;
use uuid::Uuid;

snapshot! {
    pub struct SaleComment: V3 => "sale_comment" {
        pub date: Option<DateTime<Utc>>,
        pub comment: String,
        pub sale_id: Uuid,
        pub author_id: Option<Uuid>,
    }
}

pub struct SaleComments;

#[async_trait::async_trait]
impl Patch<Sqlite> for SaleComments {
    fn name(&self) -> &str {
        "patch-04-35"
    }

    fn generation(&self) -> u8 {
        3
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .execute_script(
                r#"
                CREATE TABLE sale_comment (
                    id BLOB PRIMARY KEY,
                    te_id BLOB NOT NULL UNIQUE REFERENCES transaction_entry (id),
                    date DATETIME,
                    comment TEXT NOT NULL,
                    sale_id BLOB NOT NULL REFERENCES sale (id),
                    author_id BLOB REFERENCES login_user (id)
                );
                "#,
            )
            .await?;

        let sales = session
            .fetch_raw(
                r#"SELECT sale.id, sale.notes, sale.open_date, login_user.id AS author_id
                FROM sale
                LEFT JOIN sales_person ON sales_person.id = sale.salesperson_id
                LEFT JOIN login_user ON login_user.person_id = sales_person.person_id
                WHERE sale.notes IS NOT NULL"#,
                vec![],
            )
            .await?;

        for sale in sales {
            session
                .create(SaleComment {
                    date: sale.get("open_date")?,
                    comment: sale.get("notes")?,
                    sale_id: sale.get("id")?,
                    author_id: sale.get("author_id")?,
                })
                .await?;
        }

        session
            .execute_script("ALTER TABLE sale DROP COLUMN notes")
            .await?;

        Ok(())
    }
}
