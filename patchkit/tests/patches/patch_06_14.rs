//! Adds `product.has_kps_enabled` to a populated table.

use std::sync::atomic::{AtomicUsize, Ordering};

use patchkit::{BatchDefault, Patch, Session};
use sqlx::Sqlite;

pub static BATCHES: AtomicUsize = AtomicUsize::new(0);

pub struct KpsEnabled;

#[async_trait::async_trait]
impl Patch<Sqlite> for KpsEnabled {
    fn name(&self) -> &str {
        "patch-06-14"
    }

    fn generation(&self) -> u8 {
        4
    }

    async fn apply_patch(&self, session: &mut Session<Sqlite>) -> anyhow::Result<()> {
        session
            .execute_script("ALTER TABLE product ADD COLUMN has_kps_enabled BOOLEAN")
            .await?;

        let job = BatchDefault::new("product", "has_kps_enabled", false).batch_size(1000);
        let report = session.run_default(&job).await?;

        BATCHES.store(report.batches, Ordering::SeqCst);

        Ok(())
    }
}
