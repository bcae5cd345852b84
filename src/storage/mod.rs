//! Persistence layer (spec §3, §6.3).
//!
//! Modeled on the teacher's `Storage` (`storage/mod.rs`): a single struct
//! wrapping a connection pool, an `include_str!`-embedded migration runner,
//! and query methods grouped by entity. The teacher runs SQLite in a single
//! process; Nerve runs PostgreSQL so that tenant isolation can be enforced
//! with real row-level security (see `with_org_scope` below), not just
//! app-layer checks.

pub mod credentials;
pub mod entitlements;
pub mod models;
pub mod orgs;
pub mod tenant_data;
pub mod usage;
pub mod webhooks;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgTransaction};
use sqlx::{Executor, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
    /// Mirrors `NerveConfig::cloud_mode`; forwarded into every scoped
    /// transaction as the `app.cloud_mode` session variable so RLS policies
    /// know whether to enforce tenant scoping at all (spec §4.7: "the
    /// flag-gated pattern preserves single-tenant/self-hosted deployments
    /// where all rows must be visible").
    cloud_mode: bool,
}

impl Storage {
    pub async fn connect(database_url: &str, cloud_mode: bool) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("connecting to database")?;
        let storage = Self { pool, cloud_mode };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Returns a clone of the pool (cheap — `Arc`-backed internally).
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Wraps an already-migrated pool. Used by integration tests that lean
    /// on `#[sqlx::test]` for pool lifecycle and migration. Defaults to
    /// cloud mode on, matching the production default.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, cloud_mode: true }
    }

    async fn migrate(&self) -> Result<()> {
        for sql in [
            include_str!("migrations/0001_core.sql"),
            include_str!("migrations/0002_rls.sql"),
        ] {
            self.pool.execute(sql).await.context("running migration")?;
        }
        Ok(())
    }

    /// Runs `f` inside a transaction with `app.org_id` bound to `org_id` for
    /// the lifetime of the transaction, so row-level security policies scope
    /// every statement `f` issues to that tenant (spec §4.7).
    ///
    /// The org id is passed as a bound parameter to `set_config`, never
    /// interpolated into the SQL string — interpolation here would reopen
    /// the injection hole RLS exists to close.
    pub async fn with_org_scope<'a, F, T>(&'a self, org_id: Uuid, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
            &'c mut PgTransaction<'a>,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send + 'c>>,
    {
        let mut tx = self.pool.begin().await.context("beginning scoped transaction")?;
        sqlx::query("SELECT set_config('app.org_id', $1, true), set_config('app.cloud_mode', $2, true)")
            .bind(org_id.to_string())
            .bind(if self.cloud_mode { "true" } else { "false" })
            .execute(&mut *tx)
            .await
            .context("setting tenant scope")?;
        let result = f(&mut tx).await?;
        tx.commit().await.context("committing scoped transaction")?;
        Ok(result)
    }
}
