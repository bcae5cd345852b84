//! Tenant data queries: inboxes, threads, messages (spec §3, §4.7).
//!
//! These are the tables RLS protects. Every query still carries an explicit
//! `org_id` predicate — RLS is the backstop, not the only line of defense,
//! matching the teacher's own layered-checks style (`tasks/ownership.rs`
//! validates a path pattern in addition to whatever the filesystem itself
//! would refuse).

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::PgTransaction;
use uuid::Uuid;

use super::models::{InboxRow, MessageRow, ThreadRow};
use super::Storage;

impl Storage {
    pub async fn create_inbox(&self, org_id: Uuid, address: &str) -> Result<InboxRow> {
        Ok(sqlx::query_as::<_, InboxRow>(
            "INSERT INTO inboxes (id, org_id, address, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(address)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn get_inbox(&self, org_id: Uuid, inbox_id: Uuid) -> Result<Option<InboxRow>> {
        Ok(sqlx::query_as::<_, InboxRow>("SELECT * FROM inboxes WHERE id = $1 AND org_id = $2")
            .bind(inbox_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Same lookup as [`Storage::get_inbox`], but run against an
    /// RLS-scoped transaction (see [`Storage::with_org_scope`]) so the
    /// database policy actually backstops this read instead of relying
    /// solely on the `WHERE org_id = ...` predicate.
    pub async fn get_inbox_scoped(tx: &mut PgTransaction<'_>, org_id: Uuid, inbox_id: Uuid) -> Result<Option<InboxRow>> {
        Ok(sqlx::query_as::<_, InboxRow>("SELECT * FROM inboxes WHERE id = $1 AND org_id = $2")
            .bind(inbox_id)
            .bind(org_id)
            .fetch_optional(&mut **tx)
            .await?)
    }

    pub async fn list_inboxes(&self, org_id: Uuid) -> Result<Vec<InboxRow>> {
        Ok(
            sqlx::query_as::<_, InboxRow>("SELECT * FROM inboxes WHERE org_id = $1 ORDER BY created_at")
                .bind(org_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn count_inboxes(&self, org_id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM inboxes WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn create_thread(&self, org_id: Uuid, inbox_id: Uuid, subject: &str) -> Result<ThreadRow> {
        Ok(sqlx::query_as::<_, ThreadRow>(
            "INSERT INTO threads (id, org_id, inbox_id, subject, created_at)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(inbox_id)
        .bind(subject)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn get_thread(&self, org_id: Uuid, thread_id: Uuid) -> Result<Option<ThreadRow>> {
        Ok(sqlx::query_as::<_, ThreadRow>("SELECT * FROM threads WHERE id = $1 AND org_id = $2")
            .bind(thread_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Scoped counterpart of [`Storage::get_thread`] — see
    /// [`Storage::get_inbox_scoped`].
    pub async fn get_thread_scoped(tx: &mut PgTransaction<'_>, org_id: Uuid, thread_id: Uuid) -> Result<Option<ThreadRow>> {
        Ok(sqlx::query_as::<_, ThreadRow>("SELECT * FROM threads WHERE id = $1 AND org_id = $2")
            .bind(thread_id)
            .bind(org_id)
            .fetch_optional(&mut **tx)
            .await?)
    }

    pub async fn list_threads(&self, org_id: Uuid, inbox_id: Uuid) -> Result<Vec<ThreadRow>> {
        Ok(sqlx::query_as::<_, ThreadRow>(
            "SELECT * FROM threads WHERE org_id = $1 AND inbox_id = $2 ORDER BY created_at DESC",
        )
        .bind(org_id)
        .bind(inbox_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create_message(
        &self,
        org_id: Uuid,
        thread_id: Uuid,
        sender: &str,
        body: &str,
    ) -> Result<MessageRow> {
        Ok(sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (id, org_id, thread_id, sender, body, created_at)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(thread_id)
        .bind(sender)
        .bind(body)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn list_messages(&self, org_id: Uuid, thread_id: Uuid) -> Result<Vec<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE org_id = $1 AND thread_id = $2 ORDER BY created_at",
        )
        .bind(org_id)
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn get_message(&self, org_id: Uuid, message_id: Uuid) -> Result<Option<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1 AND org_id = $2")
            .bind(message_id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Scoped counterpart of [`Storage::get_message`] — see
    /// [`Storage::get_inbox_scoped`].
    pub async fn get_message_scoped(tx: &mut PgTransaction<'_>, org_id: Uuid, message_id: Uuid) -> Result<Option<MessageRow>> {
        Ok(sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1 AND org_id = $2")
            .bind(message_id)
            .bind(org_id)
            .fetch_optional(&mut **tx)
            .await?)
    }
}
