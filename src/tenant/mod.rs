//! Tenant-isolation layer: app-layer ownership checks (spec §4.7).
//!
//! Defense in depth alongside the database's row-level security policies
//! (`storage/migrations/0002_rls.sql`, enforced via [`Storage::with_org_scope`]):
//! every handler that resolves a tenant-owned row by id also confirms that
//! row's `org_id` matches the caller's before touching it, the same
//! belt-and-suspenders pattern as the teacher's `check_path_ownership`
//! (`tasks/ownership.rs`), generalized from filesystem paths to database
//! rows.

use uuid::Uuid;

use crate::error::{NerveError, Result};
use crate::storage::models::{InboxRow, MessageRow, ThreadRow};
use crate::storage::Storage;

pub async fn ensure_inbox_belongs_to_org(storage: &Storage, org_id: Uuid, inbox_id: Uuid) -> Result<InboxRow> {
    storage
        .with_org_scope(org_id, move |tx| {
            Box::pin(async move { Storage::get_inbox_scoped(tx, org_id, inbox_id).await })
        })
        .await
        .map_err(NerveError::Internal)?
        .ok_or_else(|| NerveError::OwnershipMismatch(format!("inbox:{inbox_id}")))
}

pub async fn ensure_thread_belongs_to_org(storage: &Storage, org_id: Uuid, thread_id: Uuid) -> Result<ThreadRow> {
    storage
        .with_org_scope(org_id, move |tx| {
            Box::pin(async move { Storage::get_thread_scoped(tx, org_id, thread_id).await })
        })
        .await
        .map_err(NerveError::Internal)?
        .ok_or_else(|| NerveError::OwnershipMismatch(format!("thread:{thread_id}")))
}

pub async fn ensure_message_belongs_to_org(storage: &Storage, org_id: Uuid, message_id: Uuid) -> Result<MessageRow> {
    storage
        .with_org_scope(org_id, move |tx| {
            Box::pin(async move { Storage::get_message_scoped(tx, org_id, message_id).await })
        })
        .await
        .map_err(NerveError::Internal)?
        .ok_or_else(|| NerveError::OwnershipMismatch(format!("message:{message_id}")))
}

/// Lists a thread's messages inside an RLS-scoped transaction, so the
/// second line of defense (the database policy, not just this crate's
/// `WHERE org_id = ...` predicate) is actually exercised on a real read
/// path (spec §4.7: both layers apply, not just the app-layer one).
pub async fn list_messages_scoped(storage: &Storage, org_id: Uuid, thread_id: Uuid) -> Result<Vec<MessageRow>> {
    storage
        .with_org_scope(org_id, |tx| {
            Box::pin(async move {
                Ok(sqlx::query_as::<_, MessageRow>(
                    "SELECT * FROM messages WHERE org_id = $1 AND thread_id = $2 ORDER BY created_at",
                )
                .bind(org_id)
                .bind(thread_id)
                .fetch_all(&mut **tx)
                .await?)
            })
        })
        .await
        .map_err(NerveError::Internal)
}
