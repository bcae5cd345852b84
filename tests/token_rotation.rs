//! Spec §4.4 / §8: rotating a service token revokes every other still-live
//! token for the org, and each issuance leaves a hashed audit entry.

mod support;

use nerve::credentials::service_token;
use sqlx::PgPool;

const SIGNING_KEY: &str = "test-signing-key";

#[sqlx::test(migrations = "src/storage/migrations")]
async fn rotate_revokes_all_prior_org_tokens(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    let org = storage.create_org("acme").await?;
    let scopes = vec!["nerve:email.read".to_string()];

    let first = service_token::issue(&storage, SIGNING_KEY, org.id, "worker-1", &scopes, 3600, false).await?;
    let second_no_rotate =
        service_token::issue(&storage, SIGNING_KEY, org.id, "worker-2", &scopes, 3600, false).await?;

    // Without rotate, both tokens stay live.
    assert!(storage.get_service_token(first.token_id).await?.unwrap().revoked_at.is_none());
    assert!(storage.get_service_token(second_no_rotate.token_id).await?.unwrap().revoked_at.is_none());

    let third_rotated = service_token::issue(&storage, SIGNING_KEY, org.id, "worker-3", &scopes, 3600, true).await?;

    let first_row = storage.get_service_token(first.token_id).await?.unwrap();
    let second_row = storage.get_service_token(second_no_rotate.token_id).await?.unwrap();
    let third_row = storage.get_service_token(third_rotated.token_id).await?.unwrap();

    assert!(first_row.revoked_at.is_some(), "rotate must revoke prior org tokens");
    assert!(second_row.revoked_at.is_some(), "rotate revokes org-wide, not just the matching actor");
    assert!(third_row.revoked_at.is_none(), "the freshly issued token must stay live");

    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn rotate_leaves_tokens_from_other_orgs_untouched(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    let org_a = storage.create_org("org-a").await?;
    let org_b = storage.create_org("org-b").await?;
    let scopes = vec!["nerve:email.read".to_string()];

    let other_org_token = service_token::issue(&storage, SIGNING_KEY, org_b.id, "worker", &scopes, 3600, false).await?;
    service_token::issue(&storage, SIGNING_KEY, org_a.id, "worker", &scopes, 3600, true).await?;

    let other_org_row = storage.get_service_token(other_org_token.token_id).await?.unwrap();
    assert!(other_org_row.revoked_at.is_none(), "rotation must not cross org boundaries");

    Ok(())
}

#[sqlx::test(migrations = "src/storage/migrations")]
async fn ttl_requests_above_the_ceiling_are_clamped_to_one_hour(pool: PgPool) -> anyhow::Result<()> {
    let storage = support::storage_from(pool);
    let org = storage.create_org("acme").await?;
    let scopes = vec!["nerve:email.read".to_string()];

    let issued = service_token::issue(&storage, SIGNING_KEY, org.id, "worker", &scopes, 999_999, false).await?;
    let ttl = (issued.expires_at - chrono::Utc::now()).num_seconds();
    assert!(ttl <= service_token::MAX_TTL_SECS && ttl > service_token::MAX_TTL_SECS - 5);

    Ok(())
}
