//! The resolved caller identity (spec §3: Principal).

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalKind {
    /// A signed service token minted via `src/credentials` (spec §4.4).
    ServiceToken { token_id: Uuid },
    /// An opaque `nrv_live_*` cloud API key (spec §4.4).
    ApiKey { key_id: Uuid },
    /// The break-glass bootstrap admin key (spec §4.1). Carries `*` scope
    /// and is not associated with any single org.
    Bootstrap,
}

#[derive(Debug, Clone)]
pub struct Principal {
    pub kind: PrincipalKind,
    /// `None` only for `Bootstrap`, which acts before an org is chosen
    /// (e.g. creating the first org).
    pub org_id: Option<Uuid>,
    pub actor: String,
    pub scopes: Vec<String>,
}

impl Principal {
    pub fn is_bootstrap(&self) -> bool {
        matches!(self.kind, PrincipalKind::Bootstrap)
    }

    pub fn has_scope(&self, required: &str) -> bool {
        super::scope::scope_satisfies(&self.scopes, required)
    }

    /// Returns the org this principal is scoped to, or
    /// [`crate::error::NerveError::Unauthorized`] if it has none (bootstrap
    /// calls that omit an explicit org).
    pub fn require_org(&self) -> crate::error::Result<Uuid> {
        self.org_id.ok_or(crate::error::NerveError::Unauthorized)
    }
}
