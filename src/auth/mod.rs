//! Principal resolution and scope enforcement (spec §4.1).

pub mod principal;
pub mod resolver;
pub mod scope;

pub use principal::{Principal, PrincipalKind};
pub use resolver::resolve_principal;
