use autohub_core::{PrincipalId, Role, SectorId, User};

use crate::claims::SessionClaims;

/// An authenticated caller for the duration of one request.
///
/// `user` is the row re-read from the store after the token was verified, and
/// is what every authorization decision consults. `session` is the decoded
/// token snapshot, kept only for identity and expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user: User,
    pub session: SessionClaims,
}

impl Principal {
    pub fn id(&self) -> PrincipalId {
        self.user.id
    }

    pub fn sector_id(&self) -> SectorId {
        self.user.sector_id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}
