use tracing::{info, warn};

use super::{Permission, SessionUser};

/// Where a refused admin view sends the user.
pub const PUBLIC_ENTRY_POINT: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Locked,
    Unlocked(SessionUser),
    /// Terminal: the view must stop rendering and go to the public entry point.
    Redirect,
}

/// Admin-panel guard. It is evaluated once when a view loads; admin actions
/// within the same view are not re-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminGate {
    state: GateState,
}

impl Default for AdminGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Locked,
        }
    }

    /// Runs the check on view entry. Only a locked gate transitions; later
    /// calls return the settled state unchanged.
    pub fn enter(&mut self, session: Option<SessionUser>) -> &GateState {
        if self.state != GateState::Locked {
            return &self.state;
        }

        self.state = match session {
            Some(user) if user.has_permission(Permission::OpenAdminPanel) => {
                info!(user_id = user.id, "Admin view unlocked");
                GateState::Unlocked(user)
            }
            Some(user) => {
                warn!(user_id = user.id, "Admin view refused for non-admin session");
                GateState::Redirect
            }
            None => {
                warn!("Admin view refused without a session");
                GateState::Redirect
            }
        };

        &self.state
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::{AdminGate, GateState};
    use crate::auth::SessionUser;

    fn user(name: &str, is_admin: bool) -> SessionUser {
        SessionUser {
            id: 7,
            name: name.to_string(),
            email: None,
            is_admin,
            username: None,
        }
    }

    #[test]
    fn test_admin_session_unlocks() {
        let mut gate = AdminGate::new();
        assert_eq!(gate.state(), &GateState::Locked);

        gate.enter(Some(user("gm", true)));
        assert!(matches!(gate.state(), GateState::Unlocked(_)));
    }

    #[test]
    fn test_missing_or_plain_session_redirects() {
        let mut gate = AdminGate::new();
        assert_eq!(gate.enter(None), &GateState::Redirect);

        let mut gate = AdminGate::new();
        assert_eq!(gate.enter(Some(user("bob", false))), &GateState::Redirect);
    }

    #[test]
    fn test_outcome_is_settled_after_first_check() {
        let mut gate = AdminGate::new();
        gate.enter(None);

        assert_eq!(gate.enter(Some(user("admin", true))), &GateState::Redirect);
    }
}
