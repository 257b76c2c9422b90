//! Admin allow-list checks for diagnostic commands.

use tracing::info;

/// Decides who may run diagnostic commands.
///
/// Matching is exact on the account name; there are no wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminGate {
    admins: Vec<String>,
}

impl AdminGate {
    /// Creates a gate over the given allow-list.
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true iff `sender` is on the allow-list.
    pub fn is_authorized(&self, sender: &str) -> bool {
        self.admins.iter().any(|admin| admin == sender)
    }

    /// Checks `sender` for `action`, logging refusals for audit.
    pub fn check(&self, sender: &str, action: &str) -> bool {
        let allowed = self.is_authorized(sender);
        if !allowed {
            info!(
                sender = %sender,
                bot_admins = ?self.admins,
                "ignoring {} from @{}",
                action,
                sender
            );
        }
        allowed
    }

    /// The configured allow-list, in order.
    pub fn admins(&self) -> &[String] {
        &self.admins
    }
}
