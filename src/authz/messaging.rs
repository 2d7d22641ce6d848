//! Who may read and post in a conversation

use crate::config::MessagingConfig;
use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::connection::ConnectionStatus;
use crate::models::conversation::Conversation;

/// Messaging rules in effect for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagingPolicy {
    /// Admins must be a participant to read or post.
    ///
    /// Whether admins may act on conversations they are not part of is an
    /// unresolved product question; `true` keeps the strict reading.
    pub admin_requires_participancy: bool,
}

impl Default for MessagingPolicy {
    fn default() -> Self {
        Self {
            admin_requires_participancy: true,
        }
    }
}

impl From<MessagingConfig> for MessagingPolicy {
    fn from(config: MessagingConfig) -> Self {
        Self {
            admin_requires_participancy: config.admin_requires_participancy,
        }
    }
}

impl MessagingPolicy {
    fn admin_override(&self, auth: &AuthContext) -> bool {
        auth.role.bypasses_ownership() && !self.admin_requires_participancy
    }

    /// Reading a conversation's history
    pub fn authorize_read(
        &self,
        auth: &AuthContext,
        conversation: &Conversation,
    ) -> Result<(), AppError> {
        if conversation.is_participant(auth.user_id) || self.admin_override(auth) {
            return Ok(());
        }

        Err(AppError::Authorization(
            "You are not a participant in this conversation".to_string(),
        ))
    }

    /// Posting into a conversation.
    ///
    /// `connection_status` is the status of the connection between the sender
    /// and the other participant, if one exists.
    pub fn authorize_send(
        &self,
        auth: &AuthContext,
        conversation: &Conversation,
        connection_status: Option<ConnectionStatus>,
    ) -> Result<(), AppError> {
        if !conversation.is_participant(auth.user_id) {
            if self.admin_override(auth) {
                return Ok(());
            }
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        if auth.role.bypasses_ownership() {
            return Ok(());
        }

        if connection_status != Some(ConnectionStatus::Accepted) {
            return Err(AppError::Authorization(
                "You can only message users you are connected with".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "member@example.com".to_string(),
            role,
        }
    }

    fn conversation_with(a: &AuthContext) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            participant_one_id: a.user_id,
            participant_two_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const STRICT: MessagingPolicy = MessagingPolicy {
        admin_requires_participancy: true,
    };
    const LENIENT: MessagingPolicy = MessagingPolicy {
        admin_requires_participancy: false,
    };

    #[test]
    fn test_participant_with_accepted_connection_may_send() {
        let sender = ctx(UserRole::User);
        let conversation = conversation_with(&sender);
        assert!(STRICT
            .authorize_send(&sender, &conversation, Some(ConnectionStatus::Accepted))
            .is_ok());
    }

    #[test]
    fn test_participant_without_accepted_connection_is_denied() {
        let sender = ctx(UserRole::Hr);
        let conversation = conversation_with(&sender);

        for status in [None, Some(ConnectionStatus::Pending), Some(ConnectionStatus::Rejected)] {
            assert!(STRICT.authorize_send(&sender, &conversation, status).is_err());
        }
    }

    #[test]
    fn test_admin_participant_skips_connection_requirement() {
        let admin = ctx(UserRole::Admin);
        let conversation = conversation_with(&admin);
        assert!(STRICT.authorize_send(&admin, &conversation, None).is_ok());
    }

    #[test]
    fn test_non_participant_is_denied_even_with_connection() {
        let outsider = ctx(UserRole::User);
        let conversation = conversation_with(&ctx(UserRole::User));
        assert!(STRICT
            .authorize_send(&outsider, &conversation, Some(ConnectionStatus::Accepted))
            .is_err());
        assert!(STRICT.authorize_read(&outsider, &conversation).is_err());
    }

    #[test]
    fn test_admin_participancy_follows_policy() {
        let admin = ctx(UserRole::Admin);
        let conversation = conversation_with(&ctx(UserRole::User));

        assert!(STRICT.authorize_send(&admin, &conversation, None).is_err());
        assert!(STRICT.authorize_read(&admin, &conversation).is_err());

        assert!(LENIENT.authorize_send(&admin, &conversation, None).is_ok());
        assert!(LENIENT.authorize_read(&admin, &conversation).is_ok());

        // Moderators never get the override.
        let moderator = ctx(UserRole::Moderator);
        assert!(LENIENT.authorize_send(&moderator, &conversation, None).is_err());
    }
}
