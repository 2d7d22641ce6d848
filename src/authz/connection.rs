//! Connection request state machine
//!
//! PENDING → ACCEPTED | REJECTED, receiver only. Both outcomes are terminal.

use serde::Deserialize;

use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::connection::{Connection, ConnectionStatus};

/// Receiver's answer to a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDecision {
    Accept,
    Reject,
}

impl ConnectionDecision {
    pub fn target_status(self) -> ConnectionStatus {
        match self {
            ConnectionDecision::Accept => ConnectionStatus::Accepted,
            ConnectionDecision::Reject => ConnectionStatus::Rejected,
        }
    }
}

/// Validate a response to `connection` and return the status to store.
///
/// The state check runs before the identity check: a settled request fails
/// the same way for everyone.
pub fn respond(
    auth: &AuthContext,
    connection: &Connection,
    decision: ConnectionDecision,
) -> Result<ConnectionStatus, AppError> {
    if connection.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "Request already {}",
            connection.status
        )));
    }

    if connection.receiver_id != auth.user_id {
        return Err(AppError::Authorization(
            "Only the receiver can respond to this connection request".to_string(),
        ));
    }

    Ok(decision.target_status())
}

/// Check that `auth` may open a request towards `receiver_id`
pub fn validate_request(
    auth: &AuthContext,
    receiver_id: uuid::Uuid,
    existing: Option<&Connection>,
) -> Result<(), AppError> {
    if receiver_id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot connect with yourself".to_string(),
        ));
    }

    if let Some(existing) = existing {
        return Err(AppError::Conflict(format!(
            "A connection with this user is already {}",
            existing.status
        )));
    }

    Ok(())
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

    fn connection(receiver: &AuthContext, status: ConnectionStatus) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            receiver_id: receiver.user_id,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_receiver_accepts_pending() {
        let receiver = ctx(UserRole::User);
        let conn = connection(&receiver, ConnectionStatus::Pending);
        assert_eq!(
            respond(&receiver, &conn, ConnectionDecision::Accept).unwrap(),
            ConnectionStatus::Accepted
        );
        assert_eq!(
            respond(&receiver, &conn, ConnectionDecision::Reject).unwrap(),
            ConnectionStatus::Rejected
        );
    }

    #[test]
    fn test_requester_cannot_respond() {
        let receiver = ctx(UserRole::User);
        let conn = connection(&receiver, ConnectionStatus::Pending);
        let requester = AuthContext {
            user_id: conn.requester_id,
            ..ctx(UserRole::User)
        };

        let err = respond(&requester, &conn, ConnectionDecision::Accept).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_admin_cannot_respond_for_receiver() {
        let receiver = ctx(UserRole::User);
        let conn = connection(&receiver, ConnectionStatus::Pending);
        assert!(respond(&ctx(UserRole::Admin), &conn, ConnectionDecision::Accept).is_err());
    }

    #[test]
    fn test_rejected_request_fails_for_every_caller() {
        let receiver = ctx(UserRole::User);
        let conn = connection(&receiver, ConnectionStatus::Rejected);
        let callers = [
            receiver.clone(),
            AuthContext {
                user_id: conn.requester_id,
                ..ctx(UserRole::User)
            },
            ctx(UserRole::Admin),
            ctx(UserRole::Hr),
        ];

        for caller in &callers {
            for decision in [ConnectionDecision::Accept, ConnectionDecision::Reject] {
                match respond(caller, &conn, decision) {
                    Err(AppError::InvalidState(message)) => {
                        assert_eq!(message, "Request already rejected")
                    }
                    other => panic!("expected invalid state, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_accepted_request_is_terminal() {
        let receiver = ctx(UserRole::User);
        let conn = connection(&receiver, ConnectionStatus::Accepted);
        let err = respond(&receiver, &conn, ConnectionDecision::Reject).unwrap_err();
        assert_eq!(err.to_string(), "Request already accepted");
    }

    #[test]
    fn test_decision_wire_format() {
        let decision: ConnectionDecision = serde_json::from_str("\"accept\"").unwrap();
        assert_eq!(decision, ConnectionDecision::Accept);
        assert!(serde_json::from_str::<ConnectionDecision>("\"ignore\"").is_err());
    }

    #[test]
    fn test_request_validation() {
        let auth = ctx(UserRole::User);
        assert!(matches!(
            validate_request(&auth, auth.user_id, None),
            Err(AppError::BadRequest(_))
        ));

        let existing = connection(&auth, ConnectionStatus::Pending);
        assert!(matches!(
            validate_request(&auth, existing.requester_id, Some(&existing)),
            Err(AppError::Conflict(_))
        ));

        assert!(validate_request(&auth, Uuid::new_v4(), None).is_ok());
    }
}
