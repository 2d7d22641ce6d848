//! Central action → rule table for role and ownership checks

use uuid::Uuid;

use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::UserRole;

/// Identity fields on the target resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    pub owner_id: Option<Uuid>,
    pub hr_id: Option<Uuid>,
}

/// Protected operations on owned resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateCompany,
    PostJob,
    ViewApplicants,
    UpdateApplicationStatus,
}

/// One way of satisfying an action's rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    /// ADMIN or SUPER_ADMIN
    Admin,
    /// `owner_id` matches the caller
    Owner,
    /// `hr_id` matches the caller and the caller holds the HR role
    HrManager,
}

impl Action {
    fn grants(self) -> &'static [Grant] {
        match self {
            Action::UpdateCompany => &[Grant::Admin, Grant::Owner],
            Action::PostJob => &[Grant::Admin, Grant::Owner, Grant::HrManager],
            Action::ViewApplicants => &[Grant::Admin, Grant::HrManager],
            Action::UpdateApplicationStatus => &[Grant::Admin, Grant::Owner, Grant::HrManager],
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Action::UpdateCompany => "Only the company owner can modify this company",
            Action::PostJob => "Only the company owner or its HR manager can post jobs",
            Action::ViewApplicants => "Only the company's HR manager can view applicants",
            Action::UpdateApplicationStatus => {
                "Only the company owner or its HR manager can update this application"
            }
        }
    }
}

impl Grant {
    fn matches(self, auth: &AuthContext, ownership: &Ownership) -> bool {
        match self {
            Grant::Admin => auth.role.bypasses_ownership(),
            Grant::Owner => ownership.owner_id == Some(auth.user_id),
            Grant::HrManager => {
                auth.role == UserRole::Hr && ownership.hr_id == Some(auth.user_id)
            }
        }
    }
}

/// Whether `auth` may perform `action` on a resource with `ownership`
pub fn is_permitted(auth: &AuthContext, action: Action, ownership: &Ownership) -> bool {
    action
        .grants()
        .iter()
        .any(|grant| grant.matches(auth, ownership))
}

/// Check `action` against the rule table, producing a 403 on failure
pub fn authorize(auth: &AuthContext, action: Action, ownership: &Ownership) -> Result<(), AppError> {
    if is_permitted(auth, action, ownership) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %auth.user_id,
        role = %auth.role,
        action = ?action,
        "Ownership check failed"
    );
    Err(AppError::Authorization(action.denial().to_string()))
}

/// Require one of `roles`
pub fn require_roles(auth: &AuthContext, roles: &[UserRole]) -> Result<(), AppError> {
    if auth.has_any_role(roles) {
        return Ok(());
    }

    Err(AppError::Authorization(format!(
        "Role {} is not permitted to perform this action",
        auth.role
    )))
}

/// Roles that may change other users' roles
const ROLE_MANAGERS: &[UserRole] = &[UserRole::Admin, UserRole::SuperAdmin];

/// Check a role change requested by `auth` for `target_user_id`.
///
/// Admins may not drop themselves out of the role managers.
pub fn authorize_role_change(
    auth: &AuthContext,
    target_user_id: Uuid,
    new_role: UserRole,
) -> Result<(), AppError> {
    require_roles(auth, ROLE_MANAGERS)?;

    if auth.role == UserRole::Admin && new_role == UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Only a super admin can grant the SUPER_ADMIN role".to_string(),
        ));
    }

    if target_user_id == auth.user_id && !ROLE_MANAGERS.contains(&new_role) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    Ok(())
}

/// Check that `auth` may modify an account currently holding `target_role`
pub fn authorize_account_management(auth: &AuthContext, target_role: UserRole) -> Result<(), AppError> {
    if target_role == UserRole::SuperAdmin && auth.role != UserRole::SuperAdmin {
        return Err(AppError::Authorization(
            "Only a super admin can modify a super admin account".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    fn owned_by(owner: &AuthContext) -> Ownership {
        Ownership {
            owner_id: Some(owner.user_id),
            hr_id: None,
        }
    }

    fn managed_by(hr: &AuthContext) -> Ownership {
        Ownership {
            owner_id: Some(Uuid::new_v4()),
            hr_id: Some(hr.user_id),
        }
    }

    #[test]
    fn test_company_mutation_owner_or_admin() {
        let owner = ctx(UserRole::Hr);
        let ownership = owned_by(&owner);

        assert!(authorize(&owner, Action::UpdateCompany, &ownership).is_ok());
        assert!(authorize(&ctx(UserRole::Admin), Action::UpdateCompany, &ownership).is_ok());

        let hr = ctx(UserRole::Hr);
        let managed = Ownership {
            hr_id: Some(hr.user_id),
            ..ownership
        };
        assert!(authorize(&hr, Action::UpdateCompany, &managed).is_err());
        assert!(authorize(&ctx(UserRole::Moderator), Action::UpdateCompany, &ownership).is_err());
    }

    #[test]
    fn test_applicant_visibility_requires_hr_role() {
        let hr = ctx(UserRole::Hr);
        let ownership = managed_by(&hr);
        assert!(authorize(&hr, Action::ViewApplicants, &ownership).is_ok());

        // Same identity without the HR role is not enough.
        let demoted = AuthContext {
            role: UserRole::User,
            ..hr.clone()
        };
        assert!(authorize(&demoted, Action::ViewApplicants, &ownership).is_err());

        assert!(authorize(&ctx(UserRole::SuperAdmin), Action::ViewApplicants, &ownership).is_ok());
    }

    #[test]
    fn test_owner_cannot_view_applicants_without_managing() {
        let owner = ctx(UserRole::Hr);
        assert!(authorize(&owner, Action::ViewApplicants, &owned_by(&owner)).is_err());
    }

    #[test]
    fn test_application_status_any_identity_grants() {
        let owner = ctx(UserRole::User);
        let hr = ctx(UserRole::Hr);
        let ownership = Ownership {
            owner_id: Some(owner.user_id),
            hr_id: Some(hr.user_id),
        };

        assert!(authorize(&owner, Action::UpdateApplicationStatus, &ownership).is_ok());
        assert!(authorize(&hr, Action::UpdateApplicationStatus, &ownership).is_ok());
        assert!(authorize(&ctx(UserRole::Admin), Action::UpdateApplicationStatus, &ownership).is_ok());
    }

    #[test]
    fn test_application_status_denied_for_outsider() {
        let ownership = Ownership {
            owner_id: Some(Uuid::new_v4()),
            hr_id: Some(Uuid::new_v4()),
        };

        for role in [UserRole::User, UserRole::Hr, UserRole::Moderator] {
            let err = authorize(&ctx(role), Action::UpdateApplicationStatus, &ownership).unwrap_err();
            assert!(matches!(err, AppError::Authorization(_)));
        }
    }

    #[test]
    fn test_missing_identity_fields_never_match() {
        let auth = ctx(UserRole::Hr);
        assert!(!is_permitted(&auth, Action::PostJob, &Ownership::default()));
    }

    #[test]
    fn test_self_demotion_is_rejected() {
        let admin = ctx(UserRole::Admin);

        let err = authorize_role_change(&admin, admin.user_id, UserRole::Hr).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(authorize_role_change(&admin, Uuid::new_v4(), UserRole::Hr).is_ok());
    }

    #[test]
    fn test_self_change_to_moderator_is_rejected() {
        for role in [UserRole::Admin, UserRole::SuperAdmin] {
            let auth = ctx(role);
            let err = authorize_role_change(&auth, auth.user_id, UserRole::Moderator).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        let admin = ctx(UserRole::Admin);
        assert!(authorize_role_change(&admin, Uuid::new_v4(), UserRole::Moderator).is_ok());
    }

    #[test]
    fn test_self_change_between_admin_variants_is_allowed() {
        let super_admin = ctx(UserRole::SuperAdmin);
        assert!(authorize_role_change(&super_admin, super_admin.user_id, UserRole::Admin).is_ok());
    }

    #[test]
    fn test_role_changes_need_a_role_manager() {
        assert!(authorize_role_change(&ctx(UserRole::Moderator), Uuid::new_v4(), UserRole::Hr).is_err());
        assert!(authorize_role_change(&ctx(UserRole::Hr), Uuid::new_v4(), UserRole::User).is_err());
        assert!(authorize_role_change(&ctx(UserRole::Admin), Uuid::new_v4(), UserRole::SuperAdmin).is_err());
        assert!(authorize_role_change(&ctx(UserRole::SuperAdmin), Uuid::new_v4(), UserRole::SuperAdmin).is_ok());
    }

    #[test]
    fn test_super_admin_accounts_are_guarded() {
        assert!(authorize_account_management(&ctx(UserRole::Admin), UserRole::SuperAdmin).is_err());
        assert!(authorize_account_management(&ctx(UserRole::Admin), UserRole::Admin).is_ok());
        assert!(authorize_account_management(&ctx(UserRole::SuperAdmin), UserRole::SuperAdmin).is_ok());
    }
}
