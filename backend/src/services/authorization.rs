//! The authorization gate run first by every privileged operation.

use crate::{
    error::AppError,
    models::user::{Caller, Role},
};

/// What a caller must hold to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A user principal whose role claim equals this role exactly.
    Role(Role),
    /// As [`Requirement::Role`], and the scheduler principal is admitted too.
    RoleOrSystem(Role),
}

/// Admits or rejects `caller`. Has no side effects.
///
/// Matching is strict equality on the role claim; no role implies another.
pub fn authorize(
    caller: &Caller,
    requirement: &Requirement,
    denial_message: &str,
) -> Result<(), AppError> {
    let admitted = match (caller, requirement) {
        (Caller::System, Requirement::RoleOrSystem(_)) => true,
        (Caller::System, Requirement::Role(_)) => false,
        (Caller::Anonymous, _) => false,
        (Caller::User(principal), Requirement::Role(role))
        | (Caller::User(principal), Requirement::RoleOrSystem(role)) => {
            principal.role.as_ref() == Some(role)
        }
    };

    if admitted {
        Ok(())
    } else {
        tracing::warn!(
            caller = %caller.label(),
            requirement = ?requirement,
            "permission denied"
        );
        Err(AppError::PermissionDenied(denial_message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Principal;

    fn user(role: Option<Role>) -> Caller {
        Caller::User(Principal {
            uid: "uid-1".to_string(),
            email: Some("someone@example.com".to_string()),
            role,
        })
    }

    #[test]
    fn exact_role_is_admitted() {
        assert!(authorize(&user(Some(Role::Admin)), &Requirement::Role(Role::Admin), "no").is_ok());
        assert!(authorize(
            &user(Some(Role::BarangayOfficial)),
            &Requirement::Role(Role::BarangayOfficial),
            "no"
        )
        .is_ok());
    }

    #[test]
    fn other_roles_are_denied_with_the_given_message() {
        let err = authorize(
            &user(Some(Role::BarangayOfficial)),
            &Requirement::Role(Role::Admin),
            "Only admins can trigger backups",
        )
        .unwrap_err();
        assert_eq!(err.code(), "permission-denied");
        assert_eq!(err.to_string(), "Only admins can trigger backups");
    }

    #[test]
    fn admin_does_not_imply_other_roles() {
        assert!(authorize(
            &user(Some(Role::Admin)),
            &Requirement::Role(Role::BarangayOfficial),
            "no"
        )
        .is_err());
    }

    #[test]
    fn missing_role_and_anonymous_are_denied() {
        assert!(authorize(&user(None), &Requirement::Role(Role::Admin), "no").is_err());
        assert!(authorize(
            &user(Some(Role::Other("admin".to_string()))),
            &Requirement::Role(Role::Admin),
            "no"
        )
        .is_err());
        assert!(authorize(&Caller::Anonymous, &Requirement::RoleOrSystem(Role::Admin), "no").is_err());
    }

    #[test]
    fn system_principal_only_passes_requirements_that_admit_it() {
        assert!(authorize(&Caller::System, &Requirement::RoleOrSystem(Role::Admin), "no").is_ok());
        assert!(authorize(&Caller::System, &Requirement::Role(Role::Admin), "no").is_err());
    }
}
