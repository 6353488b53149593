use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{Caller, Role},
    services::authorization::{authorize, Requirement},
    utils::identity::IdentityProvider,
};

const EMAIL_REQUIRED: &str = "Email is required";

/// Which role a [`RoleAssigner`] hands out and who may ask for it.
#[derive(Debug, Clone)]
pub struct RoleGrant {
    pub target_role: Role,
    pub required_caller_role: Role,
    /// Article and title used in the confirmation, e.g. "an Admin".
    pub title: &'static str,
    pub denial_message: &'static str,
}

impl RoleGrant {
    pub fn admin() -> Self {
        Self {
            target_role: Role::Admin,
            required_caller_role: Role::Admin,
            title: "an Admin",
            denial_message: "Only admins can assign admin role",
        }
    }

    pub fn barangay_official() -> Self {
        Self {
            target_role: Role::BarangayOfficial,
            required_caller_role: Role::Admin,
            title: "a Barangay Official",
            denial_message: "Only admins can assign barangay official role",
        }
    }
}

#[derive(Debug, Validate)]
struct RoleAssignmentInput {
    #[validate(required, length(min = 1))]
    email: Option<String>,
}

/// Sets the role claim of the identity registered under an email address.
pub struct RoleAssigner {
    identity: Arc<dyn IdentityProvider>,
    grant: RoleGrant,
}

impl RoleAssigner {
    pub fn new(identity: Arc<dyn IdentityProvider>, grant: RoleGrant) -> Self {
        Self { identity, grant }
    }

    /// Replaces the target's role claim and returns a confirmation message.
    ///
    /// Steps run strictly in order: authorize, validate, look up, mutate.
    /// No audit entry is written for role changes.
    pub async fn assign(&self, caller: &Caller, email: Option<&str>) -> Result<String, AppError> {
        authorize(
            caller,
            &Requirement::Role(self.grant.required_caller_role.clone()),
            self.grant.denial_message,
        )?;

        let input = RoleAssignmentInput {
            email: email.map(str::to_owned),
        };
        input
            .validate()
            .map_err(|_| AppError::InvalidArgument(EMAIL_REQUIRED.to_string()))?;
        let email = input
            .email
            .as_deref()
            .ok_or_else(|| AppError::InvalidArgument(EMAIL_REQUIRED.to_string()))?;

        let user = self
            .identity
            .get_user_by_email(email)
            .await
            .map_err(AppError::unknown)?;

        self.identity
            .set_role(&user.uid, &self.grant.target_role)
            .await
            .map_err(AppError::unknown)?;

        tracing::info!(
            caller = %caller.label(),
            target_uid = %user.uid,
            role = %self.grant.target_role,
            "role claim assigned"
        );

        Ok(format!("Success! {} is now {}.", email, self.grant.title))
    }
}
