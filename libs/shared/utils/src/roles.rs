use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

/// Role predicate attached to a router via `require_role`. Replaces the
/// scattered per-handler role string checks: every management surface
/// declares up front which roles may pass.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [UserRole],
}

impl RoleGate {
    pub const ADMIN_ONLY: RoleGate = RoleGate::new(&[UserRole::Admin]);

    pub const DOCTOR_OR_ADMIN: RoleGate = RoleGate::new(&[UserRole::Doctor, UserRole::Admin]);

    pub const CLINIC_STAFF: RoleGate =
        RoleGate::new(&[UserRole::Doctor, UserRole::Reception, UserRole::Admin]);

    pub const fn new(allowed: &'static [UserRole]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, role: Option<UserRole>) -> bool {
        match role {
            Some(role) => self.allowed.contains(&role),
            None => false,
        }
    }
}

/// Middleware enforcing a `RoleGate`. Must be layered inside
/// `auth_middleware` so the `User` extension is already present.
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

    if !gate.allows(user.role) {
        return Err(AppError::Forbidden(
            "Your account role does not permit this operation".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Convenience for handlers that still need an ownership decision on top
/// of the gate (a doctor managing only their own records).
pub fn is_admin(user: &User) -> bool {
    user.role == Some(UserRole::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gate_rejects_other_roles() {
        let gate = RoleGate::ADMIN_ONLY;
        assert!(gate.allows(Some(UserRole::Admin)));
        assert!(!gate.allows(Some(UserRole::Doctor)));
        assert!(!gate.allows(Some(UserRole::Reception)));
        assert!(!gate.allows(Some(UserRole::Patient)));
        assert!(!gate.allows(None));
    }

    #[test]
    fn doctor_or_admin_gate() {
        let gate = RoleGate::DOCTOR_OR_ADMIN;
        assert!(gate.allows(Some(UserRole::Doctor)));
        assert!(gate.allows(Some(UserRole::Admin)));
        assert!(!gate.allows(Some(UserRole::Reception)));
    }

    #[test]
    fn clinic_staff_gate_excludes_patients() {
        let gate = RoleGate::CLINIC_STAFF;
        assert!(gate.allows(Some(UserRole::Reception)));
        assert!(!gate.allows(Some(UserRole::Patient)));
    }
}
