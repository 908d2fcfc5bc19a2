use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::error::ApiError;
use crate::model::role::Role;

/// The caller, as established by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| ErrorUnauthorized("Not authenticated")))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_supervisor_or_admin(&self) -> Result<(), ApiError> {
        if self.role.can_supervise() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Supervisor/Admin only".into()))
        }
    }

    /// Resolve whose data a request targets: agents only ever see their own.
    pub fn subject(&self, requested: Option<u64>) -> Result<u64, ApiError> {
        match requested {
            None => Ok(self.user_id),
            Some(id) if id == self.user_id => Ok(id),
            Some(id) => {
                self.require_supervisor_or_admin()?;
                Ok(id)
            }
        }
    }
}
