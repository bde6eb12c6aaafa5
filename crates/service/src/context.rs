//! The authenticated caller as seen by the service layer.

use uuid::Uuid;

use models::user::Role;

use crate::errors::ServiceError;

#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub clinic_id: Option<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Clinic owner of exactly `clinic_id`.
    pub fn owns_clinic(&self, clinic_id: Uuid) -> bool {
        self.role == Role::Clinic && self.clinic_id == Some(clinic_id)
    }

    /// Clinic a write operates on: admins name it, everyone else uses their own.
    pub fn clinic_scope(&self, requested: Option<Uuid>) -> Result<Uuid, ServiceError> {
        if self.is_admin() {
            return requested.ok_or_else(|| ServiceError::validation("clinic_id required"));
        }
        let own = self.clinic_id.ok_or_else(|| ServiceError::forbidden("no clinic linked to this account"))?;
        match requested {
            Some(other) if other != own => Err(ServiceError::forbidden("clinic outside caller scope")),
            _ => Ok(own),
        }
    }

    /// Clinic filter for listings; `None` lets admins see every clinic.
    pub fn list_scope(&self, requested: Option<Uuid>) -> Result<Option<Uuid>, ServiceError> {
        if self.is_admin() {
            return Ok(requested);
        }
        self.clinic_scope(requested).map(Some)
    }

    /// Rejects access to a record belonging to another clinic.
    pub fn ensure_clinic(&self, clinic_id: Uuid) -> Result<(), ServiceError> {
        if self.is_admin() || self.clinic_id == Some(clinic_id) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("record belongs to another clinic"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() { Ok(()) } else { Err(ServiceError::forbidden("admin only")) }
    }
}
