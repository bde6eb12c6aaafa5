//! Role and agent permission grids, the authorization policy and the sidebar.

pub mod policy;
pub mod sidebar;
pub mod store;

pub use models::permission::Action;
pub use policy::authorize;

/// Module keys used by the policy checks and the navigation catalogue.
pub mod modules {
    pub const USERS: &str = "users";
    pub const CLINICS: &str = "clinics";
    pub const DOCTORS: &str = "doctors";
    pub const BLOGS: &str = "blogs";
    pub const JOBS: &str = "jobs";
    pub const LEADS: &str = "leads";
    pub const TREATMENTS: &str = "treatments";
    pub const PATIENTS: &str = "patients";
    pub const MEMBERSHIPS: &str = "memberships";
    pub const PETTY_CASH: &str = "petty_cash";
    pub const OFFERS: &str = "offers";
    pub const VENDORS: &str = "vendors";
    pub const PERMISSIONS: &str = "permissions";
}
