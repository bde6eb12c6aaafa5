//! Service layer providing the marketplace's business operations on top of models.
//! - Every operation takes the authenticated `Actor` and checks the permission policy.
//! - Reuses validation, derived totals and entity definitions from the `models` crate.
//! - Outbound calls (geocoding, media, notifications) go through `integrations`.

pub mod errors;
pub mod context;
pub mod listing;
pub mod runtime;
pub mod auth;
pub mod permissions;
pub mod integrations;

pub mod user_service;
pub mod clinic_service;
pub mod doctor_service;
pub mod blog_service;
pub mod job_service;
pub mod lead_service;
pub mod treatment_service;
pub mod patient_service;
pub mod membership_service;
pub mod petty_cash_service;
pub mod offer_service;
pub mod vendor_service;
pub mod contact_service;

#[cfg(test)]
pub mod test_support;

pub use context::Actor;
pub use errors::ServiceError;
