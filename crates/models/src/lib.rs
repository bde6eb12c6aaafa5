pub mod errors;
pub mod db;
pub mod validate;
pub mod types;
pub mod user;
pub mod user_credentials;
pub mod clinic;
pub mod doctor_profile;
pub mod blog;
pub mod job_posting;
pub mod lead;
pub mod treatment;
pub mod patient_registration;
pub mod membership;
pub mod petty_cash;
pub mod permission;
pub mod clinic_permission;
pub mod agent_permission;
pub mod offer;
pub mod vendor;
pub mod get_in_touch;

#[cfg(test)]
mod tests;
