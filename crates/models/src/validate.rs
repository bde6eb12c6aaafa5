//! Field validators shared by the entity constructors and save hooks.

use sea_orm::{ActiveValue, Value};

use crate::errors::ModelError;

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ModelError::validation("invalid email"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ModelError::validation("invalid email"));
    }
    if email.len() > 255 || email.chars().any(char::is_whitespace) {
        return Err(ModelError::validation("invalid email"));
    }
    Ok(())
}

/// Non-blank and at most `max` characters.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), ModelError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ModelError::Validation(format!("{field} required")));
    }
    if v.chars().count() > max {
        return Err(ModelError::Validation(format!("{field} too long (<= {max})")));
    }
    Ok(())
}

/// Digits with an optional leading `+`, spaces and dashes allowed; 7 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), ModelError> {
    let p = phone.trim();
    let body = p.strip_prefix('+').unwrap_or(p);
    if body.chars().any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-')) {
        return Err(ModelError::validation("invalid phone number"));
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    if !(7..=15).contains(&digits) {
        return Err(ModelError::validation("invalid phone number"));
    }
    Ok(())
}

pub fn validate_amount(field: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::Validation(format!("{field} must be a non-negative amount")));
    }
    Ok(())
}

pub fn validate_positive(field: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ModelError::Validation(format!("{field} must be greater than zero")));
    }
    Ok(())
}

/// Round to cents so that derived balances compare exactly.
pub fn round_money(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Value carried by an active-model field, whether freshly set or loaded.
pub fn current<V>(v: &ActiveValue<V>) -> Option<V>
where
    V: Into<Value> + Clone,
{
    match v {
        ActiveValue::Set(x) | ActiveValue::Unchanged(x) => Some(x.clone()),
        ActiveValue::NotSet => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@nodot").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn phone_validation() {
        assert!(validate_phone("+971 50 123 4567").is_ok());
        assert!(validate_phone("050-1234567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("phone").is_err());
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Smile Dental -- Clinic! "), "smile-dental-clinic");
        assert_eq!(slugify("Laser & Skin Care 2"), "laser-skin-care-2");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(round_money(0.1 + 0.2), 0.3);
        assert_eq!(round_money(10.005 * 2.0), 20.01);
    }

    #[test]
    fn required_fields() {
        assert!(validate_required("name", "  ", 10).is_err());
        assert!(validate_required("name", "abcdefghijk", 10).is_err());
        assert!(validate_required("name", "abc", 10).is_ok());
    }
}
