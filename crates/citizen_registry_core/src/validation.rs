//! crates/citizen_registry_core/src/validation.rs
//!
//! Field-level rules shared by every `CitizenStore` implementation.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::Citizen;
use crate::ports::{PortError, PortResult};

pub const MIN_AGE: i32 = 1;
pub const MAX_AGE: i32 = 120;

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{12}$").expect("national id pattern is valid"))
}

/// True when `value` is exactly twelve ASCII digits.
pub fn is_valid_national_id(value: &str) -> bool {
    // `\d` is Unicode-aware in the regex crate; the ASCII check keeps it to 0-9.
    value.is_ascii() && national_id_pattern().is_match(value)
}

/// Guards the national-ID lookups before any storage access.
pub fn require_national_id(value: &str) -> PortResult<()> {
    if is_valid_national_id(value) {
        Ok(())
    } else {
        Err(PortError::InvalidInput(
            "Valid 12-digit national ID number is required".to_string(),
        ))
    }
}

/// Trims every text field in place and checks all rules.
///
/// All violations are reported together, separated by `; `.
pub fn normalize(citizen: &mut Citizen) -> PortResult<()> {
    let mut problems = Vec::new();

    let text_fields: [(&str, &mut String); 7] = [
        ("name", &mut citizen.name),
        ("phoneNumber", &mut citizen.phone_number),
        ("fatherName", &mut citizen.father_name),
        ("address", &mut citizen.address),
        ("nationalIdNumber", &mut citizen.national_id_number),
        ("purpose", &mut citizen.purpose),
        ("state", &mut citizen.state),
    ];
    for (field, value) in text_fields {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
        if value.is_empty() {
            problems.push(format!("{field} is required"));
        }
    }

    if !(MIN_AGE..=MAX_AGE).contains(&citizen.age) {
        problems.push(format!("age must be between {MIN_AGE} and {MAX_AGE}"));
    }

    if !citizen.national_id_number.is_empty()
        && !is_valid_national_id(&citizen.national_id_number)
    {
        problems.push("National ID number must be 12 digits".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Citizen, NewCitizen};
    use chrono::Utc;

    fn new_citizen() -> NewCitizen {
        NewCitizen {
            name: "Asha".to_string(),
            phone_number: "9999999999".to_string(),
            father_name: "Ram".to_string(),
            age: 30,
            address: "X".to_string(),
            national_id_number: "123456789012".to_string(),
            purpose: "visit".to_string(),
            state: "UP".to_string(),
            photo: None,
        }
    }

    fn validation_message(new: NewCitizen) -> String {
        match Citizen::register(new, Utc::now()) {
            Err(PortError::Validation(msg)) => msg,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_twelve_digits_only() {
        assert!(is_valid_national_id("123456789012"));
        assert!(!is_valid_national_id("12345678901"));
        assert!(!is_valid_national_id("1234567890123"));
        assert!(!is_valid_national_id("12345678901a"));
        assert!(!is_valid_national_id("abc"));
        assert!(!is_valid_national_id(""));
        // Arabic-Indic digits are not ASCII.
        assert!(!is_valid_national_id("١٢٣٤٥٦٧٨٩٠١٢"));
    }

    #[test]
    fn require_national_id_reports_invalid_input() {
        assert!(require_national_id("123456789012").is_ok());
        assert!(matches!(
            require_national_id("abc"),
            Err(PortError::InvalidInput(_))
        ));
    }

    #[test]
    fn age_bounds_are_inclusive() {
        for age in [MIN_AGE, MAX_AGE] {
            let mut new = new_citizen();
            new.age = age;
            assert!(Citizen::register(new, Utc::now()).is_ok());
        }
        for age in [0, 121, -5] {
            let mut new = new_citizen();
            new.age = age;
            assert!(validation_message(new).contains("age must be between 1 and 120"));
        }
    }

    #[test]
    fn blank_text_fields_are_rejected() {
        let mut new = new_citizen();
        new.father_name = "   ".to_string();
        new.state = String::new();
        let msg = validation_message(new);
        assert!(msg.contains("fatherName is required"));
        assert!(msg.contains("state is required"));
    }

    #[test]
    fn malformed_national_id_is_rejected() {
        for id in ["12345678901", "1234567890123", "12345678901x"] {
            let mut new = new_citizen();
            new.national_id_number = id.to_string();
            assert!(validation_message(new).contains("National ID number must be 12 digits"));
        }
    }
}
