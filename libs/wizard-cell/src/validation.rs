use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::error::WizardError;
use crate::models::{FieldKey, FieldValue};

static BLOOD_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{2,3})\s*/\s*(\d{2,3})\s*$").expect("valid regex"));

pub const PAYMENT_METHODS: [&str; 4] = ["cash", "card", "upi", "insurance"];

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Accepts the slot labels the availability endpoints hand out: `10:00 AM`, `10:00`, `10:00:00`.
pub fn parse_slot_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    ["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

fn invalid(field: FieldKey, reason: impl Into<String>) -> WizardError {
    WizardError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn number_in_range(field: FieldKey, value: &FieldValue, min: f64, max: f64, unit: &str) -> Result<(), WizardError> {
    let number = value
        .as_number()
        .ok_or_else(|| invalid(field, "must be a number"))?;

    if !(min..=max).contains(&number) {
        return Err(invalid(field, format!("must be between {} and {} {}", min, max, unit)));
    }

    Ok(())
}

/// Client-side form rules, checked before a value is merged into the selections.
pub fn validate_field(field: FieldKey, value: &FieldValue) -> Result<(), WizardError> {
    if value.as_text().trim().is_empty() {
        return Err(invalid(field, "must not be blank"));
    }

    match field {
        FieldKey::Date => {
            parse_date(&value.as_text()).ok_or_else(|| invalid(field, "expected a date as YYYY-MM-DD"))?;
        }
        FieldKey::Slot => {
            parse_slot_time(&value.as_text()).ok_or_else(|| invalid(field, "expected a time such as 10:00 AM"))?;
        }
        FieldKey::BloodPressure => {
            let text = value.as_text();
            let captures = BLOOD_PRESSURE
                .captures(&text)
                .ok_or_else(|| invalid(field, "expected systolic/diastolic, e.g. 120/80"))?;
            let systolic: u32 = captures[1].parse().map_err(|_| invalid(field, "systolic is not a number"))?;
            let diastolic: u32 = captures[2].parse().map_err(|_| invalid(field, "diastolic is not a number"))?;
            if systolic <= diastolic {
                return Err(invalid(field, "systolic must be higher than diastolic"));
            }
        }
        FieldKey::Pulse => number_in_range(field, value, 20.0, 250.0, "bpm")?,
        FieldKey::Temperature => number_in_range(field, value, 30.0, 45.0, "°C")?,
        FieldKey::Weight => number_in_range(field, value, 0.5, 500.0, "kg")?,
        FieldKey::OxygenSaturation => number_in_range(field, value, 50.0, 100.0, "%")?,
        FieldKey::PaymentAmount => {
            let amount = value
                .as_number()
                .ok_or_else(|| invalid(field, "must be a number"))?;
            if amount < 0.0 || !amount.is_finite() {
                return Err(invalid(field, "must not be negative"));
            }
        }
        FieldKey::PaymentMethod => {
            let method = value.as_text().trim().to_ascii_lowercase();
            if !PAYMENT_METHODS.contains(&method.as_str()) {
                return Err(invalid(field, format!("must be one of {}", PAYMENT_METHODS.join(", "))));
            }
        }
        _ => {}
    }

    Ok(())
}
