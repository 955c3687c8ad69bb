//! Maps the shapes the portal API answers with onto canonical options and
//! confirmation records. The API is inconsistent across endpoints: ids arrive as
//! `id`, `_id` or `<entity>Id`, names in snake_case or camelCase, and lists are
//! sometimes wrapped in an envelope object.

use serde_json::{json, Map, Value};
use tracing::debug;

use wizard_cell::error::BackendError;
use wizard_cell::models::{ConfirmationRecord, ResourceType, WizardOption};
use wizard_cell::validation::{parse_date, parse_slot_time};

type Record = Map<String, Value>;

const ENVELOPE_KEYS: [&str; 10] = [
    "data",
    "items",
    "results",
    "hospitals",
    "doctors",
    "patients",
    "dates",
    "slots",
    "appointments",
    "queue",
];

fn text(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn flag(record: &Record, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| record.get(*key)?.as_bool())
}

fn decode_error(resource: ResourceType, detail: &str) -> BackendError {
    BackendError::Decode(format!("{} response {}", resource, detail))
}

/// The list inside a response, whether it is the body itself or wrapped.
pub fn unwrap_list(resource: ResourceType, value: Value) -> Result<Vec<Value>, BackendError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| decode_error(resource, "has no list")),
        Value::Null => Ok(Vec::new()),
        _ => Err(decode_error(resource, "is not a list")),
    }
}

pub fn options_for(resource: ResourceType, value: Value) -> Result<Vec<WizardOption>, BackendError> {
    let items = unwrap_list(resource, value)?;
    let total = items.len();

    let options: Vec<WizardOption> = items
        .into_iter()
        .filter_map(|item| match resource {
            ResourceType::AvailableDates => date_option(item),
            ResourceType::AvailableSlots => slot_option(item),
            _ => match item {
                Value::Object(record) => record_option(resource, &record),
                _ => None,
            },
        })
        .collect();

    if options.len() < total {
        debug!(
            "Dropped {} of {} {} records (unavailable or unrecognised)",
            total - options.len(),
            total,
            resource
        );
    }

    Ok(options)
}

fn record_option(resource: ResourceType, record: &Record) -> Option<WizardOption> {
    match resource {
        ResourceType::Hospitals => hospital_option(record),
        ResourceType::Doctors => doctor_option(record),
        ResourceType::Patients => patient_option(record),
        ResourceType::TriageQueue => queue_option(record),
        ResourceType::Appointments | ResourceType::TriageRecords => {
            let id = text(record, &["id", "_id"])?;
            let label = text(record, &["name", "title"]).unwrap_or_else(|| id.clone());
            Some(WizardOption::new(id, label))
        }
        ResourceType::AvailableDates | ResourceType::AvailableSlots => None,
    }
}

fn hospital_option(record: &Record) -> Option<WizardOption> {
    let id = text(record, &["id", "_id", "hospitalId", "hospital_id"])?;
    let name = text(record, &["name", "hospitalName", "hospital_name"]).unwrap_or_else(|| id.clone());

    Some(WizardOption::new(id, name).with_metadata(json!({
        "city": text(record, &["city"]),
        "address": text(record, &["address"]),
    })))
}

fn doctor_option(record: &Record) -> Option<WizardOption> {
    let id = text(record, &["id", "_id", "doctorId", "doctor_id"])?;
    let name = text(record, &["full_name", "fullName", "name"]).unwrap_or_else(|| id.clone());

    Some(WizardOption::new(id, name).with_metadata(json!({
        "specialization": text(record, &["specialization", "specialty", "speciality"]),
        "hospitalId": text(record, &["hospital_id", "hospitalId"]),
    })))
}

fn patient_option(record: &Record) -> Option<WizardOption> {
    let id = text(record, &["id", "_id", "patientId", "patient_id"])?;
    let name = text(record, &["full_name", "fullName", "name"]).unwrap_or_else(|| id.clone());
    let uhid = text(record, &["uhid", "UHID"]);

    let label = match &uhid {
        Some(uhid) => format!("{} ({})", name, uhid),
        None => name,
    };

    Some(WizardOption::new(id, label).with_metadata(json!({ "uhid": uhid })))
}

fn queue_option(record: &Record) -> Option<WizardOption> {
    let id = text(record, &["appointment_id", "appointmentId", "_id", "id"])?;
    let patient = text(record, &["patient_name", "patientName"]).unwrap_or_else(|| id.clone());
    let scheduled = text(record, &["scheduled_time", "scheduledTime"]);

    let label = match &scheduled {
        Some(time) => format!("{} at {}", patient, time),
        None => patient,
    };

    Some(WizardOption::new(id, label).with_metadata(json!({
        "uhid": text(record, &["uhid", "UHID"]),
        "scheduledTime": scheduled,
    })))
}

fn date_option(item: Value) -> Option<WizardOption> {
    let (date, slots_available) = match item {
        Value::String(date) => (date, None),
        Value::Object(record) => (
            text(&record, &["date", "day"])?,
            record
                .get("slots_available")
                .or_else(|| record.get("slotsAvailable"))
                .and_then(Value::as_u64),
        ),
        _ => return None,
    };

    parse_date(&date)?;
    if slots_available == Some(0) {
        return None;
    }

    Some(WizardOption::new(date.clone(), date).with_metadata(json!({ "slotsAvailable": slots_available })))
}

fn slot_option(item: Value) -> Option<WizardOption> {
    let slot = match item {
        Value::String(slot) => slot,
        Value::Object(record) => {
            if flag(&record, &["is_available", "isAvailable", "available"]) == Some(false) {
                return None;
            }
            text(&record, &["time", "startTime", "start_time", "slot"])?
        }
        _ => return None,
    };

    parse_slot_time(&slot)?;
    Some(WizardOption::new(slot.clone(), slot))
}

/// snake_case and leading-underscore keys become camelCase.
pub fn camel_case(key: &str) -> String {
    let mut parts = key.trim_start_matches('_').split('_').filter(|part| !part.is_empty());
    let mut result = parts.next().unwrap_or_default().to_string();

    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }

    result
}

const CONFIRMATION_ID_KEYS: [&str; 6] = ["id", "_id", "appointmentId", "appointment_id", "triageId", "triage_id"];

const CONFIRMATION_ENVELOPE_KEYS: [&str; 4] = ["appointment", "triage", "record", "data"];

pub fn confirmation(resource: ResourceType, value: Value) -> Result<ConfirmationRecord, BackendError> {
    let Value::Object(mut object) = value else {
        return Err(decode_error(resource, "is not an object"));
    };

    let has_id = |record: &Record| CONFIRMATION_ID_KEYS.iter().any(|key| record.contains_key(*key));
    let record = if has_id(&object) {
        object
    } else {
        CONFIRMATION_ENVELOPE_KEYS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Object(inner)) if has_id(&inner) => Some(inner),
                _ => None,
            })
            .ok_or_else(|| decode_error(resource, "carries no record id"))?
    };

    let id = text(&record, &CONFIRMATION_ID_KEYS).ok_or_else(|| decode_error(resource, "carries no record id"))?;

    let summary_fields = record
        .into_iter()
        .filter(|(key, _)| !matches!(key.as_str(), "id" | "_id"))
        .map(|(key, value)| (camel_case(&key), value))
        .collect();

    Ok(ConfirmationRecord { id, summary_fields })
}
