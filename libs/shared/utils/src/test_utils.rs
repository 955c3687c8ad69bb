use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub portal_api_url: String,
    pub portal_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            portal_api_url: "http://localhost:8080".to_string(),
            portal_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock backend, e.g. a `wiremock::MockServer` uri.
    pub fn with_backend(url: impl Into<String>) -> Self {
        Self {
            portal_api_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            portal_api_url: self.portal_api_url.clone(),
            portal_api_key: self.portal_api_key.clone(),
            portal_jwt_secret: self.jwt_secret.clone(),
            request_timeout_secs: 5,
            bind_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub full_name: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", "patient")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            full_name: "Test User".to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn coordinator(email: &str) -> Self {
        Self::new(email, "coordinator")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            full_name: Some(self.full_name.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "full_name": user.full_name,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned portal backend bodies. Shapes deliberately mix snake_case and camelCase
/// because the real API does.
pub struct MockPortalResponses;

impl MockPortalResponses {
    pub fn hospitals_response() -> serde_json::Value {
        json!([
            { "id": "hosp-city", "name": "City Hospital", "city": "Pune" },
            { "_id": "hosp-lake", "hospitalName": "Lakeside Clinic", "address": "12 Lake Road" }
        ])
    }

    pub fn doctors_response(hospital_id: &str) -> serde_json::Value {
        json!({
            "data": [
                {
                    "id": "doc-smith",
                    "full_name": "Dr. Smith",
                    "specialization": "Cardiology",
                    "hospital_id": hospital_id
                },
                {
                    "doctorId": "doc-rao",
                    "fullName": "Dr. Rao",
                    "specialty": "General Medicine",
                    "hospitalId": hospital_id
                }
            ]
        })
    }

    pub fn dates_response() -> serde_json::Value {
        json!(["2024-06-10", { "date": "2024-06-11", "slots_available": 4 }])
    }

    pub fn slots_response() -> serde_json::Value {
        json!([
            "09:30 AM",
            { "time": "10:00 AM", "is_available": true },
            { "startTime": "10:30 AM", "isAvailable": false }
        ])
    }

    pub fn patients_response() -> serde_json::Value {
        json!([
            { "id": "pat-1", "full_name": "Asha Verma", "uhid": "UH-1001" },
            { "patientId": "pat-2", "fullName": "Ravi Kumar", "UHID": "UH-1002" }
        ])
    }

    pub fn triage_queue_response() -> serde_json::Value {
        json!([
            {
                "appointment_id": "appt-77",
                "patient_name": "Asha Verma",
                "scheduled_time": "2024-06-10T10:00:00",
                "uhid": "UH-1001"
            }
        ])
    }

    pub fn appointment_confirmation(doctor_id: &str, hospital_id: &str, scheduled_time: &str) -> serde_json::Value {
        json!({
            "appointment": {
                "_id": "appt-123",
                "doctor_id": doctor_id,
                "hospitalId": hospital_id,
                "scheduled_time": scheduled_time,
                "appointment_type": "Consultation",
                "status": "scheduled"
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
