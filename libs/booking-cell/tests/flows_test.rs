use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::services::{DoctorBookingFlow, PatientBookingFlow, RestPortalBackend, TriageFlow};
use session_cell::StaticSession;
use shared_utils::test_utils::{MockPortalResponses, TestConfig, TestUser};
use wizard_cell::error::{WizardError, GENERIC_SUBMISSION_FAILURE};
use wizard_cell::models::{FieldKey, FieldValue, StepId, SubmissionStatus};
use wizard_cell::services::{FetchOutcome, WizardFlow, WizardSession};

const TOKEN: &str = "session-token";

fn session_for(flow: Arc<dyn WizardFlow>, server: &MockServer, user: TestUser) -> WizardSession {
    let config = TestConfig::with_backend(server.uri()).to_app_config();
    let provider = Arc::new(StaticSession::new(user.to_user(), TOKEN));
    let backend = Arc::new(RestPortalBackend::new(&config, provider));
    WizardSession::new(flow, backend)
}

async fn mount_booking_lookups(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/hospitals"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::hospitals_response()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/doctors"))
        .and(query_param("hospitalId", "hosp-city"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::doctors_response("hosp-city")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/availability/dates"))
        .and(query_param("doctorId", "doc-smith"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::dates_response()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/availability/slots"))
        .and(query_param("doctorId", "doc-smith"))
        .and(query_param("date", "2024-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::slots_response()))
        .mount(server)
        .await;
}

/// Walks hospital, doctor, date and slot selection through the real lookups.
async fn choose_city_hospital_slot(session: &WizardSession) {
    assert_eq!(session.advance().await, Ok(StepId::SelectPrimary));
    assert_eq!(
        session.refresh_step_options().await,
        vec![(FieldKey::HospitalId, FetchOutcome::Applied { count: 2 })]
    );
    session.select_option(FieldKey::HospitalId, "hosp-city").await.expect("hospital");

    assert_eq!(session.advance().await, Ok(StepId::SelectSecondary));
    session.refresh_step_options().await;
    session.select_option(FieldKey::DoctorId, "doc-smith").await.expect("doctor");

    assert_eq!(session.advance().await, Ok(StepId::SelectDateTime));
    session.refresh_step_options().await;
    session.select_option(FieldKey::Date, "2024-06-10").await.expect("date");
    assert_eq!(
        session.load_options(FieldKey::Slot).await,
        Ok(FetchOutcome::Applied { count: 2 })
    );
    session.select_option(FieldKey::Slot, "10:00 AM").await.expect("slot");

    assert_eq!(session.advance().await, Ok(StepId::Confirm));
}

#[tokio::test]
async fn test_patient_books_city_hospital_with_dr_smith() {
    let server = MockServer::start().await;
    mount_booking_lookups(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_json(json!({
            "doctorId": "doc-smith",
            "hospitalId": "hosp-city",
            "scheduledTime": "2024-06-10T10:00:00",
            "appointmentType": "Consultation"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(MockPortalResponses::appointment_confirmation(
            "doc-smith",
            "hosp-city",
            "2024-06-10T10:00:00",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let flow = Arc::new(PatientBookingFlow::new().expect("flow"));
    let session = session_for(flow, &server, TestUser::patient("asha@example.com"));

    choose_city_hospital_slot(&session).await;
    assert!(session.view().await.can_submit);

    let record = session.submit().await.expect("booking confirmed");
    assert_eq!(record.id, "appt-123");
    assert_eq!(record.summary_fields["doctorId"], "doc-smith");
    assert_eq!(record.summary_fields["hospitalId"], "hosp-city");
    assert_eq!(record.summary_fields["scheduledTime"], "2024-06-10T10:00:00");
    assert_eq!(record.summary_fields["appointmentType"], "Consultation");

    let view = session.view().await;
    assert_eq!(view.current_step, StepId::Success);
    assert!(!view.can_submit);
    assert_matches!(view.submission, SubmissionStatus::Succeeded { confirmation } if confirmation == record);
}

#[tokio::test]
async fn test_doctor_booking_includes_patient_and_type() {
    let server = MockServer::start().await;
    mount_booking_lookups(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::patients_response()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_json(json!({
            "patientId": "pat-2",
            "doctorId": "doc-smith",
            "hospitalId": "hosp-city",
            "scheduledTime": "2024-06-10T10:00:00",
            "appointmentType": "Follow-up"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "appt-900", "status": "scheduled" })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = Arc::new(DoctorBookingFlow::new().expect("flow"));
    let session = session_for(flow, &server, TestUser::doctor("smith@example.com"));

    session.refresh_step_options().await;
    let patients = session.option_set(FieldKey::PatientId).await.expect("patients");
    assert_eq!(patients.options[1].display_label, "Ravi Kumar (UH-1002)");
    session.select_option(FieldKey::PatientId, "pat-2").await.expect("patient");

    choose_city_hospital_slot(&session).await;
    assert_eq!(
        session.missing_fields().await,
        vec![FieldKey::AppointmentType]
    );
    assert!(!session.view().await.can_submit);

    session
        .set_field(FieldKey::AppointmentType, FieldValue::text("Follow-up"))
        .await
        .expect("type");
    let record = session.submit().await.expect("booking confirmed");

    assert_eq!(record.id, "appt-900");
    assert_eq!(session.current_step().await, StepId::Success);
}

#[tokio::test]
async fn test_rejected_booking_surfaces_server_message() {
    let server = MockServer::start().await;
    mount_booking_lookups(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(MockPortalResponses::error_response("Slot no longer available", "SLOT_TAKEN")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let flow = Arc::new(PatientBookingFlow::new().expect("flow"));
    let session = session_for(flow, &server, TestUser::patient("asha@example.com"));
    choose_city_hospital_slot(&session).await;

    assert_eq!(
        session.submit().await,
        Err(WizardError::Submission("Slot no longer available".to_string()))
    );
    assert_eq!(session.current_step().await, StepId::Confirm);

    assert_eq!(
        session.submit().await,
        Err(WizardError::Submission(GENERIC_SUBMISSION_FAILURE.to_string()))
    );
    assert!(session.view().await.can_submit);
}

#[tokio::test]
async fn test_doctor_lookup_failure_leaves_hospitals_intact() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hospitals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::hospitals_response()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/doctors"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({ "message": "Doctor directory is under maintenance" })),
        )
        .mount(&server)
        .await;

    let flow = Arc::new(PatientBookingFlow::new().expect("flow"));
    let session = session_for(flow, &server, TestUser::patient("asha@example.com"));

    session.load_options(FieldKey::HospitalId).await.expect("hospitals");
    session.select_option(FieldKey::HospitalId, "hosp-city").await.expect("hospital");

    assert_eq!(session.load_options(FieldKey::DoctorId).await, Ok(FetchOutcome::Failed));

    let view = session.view().await;
    let doctors = view
        .option_sets
        .iter()
        .find(|set| set.key == FieldKey::DoctorId)
        .expect("doctor set");
    assert_eq!(
        doctors.error.as_ref().map(|e| e.message.as_str()),
        Some("Doctor directory is under maintenance")
    );

    let hospitals = view
        .option_sets
        .iter()
        .find(|set| set.key == FieldKey::HospitalId)
        .expect("hospital set");
    assert!(hospitals.error.is_none());
    assert_eq!(hospitals.options.len(), 2);
}

#[tokio::test]
async fn test_coordinator_triage_reaches_ready_for_doctor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hospitals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::hospitals_response()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/appointments/queue"))
        .and(query_param("hospitalId", "hosp-city"))
        .and(query_param("status", "scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::triage_queue_response()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/triage"))
        .and(body_json(json!({
            "appointmentId": "appt-77",
            "hospitalId": "hosp-city",
            "vitals": {
                "bloodPressure": "120/80",
                "pulse": 72.0,
                "temperature": 36.8,
                "oxygenSaturation": 98.0
            },
            "payment": { "amount": 500.0, "method": "upi" },
            "status": "ready_for_doctor"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "triage": { "_id": "tri-5", "appointment_id": "appt-77", "status": "ready_for_doctor" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = Arc::new(TriageFlow::new().expect("flow"));
    let session = session_for(flow, &server, TestUser::coordinator("desk@example.com"));

    session.refresh_step_options().await;
    session.select_option(FieldKey::HospitalId, "hosp-city").await.expect("hospital");
    assert_eq!(session.advance().await, Ok(StepId::SelectPrimary));

    session.refresh_step_options().await;
    session.select_option(FieldKey::AppointmentId, "appt-77").await.expect("appointment");
    assert_eq!(session.advance().await, Ok(StepId::VitalsTab));

    assert_matches!(
        session.advance().await,
        Err(WizardError::Validation { step: StepId::VitalsTab, .. })
    );
    assert_matches!(
        session.set_field(FieldKey::BloodPressure, FieldValue::text("80/120")).await,
        Err(WizardError::InvalidValue { field: FieldKey::BloodPressure, .. })
    );
    session.set_field(FieldKey::BloodPressure, FieldValue::text("120/80")).await.expect("bp");
    session.set_field(FieldKey::Pulse, FieldValue::Number(72.0)).await.expect("pulse");
    session.set_field(FieldKey::Temperature, FieldValue::Number(36.8)).await.expect("temperature");
    session.set_field(FieldKey::OxygenSaturation, FieldValue::Number(98.0)).await.expect("spo2");
    assert_eq!(session.advance().await, Ok(StepId::PaymentTab));

    // Payment and vitals tabs can be switched without losing input.
    assert_eq!(session.retreat().await, Ok(StepId::VitalsTab));
    assert_eq!(session.advance().await, Ok(StepId::PaymentTab));

    session.set_field(FieldKey::PaymentAmount, FieldValue::Number(500.0)).await.expect("amount");
    session.set_field(FieldKey::PaymentMethod, FieldValue::text("upi")).await.expect("method");
    assert_eq!(session.advance().await, Err(WizardError::NoNextStep(StepId::PaymentTab)));

    let record = session.submit().await.expect("triage recorded");
    assert_eq!(record.id, "tri-5");
    assert_eq!(record.summary_fields["appointmentId"], "appt-77");
    assert_eq!(session.current_step().await, StepId::ReadyForDoctor);
}
