#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects
)]

use super::*;
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{vec, Env};

const NOW: u64 = 1_000_000;
const CARDIOLOGY: u32 = 3;
const NEUROLOGY: u32 = 29;

fn setup() -> (Env, MedicalRecordsContractClient<'static>, Address) {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(NOW);

    let contract_id = env.register(MedicalRecordsContract, ());
    let client = MedicalRecordsContractClient::new(&env, &contract_id);

    let admin = Address::generate(&env);
    client.initialize(&admin);
    client.load_rights();
    client.begin_load_specialties();
    client.finish_load_specialties();

    (env, client, admin)
}

fn register_patient(env: &Env, client: &MedicalRecordsContractClient) -> Address {
    let patient = Address::generate(env);
    client.upsert_patient(&patient, &String::from_str(env, "patient-pk"));
    patient
}

fn register_doctor(env: &Env, client: &MedicalRecordsContractClient, specialty: u32) -> Address {
    let doctor = Address::generate(env);
    client.upsert_doctor(&doctor, &specialty, &String::from_str(env, "doctor-pk"));
    doctor
}

fn record_key(env: &Env) -> Option<String> {
    Some(String::from_str(env, "enc-record-key"))
}

#[test]
fn test_initialize() {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register(MedicalRecordsContract, ());
    let client = MedicalRecordsContractClient::new(&env, &contract_id);

    assert!(!client.is_initialized());
    assert_eq!(client.try_get_admin(), Err(Ok(ContractError::NotInitialized)));

    let admin = Address::generate(&env);
    client.initialize(&admin);

    assert!(client.is_initialized());
    assert_eq!(client.get_admin(), admin);
    assert_eq!(
        client.try_initialize(&admin),
        Err(Ok(ContractError::AlreadyInitialized))
    );
}

#[test]
fn test_nomenclature_loads_once() {
    let (env, client, _) = setup();

    assert_eq!(
        client.get_right_name(&2),
        Some(String::from_str(&env, "CONSULT & ADD"))
    );
    assert_eq!(
        client.get_specialty_name(&NEUROLOGY),
        Some(String::from_str(&env, "NEUROLOGY"))
    );
    assert_eq!(client.get_specialty_name(&51), None);

    assert_eq!(
        client.try_load_rights(),
        Err(Ok(ContractError::NomenclatureAlreadyLoaded))
    );
    assert_eq!(
        client.try_begin_load_specialties(),
        Err(Ok(ContractError::NomenclatureAlreadyLoaded))
    );
    assert_eq!(
        client.try_finish_load_specialties(),
        Err(Ok(ContractError::NomenclatureAlreadyLoaded))
    );
}

#[test]
fn test_doctor_registration_validates_specialty() {
    let (env, client, _) = setup();
    let doctor = Address::generate(&env);
    let pk = String::from_str(&env, "pk");

    assert_eq!(
        client.try_upsert_doctor(&doctor, &99, &pk),
        Err(Ok(ContractError::InvalidSpecialty))
    );

    client.upsert_doctor(&doctor, &CARDIOLOGY, &pk);
    client.upsert_doctor(&doctor, &NEUROLOGY, &String::from_str(&env, "pk2"));

    let stored = client.get_doctor(&doctor);
    assert_eq!(stored.specialty_id, NEUROLOGY);
    assert_eq!(stored.public_key, String::from_str(&env, "pk2"));
}

#[test]
fn test_patient_upsert_only_replaces_key() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Read as u32),
        &Interval::INFINITE,
        &None,
    );

    client.upsert_patient(&patient, &String::from_str(&env, "rotated"));

    let stored = client.get_patient(&patient);
    assert_eq!(stored.public_key, String::from_str(&env, "rotated"));
    assert_eq!(stored.perms.get(doctor).unwrap().len(), 1);
}

// ── Scenario A ──────────────────────────────────────────────

#[test]
fn test_infinite_read_grant_satisfies_limited_request() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Read as u32),
        &Interval::INFINITE,
        &None,
    );

    let satisfied = client.check_read_access(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &Interval::new(NOW - 5_000, NOW + 5_000),
    );
    assert_eq!(satisfied, vec![&env, CARDIOLOGY]);
}

// ── Scenario B ──────────────────────────────────────────────

#[test]
fn test_overlapping_write_grant_is_rejected() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let first = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW + 10, NOW + 400),
        &record_key(&env),
    );
    assert_eq!(first, 0);

    let second = client.try_grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW + 200, NOW + 600),
        &None,
    );
    assert_eq!(second, Err(Ok(ContractError::OverlappedPermissions)));

    assert_eq!(client.get_doctor_permissions(&patient, &doctor).len(), 1);
}

// ── Scenario C ──────────────────────────────────────────────

#[test]
fn test_limited_write_grant_expires_at_deadline() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let id = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 300),
        &record_key(&env),
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), Some(NOW + 300));
    assert!(client.get_granted_key(&doctor, &patient).is_some());

    env.ledger().set_timestamp(NOW + 299);
    assert_eq!(
        client.try_expire_permission(&patient, &id),
        Err(Ok(ContractError::ExpiryNotDue))
    );

    env.ledger().set_timestamp(NOW + 300);
    assert!(client.expire_permission(&patient, &id));

    assert_eq!(
        client.try_get_permission(&patient, &id),
        Err(Ok(ContractError::PermissionNotFound))
    );
    assert!(client.get_patient(&patient).perms.get(doctor.clone()).is_none());
    assert!(!client.get_granted_key(&doctor, &patient).is_some());
    assert_eq!(client.get_scheduled_expiry(&patient, &id), None);

    // A second firing finds nothing to do.
    assert!(!client.expire_permission(&patient, &id));
}

#[test]
fn test_process_expirations_sweeps_due_grants() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let cardiologist = register_doctor(&env, &client, CARDIOLOGY);
    let neurologist = register_doctor(&env, &client, NEUROLOGY);

    client.grant_permission(
        &patient,
        &cardiologist,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 300),
        &record_key(&env),
    );
    client.grant_permission(
        &patient,
        &neurologist,
        &vec![&env, NEUROLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 900),
        &record_key(&env),
    );

    env.ledger().set_timestamp(NOW + 600);
    assert_eq!(client.process_expirations(&patient, &10), 1);
    assert_eq!(client.get_doctor_permissions(&patient, &cardiologist).len(), 0);
    assert_eq!(client.get_doctor_permissions(&patient, &neurologist).len(), 1);

    env.ledger().set_timestamp(NOW + 900);
    assert_eq!(client.process_expirations(&patient, &10), 1);
    assert_eq!(client.process_expirations(&patient, &10), 0);
}

// ── Scenario D ──────────────────────────────────────────────

#[test]
fn test_write_requires_matching_specialty() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::ReadWrite as u32),
        &Interval::INFINITE,
        &record_key(&env),
    );
    client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, NEUROLOGY],
        &(Right::Read as u32),
        &Interval::INFINITE,
        &None,
    );

    let result = client.try_write_record(
        &patient,
        &doctor,
        &NEUROLOGY,
        &String::from_str(&env, "QmNeuro"),
        &String::from_str(&env, "scan"),
    );
    assert_eq!(result, Err(Ok(ContractError::SpecialtyMismatch)));
    assert!(!client.check_write_access(&patient, &doctor, &NEUROLOGY));
    assert!(client.check_write_access(&patient, &doctor, &CARDIOLOGY));
}

#[test]
fn test_write_grant_for_foreign_specialty_is_rejected() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let result = client.try_grant_permission(
        &patient,
        &doctor,
        &vec![&env, NEUROLOGY],
        &(Right::Write as u32),
        &Interval::INFINITE,
        &record_key(&env),
    );
    assert_eq!(result, Err(Ok(ContractError::SpecialtyMismatch)));
}

// ── Scenario E ──────────────────────────────────────────────

#[test]
fn test_update_to_read_cancels_expiry() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let id = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW + 100, NOW + 700),
        &record_key(&env),
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), Some(NOW + 700));

    client.update_permission(
        &patient,
        &doctor,
        &id,
        &vec![&env, CARDIOLOGY],
        &(Right::Read as u32),
        &Interval::new(NOW + 100, NOW + 700),
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), None);

    env.ledger().set_timestamp(NOW + 1_000);
    assert!(!client.expire_permission(&patient, &id));
    assert_eq!(client.process_expirations(&patient, &10), 0);

    let stored = client.get_permission(&patient, &id);
    assert_eq!(stored.right, Right::Read);
    assert_eq!(stored.id, id);
}

#[test]
fn test_update_between_limited_writes_reschedules() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let id = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 400),
        &record_key(&env),
    );

    client.update_permission(
        &patient,
        &doctor,
        &id,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW + 100, NOW + 900),
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), Some(NOW + 900));

    env.ledger().set_timestamp(NOW + 400);
    assert_eq!(
        client.try_expire_permission(&patient, &id),
        Err(Ok(ContractError::ExpiryNotDue))
    );
    assert_eq!(client.process_expirations(&patient, &10), 0);
}

#[test]
fn test_update_from_read_to_limited_write_schedules() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let id = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Read as u32),
        &Interval::INFINITE,
        &None,
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), None);

    client.update_permission(
        &patient,
        &doctor,
        &id,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 500),
    );
    assert_eq!(client.get_scheduled_expiry(&patient, &id), Some(NOW + 500));
}

#[test]
fn test_revoke_last_grant_forgets_record_key() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let write = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::INFINITE,
        &record_key(&env),
    );
    let read = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Read as u32),
        &Interval::INFINITE,
        &None,
    );
    assert_eq!(read, write + 1);

    client.revoke_permission(&patient, &doctor, &write);
    assert!(client.get_granted_key(&doctor, &patient).is_some());

    client.revoke_permission(&patient, &doctor, &read);
    assert!(!client.get_granted_key(&doctor, &patient).is_some());
    assert_eq!(
        client.try_revoke_permission(&patient, &doctor, &read),
        Err(Ok(ContractError::NoPermissionsFromPatient))
    );
}

#[test]
fn test_admin_writes_without_grant() {
    let (env, client, admin) = setup();
    let patient = register_patient(&env, &client);

    client.write_record(
        &patient,
        &admin,
        &NEUROLOGY,
        &String::from_str(&env, "QmAdmin"),
        &String::from_str(&env, "intake"),
    );

    let rendered = client.read_records(
        &patient,
        &patient,
        &vec![&env, NEUROLOGY],
        &Interval::new(NOW, NOW + 1),
    );
    let json = render::to_std_string(&rendered);
    assert!(json.contains("\"29\""));
    assert!(json.contains("QmAdmin"));
}

#[test]
fn test_remove_patient_cancels_pending_expiry() {
    let (env, client, _) = setup();
    let patient = register_patient(&env, &client);
    let doctor = register_doctor(&env, &client, CARDIOLOGY);

    let id = client.grant_permission(
        &patient,
        &doctor,
        &vec![&env, CARDIOLOGY],
        &(Right::Write as u32),
        &Interval::new(NOW, NOW + 600),
        &record_key(&env),
    );

    client.remove_patient(&patient);

    assert_eq!(client.get_scheduled_expiry(&patient, &id), None);
    assert_eq!(
        client.try_get_patient(&patient),
        Err(Ok(ContractError::PatientNotRegistered))
    );
    assert_eq!(
        client.try_get_permission(&patient, &id),
        Err(Ok(ContractError::PermissionNotFound))
    );
    assert!(!client.get_granted_key(&doctor, &patient).is_some());
    assert_eq!(
        client.try_list_all_records(&patient),
        Err(Ok(ContractError::PatientNotRegistered))
    );
}

#[test]
fn test_clear_error_log_requires_admin() {
    let (env, client, admin) = setup();
    let intruder = Address::generate(&env);

    assert_eq!(
        client.try_clear_error_log(&intruder),
        Err(Ok(ContractError::Unauthorized))
    );
    client.clear_error_log(&admin);
    assert_eq!(client.get_error_count(), 0);
}

#[test]
fn test_log_error_keeps_most_recent_entries() {
    let (env, client, admin) = setup();

    env.as_contract(&client.address, || {
        for _ in 0..(errors::MAX_ERROR_LOG_SIZE + 5) {
            log_error(&env, ContractError::ReadNotAuthorized, Some(admin.clone()), None);
        }
    });

    assert_eq!(client.get_error_log().len(), errors::MAX_ERROR_LOG_SIZE);
    assert_eq!(
        client.get_error_count(),
        u64::from(errors::MAX_ERROR_LOG_SIZE + 5)
    );

    let entry = client.get_error_log().get(0).unwrap();
    assert_eq!(entry.error_code, ContractError::ReadNotAuthorized as u32);
    assert_eq!(entry.context.category, ErrorCategory::Authorization);
    assert_eq!(entry.context.severity, ErrorSeverity::Medium);
}
