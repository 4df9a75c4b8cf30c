use crate::errors::ErrorContext;
use crate::interval::Interval;
use crate::permission::Right;
use soroban_sdk::{symbol_short, Address, Env, String};

/// Event published when the contract is initialized.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub admin: Address,
    pub timestamp: u64,
}

/// Event published when a nomenclature table (or phase of it) is written.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NomenclatureLoadedEvent {
    pub table: String,
    pub entries: u32,
    pub timestamp: u64,
}

/// Event published when a patient is registered or updates its key.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatientUpsertedEvent {
    pub patient: Address,
    pub created: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatientRemovedEvent {
    pub patient: Address,
    pub timestamp: u64,
}

/// Event published when a doctor is registered or updates its profile.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DoctorUpsertedEvent {
    pub doctor: Address,
    pub specialty_id: u32,
    pub created: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DoctorRemovedEvent {
    pub doctor: Address,
    pub timestamp: u64,
}

/// Event published when a grant is created or replaced.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionChangedEvent {
    pub patient: Address,
    pub doctor: Address,
    pub permission_id: u64,
    pub right: Right,
    pub interval: Interval,
    pub timestamp: u64,
}

/// Event published when a grant is revoked by the patient.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionRevokedEvent {
    pub patient: Address,
    pub doctor: Address,
    pub permission_id: u64,
    pub timestamp: u64,
}

/// Event published when an expiry task removes a grant.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionExpiredEvent {
    pub patient: Address,
    pub doctor: Address,
    pub permission_id: u64,
    pub expired_at: u64,
}

/// Event published when a record is appended or deleted.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordChangedEvent {
    pub patient: Address,
    pub author: Address,
    pub specialty_id: u32,
    pub hash: String,
    pub timestamp: u64,
}

pub fn publish_initialized(env: &Env, admin: Address) {
    let topics = (symbol_short!("INIT"),);
    let data = InitializedEvent {
        admin,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_nomenclature_loaded(env: &Env, table: &str, entries: u32) {
    let topics = (symbol_short!("NOM_LOAD"),);
    let data = NomenclatureLoadedEvent {
        table: String::from_str(env, table),
        entries,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

/// Publishes an event when a patient is registered or re-keyed.
/// `created` distinguishes first registration from a key update.
pub fn publish_patient_upserted(env: &Env, patient: Address, created: bool) {
    let topics = (symbol_short!("PAT_UPS"), patient.clone());
    let data = PatientUpsertedEvent {
        patient,
        created,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_patient_removed(env: &Env, patient: Address) {
    let topics = (symbol_short!("PAT_RM"), patient.clone());
    let data = PatientRemovedEvent {
        patient,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

/// Publishes an event when a doctor is registered or updates its profile.
pub fn publish_doctor_upserted(env: &Env, doctor: Address, specialty_id: u32, created: bool) {
    let topics = (symbol_short!("DOC_UPS"), doctor.clone());
    let data = DoctorUpsertedEvent {
        doctor,
        specialty_id,
        created,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_doctor_removed(env: &Env, doctor: Address) {
    let topics = (symbol_short!("DOC_RM"), doctor.clone());
    let data = DoctorRemovedEvent {
        doctor,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

/// Publishes an event when a patient grants a doctor a new permission.
/// This event includes both parties, the grant id, its right and interval.
pub fn publish_permission_granted(
    env: &Env,
    patient: Address,
    doctor: Address,
    permission_id: u64,
    right: Right,
    interval: Interval,
) {
    let topics = (symbol_short!("PERM_ADD"), patient.clone(), doctor.clone());
    let data = PermissionChangedEvent {
        patient,
        doctor,
        permission_id,
        right,
        interval,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_permission_updated(
    env: &Env,
    patient: Address,
    doctor: Address,
    permission_id: u64,
    right: Right,
    interval: Interval,
) {
    let topics = (symbol_short!("PERM_UPD"), patient.clone(), doctor.clone());
    let data = PermissionChangedEvent {
        patient,
        doctor,
        permission_id,
        right,
        interval,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_permission_revoked(env: &Env, patient: Address, doctor: Address, permission_id: u64) {
    let topics = (symbol_short!("PERM_REV"), patient.clone(), doctor.clone());
    let data = PermissionRevokedEvent {
        patient,
        doctor,
        permission_id,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_permission_expired(
    env: &Env,
    patient: Address,
    doctor: Address,
    permission_id: u64,
    expired_at: u64,
) {
    let topics = (symbol_short!("PERM_EXP"), patient.clone(), doctor.clone());
    let data = PermissionExpiredEvent {
        patient,
        doctor,
        permission_id,
        expired_at,
    };
    env.events().publish(topics, data);
}

/// Publishes an event when a record is appended to a patient's book.
pub fn publish_record_added(
    env: &Env,
    patient: Address,
    author: Address,
    specialty_id: u32,
    hash: String,
) {
    let topics = (symbol_short!("REC_ADD"), patient.clone(), author.clone());
    let data = RecordChangedEvent {
        patient,
        author,
        specialty_id,
        hash,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_record_removed(
    env: &Env,
    patient: Address,
    author: Address,
    specialty_id: u32,
    hash: String,
) {
    let topics = (symbol_short!("REC_RM"), patient.clone());
    let data = RecordChangedEvent {
        patient,
        author,
        specialty_id,
        hash,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

/// Publishes an error event for monitoring.
/// Topics carry the category and severity so indexers can filter on them.
pub fn publish_error(env: &Env, error_code: u32, context: ErrorContext) {
    let topics = (
        symbol_short!("ERROR"),
        context.category.clone(),
        context.severity.clone(),
    );
    let data = (
        error_code,
        context.category,
        context.severity,
        context.message,
        context.user,
        context.resource_id,
        context.retryable,
        context.timestamp,
    );
    env.events().publish(topics, data);
}
