//! Grants a patient issues to a doctor, and their lifecycle.
//!
//! A grant is the triple (right, specialty set, interval). Two grants held by
//! the same doctor from the same patient may never conflict, where conflict
//! means the rights overlap, the specialty sets share an id and the intervals
//! overlap, all at once.
//!
//! Limited-interval `Write` grants self-destruct: a deferred task keyed by the
//! grant id is kept in [`common::scheduler`] for as long as the grant has that
//! shape. The task is never tracked by a flag; the grant's (right, interval)
//! pair is the only source of truth for whether one is outstanding.

use common::scheduler::{self, TaskHandle};
use soroban_sdk::{contracttype, symbol_short, Address, Env, String, Symbol, Vec};

use crate::directory::{self, Patient};
use crate::events;
use crate::interval::Interval;
use crate::nomenclature::Nomenclature;
use crate::validation;
use crate::ContractError;

const TTL_THRESHOLD: u32 = 5184000;
const TTL_EXTEND_TO: u32 = 10368000;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Right {
    Read = 0,
    Write = 1,
    ReadWrite = 2,
}

impl Right {
    pub fn from_id(id: u32) -> Result<Self, ContractError> {
        match id {
            0 => Ok(Right::Read),
            1 => Ok(Right::Write),
            2 => Ok(Right::ReadWrite),
            _ => Err(ContractError::InvalidRight),
        }
    }

    /// Equal rights conflict; `ReadWrite` conflicts with everything.
    pub fn conflicts_with(&self, other: &Right) -> bool {
        self == other || *self == Right::ReadWrite || *other == Right::ReadWrite
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Right::Write | Right::ReadWrite)
    }

    pub fn can_read(&self) -> bool {
        matches!(self, Right::Read | Right::ReadWrite)
    }
}

/// A grant held by `doctor`, stored under the issuing patient.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Permission {
    pub id: u64,
    pub doctor: Address,
    pub specialties: Vec<u32>,
    pub right: Right,
    pub interval: Interval,
}

impl Permission {
    /// Limited `Write` grants are the only ones carrying an expiry task.
    pub fn has_expiry_timer(&self) -> bool {
        self.right == Right::Write && self.interval.is_limited()
    }

    pub fn lists_specialty(&self, specialty: u32) -> bool {
        self.specialties.contains(specialty)
    }

    /// Whether a grant with the given fields would conflict with this one.
    pub fn conflicts_with(&self, specialties: &Vec<u32>, right: Right, interval: &Interval) -> bool {
        right.conflicts_with(&self.right)
            && specialties_overlap(specialties, &self.specialties)
            && interval.overlaps(&self.interval)
    }
}

pub fn specialties_overlap(first: &Vec<u32>, second: &Vec<u32>) -> bool {
    first.iter().any(|id| second.contains(id))
}

// ── Storage ─────────────────────────────────────────────────

fn permission_key(patient: &Address, id: u64) -> (Symbol, Address, u64) {
    (symbol_short!("PERM"), patient.clone(), id)
}

fn counter_key(patient: &Address) -> (Symbol, Address) {
    (symbol_short!("PERM_CTR"), patient.clone())
}

pub fn get_permission(env: &Env, patient: &Address, id: u64) -> Option<Permission> {
    env.storage().persistent().get(&permission_key(patient, id))
}

fn set_permission(env: &Env, patient: &Address, permission: &Permission) {
    let key = permission_key(patient, permission.id);
    env.storage().persistent().set(&key, permission);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn remove_permission(env: &Env, patient: &Address, id: u64) {
    env.storage().persistent().remove(&permission_key(patient, id));
}

/// Ids are allocated per patient and never reused.
fn next_permission_id(env: &Env, patient: &Address) -> u64 {
    let key = counter_key(patient);
    let id: u64 = env.storage().persistent().get(&key).unwrap_or(0);
    env.storage().persistent().set(&key, &id.saturating_add(1));
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    id
}

fn expiry_handle(patient: &Address, id: u64) -> TaskHandle {
    TaskHandle {
        owner: patient.clone(),
        key: id,
    }
}

/// The scheduled expiry for a grant, if one is outstanding.
pub fn scheduled_expiry(env: &Env, patient: &Address, id: u64) -> Option<u64> {
    scheduler::get_task(env, &expiry_handle(patient, id)).map(|task| task.due_at)
}

// ── Validation ──────────────────────────────────────────────

/// Request-shape checks shared by grant and update: right id, interval
/// validity and duration, specialty cardinality, uniqueness and existence.
fn validate_request(
    nomenclature: &Nomenclature,
    specialties: &Vec<u32>,
    right_id: u32,
    interval: &Interval,
    now: u64,
) -> Result<Right, ContractError> {
    let right = nomenclature.validate_right(right_id)?;

    if !interval.is_valid() {
        return Err(ContractError::InvalidInterval);
    }
    if interval.is_limited() {
        if right.can_write() && interval.from < now {
            return Err(ContractError::IntervalStartsInPast);
        }
        if !interval.has_min_duration() {
            return Err(ContractError::IntervalBelowMinimum);
        }
    }

    validation::validate_grant_specialties(nomenclature, right, specialties)?;
    Ok(right)
}

fn ensure_no_overlap(
    env: &Env,
    patient: &Address,
    held: &Vec<u64>,
    skip: Option<u64>,
    specialties: &Vec<u32>,
    right: Right,
    interval: &Interval,
) -> Result<(), ContractError> {
    for id in held.iter() {
        if Some(id) == skip {
            continue;
        }
        let other = get_permission(env, patient, id).ok_or(ContractError::PermissionNotFound)?;
        if other.conflicts_with(specialties, right, interval) {
            return Err(ContractError::OverlappedPermissions);
        }
    }
    Ok(())
}

fn ensure_specialty_matches(
    doctor_specialty: u32,
    right: Right,
    specialties: &Vec<u32>,
) -> Result<(), ContractError> {
    if right.can_write() && specialties.get(0) != Some(doctor_specialty) {
        return Err(ContractError::SpecialtyMismatch);
    }
    Ok(())
}

/// Looks up `id` in the doctor's grant list and the grant table.
fn owned_permission(
    env: &Env,
    patient: &Patient,
    doctor: &Address,
    id: u64,
) -> Result<(Vec<u64>, Permission), ContractError> {
    let held = patient.grants_of(doctor)?;
    if !held.contains(id) {
        return Err(ContractError::PermissionNotOwned);
    }
    let permission =
        get_permission(env, &patient.account, id).ok_or(ContractError::PermissionNotFound)?;
    Ok((held, permission))
}

// ── Lifecycle ───────────────────────────────────────────────

/// Creates a grant from `patient` to `doctor` and returns its id.
///
/// The caller has already authenticated as `patient`.
pub fn grant(
    env: &Env,
    patient: &Address,
    doctor: &Address,
    specialties: Vec<u32>,
    right_id: u32,
    interval: Interval,
    first_key: Option<String>,
) -> Result<u64, ContractError> {
    let now = env.ledger().timestamp();
    let nomenclature = Nomenclature::load(env);
    let right = validate_request(&nomenclature, &specialties, right_id, &interval, now)?;

    let mut patient_record = directory::require_patient(env, patient)?;
    let doctor_record = directory::require_doctor(env, doctor)?;

    ensure_specialty_matches(doctor_record.specialty_id, right, &specialties)?;

    let linked = match patient_record.grants_of(doctor) {
        Ok(held) => {
            ensure_no_overlap(env, patient, &held, None, &specialties, right, &interval)?;
            true
        }
        Err(_) => false,
    };

    let mut new_key = None;
    if right.can_write() && directory::get_granted_key(env, doctor, patient).is_none() {
        match first_key {
            Some(key) if !key.is_empty() => new_key = Some(key),
            _ => return Err(ContractError::MissingRecordKey),
        }
    }

    // Every check has passed; mutations start here.
    let id = next_permission_id(env, patient);
    let permission = Permission {
        id,
        doctor: doctor.clone(),
        specialties,
        right,
        interval,
    };

    if permission.has_expiry_timer() {
        scheduler::schedule(env, patient, id, interval.to.saturating_sub(now))?;
    }

    set_permission(env, patient, &permission);
    patient_record.add_grant(env, doctor, id);
    directory::set_patient(env, &patient_record);
    if !linked {
        directory::link_patient(env, doctor);
    }
    if let Some(key) = new_key {
        directory::set_granted_key(env, doctor, patient, &key);
    }

    events::publish_permission_granted(env, patient.clone(), doctor.clone(), id, right, interval);

    Ok(id)
}

/// Replaces the fields of an existing grant, keeping its id.
///
/// The caller has already authenticated as `patient`.
pub fn update(
    env: &Env,
    patient: &Address,
    doctor: &Address,
    id: u64,
    specialties: Vec<u32>,
    right_id: u32,
    interval: Interval,
) -> Result<(), ContractError> {
    let now = env.ledger().timestamp();
    let nomenclature = Nomenclature::load(env);
    let right = validate_request(&nomenclature, &specialties, right_id, &interval, now)?;

    let patient_record = directory::require_patient(env, patient)?;
    let doctor_record = directory::require_doctor(env, doctor)?;
    let (held, previous) = owned_permission(env, &patient_record, doctor, id)?;

    ensure_specialty_matches(doctor_record.specialty_id, right, &specialties)?;
    ensure_no_overlap(env, patient, &held, Some(id), &specialties, right, &interval)?;

    let updated = Permission {
        id,
        doctor: doctor.clone(),
        specialties,
        right,
        interval,
    };

    // Cancel and reschedule are independent: Write -> Write needs both.
    if previous.has_expiry_timer() {
        scheduler::cancel(env, &expiry_handle(patient, id));
    }
    if updated.has_expiry_timer() {
        scheduler::schedule(env, patient, id, interval.to.saturating_sub(now))?;
    }

    set_permission(env, patient, &updated);

    events::publish_permission_updated(env, patient.clone(), doctor.clone(), id, right, interval);

    Ok(())
}

/// Removes a grant on the patient's request.
///
/// The caller has already authenticated as `patient`.
pub fn revoke(env: &Env, patient: &Address, doctor: &Address, id: u64) -> Result<(), ContractError> {
    let mut patient_record = directory::require_patient(env, patient)?;
    let (_, permission) = owned_permission(env, &patient_record, doctor, id)?;

    detach(env, &mut patient_record, &permission);

    events::publish_permission_revoked(env, patient.clone(), doctor.clone(), id);

    Ok(())
}

/// Fires the expiry task of grant `id`.
///
/// Returns `Ok(false)` when there is nothing to expire: no task outstanding,
/// or the grant was removed or reshaped after the task was scheduled.
pub fn expire(env: &Env, patient: &Address, id: u64) -> Result<bool, ContractError> {
    let handle = expiry_handle(patient, id);
    if scheduler::take_due(env, &handle)?.is_none() {
        return Ok(false);
    }

    let now = env.ledger().timestamp();
    let permission = match get_permission(env, patient, id) {
        Some(permission) => permission,
        None => return Ok(false),
    };
    if !permission.has_expiry_timer() || permission.interval.to > now {
        return Ok(false);
    }

    let mut patient_record = match directory::get_patient(env, patient) {
        Some(record) => record,
        None => return Ok(false),
    };
    let still_held = patient_record
        .grants_of(&permission.doctor)
        .map(|held| held.contains(id))
        .unwrap_or(false);
    if !still_held {
        return Ok(false);
    }

    detach(env, &mut patient_record, &permission);

    events::publish_permission_expired(env, patient.clone(), permission.doctor, id, now);

    Ok(true)
}

/// Fires up to `limit` of `patient`'s due expiry tasks. Returns the number
/// of grants removed.
pub fn process_expirations(env: &Env, patient: &Address, limit: u32) -> Result<u32, ContractError> {
    let mut removed = 0u32;
    for handle in scheduler::due_handles(env, patient, limit).iter() {
        if expire(env, patient, handle.key)? {
            removed = removed.saturating_add(1);
        }
    }
    Ok(removed)
}

/// Deletes every grant issued by `patient`, cancelling outstanding expiry
/// tasks and withdrawing shared record keys.
pub fn remove_all_for_patient(env: &Env, patient: &Patient) {
    for (doctor, held) in patient.perms.iter() {
        for id in held.iter() {
            if let Some(permission) = get_permission(env, &patient.account, id) {
                if permission.has_expiry_timer() {
                    scheduler::cancel(env, &expiry_handle(&patient.account, id));
                }
                remove_permission(env, &patient.account, id);
            }
        }
        directory::forget_granted_key(env, &doctor, &patient.account);
        directory::unlink_patient(env, &doctor);
    }
}

/// Shared removal path of revoke and expiry.
fn detach(env: &Env, patient: &mut Patient, permission: &Permission) {
    if permission.has_expiry_timer() {
        scheduler::cancel(env, &expiry_handle(&patient.account, permission.id));
    }
    remove_permission(env, &patient.account, permission.id);

    if patient.remove_grant(&permission.doctor, permission.id) {
        directory::forget_granted_key(env, &permission.doctor, &patient.account);
        directory::unlink_patient(env, &permission.doctor);
    }
    directory::set_patient(env, patient);
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{testutils::Address as _, vec};

    fn permission(env: &Env, specialties: Vec<u32>, right: Right, interval: Interval) -> Permission {
        Permission {
            id: 0,
            doctor: Address::generate(env),
            specialties,
            right,
            interval,
        }
    }

    #[test]
    fn right_conflict_table() {
        assert!(Right::Read.conflicts_with(&Right::Read));
        assert!(Right::Write.conflicts_with(&Right::Write));
        assert!(!Right::Read.conflicts_with(&Right::Write));
        assert!(!Right::Write.conflicts_with(&Right::Read));
        assert!(Right::ReadWrite.conflicts_with(&Right::Read));
        assert!(Right::Write.conflicts_with(&Right::ReadWrite));
    }

    #[test]
    fn unknown_right_id_is_rejected() {
        assert_eq!(Right::from_id(1), Ok(Right::Write));
        assert_eq!(Right::from_id(3), Err(ContractError::InvalidRight));
    }

    #[test]
    fn conflict_needs_all_three_dimensions() {
        let env = Env::default();
        let existing = permission(
            &env,
            vec![&env, 3u32, 5],
            Right::Read,
            Interval::new(1_000, 2_000),
        );

        assert!(existing.conflicts_with(&vec![&env, 5u32], Right::Read, &Interval::new(1_500, 2_500)));
        // different right
        assert!(!existing.conflicts_with(&vec![&env, 5u32], Right::Write, &Interval::new(1_500, 2_500)));
        // disjoint specialties
        assert!(!existing.conflicts_with(&vec![&env, 4u32], Right::Read, &Interval::new(1_500, 2_500)));
        // adjacent interval
        assert!(!existing.conflicts_with(&vec![&env, 5u32], Right::Read, &Interval::new(2_000, 2_500)));
        // read-write against read, infinite
        assert!(existing.conflicts_with(&vec![&env, 3u32], Right::ReadWrite, &Interval::INFINITE));
    }

    #[test]
    fn only_limited_write_grants_carry_timers() {
        let env = Env::default();
        let limited = Interval::new(1_000, 2_000);
        assert!(permission(&env, vec![&env, 3u32], Right::Write, limited).has_expiry_timer());
        assert!(!permission(&env, vec![&env, 3u32], Right::Write, Interval::INFINITE).has_expiry_timer());
        assert!(!permission(&env, vec![&env, 3u32], Right::ReadWrite, limited).has_expiry_timer());
        assert!(!permission(&env, vec![&env, 3u32], Right::Read, limited).has_expiry_timer());
    }
}
