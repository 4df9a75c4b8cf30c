//! Authorization checks gating every record operation.

use soroban_sdk::{Address, Env, Map, Vec};

use crate::directory;
use crate::interval::Interval;
use crate::permission::{self, Permission};
use crate::ContractError;

/// May `doctor` append records of `specialty` for `patient` at instant `now`?
///
/// The administrator is always allowed. Anyone else needs a registered
/// doctor profile in that specialty and a write-capable grant for it whose
/// interval is active at `now`. Write grants carry a single specialty, so at
/// most one grant can match per specialty.
pub fn can_write(
    env: &Env,
    admin: &Address,
    patient: &Address,
    doctor: &Address,
    specialty: u32,
    now: u64,
) -> Result<(), ContractError> {
    if doctor == admin {
        return Ok(());
    }

    let doctor_record = directory::require_doctor(env, doctor)?;
    if doctor_record.specialty_id != specialty {
        return Err(ContractError::SpecialtyMismatch);
    }

    let patient_record = directory::require_patient(env, patient)?;
    let held = patient_record.grants_of(doctor)?;

    let mut outside_window = false;
    for id in held.iter() {
        let grant = match permission::get_permission(env, patient, id) {
            Some(grant) => grant,
            None => continue,
        };
        if !grant.right.can_write() || grant.specialties.get(0) != Some(specialty) {
            continue;
        }
        if grant.interval.is_active_at(now) {
            return Ok(());
        }
        outside_window = true;
    }

    if outside_window {
        Err(ContractError::WriteWindowInactive)
    } else {
        Err(ContractError::WriteNotAuthorized)
    }
}

/// Which of `requested` may `reader` consult over `interval`?
///
/// Returns the satisfied specialties in ascending order. The request fails
/// only when nothing is satisfied; a partial answer is a success and callers
/// must use the returned set rather than the requested one.
///
/// Grants are visited in the order the patient issued them and the walk
/// stops as soon as every requested specialty is satisfied. A specialty is
/// satisfied by a read-capable grant listing it whose interval is infinite or
/// fully contains `interval`; coverage is never stitched together from
/// several grants.
pub fn can_read(
    env: &Env,
    admin: &Address,
    patient: &Address,
    reader: &Address,
    requested: &Vec<u32>,
    interval: &Interval,
) -> Result<Vec<u32>, ContractError> {
    if !interval.is_valid() || (interval.is_limited() && interval.from > interval.to) {
        return Err(ContractError::InvalidInterval);
    }
    if interval.is_infinite() {
        return Err(ContractError::InfiniteReadInterval);
    }

    let mut satisfied: Map<u32, bool> = Map::new(env);
    for id in requested.iter() {
        satisfied.set(id, false);
    }

    if reader == admin || reader == patient {
        return Ok(satisfied.keys());
    }

    directory::require_doctor(env, reader)?;
    let patient_record = directory::require_patient(env, patient)?;
    let held = patient_record.grants_of(reader)?;

    let wanted = satisfied.len();
    let mut found = 0u32;
    for id in held.iter() {
        if found == wanted {
            break;
        }
        let grant: Permission = match permission::get_permission(env, patient, id) {
            Some(grant) => grant,
            None => continue,
        };
        if !grant.right.can_read() || !grant.interval.contains(interval) {
            continue;
        }
        for specialty in satisfied.keys().iter() {
            let done = satisfied.get(specialty).unwrap_or(true);
            if !done && grant.lists_specialty(specialty) {
                satisfied.set(specialty, true);
                found = found.saturating_add(1);
            }
        }
    }

    if found == 0 {
        return Err(ContractError::ReadNotAuthorized);
    }

    let mut granted = Vec::new(env);
    for (specialty, done) in satisfied.iter() {
        if done {
            granted.push_back(specialty);
        }
    }
    Ok(granted)
}
