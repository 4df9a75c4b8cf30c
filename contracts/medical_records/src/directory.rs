use soroban_sdk::{contracttype, symbol_short, Address, Env, Map, String, Symbol, Vec};

use crate::ContractError;

const TTL_THRESHOLD: u32 = 5184000;
const TTL_EXTEND_TO: u32 = 10368000;

/// A registered patient.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Patient {
    pub account: Address,
    /// Public encryption key, stored and forwarded as-is.
    pub public_key: String,
    /// Doctor → ids of the live grants that doctor holds from this patient.
    pub perms: Map<Address, Vec<u64>>,
}

/// A registered doctor.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Doctor {
    pub account: Address,
    pub specialty_id: u32,
    /// Public key used by patients to share their record key with this doctor.
    pub public_key: String,
}

impl Patient {
    pub fn new(env: &Env, account: Address, public_key: String) -> Self {
        Self {
            account,
            public_key,
            perms: Map::new(env),
        }
    }

    /// Grant ids held by `doctor`, or `NoPermissionsFromPatient` if none.
    pub fn grants_of(&self, doctor: &Address) -> Result<Vec<u64>, ContractError> {
        self.perms
            .get(doctor.clone())
            .ok_or(ContractError::NoPermissionsFromPatient)
    }

    pub fn add_grant(&mut self, env: &Env, doctor: &Address, grant_id: u64) {
        let mut ids = self.perms.get(doctor.clone()).unwrap_or(Vec::new(env));
        ids.push_back(grant_id);
        self.perms.set(doctor.clone(), ids);
    }

    /// Drops `grant_id` from the doctor's list. Returns `true` when that was
    /// the doctor's last grant, in which case the doctor entry is removed.
    pub fn remove_grant(&mut self, doctor: &Address, grant_id: u64) -> bool {
        let mut ids = match self.perms.get(doctor.clone()) {
            Some(ids) => ids,
            None => return false,
        };
        if let Some(index) = ids.first_index_of(grant_id) {
            ids.remove(index);
        }
        if ids.is_empty() {
            self.perms.remove(doctor.clone());
            return true;
        }
        self.perms.set(doctor.clone(), ids);
        false
    }
}

impl Doctor {
    pub fn new(account: Address, specialty_id: u32, public_key: String) -> Self {
        Self {
            account,
            specialty_id,
            public_key,
        }
    }
}

fn patient_key(patient: &Address) -> (Symbol, Address) {
    (symbol_short!("PATIENT"), patient.clone())
}

fn doctor_key(doctor: &Address) -> (Symbol, Address) {
    (symbol_short!("DOCTOR"), doctor.clone())
}

fn extend_ttl_address_key(env: &Env, key: &(Symbol, Address)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn get_patient(env: &Env, patient: &Address) -> Option<Patient> {
    env.storage().persistent().get(&patient_key(patient))
}

pub fn require_patient(env: &Env, patient: &Address) -> Result<Patient, ContractError> {
    get_patient(env, patient).ok_or(ContractError::PatientNotRegistered)
}

pub fn set_patient(env: &Env, patient: &Patient) {
    let key = patient_key(&patient.account);
    env.storage().persistent().set(&key, patient);
    extend_ttl_address_key(env, &key);
}

pub fn remove_patient(env: &Env, patient: &Address) {
    env.storage().persistent().remove(&patient_key(patient));
}

pub fn get_doctor(env: &Env, doctor: &Address) -> Option<Doctor> {
    env.storage().persistent().get(&doctor_key(doctor))
}

pub fn require_doctor(env: &Env, doctor: &Address) -> Result<Doctor, ContractError> {
    get_doctor(env, doctor).ok_or(ContractError::DoctorNotRegistered)
}

pub fn set_doctor(env: &Env, doctor: &Doctor) {
    let key = doctor_key(&doctor.account);
    env.storage().persistent().set(&key, doctor);
    extend_ttl_address_key(env, &key);
}

pub fn remove_doctor(env: &Env, doctor: &Address) {
    env.storage().persistent().remove(&doctor_key(doctor));
}

// ── Doctor ↔ patient links ──────────────────────────────────
//
// Both live outside the doctor entry so that neither grows with the number
// of patients a doctor serves, and both outlive a doctor's removal.

fn granted_key_key(doctor: &Address, patient: &Address) -> (Symbol, Address, Address) {
    (symbol_short!("DOC_KEY"), doctor.clone(), patient.clone())
}

fn link_count_key(doctor: &Address) -> (Symbol, Address) {
    (symbol_short!("DOC_LNK"), doctor.clone())
}

/// Record key `patient` shared with `doctor` on its first write grant.
pub fn get_granted_key(env: &Env, doctor: &Address, patient: &Address) -> Option<String> {
    env.storage()
        .persistent()
        .get(&granted_key_key(doctor, patient))
}

pub fn set_granted_key(env: &Env, doctor: &Address, patient: &Address, key: &String) {
    let storage_key = granted_key_key(doctor, patient);
    env.storage().persistent().set(&storage_key, key);
    env.storage()
        .persistent()
        .extend_ttl(&storage_key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn forget_granted_key(env: &Env, doctor: &Address, patient: &Address) {
    env.storage()
        .persistent()
        .remove(&granted_key_key(doctor, patient));
}

/// Number of patients holding at least one live grant for `doctor`.
pub fn linked_patients(env: &Env, doctor: &Address) -> u32 {
    env.storage()
        .persistent()
        .get(&link_count_key(doctor))
        .unwrap_or(0)
}

pub fn link_patient(env: &Env, doctor: &Address) {
    let key = link_count_key(doctor);
    let count = linked_patients(env, doctor).saturating_add(1);
    env.storage().persistent().set(&key, &count);
    extend_ttl_address_key(env, &key);
}

pub fn unlink_patient(env: &Env, doctor: &Address) {
    let key = link_count_key(doctor);
    let count = linked_patients(env, doctor).saturating_sub(1);
    if count == 0 {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, &count);
    extend_ttl_address_key(env, &key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::{contract, contractimpl, testutils::Address as _};

    #[contract]
    pub struct TestContract;

    #[contractimpl]
    impl TestContract {}

    #[test]
    fn last_grant_removal_drops_doctor_entry() {
        let env = Env::default();
        let patient = Address::generate(&env);
        let doctor = Address::generate(&env);
        let mut record = Patient::new(&env, patient, String::from_str(&env, "pk"));

        record.add_grant(&env, &doctor, 0);
        record.add_grant(&env, &doctor, 1);
        assert_eq!(record.grants_of(&doctor).unwrap().len(), 2);

        assert!(!record.remove_grant(&doctor, 0));
        assert_eq!(record.grants_of(&doctor).unwrap().get(0), Some(1));

        assert!(record.remove_grant(&doctor, 1));
        assert_eq!(
            record.grants_of(&doctor),
            Err(ContractError::NoPermissionsFromPatient)
        );
    }

    #[test]
    fn removing_from_unknown_doctor_is_noop() {
        let env = Env::default();
        let patient = Address::generate(&env);
        let doctor = Address::generate(&env);
        let mut record = Patient::new(&env, patient, String::from_str(&env, "pk"));
        assert!(!record.remove_grant(&doctor, 9));
        assert!(record.perms.is_empty());
    }

    #[test]
    fn links_and_keys_survive_doctor_removal() {
        let env = Env::default();
        let contract_id = env.register(TestContract, ());
        let doctor = Address::generate(&env);
        let patient = Address::generate(&env);

        env.as_contract(&contract_id, || {
            set_doctor(
                &env,
                &Doctor::new(doctor.clone(), 3, String::from_str(&env, "pk")),
            );
            link_patient(&env, &doctor);
            link_patient(&env, &doctor);
            set_granted_key(&env, &doctor, &patient, &String::from_str(&env, "k"));

            remove_doctor(&env, &doctor);
            assert_eq!(linked_patients(&env, &doctor), 2);
            assert!(get_granted_key(&env, &doctor, &patient).is_some());

            unlink_patient(&env, &doctor);
            unlink_patient(&env, &doctor);
            unlink_patient(&env, &doctor);
            assert_eq!(linked_patients(&env, &doctor), 0);

            forget_granted_key(&env, &doctor, &patient);
            assert_eq!(get_granted_key(&env, &doctor, &patient), None);
        });
    }
}
