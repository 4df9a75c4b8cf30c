#![no_std]
extern crate alloc;

pub mod access;
pub mod directory;
pub mod errors;
pub mod events;
pub mod interval;
pub mod nomenclature;
pub mod permission;
pub mod records;
pub mod render;
pub mod validation;

use soroban_sdk::{contract, contractimpl, symbol_short, Address, Env, String, Symbol, Vec};

pub use directory::{Doctor, Patient};
pub use errors::{
    create_error_context, log_error, ContractError, ErrorCategory, ErrorLogEntry, ErrorSeverity,
};
pub use interval::{Interval, MIN_INTERVAL_SECS};
pub use nomenclature::Nomenclature;
pub use permission::{Permission, Right};
pub use records::RecordEntry;

/// Storage keys for the contract
const ADMIN: Symbol = symbol_short!("ADMIN");
const INITIALIZED: Symbol = symbol_short!("INIT");

const TTL_THRESHOLD: u32 = 5184000;
const TTL_EXTEND_TO: u32 = 10368000;

/// Extends the time-to-live (TTL) for instance storage.
/// Admin, nomenclature tables and the error log all live there.
fn extend_ttl_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

#[contract]
pub struct MedicalRecordsContract;

#[contractimpl]
impl MedicalRecordsContract {
    fn admin(env: &Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&ADMIN)
            .ok_or(ContractError::NotInitialized)
    }

    /// Loads the admin and requires its signature.
    fn authorize_admin(env: &Env) -> Result<Address, ContractError> {
        let admin = Self::admin(env)?;
        admin.require_auth();
        Ok(admin)
    }

    /// Records a refused request in the error log and as an `ERROR` event.
    /// Every caller returns the error afterwards, which rolls both back; the
    /// log only keeps entries written by invocations that succeed.
    fn report(env: &Env, error: ContractError, caller: &Address, resource: &str) -> ContractError {
        let resource_id = String::from_str(env, resource);
        let context = create_error_context(
            env,
            error,
            Some(caller.clone()),
            Some(resource_id.clone()),
        );
        log_error(env, error, Some(caller.clone()), Some(resource_id));
        events::publish_error(env, error as u32, context);
        error
    }

    // ======================== Lifecycle ========================

    /// Initialize the contract with an admin address
    pub fn initialize(env: Env, admin: Address) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&ADMIN, &admin);
        env.storage().instance().set(&INITIALIZED, &true);
        extend_ttl_instance(&env);

        events::publish_initialized(&env, admin);

        Ok(())
    }

    /// Get the admin address
    pub fn get_admin(env: Env) -> Result<Address, ContractError> {
        Self::admin(&env)
    }

    /// Check if the contract is initialized
    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    /// Contract version
    pub fn version() -> u32 {
        1
    }

    // ======================== Nomenclature ========================

    /// Writes the rights table. Returns the number of rights.
    pub fn load_rights(env: Env) -> Result<u32, ContractError> {
        Self::authorize_admin(&env)?;
        let entries = nomenclature::load_rights(&env)?;
        extend_ttl_instance(&env);
        events::publish_nomenclature_loaded(&env, "rights", entries);
        Ok(entries)
    }

    /// Writes the first half of the specialty table.
    pub fn begin_load_specialties(env: Env) -> Result<u32, ContractError> {
        Self::authorize_admin(&env)?;
        let entries = nomenclature::begin_load_specialties(&env)?;
        extend_ttl_instance(&env);
        events::publish_nomenclature_loaded(&env, "specialties", entries);
        Ok(entries)
    }

    /// Completes the specialty table. Returns its final size.
    pub fn finish_load_specialties(env: Env) -> Result<u32, ContractError> {
        Self::authorize_admin(&env)?;
        let entries = nomenclature::finish_load_specialties(&env)?;
        extend_ttl_instance(&env);
        events::publish_nomenclature_loaded(&env, "specialties", entries);
        Ok(entries)
    }

    pub fn get_right_name(env: Env, right_id: u32) -> Option<String> {
        Nomenclature::load(&env).right_name(right_id)
    }

    pub fn get_specialty_name(env: Env, specialty_id: u32) -> Option<String> {
        Nomenclature::load(&env).specialty_name(specialty_id)
    }

    // ======================== Directory ========================

    /// Registers a patient (admin) or replaces its public key (patient).
    pub fn upsert_patient(env: Env, patient: Address, public_key: String) -> Result<(), ContractError> {
        let admin = Self::admin(&env)?;

        let created = match directory::get_patient(&env, &patient) {
            Some(mut record) => {
                patient.require_auth();
                record.public_key = public_key;
                directory::set_patient(&env, &record);
                false
            }
            None => {
                admin.require_auth();
                directory::set_patient(&env, &Patient::new(&env, patient.clone(), public_key));
                records::create_book(&env, &patient);
                true
            }
        };

        events::publish_patient_upserted(&env, patient, created);

        Ok(())
    }

    /// Removes a patient with every grant it issued and all of its records.
    pub fn remove_patient(env: Env, patient: Address) -> Result<(), ContractError> {
        Self::authorize_admin(&env)?;
        let record = directory::require_patient(&env, &patient)?;

        permission::remove_all_for_patient(&env, &record);
        records::remove_book(&env, &patient);
        directory::remove_patient(&env, &patient);

        events::publish_patient_removed(&env, patient);

        Ok(())
    }

    /// Registers a doctor (admin) or updates its profile (doctor).
    pub fn upsert_doctor(
        env: Env,
        doctor: Address,
        specialty_id: u32,
        public_key: String,
    ) -> Result<(), ContractError> {
        let admin = Self::admin(&env)?;

        let created = match directory::get_doctor(&env, &doctor) {
            Some(mut record) => {
                doctor.require_auth();
                Nomenclature::load(&env).validate_specialty(specialty_id)?;
                record.specialty_id = specialty_id;
                record.public_key = public_key;
                directory::set_doctor(&env, &record);
                false
            }
            None => {
                admin.require_auth();
                if directory::linked_patients(&env, &doctor) > 0 {
                    return Err(ContractError::DoctorHasGrants);
                }
                Nomenclature::load(&env).validate_specialty(specialty_id)?;
                directory::set_doctor(&env, &Doctor::new(doctor.clone(), specialty_id, public_key));
                true
            }
        };

        events::publish_doctor_upserted(&env, doctor, specialty_id, created);

        Ok(())
    }

    /// Unregisters a doctor. Grants it holds stay stored but can no longer
    /// be exercised, and the address cannot be registered again until every
    /// patient has revoked them.
    pub fn remove_doctor(env: Env, doctor: Address) -> Result<(), ContractError> {
        Self::authorize_admin(&env)?;
        directory::require_doctor(&env, &doctor)?;
        directory::remove_doctor(&env, &doctor);

        events::publish_doctor_removed(&env, doctor);

        Ok(())
    }

    pub fn get_patient(env: Env, patient: Address) -> Result<Patient, ContractError> {
        directory::require_patient(&env, &patient)
    }

    pub fn get_doctor(env: Env, doctor: Address) -> Result<Doctor, ContractError> {
        directory::require_doctor(&env, &doctor)
    }

    /// Record key `patient` shared with `doctor`, if any.
    pub fn get_granted_key(env: Env, doctor: Address, patient: Address) -> Option<String> {
        directory::get_granted_key(&env, &doctor, &patient)
    }

    // ======================== Grants ========================

    pub fn get_permission(
        env: Env,
        patient: Address,
        permission_id: u64,
    ) -> Result<Permission, ContractError> {
        permission::get_permission(&env, &patient, permission_id)
            .ok_or(ContractError::PermissionNotFound)
    }

    /// Live grants `doctor` holds from `patient`, in issue order.
    pub fn get_doctor_permissions(
        env: Env,
        patient: Address,
        doctor: Address,
    ) -> Result<Vec<Permission>, ContractError> {
        let record = directory::require_patient(&env, &patient)?;
        let mut grants = Vec::new(&env);
        if let Ok(held) = record.grants_of(&doctor) {
            for id in held.iter() {
                if let Some(grant) = permission::get_permission(&env, &patient, id) {
                    grants.push_back(grant);
                }
            }
        }
        Ok(grants)
    }

    /// Grants `doctor` a right over some of the patient's specialties for an
    /// interval. `record_key` is required on the first write-capable grant
    /// to this doctor and ignored afterwards. Returns the new grant id.
    #[allow(clippy::too_many_arguments)]
    pub fn grant_permission(
        env: Env,
        patient: Address,
        doctor: Address,
        specialty_ids: Vec<u32>,
        right_id: u32,
        interval: Interval,
        record_key: Option<String>,
    ) -> Result<u64, ContractError> {
        patient.require_auth();
        permission::grant(
            &env,
            &patient,
            &doctor,
            specialty_ids,
            right_id,
            interval,
            record_key,
        )
    }

    pub fn update_permission(
        env: Env,
        patient: Address,
        doctor: Address,
        permission_id: u64,
        specialty_ids: Vec<u32>,
        right_id: u32,
        interval: Interval,
    ) -> Result<(), ContractError> {
        patient.require_auth();
        permission::update(
            &env,
            &patient,
            &doctor,
            permission_id,
            specialty_ids,
            right_id,
            interval,
        )
    }

    pub fn revoke_permission(
        env: Env,
        patient: Address,
        doctor: Address,
        permission_id: u64,
    ) -> Result<(), ContractError> {
        patient.require_auth();
        permission::revoke(&env, &patient, &doctor, permission_id)
    }

    /// Fires the expiry task of a time-bounded write grant. Anyone may call
    /// this once the grant's end time has passed.
    pub fn expire_permission(
        env: Env,
        patient: Address,
        permission_id: u64,
    ) -> Result<bool, ContractError> {
        permission::expire(&env, &patient, permission_id)
    }

    /// Fires up to `limit` of the patient's due expiry tasks in schedule order.
    pub fn process_expirations(env: Env, patient: Address, limit: u32) -> Result<u32, ContractError> {
        permission::process_expirations(&env, &patient, limit)
    }

    pub fn get_scheduled_expiry(env: Env, patient: Address, permission_id: u64) -> Option<u64> {
        permission::scheduled_expiry(&env, &patient, permission_id)
    }

    // ======================== Access checks ========================

    pub fn check_write_access(env: Env, patient: Address, doctor: Address, specialty_id: u32) -> bool {
        let admin = match Self::admin(&env) {
            Ok(admin) => admin,
            Err(_) => return false,
        };
        let now = env.ledger().timestamp();
        access::can_write(&env, &admin, &patient, &doctor, specialty_id, now).is_ok()
    }

    /// Specialties among `specialty_ids` that `reader` may consult over
    /// `interval`, in ascending order.
    pub fn check_read_access(
        env: Env,
        patient: Address,
        reader: Address,
        specialty_ids: Vec<u32>,
        interval: Interval,
    ) -> Result<Vec<u32>, ContractError> {
        let admin = Self::admin(&env)?;
        validation::validate_requested_specialties(&Nomenclature::load(&env), &specialty_ids)?;
        access::can_read(&env, &admin, &patient, &reader, &specialty_ids, &interval)
    }

    // ======================== Records ========================

    /// Appends a record to the patient's log for `specialty_id`, stamped with
    /// the current ledger time.
    pub fn write_record(
        env: Env,
        patient: Address,
        doctor: Address,
        specialty_id: u32,
        hash: String,
        description: String,
    ) -> Result<(), ContractError> {
        doctor.require_auth();
        let admin = Self::admin(&env)?;

        Nomenclature::load(&env).validate_specialty(specialty_id)?;
        directory::require_patient(&env, &patient)?;
        validation::validate_description(&description)?;
        validation::validate_record_hash(&hash)?;

        let now = env.ledger().timestamp();
        access::can_write(&env, &admin, &patient, &doctor, specialty_id, now)
            .map_err(|err| Self::report(&env, err, &doctor, "write_record"))?;

        records::append(
            &env,
            &patient,
            specialty_id,
            RecordEntry {
                timestamp: now,
                hash: hash.clone(),
                doctor: doctor.clone(),
                description,
            },
        );

        events::publish_record_added(&env, patient, doctor, specialty_id, hash);

        Ok(())
    }

    /// Records of the requested specialties whose timestamp falls inside
    /// `interval`, rendered as a JSON object keyed by specialty id. Only the
    /// specialties `reader` is allowed to consult are included.
    pub fn read_records(
        env: Env,
        patient: Address,
        reader: Address,
        specialty_ids: Vec<u32>,
        interval: Interval,
    ) -> Result<String, ContractError> {
        reader.require_auth();
        let admin = Self::admin(&env)?;

        validation::validate_requested_specialties(&Nomenclature::load(&env), &specialty_ids)?;
        directory::require_patient(&env, &patient)?;

        let granted = access::can_read(&env, &admin, &patient, &reader, &specialty_ids, &interval)
            .map_err(|err| Self::report(&env, err, &reader, "read_records"))?;

        let selected = records::query(&env, &patient, &granted, &interval);
        render::by_specialty_id(&env, &selected)
    }

    /// Every record of the patient, keyed by specialty name.
    pub fn list_all_records(env: Env, patient: Address) -> Result<String, ContractError> {
        patient.require_auth();
        let book = records::get_book(&env, &patient).ok_or(ContractError::PatientNotRegistered)?;
        render::by_specialty_name(&env, &book, &Nomenclature::load(&env))
    }

    /// Deletes the first record of `specialty_id` carrying `hash`.
    pub fn admin_delete_record(
        env: Env,
        patient: Address,
        specialty_id: u32,
        hash: String,
    ) -> Result<(), ContractError> {
        Self::authorize_admin(&env)?;
        Nomenclature::load(&env).validate_specialty(specialty_id)?;

        let removed = records::remove_by_hash(&env, &patient, specialty_id, &hash)?;

        events::publish_record_removed(&env, patient, removed.doctor, specialty_id, hash);

        Ok(())
    }

    // ======================== Diagnostics ========================

    pub fn get_error_log(env: Env) -> Vec<ErrorLogEntry> {
        errors::get_error_log(&env)
    }

    pub fn get_error_count(env: Env) -> u64 {
        errors::get_error_count(&env)
    }

    /// Clears the error log. Admin only.
    pub fn clear_error_log(env: Env, caller: Address) -> Result<(), ContractError> {
        caller.require_auth();
        let admin = Self::admin(&env)?;
        if caller != admin {
            return Err(Self::report(&env, ContractError::Unauthorized, &caller, "clear_error_log"));
        }
        errors::clear_error_log(&env);
        Ok(())
    }
}

#[cfg(test)]
mod test;
