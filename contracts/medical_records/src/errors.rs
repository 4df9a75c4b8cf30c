#![allow(clippy::arithmetic_side_effects)]
use common::CommonError;
use soroban_sdk::{contracttype, symbol_short, Address, Env, String, Symbol, Vec};

pub const ERROR_LOG_KEY: Symbol = symbol_short!("ERR_LOG");
pub const ERROR_COUNT_KEY: Symbol = symbol_short!("ERR_CNT");
pub const MAX_ERROR_LOG_SIZE: u32 = 100;

const TTL_THRESHOLD: u32 = 5184000;
const TTL_EXTEND_TO: u32 = 10368000;

/// Extends the time-to-live (TTL) for instance storage.
/// Instance storage TTL applies to all keys in the instance storage.
fn extend_ttl_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Error categories for classifying different types of errors
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Validation errors: malformed ids, intervals, lists or payloads
    Validation = 1,
    /// Authorization errors: the caller is not allowed to do this
    Authorization = 2,
    /// Not found errors: unregistered actors, missing grants or records
    NotFound = 3,
    /// State conflict errors: overlapping grants, double initialisation
    StateConflict = 4,
    /// System errors: contract not ready or scheduler failures
    System = 5,
}

/// Error severity levels indicating the impact and urgency of errors
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorSeverity {
    /// Low severity: malformed request, nothing happened
    Low = 1,
    /// Medium severity: denied access attempt
    Medium = 2,
    /// High severity: contract misconfiguration
    High = 3,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ErrorContext {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
    pub user: Option<Address>,
    pub resource_id: Option<String>,
    pub timestamp: u64,
    pub retryable: bool,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ErrorLogEntry {
    pub error_code: u32,
    pub context: ErrorContext,
}

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    NomenclatureNotLoaded = 4,
    NomenclatureAlreadyLoaded = 5,

    InvalidRight = 10,
    InvalidSpecialty = 11,
    InvalidInterval = 12,
    IntervalStartsInPast = 13,
    IntervalBelowMinimum = 14,
    WriteRequiresSingleSpecialty = 15,
    ReadRequiresSpecialty = 16,
    DuplicateSpecialty = 17,
    EmptySpecialtyList = 18,
    InfiniteReadInterval = 19,
    DescriptionTooLong = 20,
    InvalidRecordHash = 21,
    MissingRecordKey = 22,
    InvalidTextEncoding = 23,

    PatientNotRegistered = 30,
    DoctorNotRegistered = 31,
    PermissionNotFound = 32,
    RecordNotFound = 33,
    NoRecordsForSpecialty = 34,

    OverlappedPermissions = 40,
    SpecialtyMismatch = 41,
    NoPermissionsFromPatient = 42,
    PermissionNotOwned = 43,
    WriteNotAuthorized = 44,
    WriteWindowInactive = 45,
    ReadNotAuthorized = 46,
    DoctorHasGrants = 47,

    ExpiryNotDue = 50,
    SchedulingFailed = 51,
    RenderFailed = 52,
}

impl From<CommonError> for ContractError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::TaskNotDue => ContractError::ExpiryNotDue,
            CommonError::DelayOverflow => ContractError::SchedulingFailed,
        }
    }
}

impl ContractError {
    /// Returns the error category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ContractError::InvalidRight
            | ContractError::InvalidSpecialty
            | ContractError::InvalidInterval
            | ContractError::IntervalStartsInPast
            | ContractError::IntervalBelowMinimum
            | ContractError::WriteRequiresSingleSpecialty
            | ContractError::ReadRequiresSpecialty
            | ContractError::DuplicateSpecialty
            | ContractError::EmptySpecialtyList
            | ContractError::InfiniteReadInterval
            | ContractError::DescriptionTooLong
            | ContractError::InvalidRecordHash
            | ContractError::MissingRecordKey
            | ContractError::InvalidTextEncoding => ErrorCategory::Validation,
            ContractError::Unauthorized
            | ContractError::SpecialtyMismatch
            | ContractError::NoPermissionsFromPatient
            | ContractError::PermissionNotOwned
            | ContractError::WriteNotAuthorized
            | ContractError::WriteWindowInactive
            | ContractError::ReadNotAuthorized => ErrorCategory::Authorization,
            ContractError::PatientNotRegistered
            | ContractError::DoctorNotRegistered
            | ContractError::PermissionNotFound
            | ContractError::RecordNotFound
            | ContractError::NoRecordsForSpecialty => ErrorCategory::NotFound,
            ContractError::AlreadyInitialized
            | ContractError::NomenclatureAlreadyLoaded
            | ContractError::OverlappedPermissions
            | ContractError::DoctorHasGrants
            | ContractError::ExpiryNotDue => ErrorCategory::StateConflict,
            ContractError::NotInitialized
            | ContractError::NomenclatureNotLoaded
            | ContractError::SchedulingFailed
            | ContractError::RenderFailed => ErrorCategory::System,
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::NotFound | ErrorCategory::StateConflict => {
                ErrorSeverity::Low
            }
            ErrorCategory::Authorization => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::High,
        }
    }

    /// Returns whether this error is retryable.
    /// Only a premature expiry call succeeds later without any change of input.
    pub fn retryable(&self) -> bool {
        matches!(self, ContractError::ExpiryNotDue)
    }

    /// Returns a human-readable error message for this error.
    pub fn message(&self) -> &'static str {
        match self {
            ContractError::NotInitialized => "Contract has not been initialized",
            ContractError::AlreadyInitialized => "Contract is already initialized",
            ContractError::Unauthorized => "Caller is not authorized for this operation",
            ContractError::NomenclatureNotLoaded => "Nomenclature was not loaded yet",
            ContractError::NomenclatureAlreadyLoaded => "Nomenclature is already loaded",
            ContractError::InvalidRight => {
                "Invalid right id, valid ones are CONSULT=0 ADD=1 CONSULT & ADD=2"
            }
            ContractError::InvalidSpecialty => "Invalid specialty id",
            ContractError::InvalidInterval => "Specified interval is not valid",
            ContractError::IntervalStartsInPast => "Interval can't start before current time",
            ContractError::IntervalBelowMinimum => "Min interval is 5 min or infinite",
            ContractError::WriteRequiresSingleSpecialty => {
                "ADD or CONSULT & ADD rights can contain only 1 specialty"
            }
            ContractError::ReadRequiresSpecialty => {
                "CONSULT right must contain at least 1 specialty"
            }
            ContractError::DuplicateSpecialty => "All specialties must be unique",
            ContractError::EmptySpecialtyList => {
                "Requested specialties must contain at least one specialty"
            }
            ContractError::InfiniteReadInterval => "Requested interval can't be infinite",
            ContractError::DescriptionTooLong => "Description can contain up to 20 characters",
            ContractError::InvalidRecordHash => "Invalid record hash",
            ContractError::MissingRecordKey => {
                "First ADD or CONSULT & ADD grant requires the record encryption key"
            }
            ContractError::InvalidTextEncoding => "Text must be valid UTF-8",
            ContractError::PatientNotRegistered => "Patient is not registered",
            ContractError::DoctorNotRegistered => "Doctor is not registered",
            ContractError::PermissionNotFound => "Permission id is not valid",
            ContractError::RecordNotFound => "Record does not exist",
            ContractError::NoRecordsForSpecialty => "Patient has no records for this specialty",
            ContractError::OverlappedPermissions => "Overlapped permissions",
            ContractError::SpecialtyMismatch => "Doctor does not belong to the specified specialty",
            ContractError::NoPermissionsFromPatient => {
                "Doctor has no permissions from this patient"
            }
            ContractError::PermissionNotOwned => {
                "Permission id does not belong to this doctor and patient"
            }
            ContractError::WriteNotAuthorized => {
                "No permission to add records for this specialty"
            }
            ContractError::WriteWindowInactive => {
                "Write permission is expired or not active yet"
            }
            ContractError::ReadNotAuthorized => {
                "No permission covers the requested specialties and interval"
            }
            ContractError::DoctorHasGrants => {
                "Doctor still holds grants from a previous registration"
            }
            ContractError::ExpiryNotDue => "Permission expiry is not due yet",
            ContractError::SchedulingFailed => "Expiry could not be scheduled",
            ContractError::RenderFailed => "Records could not be rendered as JSON",
        }
    }
}

/// Logs an error to the contract's error log.
/// The error log is limited to the most recent 100 entries.
pub fn log_error(
    env: &Env,
    error: ContractError,
    user: Option<Address>,
    resource_id: Option<String>,
) {
    let log_entry = ErrorLogEntry {
        error_code: error as u32,
        context: create_error_context(env, error, user, resource_id),
    };

    let mut error_log: Vec<ErrorLogEntry> = env
        .storage()
        .instance()
        .get(&ERROR_LOG_KEY)
        .unwrap_or(Vec::new(env));

    error_log.push_back(log_entry);

    if error_log.len() > MAX_ERROR_LOG_SIZE {
        error_log.pop_front();
    }

    env.storage().instance().set(&ERROR_LOG_KEY, &error_log);

    let error_count: u64 = env.storage().instance().get(&ERROR_COUNT_KEY).unwrap_or(0);
    env.storage()
        .instance()
        .set(&ERROR_COUNT_KEY, &(error_count + 1));

    extend_ttl_instance(env);
}

/// Retrieves the complete error log containing all logged errors.
pub fn get_error_log(env: &Env) -> Vec<ErrorLogEntry> {
    env.storage()
        .instance()
        .get(&ERROR_LOG_KEY)
        .unwrap_or(Vec::new(env))
}

/// Returns the total count of errors that have been logged.
/// This count persists even when older entries fall out of the log.
pub fn get_error_count(env: &Env) -> u64 {
    env.storage().instance().get(&ERROR_COUNT_KEY).unwrap_or(0)
}

/// Clears the error log and resets the error count to zero.
pub fn clear_error_log(env: &Env) {
    env.storage().instance().remove(&ERROR_LOG_KEY);
    env.storage().instance().set(&ERROR_COUNT_KEY, &0u64);
    extend_ttl_instance(env);
}

/// Creates an ErrorContext structure from an error and optional user/resource information.
pub fn create_error_context(
    env: &Env,
    error: ContractError,
    user: Option<Address>,
    resource_id: Option<String>,
) -> ErrorContext {
    ErrorContext {
        category: error.category(),
        severity: error.severity(),
        message: String::from_str(env, error.message()),
        user,
        resource_id,
        timestamp: env.ledger().timestamp(),
        retryable: error.retryable(),
    }
}
