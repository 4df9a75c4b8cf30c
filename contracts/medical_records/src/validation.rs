use soroban_sdk::{String, Vec};

use crate::nomenclature::Nomenclature;
use crate::permission::Right;
use crate::ContractError;

pub const MAX_DESCRIPTION_LEN: u32 = 20;
pub const MAX_HASH_LEN: u32 = 128;

/// Validate the specialty list attached to a grant of `right`.
/// Write-capable rights carry exactly one specialty, read grants at least one.
pub fn validate_grant_specialties(
    nomenclature: &Nomenclature,
    right: Right,
    specialties: &Vec<u32>,
) -> Result<(), ContractError> {
    if right.can_write() && specialties.len() != 1 {
        return Err(ContractError::WriteRequiresSingleSpecialty);
    }
    if right == Right::Read && specialties.is_empty() {
        return Err(ContractError::ReadRequiresSpecialty);
    }
    validate_specialty_ids(nomenclature, specialties)
}

/// Validate the specialty list of a read request.
pub fn validate_requested_specialties(
    nomenclature: &Nomenclature,
    specialties: &Vec<u32>,
) -> Result<(), ContractError> {
    if specialties.is_empty() {
        return Err(ContractError::EmptySpecialtyList);
    }
    validate_specialty_ids(nomenclature, specialties)
}

fn validate_specialty_ids(
    nomenclature: &Nomenclature,
    specialties: &Vec<u32>,
) -> Result<(), ContractError> {
    if !are_unique(specialties) {
        return Err(ContractError::DuplicateSpecialty);
    }
    for id in specialties.iter() {
        nomenclature.validate_specialty(id)?;
    }
    Ok(())
}

pub fn are_unique(specialties: &Vec<u32>) -> bool {
    for (i, id) in specialties.iter().enumerate() {
        for other in specialties.iter().skip(i + 1) {
            if id == other {
                return false;
            }
        }
    }
    true
}

/// `buffer` must hold at least `value.len()` bytes.
fn is_utf8(value: &String, buffer: &mut [u8]) -> bool {
    let bytes = &mut buffer[..value.len() as usize];
    value.copy_into_slice(bytes);
    core::str::from_utf8(bytes).is_ok()
}

/// Record descriptions are short UTF-8 labels; payloads live off-chain.
pub fn validate_description(description: &String) -> Result<(), ContractError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ContractError::DescriptionTooLong);
    }
    let mut buffer = [0u8; MAX_DESCRIPTION_LEN as usize];
    if !is_utf8(description, &mut buffer) {
        return Err(ContractError::InvalidTextEncoding);
    }
    Ok(())
}

/// Record hashes must be present, of bounded length and valid UTF-8.
pub fn validate_record_hash(hash: &String) -> Result<(), ContractError> {
    let len = hash.len();
    if len == 0 || len > MAX_HASH_LEN {
        return Err(ContractError::InvalidRecordHash);
    }
    let mut buffer = [0u8; MAX_HASH_LEN as usize];
    if !is_utf8(hash, &mut buffer) {
        return Err(ContractError::InvalidRecordHash);
    }
    Ok(())
}
