//! Static id → name tables for rights and medical specialties.
//!
//! The tables are written once by the administrator and never modified
//! afterwards. Specialties are loaded in two phases because the full table
//! does not fit in a single invocation's resource budget. Validation code
//! receives a [`Nomenclature`] value rather than reading storage itself.

use soroban_sdk::{symbol_short, Env, Map, String, Symbol};

use crate::permission::Right;
use crate::ContractError;

const RIGHTS: Symbol = symbol_short!("NOM_RGT");
const SPECIALTIES: Symbol = symbol_short!("NOM_SPC");

pub const RIGHT_NAMES: [(u32, &str); 3] = [(0, "CONSULT"), (1, "ADD"), (2, "CONSULT & ADD")];

pub const SPECIALTIES_FIRST_PHASE: [(u32, &str); 26] = [
    (0, "ALERGOLOGY AND IMMUNOLOGY"),
    (1, "ANESTHESIA AND INTENSIVE CARE"),
    (2, "INFECTIOUS DISEASES"),
    (3, "CARDIOLOGY"),
    (4, "CARDIOVASCULAR SURGERY"),
    (5, "GENERAL SURGERY"),
    (6, "ONCOLOGICAL SURGERY"),
    (7, "ORAL SURGERY AND MAXI - FACIAL SURGERY"),
    (8, "SURGERY PEDIATRIC ORTHOPEDICS"),
    (9, "PEDIATRIC SURGERY"),
    (10, "PLASTIC SURGERY - RECONSTRUCTIVE MICROSURGERY"),
    (11, "THORACIC SURGERY"),
    (12, "VASCULAR SURGERY"),
    (13, "DERMATOVENEREOLOGY"),
    (14, "DIABETES, NUTRITION AND METABOLIC DISEASES"),
    (15, "ENDOCRINOLOGY"),
    (16, "EPIDEMIOLOGY"),
    (17, "GASTROENTEROLOGY"),
    (18, "MEDICAL GENETICS"),
    (19, "GERIATRY AND GERONTOLOGY"),
    (20, "HEMATOLOGY"),
    (21, "FAMILY MEDICINE"),
    (22, "EMERGENCY MEDICINE"),
    (23, "GENERAL MEDICINE"),
    (24, "INTERNAL MEDICINE"),
    (25, "LABOR MEDICINE"),
];

pub const SPECIALTIES_SECOND_PHASE: [(u32, &str); 25] = [
    (26, "NEPHROLOGY"),
    (27, "NEONATOLOGY"),
    (28, "NEUROSURGERY"),
    (29, "NEUROLOGY"),
    (30, "PEDIATRIC NEUROLOGY"),
    (31, "INFANTILE NEUROPSIHIATRY"),
    (32, "OBSTETRICA - GINECOLOGY"),
    (33, "OPHTHALMOLOGY"),
    (34, "MEDICAL ONCOLOGY"),
    (35, "OTORHINOLARYNGOLOGY"),
    (36, "ORTHOPEDICS AND TRAUMATOLOGY"),
    (37, "PEDIATRIC ORTHOPEDICS AND TRAUMATOLOGY"),
    (38, "PEDIATRICS"),
    (39, "PULMONOLOGY"),
    (40, "PSYCHIATRY"),
    (41, "PEDIATRIC PSYCHIATRY"),
    (42, "PSYCHOLOGY"),
    (43, "RADIOLOGY - MEDICAL IMAGISTICS"),
    (44, "RADIOTHERAPY"),
    (45, "MEDICAL RECOVERY"),
    (46, "RHEUMATOLOGY"),
    (47, "DENTISTRY"),
    (48, "TECHNICIAN"),
    (49, "UROLOGY"),
    (50, "COUNSELING LACTATION"),
];

fn table_from(env: &Env, entries: &[(u32, &str)], into: &mut Map<u32, String>) {
    for (id, name) in entries {
        into.set(*id, String::from_str(env, name));
    }
}

/// Writes the rights table. Fails if it was already written.
pub fn load_rights(env: &Env) -> Result<u32, ContractError> {
    if env.storage().instance().has(&RIGHTS) {
        return Err(ContractError::NomenclatureAlreadyLoaded);
    }
    let mut rights = Map::new(env);
    table_from(env, &RIGHT_NAMES, &mut rights);
    env.storage().instance().set(&RIGHTS, &rights);
    Ok(rights.len())
}

/// First specialty phase: creates the table with ids 0–25.
pub fn begin_load_specialties(env: &Env) -> Result<u32, ContractError> {
    if env.storage().instance().has(&SPECIALTIES) {
        return Err(ContractError::NomenclatureAlreadyLoaded);
    }
    let mut specialties = Map::new(env);
    table_from(env, &SPECIALTIES_FIRST_PHASE, &mut specialties);
    env.storage().instance().set(&SPECIALTIES, &specialties);
    Ok(specialties.len())
}

/// Second specialty phase: appends ids 26–50 to the existing table.
pub fn finish_load_specialties(env: &Env) -> Result<u32, ContractError> {
    let mut specialties: Map<u32, String> = env
        .storage()
        .instance()
        .get(&SPECIALTIES)
        .ok_or(ContractError::NomenclatureNotLoaded)?;
    if specialties.contains_key(SPECIALTIES_SECOND_PHASE[0].0) {
        return Err(ContractError::NomenclatureAlreadyLoaded);
    }
    table_from(env, &SPECIALTIES_SECOND_PHASE, &mut specialties);
    env.storage().instance().set(&SPECIALTIES, &specialties);
    Ok(specialties.len())
}

/// Read-only snapshot of both tables, handed to validation code.
#[derive(Clone, Debug)]
pub struct Nomenclature {
    rights: Map<u32, String>,
    specialties: Map<u32, String>,
}

impl Nomenclature {
    pub fn load(env: &Env) -> Self {
        Self {
            rights: env
                .storage()
                .instance()
                .get(&RIGHTS)
                .unwrap_or(Map::new(env)),
            specialties: env
                .storage()
                .instance()
                .get(&SPECIALTIES)
                .unwrap_or(Map::new(env)),
        }
    }

    /// Parses a raw right id; the rights table must have been written.
    pub fn validate_right(&self, id: u32) -> Result<Right, ContractError> {
        let right = Right::from_id(id)?;
        if self.rights.is_empty() {
            return Err(ContractError::NomenclatureNotLoaded);
        }
        Ok(right)
    }

    pub fn validate_specialty(&self, id: u32) -> Result<(), ContractError> {
        if self.specialties.is_empty() {
            return Err(ContractError::NomenclatureNotLoaded);
        }
        if !self.specialties.contains_key(id) {
            return Err(ContractError::InvalidSpecialty);
        }
        Ok(())
    }

    pub fn right_name(&self, id: u32) -> Option<String> {
        self.rights.get(id)
    }

    pub fn specialty_name(&self, id: u32) -> Option<String> {
        self.specialties.get(id)
    }
}
