//! JSON rendering of record sets returned to callers.

use alloc::collections::BTreeMap;
use alloc::string::{String as StdString, ToString};
use alloc::vec;
use alloc::vec::Vec as StdVec;
use serde::Serialize;
use soroban_sdk::{Env, String};

use crate::nomenclature::Nomenclature;
use crate::records::{RecordBook, RecordEntry};
use crate::ContractError;

#[derive(Debug, Serialize)]
struct RecordJson {
    timestamp: u64,
    hash: StdString,
    doctor: StdString,
    description: StdString,
}

pub(crate) fn to_std_string(value: &String) -> StdString {
    let mut buffer = vec![0u8; value.len() as usize];
    value.copy_into_slice(&mut buffer);
    StdString::from_utf8_lossy(&buffer).into_owned()
}

impl From<&RecordEntry> for RecordJson {
    fn from(entry: &RecordEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            hash: to_std_string(&entry.hash),
            doctor: to_std_string(&entry.doctor.to_string()),
            description: to_std_string(&entry.description),
        }
    }
}

fn entries(book: &RecordBook, specialty: u32) -> StdVec<RecordJson> {
    book.get(specialty)
        .map(|log| log.iter().map(|entry| RecordJson::from(&entry)).collect())
        .unwrap_or_default()
}

fn to_json<T: Serialize>(env: &Env, value: &T) -> Result<String, ContractError> {
    let json = serde_json::to_string(value).map_err(|_| ContractError::RenderFailed)?;
    Ok(String::from_str(env, &json))
}

/// `{"<specialty id>": [record, ...], ...}` in ascending id order.
/// Specialties with no entries are left out.
pub fn by_specialty_id(env: &Env, book: &RecordBook) -> Result<String, ContractError> {
    let mut object: BTreeMap<u32, StdVec<RecordJson>> = BTreeMap::new();
    for specialty in book.keys().iter() {
        let list = entries(book, specialty);
        if !list.is_empty() {
            object.insert(specialty, list);
        }
    }
    to_json(env, &object)
}

/// Same layout as [`by_specialty_id`] but keyed by specialty name.
pub fn by_specialty_name(
    env: &Env,
    book: &RecordBook,
    nomenclature: &Nomenclature,
) -> Result<String, ContractError> {
    let mut object: BTreeMap<StdString, StdVec<RecordJson>> = BTreeMap::new();
    for specialty in book.keys().iter() {
        let list = entries(book, specialty);
        if list.is_empty() {
            continue;
        }
        let name = nomenclature
            .specialty_name(specialty)
            .map(|name| to_std_string(&name))
            .unwrap_or_else(|| specialty.to_string());
        object.insert(name, list);
    }
    to_json(env, &object)
}
