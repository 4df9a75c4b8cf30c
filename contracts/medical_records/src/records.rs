//! Per-patient record book: one timestamp-ordered log per specialty.
//!
//! Entries are appended with the ledger timestamp of the write, so each log
//! is sorted ascending by construction and range queries can start from a
//! binary-searched position.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Map, String, Symbol, Vec};

use crate::interval::Interval;
use crate::ContractError;

const TTL_THRESHOLD: u32 = 5184000;
const TTL_EXTEND_TO: u32 = 10368000;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordEntry {
    pub timestamp: u64,
    pub hash: String,
    pub doctor: Address,
    pub description: String,
}

pub type RecordBook = Map<u32, Vec<RecordEntry>>;

fn book_key(patient: &Address) -> (Symbol, Address) {
    (symbol_short!("RECORDS"), patient.clone())
}

pub fn get_book(env: &Env, patient: &Address) -> Option<RecordBook> {
    env.storage().persistent().get(&book_key(patient))
}

fn set_book(env: &Env, patient: &Address, book: &RecordBook) {
    let key = book_key(patient);
    env.storage().persistent().set(&key, book);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Opens an empty book for a newly registered patient.
pub fn create_book(env: &Env, patient: &Address) {
    set_book(env, patient, &Map::new(env));
}

pub fn remove_book(env: &Env, patient: &Address) {
    env.storage().persistent().remove(&book_key(patient));
}

/// Appends `entry` to the patient's log for `specialty`.
pub fn append(env: &Env, patient: &Address, specialty: u32, entry: RecordEntry) {
    let mut book = get_book(env, patient).unwrap_or(Map::new(env));
    let mut log = book.get(specialty).unwrap_or(Vec::new(env));
    log.push_back(entry);
    book.set(specialty, log);
    set_book(env, patient, &book);
}

/// Index of the first element whose key is `>= target`, or `len` if none.
///
/// `key_at(i)` must be non-decreasing in `i`. On a miss the returned index is
/// the insertion point, which callers use directly as a scan start.
pub fn lower_bound<F: Fn(u32) -> u64>(len: u32, target: u64, key_at: F) -> u32 {
    let mut low = 0u32;
    let mut high = len;
    while low < high {
        let middle = low + (high - low) / 2;
        if key_at(middle) < target {
            low = middle + 1;
        } else {
            high = middle;
        }
    }
    low
}

/// Entries of `log` with `interval.from <= timestamp <= interval.to`.
pub fn entries_in_range(env: &Env, log: &Vec<RecordEntry>, interval: &Interval) -> Vec<RecordEntry> {
    let mut selected = Vec::new(env);
    let start = lower_bound(log.len(), interval.from, |i| {
        log.get_unchecked(i).timestamp
    });
    for index in start..log.len() {
        let entry = log.get_unchecked(index);
        if entry.timestamp > interval.to {
            break;
        }
        selected.push_back(entry);
    }
    selected
}

/// Entries for each of `specialties` inside `interval`. Specialties without
/// any entry in range are left out of the result.
pub fn query(
    env: &Env,
    patient: &Address,
    specialties: &Vec<u32>,
    interval: &Interval,
) -> RecordBook {
    let mut result = Map::new(env);
    let book = match get_book(env, patient) {
        Some(book) => book,
        None => return result,
    };
    for specialty in specialties.iter() {
        if let Some(log) = book.get(specialty) {
            let selected = entries_in_range(env, &log, interval);
            if !selected.is_empty() {
                result.set(specialty, selected);
            }
        }
    }
    result
}

/// Removes the first entry of `specialty` whose hash equals `hash`.
pub fn remove_by_hash(
    env: &Env,
    patient: &Address,
    specialty: u32,
    hash: &String,
) -> Result<RecordEntry, ContractError> {
    let mut book = get_book(env, patient).ok_or(ContractError::PatientNotRegistered)?;
    let mut log = book
        .get(specialty)
        .ok_or(ContractError::NoRecordsForSpecialty)?;

    let mut position = None;
    for (index, entry) in log.iter().enumerate() {
        if entry.hash == *hash {
            position = Some(index as u32);
            break;
        }
    }
    let index = position.ok_or(ContractError::RecordNotFound)?;
    let removed = log.get_unchecked(index);
    log.remove(index);

    book.set(specialty, log);
    set_book(env, patient, &book);
    Ok(removed)
}
