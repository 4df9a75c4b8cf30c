//! # Deferred Task Scheduler
//!
//! Soroban has no native deferred transactions, so delayed work is modelled
//! as a table of scheduled tasks in persistent storage. A task is addressed by
//! a caller-assigned [`TaskHandle`] (`owner` scope + numeric `key`); scheduling
//! the same handle twice replaces the previous task. Nothing runs on its own:
//! a keeper (any account) calls back into the owning contract once the due
//! time has passed, and the contract consumes the task with [`take_due`].
//!
//! Each owner has its own sweep index listing its outstanding keys, so the
//! size of any single storage entry grows with one owner's tasks only.
//!
//! ## Usage pattern
//!
//! ```ignore
//! let handle = scheduler::schedule(&env, &patient, grant_id, delay)?;
//! // ... later, on update or removal
//! scheduler::cancel(&env, &handle);
//! // ... or, from the keeper entry point
//! if let Some(task) = scheduler::take_due(&env, &handle)? { /* fire */ }
//! ```

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::CommonError;

// ── Types ────────────────────────────────────────────────────────────────────

/// Identifies a scheduled task. The owner scopes the key so that two owners
/// may use the same numeric key independently.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskHandle {
    pub owner: Address,
    pub key: u64,
}

/// A pending deferred task.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduledTask {
    pub handle: TaskHandle,
    /// Ledger timestamp at which the task was (re)scheduled.
    pub scheduled_at: u64,
    /// Ledger timestamp from which the task may fire.
    pub due_at: u64,
}

impl ScheduledTask {
    pub fn is_due(&self, now: u64) -> bool {
        now >= self.due_at
    }
}

// ── Storage keys ─────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum SchedulerKey {
    Task(Address, u64),
    Queue(Address),
}

// ── TTL constants (mirror common convention) ─────────────────────────────────

const TTL_THRESHOLD: u32 = 5_184_000;
const TTL_EXTEND_TO: u32 = 10_368_000;

// ── Internal helpers ─────────────────────────────────────────────────────────

fn task_key(handle: &TaskHandle) -> SchedulerKey {
    SchedulerKey::Task(handle.owner.clone(), handle.key)
}

fn load_queue(env: &Env, owner: &Address) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&SchedulerKey::Queue(owner.clone()))
        .unwrap_or(Vec::new(env))
}

fn store_queue(env: &Env, owner: &Address, queue: &Vec<u64>) {
    let key = SchedulerKey::Queue(owner.clone());
    if queue.is_empty() {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, queue);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn dequeue(env: &Env, handle: &TaskHandle) {
    let mut queue = load_queue(env, &handle.owner);
    if let Some(index) = queue.first_index_of(handle.key) {
        queue.remove(index);
        store_queue(env, &handle.owner, &queue);
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Schedule (or reschedule) the task for `(owner, key)` to become due
/// `delay` seconds from the current ledger timestamp.
///
/// Returns [`CommonError::DelayOverflow`] if the due time overflows.
pub fn schedule(
    env: &Env,
    owner: &Address,
    key: u64,
    delay: u64,
) -> Result<TaskHandle, CommonError> {
    let now = env.ledger().timestamp();
    let due_at = now.checked_add(delay).ok_or(CommonError::DelayOverflow)?;

    let handle = TaskHandle {
        owner: owner.clone(),
        key,
    };
    let task = ScheduledTask {
        handle: handle.clone(),
        scheduled_at: now,
        due_at,
    };

    let storage_key = task_key(&handle);
    let replacing = env.storage().persistent().has(&storage_key);
    env.storage().persistent().set(&storage_key, &task);
    env.storage()
        .persistent()
        .extend_ttl(&storage_key, TTL_THRESHOLD, TTL_EXTEND_TO);

    if !replacing {
        let mut queue = load_queue(env, owner);
        queue.push_back(key);
        store_queue(env, owner, &queue);
    }

    Ok(handle)
}

/// Cancel the task addressed by `handle`.
///
/// Returns `false` when no task was outstanding.
pub fn cancel(env: &Env, handle: &TaskHandle) -> bool {
    let storage_key = task_key(handle);
    if !env.storage().persistent().has(&storage_key) {
        return false;
    }
    env.storage().persistent().remove(&storage_key);
    dequeue(env, handle);
    true
}

/// Look up the outstanding task for `handle`, if any.
pub fn get_task(env: &Env, handle: &TaskHandle) -> Option<ScheduledTask> {
    env.storage().persistent().get(&task_key(handle))
}

/// Consume the task for `handle` if it is due.
///
/// - `Ok(None)`: nothing is scheduled under this handle.
/// - `Err(TaskNotDue)`: a task exists but `due_at` lies in the future; it is
///   left in place.
/// - `Ok(Some(task))`: the task was due and has been removed.
pub fn take_due(env: &Env, handle: &TaskHandle) -> Result<Option<ScheduledTask>, CommonError> {
    let task = match get_task(env, handle) {
        Some(task) => task,
        None => return Ok(None),
    };
    if !task.is_due(env.ledger().timestamp()) {
        return Err(CommonError::TaskNotDue);
    }
    env.storage().persistent().remove(&task_key(handle));
    dequeue(env, handle);
    Ok(Some(task))
}

/// Return up to `limit` of `owner`'s handles whose tasks are due, in
/// scheduling order.
pub fn due_handles(env: &Env, owner: &Address, limit: u32) -> Vec<TaskHandle> {
    let now = env.ledger().timestamp();
    let mut due = Vec::new(env);
    for key in load_queue(env, owner).iter() {
        if due.len() >= limit {
            break;
        }
        let handle = TaskHandle {
            owner: owner.clone(),
            key,
        };
        if let Some(task) = get_task(env, &handle) {
            if task.is_due(now) {
                due.push_back(handle);
            }
        }
    }
    due
}

/// Number of tasks `owner` currently has outstanding.
pub fn pending_count(env: &Env, owner: &Address) -> u32 {
    load_queue(env, owner).len()
}

// ── Tests ────────────────────────────────────────────────────────────────────
