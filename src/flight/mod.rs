//! Per-key coalescing of concurrent loads.
//!
//! When several tasks miss the cache on the same key at once, only the
//! first one (the originator) runs the load; the rest wait on the same call
//! record and receive a clone of the originator's result, success or error.
//! Distinct keys never block each other.
//!
//! The group mutex is held only to install or remove a call record, never
//! across the load itself. If an originator's future is dropped mid-load,
//! the record is withdrawn and the waiters wake up to elect a new
//! originator, so a cancelled caller cannot strand the others.


use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::Notify;

use crate::error::CacheError;

/// One in-flight (or just-completed) load for a single key.
struct Call<T> {
    notify: Notify,
    result: OnceLock<Result<T, CacheError>>,
}

impl<T> Call<T> {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: OnceLock::new(),
        }
    }
}

enum Role<T> {
    Originate(Arc<Call<T>>),
    Join(Arc<Call<T>>),
}

/// Deduplicates concurrent executions keyed by string.
pub struct FlightGroup<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> FlightGroup<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` for `key`, unless a call for the same key is already in
    /// flight, in which case the in-flight result is awaited and shared.
    ///
    /// The call record is removed before this returns to the originator, so
    /// a later `run` for the same key executes `f` afresh. Errors are
    /// broadcast to every waiter unchanged and are never memoized.
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> Result<T, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let mut f = Some(f);
        loop {
            let role = {
                let mut calls = self.calls.lock().expect("flight mutex poisoned");
                match calls.get(key) {
                    Some(call) => Role::Join(call.clone()),
                    None => {
                        let call = Arc::new(Call::new());
                        calls.insert(key.to_string(), call.clone());
                        Role::Originate(call)
                    }
                }
            };

            match role {
                Role::Originate(call) => {
                    let mut guard = AbortGuard {
                        calls: &self.calls,
                        key,
                        call: &call,
                        armed: true,
                    };

                    let func = f.take().expect("originator role claimed twice");
                    let result = func().await;
                    let _ = call.result.set(result.clone());

                    // Release the waiters, then retire the record so the
                    // next arrival starts a fresh flight.
                    call.notify.notify_waiters();
                    remove_call(&self.calls, key, &call);
                    guard.armed = false;

                    return result;
                }
                Role::Join(call) => {
                    let notified = call.notify.notified();
                    if let Some(result) = call.result.get() {
                        return result.clone();
                    }
                    notified.await;
                    if let Some(result) = call.result.get() {
                        return result.clone();
                    }
                    // The originator was dropped before finishing; go
                    // around and contend for the originator role.
                }
            }
        }
    }
}

impl<T: Clone> Default for FlightGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_call<T>(calls: &Mutex<HashMap<String, Arc<Call<T>>>>, key: &str, call: &Arc<Call<T>>) {
    let mut calls = calls.lock().expect("flight mutex poisoned");
    if let Some(current) = calls.get(key) {
        if Arc::ptr_eq(current, call) {
            calls.remove(key);
        }
    }
}

/// Withdraws the call record if the originator is dropped before storing a
/// result, and wakes the waiters so one of them can take over.
struct AbortGuard<'a, T> {
    calls: &'a Mutex<HashMap<String, Arc<Call<T>>>>,
    key: &'a str,
    call: &'a Arc<Call<T>>,
    armed: bool,
}

impl<T> Drop for AbortGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            remove_call(self.calls, self.key, self.call);
            self.call.notify.notify_waiters();
        }
    }
}
