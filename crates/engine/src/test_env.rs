//! Serialized access to process environment variables in tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    keys: Vec<&'static str>,
}

impl EnvGuard {
    pub(crate) fn new(vars: &[(&'static str, &str)]) -> Self {
        let lock = env_lock();
        let mut keys = Vec::new();
        for (key, value) in vars {
            // SAFETY: env access is serialized by `env_lock`.
            unsafe { std::env::set_var(key, value) };
            keys.push(*key);
        }
        Self { _lock: lock, keys }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // SAFETY: still holding the env lock.
            unsafe { std::env::remove_var(key) };
        }
    }
}
