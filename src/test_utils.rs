//! Helpers for the unit tests

use std::path::Path;

/// Sets an environment variable for the lifetime of the guard, restoring the
/// previous value (or absence) on drop, even when the test panics.
pub struct EnvVarGuard {
    name: String,
    prev_value: Option<String>,
}

impl EnvVarGuard {
    pub fn new(
        name: impl Into<String>,
        value: &str,
    ) -> Self {
        let name = name.into();
        let prev_value = std::env::var(&name).ok();
        std::env::set_var(&name, value);
        Self { name, prev_value }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev_value {
            Some(val) => std::env::set_var(&self.name, val),
            None => std::env::remove_var(&self.name),
        }
    }
}

/// Write `content` to `path`, creating missing parent directories.
pub fn write_file(
    path: &Path,
    content: &str,
) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
