use crate::Environment;
use std::{
    fmt::Arguments,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static DEBUG: AtomicBool = AtomicBool::new(false);

/// Turns verbose mode on for every connection, whatever their environment says.
pub fn set_verbose(value: bool) {
    VERBOSE.store(value, Ordering::Relaxed);
}

/// Turns debug mode on for every connection, whatever their environment says.
pub fn set_debug(value: bool) {
    DEBUG.store(value, Ordering::Relaxed);
}

pub fn is_verbose(env: &Environment) -> bool {
    VERBOSE.load(Ordering::Relaxed) || env.verbose
}

pub fn is_debug(env: &Environment) -> bool {
    DEBUG.load(Ordering::Relaxed) || env.debug
}

/// Log targets of a connection: one for regular output, one for errors.
///
/// Records are emitted through the `log` facade, every line is prefixed with the connection
/// identity `(driver:user@host:port - alias)`.
#[derive(Debug, Clone)]
pub struct LogTargets {
    out: Arc<str>,
    err: Arc<str>,
    prefix: Arc<str>,
}

impl LogTargets {
    pub fn new(env: &Environment) -> Self {
        let name = if env.alias.is_empty() {
            "default".to_string()
        } else {
            env.alias.to_lowercase()
        };
        Self {
            out: format!("tether::{name}").into(),
            err: format!("tether::{name}::error").into(),
            prefix: format!(
                "({}:{}@{}:{} - {})",
                env.driver, env.user, env.host, env.port, env.alias
            )
            .into(),
        }
    }

    /// Replaces the targets, `None` keeps the current one.
    pub fn set(&mut self, out: Option<&str>, err: Option<&str>) {
        if let Some(out) = out {
            self.out = out.into();
        }
        if let Some(err) = err {
            self.err = err.into();
        }
    }

    pub fn out_target(&self) -> &str {
        &self.out
    }

    pub fn err_target(&self) -> &str {
        &self.err
    }

    pub fn info(&self, args: Arguments<'_>) {
        log::info!(target: &*self.out, "{} ➜ {}", self.prefix, args);
    }

    pub fn debug(&self, args: Arguments<'_>) {
        log::debug!(target: &*self.out, "{} ➜ {}", self.prefix, args);
    }

    pub fn error(&self, args: Arguments<'_>) {
        log::error!(target: &*self.err, "{} ➜ ERROR: {}", self.prefix, args);
    }
}
