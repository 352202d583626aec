use crate::{
    DbError, Result,
    parse::{parse_bool, parse_duration, parse_int},
};
use std::{borrow::Cow, env, fmt, path::PathBuf, time::Duration};

pub const DEFAULT_DRIVER: &str = "mysql";
pub const DEFAULT_PROTOCOL: &str = "tcp";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_HOST: &str = "172.18.0.1";
pub const DEFAULT_PORT: &str = "3306";
pub const DEFAULT_MAX_IDLE: usize = 1;
pub const DEFAULT_MAX_OPEN: usize = 2;
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(1800);
pub const DEFAULT_PROFILER_OUTPUT: &str = "profiler";

/// Suffixes of the `DATABASE_*` variables, also used as `DATABASE_<ALIAS>_*`.
const KEYS: &[&str] = &[
    "DSN",
    "DRIVER",
    "PROTOCOL",
    "HOST",
    "PORT",
    "USER",
    "PASS",
    "CHARSET",
    "SCHEMA",
    "MODE",
    "PARSETIME",
    "AUTOCONNECT",
    "MAXOPEN",
    "MAXIDLE",
    "MAXLIFETIME",
    "PROFILER_ENABLE",
    "PROFILER_OUTPUT",
    "VERBOSE",
    "DEBUG",
    "ERROR_NOROWS",
];

/// Resolved parameters of a database target.
///
/// Built from the process environment with [`Environment::from_env`] (optionally overlaid with
/// an alias through [`Environment::load`]) or by hand. [`Environment::validate`] must succeed
/// before the environment is used to open a connection: it checks the credentials and fills
/// every unset field with its default. Connections keep the validated value read-only.
#[derive(Default, Clone, PartialEq)]
pub struct Environment {
    pub alias: String,
    pub dsn: String,
    pub driver: String,
    pub protocol: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    pub charset: String,
    pub schema: String,
    pub mode: String,
    pub parse_time: bool,
    pub autoconnect: bool,
    pub max_open: usize,
    pub max_idle: usize,
    pub max_lifetime: Duration,
    pub profiler_enable: bool,
    pub profiler_output: PathBuf,
    pub verbose: bool,
    pub debug: bool,
    pub error_no_rows: bool,
}

impl Environment {
    /// Reads the unscoped `DATABASE_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Environment::from_env`] reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut result = Self::default();
        for key in KEYS {
            if let Some(value) = lookup(&format!("DATABASE_{key}")) {
                result.set(key, value);
            }
        }
        result
    }

    /// Overlays the `DATABASE_<ALIAS>_*` variables and records the alias.
    pub fn load(&mut self, alias: &str) {
        self.load_with(alias, |key| env::var(key).ok())
    }

    pub fn load_with(&mut self, alias: &str, lookup: impl Fn(&str) -> Option<String>) {
        self.alias = alias.trim().to_uppercase();
        if self.alias.is_empty() {
            return;
        }
        for key in KEYS {
            if let Some(value) = lookup(&format!("DATABASE_{}_{key}", self.alias)) {
                self.set(key, value);
            }
        }
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "DSN" => self.dsn = value,
            "DRIVER" => self.driver = value,
            "PROTOCOL" => self.protocol = value,
            "HOST" => self.host = value,
            "PORT" => self.port = value,
            "USER" => self.user = value,
            "PASS" => self.pass = value,
            "CHARSET" => self.charset = value,
            "SCHEMA" => self.schema = value,
            "MODE" => self.mode = value,
            "PARSETIME" => self.parse_time = parse_bool(&value),
            "AUTOCONNECT" => self.autoconnect = parse_bool(&value),
            "MAXOPEN" => self.max_open = parse_int(&value),
            "MAXIDLE" => self.max_idle = parse_int(&value),
            "MAXLIFETIME" => self.max_lifetime = parse_duration(&value),
            "PROFILER_ENABLE" => self.profiler_enable = parse_bool(&value),
            "PROFILER_OUTPUT" => self.profiler_output = value.into(),
            "VERBOSE" => self.verbose = parse_bool(&value),
            "DEBUG" => self.debug = parse_bool(&value),
            "ERROR_NOROWS" => self.error_no_rows = parse_bool(&value),
            _ => log::warn!("Unknown environment key `{}`", key),
        }
    }

    /// Checks the credentials and applies the defaults.
    pub fn validate(&mut self) -> Result<()> {
        if self.dsn.is_empty() {
            if self.user.is_empty() {
                return Err(DbError::MissingUser.into());
            }
            if self.pass.is_empty() {
                return Err(DbError::MissingPass.into());
            }
        }
        fn or_default(field: &mut String, default: &str) {
            if field.is_empty() {
                *field = default.to_string();
            }
        }
        or_default(&mut self.driver, DEFAULT_DRIVER);
        or_default(&mut self.port, DEFAULT_PORT);
        or_default(&mut self.protocol, DEFAULT_PROTOCOL);
        or_default(&mut self.charset, DEFAULT_CHARSET);
        or_default(&mut self.host, DEFAULT_HOST);
        if self.schema.is_empty() {
            self.schema = self.user.clone();
        }
        if self.max_idle == 0 {
            self.max_idle = DEFAULT_MAX_IDLE;
        }
        if self.max_open == 0 {
            self.max_open = DEFAULT_MAX_OPEN;
        }
        if self.max_lifetime.is_zero() {
            self.max_lifetime = DEFAULT_MAX_LIFETIME;
        }
        if self.profiler_enable && self.profiler_output.as_os_str().is_empty() {
            self.profiler_output = DEFAULT_PROFILER_OUTPUT.into();
        }
        Ok(())
    }

    /// The raw DSN when provided, otherwise `user:pass@protocol(host:port)/schema?charset=..`.
    pub fn connection_string(&self) -> Cow<'_, str> {
        if !self.dsn.is_empty() {
            return Cow::Borrowed(&self.dsn);
        }
        let mut dsn = format!(
            "{}:{}@{}({}:{})/{}?charset={}",
            self.user, self.pass, self.protocol, self.host, self.port, self.schema, self.charset,
        );
        if self.driver == DEFAULT_DRIVER && self.parse_time {
            dsn.push_str("&parseTime=true");
        }
        Cow::Owned(dsn)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &str| if v.is_empty() { "" } else { "***" };
        f.debug_struct("Environment")
            .field("alias", &self.alias)
            .field("dsn", &redacted(&self.dsn))
            .field("driver", &self.driver)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &redacted(&self.pass))
            .field("charset", &self.charset)
            .field("schema", &self.schema)
            .field("mode", &self.mode)
            .field("parse_time", &self.parse_time)
            .field("autoconnect", &self.autoconnect)
            .field("max_open", &self.max_open)
            .field("max_idle", &self.max_idle)
            .field("max_lifetime", &self.max_lifetime)
            .field("profiler_enable", &self.profiler_enable)
            .field("profiler_output", &self.profiler_output)
            .field("verbose", &self.verbose)
            .field("debug", &self.debug)
            .field("error_no_rows", &self.error_no_rows)
            .finish()
    }
}
