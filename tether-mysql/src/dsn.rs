use mysql_async::{Opts, OptsBuilder, PoolConstraints, PoolOpts};
use tether_core::{Environment, Error, ErrorContext, Result};
use url::Url;

/// Parts of a `user:pass@protocol(address)/schema?key=value&..` data source name.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub user: String,
    pub pass: String,
    pub protocol: String,
    pub address: String,
    pub schema: String,
    pub params: Vec<(String, String)>,
}

impl Dsn {
    pub fn parse(dsn: &str) -> Result<Self> {
        let Some((left, right)) = dsn.rsplit_once('/') else {
            return Err(Error::msg(
                "The data source name is missing the `/` before the schema",
            ));
        };
        let mut result = Dsn::default();
        let net = match left.rsplit_once('@') {
            Some((credentials, net)) => {
                match credentials.split_once(':') {
                    Some((user, pass)) => {
                        result.user = user.into();
                        result.pass = pass.into();
                    }
                    None => result.user = credentials.into(),
                }
                net
            }
            None => left,
        };
        match net.split_once('(') {
            Some((protocol, address)) => {
                let Some(address) = address.strip_suffix(')') else {
                    return Err(Error::msg(format!(
                        "The address of the data source name is not closed: `{}`",
                        net
                    )));
                };
                result.protocol = protocol.into();
                result.address = address.into();
            }
            None => result.protocol = net.into(),
        }
        let (schema, params) = right.split_once('?').unwrap_or((right, ""));
        result.schema = schema.into();
        result.params = params
            .split('&')
            .filter(|v| !v.is_empty())
            .map(|v| {
                let (key, value) = v.split_once('=').unwrap_or((v, ""));
                (key.to_string(), value.to_string())
            })
            .collect();
        Ok(result)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Host and port of a tcp address, the port defaults to 3306.
    pub fn host_port(&self) -> Result<(&str, u16)> {
        let address = self.address.as_str();
        let (host, port) = match address.strip_prefix('[') {
            Some(rest) => match rest.split_once(']') {
                Some((host, port)) => (host, port.strip_prefix(':')),
                None => return Err(Error::msg(format!("Invalid address `{}`", address))),
            },
            None => match address.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (address, None),
            },
        };
        let port = match port {
            Some(port) => port
                .parse()
                .with_context(|| format!("Invalid port `{}`", port))?,
            None => 3306,
        };
        Ok((if host.is_empty() { "127.0.0.1" } else { host }, port))
    }
}

impl std::fmt::Debug for Dsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dsn")
            .field("user", &self.user)
            .field("pass", &if self.pass.is_empty() { "" } else { "***" })
            .field("protocol", &self.protocol)
            .field("address", &self.address)
            .field("schema", &self.schema)
            .field("params", &self.params)
            .finish()
    }
}

/// Builds the `mysql_async` options for `env`: its connection string (a `mysql://` url or a
/// data source name) plus the pool limits.
pub fn options(env: &Environment) -> Result<Opts> {
    let connection_string = env.connection_string();
    let mut charset = env.charset.clone();
    let builder = if connection_string.starts_with("mysql://") {
        let url = Url::parse(&connection_string).context("While parsing the mysql url")?;
        OptsBuilder::from_opts(Opts::from_url(url.as_str()).context("While reading the mysql url")?)
    } else {
        let dsn = Dsn::parse(&connection_string)?;
        if let Some(value) = dsn.param("charset") {
            charset = value.to_string();
        }
        let builder = OptsBuilder::default()
            .user(Some(dsn.user.as_str()).filter(|v| !v.is_empty()))
            .pass(Some(dsn.pass.as_str()).filter(|v| !v.is_empty()))
            .db_name(Some(dsn.schema.as_str()).filter(|v| !v.is_empty()));
        match dsn.protocol.as_str() {
            "unix" => builder.socket(Some(dsn.address.as_str())),
            "" | "tcp" | "tcp4" | "tcp6" => {
                let (host, port) = dsn.host_port()?;
                builder.ip_or_hostname(host).tcp_port(port)
            }
            protocol => {
                return Err(Error::msg(format!(
                    "Protocol `{}` is not supported by MySQL",
                    protocol
                )));
            }
        }
    };
    let mut builder = builder.pool_opts(pool_options(env));
    if !charset.is_empty() {
        if !charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::msg(format!("Invalid charset `{}`", charset)));
        }
        builder = builder.init(vec![format!("SET NAMES {}", charset)]);
    }
    Ok(builder.into())
}

fn pool_options(env: &Environment) -> PoolOpts {
    let max = env.max_open.max(1);
    let min = env.max_idle.min(max);
    let mut result = PoolOpts::default();
    if let Some(constraints) = PoolConstraints::new(min, max) {
        result = result.with_constraints(constraints);
    }
    if !env.max_lifetime.is_zero() {
        result = result.with_abs_conn_ttl(Some(env.max_lifetime));
    }
    result
}
