use crate::{Value, truncate_long};
use std::fmt::{self, Display};

/// Anything that carries SQL text with `?` placeholders and its positional arguments.
pub trait Statement: Send + Sync {
    fn sql(&self) -> &str;
    fn args(&self) -> &[Value];
}

/// A plain statement: SQL text plus the values bound to its placeholders.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    args: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, V>(sql: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            sql: sql.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

impl Statement for Query {
    fn sql(&self) -> &str {
        &self.sql
    }
    fn args(&self) -> &[Value] {
        &self.args
    }
}

impl Statement for str {
    fn sql(&self) -> &str {
        self
    }
    fn args(&self) -> &[Value] {
        &[]
    }
}

impl Statement for String {
    fn sql(&self) -> &str {
        self
    }
    fn args(&self) -> &[Value] {
        &[]
    }
}

impl<S: Statement + ?Sized> Statement for &S {
    fn sql(&self) -> &str {
        (**self).sql()
    }
    fn args(&self) -> &[Value] {
        (**self).args()
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}
