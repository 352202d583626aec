use crate::{Statement, Value};
use std::{fmt, sync::Arc, time::Duration};
use time::OffsetDateTime;

/// Record of one executed statement: its text, arguments, owning context and timing.
///
/// Created when the execution starts, [`QueryState::finish`] stamps the end once. Afterwards
/// the record is immutable and cheap to clone.
#[derive(Debug, Clone)]
pub struct QueryState {
    sql: Arc<str>,
    args: Arc<[Value]>,
    context_id: Arc<str>,
    context_flags: Arc<[String]>,
    start: OffsetDateTime,
    end: Option<OffsetDateTime>,
}

impl QueryState {
    pub fn new<S: Statement + ?Sized>(
        statement: &S,
        context_id: impl Into<Arc<str>>,
        context_flags: impl Into<Arc<[String]>>,
    ) -> Self {
        Self {
            sql: statement.sql().into(),
            args: statement.args().into(),
            context_id: context_id.into(),
            context_flags: context_flags.into(),
            start: OffsetDateTime::now_utc(),
            end: None,
        }
    }

    /// Sets the end time, subsequent calls keep the first one.
    pub fn finish(mut self) -> Self {
        if self.end.is_none() {
            self.end = Some(OffsetDateTime::now_utc());
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn context_flags(&self) -> &[String] {
        &self.context_flags
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// End time, equal to the start until the state is finished.
    pub fn end(&self) -> OffsetDateTime {
        self.end.unwrap_or(self.start)
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    /// `end - start`, clamped to zero if the wall clock went backwards.
    pub fn runtime(&self) -> Duration {
        Duration::try_from(self.end() - self.start).unwrap_or_default()
    }

    /// The statement with every `?` placeholder replaced by the literal of its argument.
    pub fn bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.sql.len());
        let mut args = self.args.iter();
        let mut rest = &*self.sql;
        while let Some(i) = rest.find('?') {
            let Some(arg) = args.next() else {
                break;
            };
            out.push_str(&rest[..i]);
            arg.write_literal(&mut out);
            rest = &rest[i + 1..];
        }
        out.push_str(rest);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Query;

    #[test]
    fn reconstruct() {
        let state = QueryState::new(&Query::new("col1 = ?").bind("test"), "ctx", Vec::<String>::new());
        assert_eq!(state.bytes(), b"col1 = \"test\"");
        let state = QueryState::new(
            &Query::new("a = ? AND b = ? AND c IS ? AND d = ?")
                .bind(12)
                .bind(1.5)
                .bind(Option::<i32>::None)
                .bind("?"),
            "ctx",
            Vec::<String>::new(),
        );
        assert_eq!(
            state.to_string(),
            "a = 12 AND b = 1.5 AND c IS NULL AND d = \"?\""
        );
        let state = QueryState::new(&Query::new("x = ? AND y = ?").bind(true), "ctx", Vec::<String>::new());
        assert_eq!(state.to_string(), "x = \"true\" AND y = ?");
    }

    #[test]
    fn timing() {
        let state = QueryState::new(&"SELECT 1", "ctx", vec!["flag".to_string()]);
        assert!(!state.is_finished());
        assert_eq!(state.runtime(), Duration::ZERO);
        let state = state.finish();
        let end = state.end();
        assert!(state.is_finished());
        assert!(end >= state.start());
        assert_eq!(state.clone().finish().end(), end);
        assert_eq!(state.context_flags(), ["flag".to_string()]);
        assert_eq!(state.context_id(), "ctx");
    }
}
