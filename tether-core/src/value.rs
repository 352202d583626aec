use std::fmt::{self, Display, Write};
use time::PrimitiveDateTime;
use uuid::Uuid;

/// Dynamically typed value used for statement arguments and row cells.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Varchar(String),
    Blob(Box<[u8]>),
    Timestamp(PrimitiveDateTime),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(..) | Value::UInt(..) | Value::Float(..))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Boolean(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            Value::Blob(v) => std::str::from_utf8(v).ok(),
            _ => None,
        }
    }

    /// Appends the literal form used to reconstruct a statement: numbers bare, `NULL` bare,
    /// everything else double quoted.
    pub fn write_literal(&self, out: &mut String) {
        let _ = match self {
            Value::Null => out.write_str("NULL"),
            Value::Int(..) | Value::UInt(..) | Value::Float(..) => write!(out, "{}", self),
            _ => write!(out, "\"{}\"", self),
        };
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Varchar(v) => f.write_str(v),
            Value::Blob(v) => f.write_str(&String::from_utf8_lossy(v)),
            Value::Timestamp(v) => write!(f, "{} {}", v.date(), v.time()),
            Value::Uuid(v) => write!(f, "{}", v.hyphenated()),
        }
    }
}

macro_rules! impl_from_value {
    ($variant:ident, $target:ty, $($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

impl_from_value!(Boolean, bool, bool);
impl_from_value!(Int, i64, i8, i16, i32, i64);
impl_from_value!(UInt, u64, u8, u16, u32, u64);
impl_from_value!(Float, f64, f32, f64);
impl_from_value!(Varchar, String, String, &str, char);
impl_from_value!(Blob, Box<[u8]>, Vec<u8>, &[u8]);
impl_from_value!(Timestamp, PrimitiveDateTime, PrimitiveDateTime);
impl_from_value!(Uuid, Uuid, Uuid);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
