use time::{Date, Month, PrimitiveDateTime, Time};
use tether_core::Value;

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl mysql_async::prelude::FromValue for ValueWrap {
    type Intermediate = ValueWrap;
}

impl TryFrom<mysql_async::Value> for ValueWrap {
    type Error = mysql_async::FromValueError;
    fn try_from(value: mysql_async::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Bytes(v) => match String::from_utf8(v) {
                Ok(v) => Value::Varchar(v),
                Err(e) => Value::Blob(e.into_bytes().into()),
            },
            mysql_async::Value::Int(v) => Value::Int(v),
            mysql_async::Value::UInt(v) => Value::UInt(v),
            mysql_async::Value::Float(v) => Value::Float(v.into()),
            mysql_async::Value::Double(v) => Value::Float(v),
            mysql_async::Value::Date(year, month, day, hour, minute, second, microsecond) => {
                let month = Month::try_from(month)
                    .map_err(|_| mysql_async::FromValueError(value.clone()))?;
                Value::Timestamp(PrimitiveDateTime::new(
                    Date::from_calendar_date(year as _, month, day)
                        .map_err(|_| mysql_async::FromValueError(value.clone()))?,
                    Time::from_hms_micro(hour, minute, second, microsecond)
                        .map_err(|_| mysql_async::FromValueError(value.clone()))?,
                ))
            }
            mysql_async::Value::Time(negative, days, hours, minutes, seconds, micro) => {
                let sign = if negative { "-" } else { "" };
                Value::Varchar(format!(
                    "{sign}{:02}:{minutes:02}:{seconds:02}.{micro:06}",
                    days * 24 + hours as u32
                ))
            }
        }
        .into())
    }
}

impl TryFrom<ValueWrap> for mysql_async::Value {
    type Error = tether_core::Error;

    fn try_from(value: ValueWrap) -> Result<Self, Self::Error> {
        type MySQLValue = mysql_async::Value;
        Ok(match value.0 {
            Value::Null => MySQLValue::NULL,
            Value::Boolean(v) => MySQLValue::from(v),
            Value::Int(v) => MySQLValue::Int(v),
            Value::UInt(v) => MySQLValue::UInt(v),
            Value::Float(v) => MySQLValue::Double(v),
            Value::Varchar(v) => MySQLValue::Bytes(v.into_bytes()),
            Value::Blob(v) => MySQLValue::Bytes(v.into_vec()),
            Value::Timestamp(v) => {
                let year = u16::try_from(v.year()).map_err(|_| {
                    tether_core::Error::msg(format!("Date {} is out of range for MySQL", v))
                })?;
                MySQLValue::Date(
                    year,
                    v.month().into(),
                    v.day(),
                    v.hour(),
                    v.minute(),
                    v.second(),
                    v.microsecond(),
                )
            }
            Value::Uuid(v) => MySQLValue::Bytes(v.hyphenated().to_string().into_bytes()),
        })
    }
}

/// Positional parameters of a prepared statement.
pub(crate) fn params(args: &[Value]) -> tether_core::Result<mysql_async::Params> {
    if args.is_empty() {
        return Ok(mysql_async::Params::Empty);
    }
    Ok(mysql_async::Params::Positional(
        args.iter()
            .map(|v| mysql_async::Value::try_from(ValueWrap(v.clone())))
            .collect::<tether_core::Result<_>>()?,
    ))
}
