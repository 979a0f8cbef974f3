use bytes::BytesMut;
use chrono::{DateTime, Utc};
use postgres_types::{to_sql_checked, IsNull, ToSql, Type};
use std::error::Error;

/// A positional statement parameter.
///
/// Write requests carry their parameters as plain values so they can be
/// queued, logged and inspected before postgres ever sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i32),
    BigInt(Option<i64>),
    Double(Option<f64>),
    Text(String),
    Timestamp(DateTime<Utc>)
}

impl SqlParam {
    pub fn as_big_int(&self) -> Option<i64> {
        match self {
            SqlParam::BigInt(v) => *v,
            _ => None
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            SqlParam::Double(v) => *v,
            _ => None
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            SqlParam::Int(v) => Some(*v),
            _ => None
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlParam::Int(v) => v.to_sql(ty, out),
            SqlParam::BigInt(v) => v.to_sql(ty, out),
            SqlParam::Double(v) => v.to_sql(ty, out),
            SqlParam::Text(v) => v.to_sql(ty, out),
            SqlParam::Timestamp(v) => v.to_sql(ty, out)
        }
    }

    fn accepts(ty: &Type) -> bool {
        <i32 as ToSql>::accepts(ty)
            || <i64 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <String as ToSql>::accepts(ty)
            || <DateTime<Utc> as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}
