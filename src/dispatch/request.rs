use crate::database::sql_param::SqlParam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteClass {
    /// Commutative; applied concurrently in any order
    Unordered,
    /// Applied one at a time in submission order
    Ordered
}

/// A statement template plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub query: &'static str,
    pub params: Vec<SqlParam>,
    pub class: WriteClass
}

impl WriteRequest {
    pub fn unordered(query: &'static str, params: Vec<SqlParam>) -> Self {
        WriteRequest {
            query,
            params,
            class: WriteClass::Unordered
        }
    }

    pub fn ordered(query: &'static str, params: Vec<SqlParam>) -> Self {
        WriteRequest {
            query,
            params,
            class: WriteClass::Ordered
        }
    }
}
