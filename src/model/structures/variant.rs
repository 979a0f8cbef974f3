use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;
use strum_macros::EnumIter;

/// Ruleset flag orthogonal to [`Mode`](super::mode::Mode). Matches `scores.is_relax`.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
#[repr(u8)]
pub enum Variant {
    Classic = 0,
    Relax = 1
}

impl Variant {
    /// Table holding the cached per-user statistics for this variant
    pub fn stats_table(&self) -> &'static str {
        match self {
            Variant::Classic => "users_stats",
            Variant::Relax => "users_stats_relax"
        }
    }
}

impl TryFrom<i32> for Variant {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Variant::Classic),
            1 => Ok(Variant::Relax),
            _ => Err(())
        }
    }
}
