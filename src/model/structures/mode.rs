use serde_repr::{Deserialize_repr, Serialize_repr};
use std::{convert::TryFrom, fmt};
use strum_macros::EnumIter;

/// Play discipline. The discriminant matches `scores.play_mode`.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
#[repr(u8)]
pub enum Mode {
    Std = 0,
    Taiko = 1,
    Ctb = 2,
    Mania = 3
}

impl Mode {
    /// Column and key suffix used for this mode across the site
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Std => "std",
            Mode::Taiko => "taiko",
            Mode::Ctb => "ctb",
            Mode::Mania => "mania"
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<i32> for Mode {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Mode::Std),
            1 => Ok(Mode::Taiko),
            2 => Ok(Mode::Ctb),
            3 => Ok(Mode::Mania),
            _ => Err(())
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
