//! The closed set of element types a channel may hold.
//!
//! The position of a type in [`ElementKind`] is its stable type index:
//!
//! | index | type  |
//! |-------|-------|
//! | 0     | `i8`  |
//! | 1     | `u8`  |
//! | 2     | `i16` |
//! | 3     | `u16` |
//! | 4     | `i32` |
//! | 5     | `u32` |
//! | 6     | `f32` |
//! | 7     | `f64` |

use std::fmt::Debug;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::channel::Channel;
use crate::variant::VariantChannel;

/// Runtime tag of the element type stored in a [`VariantChannel`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    EnumIter,
    AsRefStr,
    Display,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ElementKind {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        use ElementKind::*;
        [I8, U8, I16, U16, I32, U32, F32, F64].get(index).copied()
    }

    /// Short type name, e.g. `"f32"`.
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::I8 => "i8",
            ElementKind::U8 => "u8",
            ElementKind::I16 => "i16",
            ElementKind::U16 => "u16",
            ElementKind::I32 => "i32",
            ElementKind::U32 => "u32",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
        }
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Implemented by exactly the element types listed in [`ElementKind`].
pub trait ChannelElement:
    sealed::Sealed + Copy + Default + PartialEq + Debug + Serialize + DeserializeOwned + 'static
{
    const KIND: ElementKind;
    const INDEX: usize = Self::KIND as usize;

    /// Boxes a typed channel into the matching variant.
    fn wrap(channel: Channel<Self>) -> VariantChannel;

    /// Borrows the typed channel if `variant` holds this type.
    fn peek(variant: &VariantChannel) -> Option<&Channel<Self>>;
}
