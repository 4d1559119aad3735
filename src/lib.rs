//! Typed multi-channel attribute store.
//!
//! Point clouds and meshes carry a runtime-chosen set of named attribute
//! arrays: positions, normals, colors, scalar parameters. This crate keeps
//! them in one container while preserving their element types.
//!
//! - [`Channel`]: a shared, row-major `num_elements x width` buffer.
//! - [`VariantChannel`]: one channel of any [`ElementKind`], tagged at runtime.
//! - [`MultiChannelMap`]: name-keyed variant channels with whole and
//!   type-filtered iteration, including erase-while-iterating via [`Cursor`].
//! - [`ChannelManager`]: the map plus float/uchar/index shortcuts and `1 x 1`
//!   scalar "atomics".
//!
//! The store is single-threaded (`!Send`). Buffers are reference counted, so
//! moving a channel from one map into another never copies data.

pub mod channel;
pub mod config;
pub mod demo;
pub mod element;
pub mod error;
pub mod logger;
pub mod manager;
pub mod map;
pub mod schema;
pub mod snapshot;
pub mod variant;

pub use channel::{
    Channel, CharChannel, DoubleChannel, FloatChannel, FloatChannelOptional, IndexChannel,
    IndexChannelOptional, IntChannel, ShortChannel, UCharChannel, UCharChannelOptional,
    UShortChannel,
};
pub use element::{ChannelElement, ElementKind};
pub use error::{ChannelError, Result};
pub use manager::ChannelManager;
pub use map::{Cursor, MultiChannelMap};
pub use snapshot::{ChannelRecord, ChannelValues, RecordError, StoreSnapshot};
pub use variant::VariantChannel;
