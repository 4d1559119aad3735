//! Self-describing records for handing a channel map to a persistence layer.
//!
//! Each [`ChannelRecord`] carries key, element type, shape and values of one
//! entry. A [`StoreSnapshot`] bundles the records of a whole map with a format
//! version and a capture timestamp. Encoding the snapshot with any serde
//! format and restoring it reproduces keys, types, shapes and values.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_yaml_bw::budget::Budget;
use serde_yaml_bw::DeserializerOptions;
use thiserror::Error;
use tracing::debug;

use crate::channel::Channel;
use crate::element::ElementKind;
use crate::error::ChannelError;
use crate::map::MultiChannelMap;
use crate::variant::VariantChannel;

pub const FORMAT_VERSION: &str = "1";

/// Float sequences with NaN and the infinities written as `"NaN"`, `"inf"`
/// and `"-inf"`. JSON has no literal for them.
mod float_seq {
    use schemars::JsonSchema;
    use serde::de::{self, DeserializeOwned};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub trait Float: Copy + Serialize + DeserializeOwned {
        const NAN: Self;
        const INFINITY: Self;
        const NEG_INFINITY: Self;

        fn is_finite(self) -> bool;
        fn is_nan(self) -> bool;
        fn is_sign_negative(self) -> bool;
    }

    macro_rules! impl_float {
        ($($ty:ty),+) => {
            $(
                impl Float for $ty {
                    const NAN: Self = <$ty>::NAN;
                    const INFINITY: Self = <$ty>::INFINITY;
                    const NEG_INFINITY: Self = <$ty>::NEG_INFINITY;

                    fn is_finite(self) -> bool {
                        <$ty>::is_finite(self)
                    }

                    fn is_nan(self) -> bool {
                        <$ty>::is_nan(self)
                    }

                    fn is_sign_negative(self) -> bool {
                        <$ty>::is_sign_negative(self)
                    }
                }
            )+
        };
    }

    impl_float!(f32, f64);

    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(untagged)]
    pub enum Token<F> {
        Number(F),
        Named(String),
    }

    fn encode<F: Float>(value: F) -> Token<F> {
        if value.is_finite() {
            Token::Number(value)
        } else if value.is_nan() {
            Token::Named(NAN.to_string())
        } else if value.is_sign_negative() {
            Token::Named(NEG_INF.to_string())
        } else {
            Token::Named(INF.to_string())
        }
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, F>(values: &Vec<F>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        F: Float,
    {
        serializer.collect_seq(values.iter().map(|value| encode(*value)))
    }

    pub fn deserialize<'de, D, F>(deserializer: D) -> Result<Vec<F>, D::Error>
    where
        D: Deserializer<'de>,
        F: Float,
    {
        Vec::<Token<F>>::deserialize(deserializer)?
            .into_iter()
            .map(|token| match token {
                Token::Number(value) => Ok(value),
                Token::Named(name) => match name.as_str() {
                    NAN => Ok(F::NAN),
                    INF => Ok(F::INFINITY),
                    NEG_INF => Ok(F::NEG_INFINITY),
                    other => Err(de::Error::custom(format!(
                        "expected a number, \"NaN\", \"inf\" or \"-inf\", found `{other}`"
                    ))),
                },
            })
            .collect()
    }
}

/// Typed, row-major values of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChannelValues {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(
        #[serde(
            serialize_with = "float_seq::serialize",
            deserialize_with = "float_seq::deserialize"
        )]
        #[schemars(with = "Vec<float_seq::Token<f32>>")]
        Vec<f32>,
    ),
    F64(
        #[serde(
            serialize_with = "float_seq::serialize",
            deserialize_with = "float_seq::deserialize"
        )]
        #[schemars(with = "Vec<float_seq::Token<f64>>")]
        Vec<f64>,
    ),
}

impl ChannelValues {
    pub fn kind(&self) -> ElementKind {
        match self {
            ChannelValues::I8(_) => ElementKind::I8,
            ChannelValues::U8(_) => ElementKind::U8,
            ChannelValues::I16(_) => ElementKind::I16,
            ChannelValues::U16(_) => ElementKind::U16,
            ChannelValues::I32(_) => ElementKind::I32,
            ChannelValues::U32(_) => ElementKind::U32,
            ChannelValues::F32(_) => ElementKind::F32,
            ChannelValues::F64(_) => ElementKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChannelValues::I8(v) => v.len(),
            ChannelValues::U8(v) => v.len(),
            ChannelValues::I16(v) => v.len(),
            ChannelValues::U16(v) => v.len(),
            ChannelValues::I32(v) => v.len(),
            ChannelValues::U32(v) => v.len(),
            ChannelValues::F32(v) => v.len(),
            ChannelValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copies the active buffer; fails only while it is mutably borrowed.
impl TryFrom<&VariantChannel> for ChannelValues {
    type Error = ChannelError;

    fn try_from(variant: &VariantChannel) -> Result<Self, ChannelError> {
        Ok(match variant {
            VariantChannel::I8(c) => ChannelValues::I8(c.to_vec()?),
            VariantChannel::U8(c) => ChannelValues::U8(c.to_vec()?),
            VariantChannel::I16(c) => ChannelValues::I16(c.to_vec()?),
            VariantChannel::U16(c) => ChannelValues::U16(c.to_vec()?),
            VariantChannel::I32(c) => ChannelValues::I32(c.to_vec()?),
            VariantChannel::U32(c) => ChannelValues::U32(c.to_vec()?),
            VariantChannel::F32(c) => ChannelValues::F32(c.to_vec()?),
            VariantChannel::F64(c) => ChannelValues::F64(c.to_vec()?),
        })
    }
}

/// One map entry in encodable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelRecord {
    pub key: String,
    pub kind: ElementKind,
    pub num_elements: usize,
    pub width: usize,
    pub values: ChannelValues,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record `{key}` declares {declared} but carries {actual} values")]
    KindMismatch {
        key: String,
        declared: ElementKind,
        actual: ElementKind,
    },

    #[error("record `{key}`: {source}")]
    Channel {
        key: String,
        #[source]
        source: ChannelError,
    },

    #[error("unsupported snapshot format version `{0}`")]
    UnsupportedVersion(String),
}

impl ChannelRecord {
    pub fn from_entry(key: &str, variant: &VariantChannel) -> Result<Self, RecordError> {
        let values = ChannelValues::try_from(variant).map_err(|source| RecordError::Channel {
            key: key.to_string(),
            source,
        })?;
        Ok(Self {
            key: key.to_string(),
            kind: variant.kind(),
            num_elements: variant.num_elements(),
            width: variant.width(),
            values,
        })
    }

    /// Rebuilds the channel, checking the declared kind and shape against the values.
    pub fn into_variant(self) -> Result<VariantChannel, RecordError> {
        let actual = self.values.kind();
        if actual != self.kind {
            return Err(RecordError::KindMismatch {
                key: self.key,
                declared: self.kind,
                actual,
            });
        }

        let (n, w) = (self.num_elements, self.width);
        let decoded = match self.values {
            ChannelValues::I8(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::U8(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::I16(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::U16(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::I32(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::U32(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::F32(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
            ChannelValues::F64(v) => Channel::from_vec(n, w, v).map(VariantChannel::from),
        };
        decoded.map_err(|source| RecordError::Channel {
            key: self.key,
            source,
        })
    }
}

impl MultiChannelMap {
    /// One record per entry, in iteration order.
    pub fn to_records(&self) -> Result<Vec<ChannelRecord>, RecordError> {
        self.iter()
            .map(|(key, variant)| ChannelRecord::from_entry(key, variant))
            .collect()
    }

    /// Rebuilds a map from records. Fails on the first invalid record
    /// without returning a partial map.
    pub fn from_records<I>(records: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = ChannelRecord>,
    {
        let mut map = MultiChannelMap::new();
        for record in records {
            let key = record.key.clone();
            let variant = record.into_variant()?;
            map.insert(key.clone(), variant)
                .map_err(|source| RecordError::Channel { key, source })?;
        }
        Ok(map)
    }
}

/// All entries of a map, ready to be written by any serde format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoreSnapshot {
    pub format_version: String,
    pub created_at: String,
    pub records: Vec<ChannelRecord>,
}

impl StoreSnapshot {
    pub fn capture(map: &MultiChannelMap) -> Result<Self, RecordError> {
        let records = map.to_records()?;
        debug!(records = records.len(), "captured store snapshot");
        Ok(Self {
            format_version: FORMAT_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339(),
            records,
        })
    }

    /// Parses a YAML snapshot.
    ///
    /// The parser's node and event budgets scale with the input length, so a
    /// large channel is not mistaken for a resource attack. Alias and depth
    /// limits keep their defaults.
    pub fn from_yaml_str(text: &str) -> serde_yaml_bw::Result<Self> {
        let mut budget = Budget::default();
        budget.max_nodes = budget.max_nodes.max(text.len());
        budget.max_events = budget.max_events.max(text.len().saturating_mul(2));
        budget.max_total_scalar_bytes = budget.max_total_scalar_bytes.max(text.len());
        let options = DeserializerOptions {
            budget: Some(budget),
            ..DeserializerOptions::default()
        };
        Self::deserialize(serde_yaml_bw::Deserializer::from_str_with_options(
            text, &options,
        ))
    }

    pub fn restore(self) -> Result<MultiChannelMap, RecordError> {
        if self.format_version != FORMAT_VERSION {
            return Err(RecordError::UnsupportedVersion(self.format_version));
        }
        MultiChannelMap::from_records(self.records)
    }
}
