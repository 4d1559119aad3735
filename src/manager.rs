use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::channel::{
    Channel, FloatChannelOptional, IndexChannelOptional, UCharChannelOptional,
};
use crate::element::ChannelElement;
use crate::error::{ChannelError, Result};
use crate::map::MultiChannelMap;
use crate::variant::VariantChannel;

/// A [`MultiChannelMap`] with shortcuts for the common attribute types and
/// for scalar "atomics".
///
/// An atomic is a plain `1 x 1` channel living in the same namespace as every
/// other entry; it is not a synchronisation primitive. All map operations are
/// reachable through `Deref`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelManager {
    channels: MultiChannelMap,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<VariantChannel>,
    {
        Ok(Self {
            channels: MultiChannelMap::from_pairs(pairs)?,
        })
    }

    pub fn into_inner(self) -> MultiChannelMap {
        self.channels
    }

    pub fn get_float_channel(&self, key: &str) -> FloatChannelOptional {
        self.channels.get_optional::<f32>(key)
    }

    /// Alias of [`get_float_channel`](Self::get_float_channel).
    pub fn get_channel(&self, key: &str) -> FloatChannelOptional {
        self.get_float_channel(key)
    }

    pub fn get_uchar_channel(&self, key: &str) -> UCharChannelOptional {
        self.channels.get_optional::<u8>(key)
    }

    pub fn get_index_channel(&self, key: &str) -> IndexChannelOptional {
        self.channels.get_optional::<u32>(key)
    }

    pub fn add_float_channel(&mut self, channel: Channel<f32>, key: &str) -> Result<()> {
        self.channels.insert(key, channel).map(|_| ())
    }

    pub fn add_uchar_channel(&mut self, channel: Channel<u8>, key: &str) -> Result<()> {
        self.channels.insert(key, channel).map(|_| ())
    }

    pub fn add_index_channel(&mut self, channel: Channel<u32>, key: &str) -> Result<()> {
        self.channels.insert(key, channel).map(|_| ())
    }

    /// Inserts a zeroed `num_elements x width` float channel and returns a handle to it.
    pub fn add_empty_float_channel(
        &mut self,
        key: &str,
        num_elements: usize,
        width: usize,
    ) -> Result<Channel<f32>> {
        self.add_empty_channel(key, num_elements, width)
    }

    pub fn add_empty_uchar_channel(
        &mut self,
        key: &str,
        num_elements: usize,
        width: usize,
    ) -> Result<Channel<u8>> {
        self.add_empty_channel(key, num_elements, width)
    }

    pub fn add_empty_index_channel(
        &mut self,
        key: &str,
        num_elements: usize,
        width: usize,
    ) -> Result<Channel<u32>> {
        self.add_empty_channel(key, num_elements, width)
    }

    fn add_empty_channel<T: ChannelElement>(
        &mut self,
        key: &str,
        num_elements: usize,
        width: usize,
    ) -> Result<Channel<T>> {
        let channel = Channel::<T>::new(num_elements, width)?;
        self.channels.insert(key, T::wrap(channel.clone()))?;
        Ok(channel)
    }

    /// Stores `value` as a `1 x 1` channel under `key`, replacing any entry there.
    pub fn add_atomic<T: ChannelElement>(&mut self, value: T, key: &str) -> Result<()> {
        let channel = Channel::from_vec(1, 1, vec![value])?;
        self.channels.insert(key, T::wrap(channel))?;
        debug!(key, kind = %T::KIND, "stored atomic");
        Ok(())
    }

    /// Reads the scalar stored by [`add_atomic`](Self::add_atomic).
    ///
    /// Fails with `KeyNotFound` if nothing is stored under `key`, and with
    /// `ShapeMismatch` if the entry is not a `1 x 1` channel of `T`.
    pub fn get_atomic<T: ChannelElement>(&self, key: &str) -> Result<T> {
        let variant = self
            .channels
            .get_variant(key)
            .ok_or_else(|| ChannelError::KeyNotFound(key.to_string()))?;

        let shape_mismatch = || ChannelError::ShapeMismatch {
            key: key.to_string(),
            expected: T::KIND.name(),
            found: variant.type_name(),
            num_elements: variant.num_elements(),
            width: variant.width(),
        };

        let channel = variant.as_channel::<T>().ok_or_else(shape_mismatch)?;
        if channel.num_elements() != 1 || channel.width() != 1 {
            return Err(shape_mismatch());
        }
        channel.get(0, 0)
    }

    pub fn add_float_atomic(&mut self, value: f32, key: &str) -> Result<()> {
        self.add_atomic(value, key)
    }

    pub fn get_float_atomic(&self, key: &str) -> Result<f32> {
        self.get_atomic(key)
    }

    pub fn add_uchar_atomic(&mut self, value: u8, key: &str) -> Result<()> {
        self.add_atomic(value, key)
    }

    pub fn get_uchar_atomic(&self, key: &str) -> Result<u8> {
        self.get_atomic(key)
    }

    pub fn add_int_atomic(&mut self, value: i32, key: &str) -> Result<()> {
        self.add_atomic(value, key)
    }

    pub fn get_int_atomic(&self, key: &str) -> Result<i32> {
        self.get_atomic(key)
    }
}

impl Deref for ChannelManager {
    type Target = MultiChannelMap;

    fn deref(&self) -> &Self::Target {
        &self.channels
    }
}

impl DerefMut for ChannelManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.channels
    }
}

impl From<MultiChannelMap> for ChannelManager {
    fn from(channels: MultiChannelMap) -> Self {
        Self { channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ChannelManager {
        let points = Channel::<f32>::new(100, 3).unwrap();
        let hyper = Channel::<u8>::new(600, 600).unwrap();
        hyper.fill(100).unwrap();

        let mut cm = ChannelManager::from_pairs(vec![
            ("points2", VariantChannel::from(points.clone())),
            ("hyper", VariantChannel::from(hyper)),
        ])
        .unwrap();
        *cm.entry_or_default("points").unwrap() = points.into();
        cm.add_uchar_channel(Channel::new(100, 3).unwrap(), "colors").unwrap();
        cm.add_empty_float_channel("normals", 100, 3).unwrap();
        cm
    }

    #[test]
    fn test_float_channel_lookup() {
        let cm = manager();
        assert!(cm.get_float_channel("points").is_some());
        assert!(cm.get_float_channel("colors").is_none());
        assert!(cm.get_float_channel("asdf").is_none());
        assert_eq!(cm.get_channel("normals"), cm.get_float_channel("normals"));
        assert!(cm.get_uchar_channel("hyper").is_some());
        assert!(cm.get_index_channel("hyper").is_none());
    }

    #[test]
    fn test_float_atomic_round_trip() {
        let mut cm = manager();
        cm.add_float_atomic(5.5, "myatomic").unwrap();
        assert_eq!(cm.get_float_atomic("myatomic").unwrap(), 5.5);

        cm.add_float_atomic(f32::MIN_POSITIVE, "tiny").unwrap();
        assert_eq!(cm.get_float_atomic("tiny").unwrap(), f32::MIN_POSITIVE);

        // atomics share the channel namespace
        assert_eq!(cm.len(), 7);
        assert_eq!(cm.get::<f32>("myatomic").unwrap().num_elements(), 1);
    }

    #[test]
    fn test_float_atomic_failures() {
        let cm = manager();
        assert_eq!(
            cm.get_float_atomic("bla").unwrap_err(),
            ChannelError::KeyNotFound("bla".into())
        );
        assert_eq!(
            cm.get_float_atomic("points").unwrap_err(),
            ChannelError::ShapeMismatch {
                key: "points".into(),
                expected: "f32",
                found: "f32",
                num_elements: 100,
                width: 3,
            }
        );
        assert!(matches!(
            cm.get_float_atomic("hyper"),
            Err(ChannelError::ShapeMismatch { found: "u8", .. })
        ));
    }

    #[test]
    fn test_atomic_with_wrong_type_is_shape_mismatch() {
        let mut cm = ChannelManager::new();
        cm.add_int_atomic(-3, "count").unwrap();
        assert_eq!(cm.get_int_atomic("count").unwrap(), -3);
        assert!(matches!(
            cm.get_float_atomic("count"),
            Err(ChannelError::ShapeMismatch { .. })
        ));

        cm.add_uchar_atomic(200, "count").unwrap();
        assert_eq!(cm.len(), 1);
        assert_eq!(cm.get_uchar_atomic("count").unwrap(), 200);
    }

    #[test]
    fn test_typed_erase_through_manager() {
        let mut cm = manager();
        cm.add_float_atomic(1.0, "scale").unwrap();
        assert_eq!(cm.keys::<f32>(), vec!["normals", "points", "points2", "scale"]);

        let mut floats = ChannelManager::new();
        floats.extend_typed_from::<f32>(&cm);

        let mut cursor = cm.typed_begin::<f32>();
        while cursor != cm.end() {
            cursor = cm.erase_at(cursor);
        }
        assert_eq!(cm.len(), 2);
        assert_eq!(cm.num_channels::<u8>(), 2);
        assert_eq!(floats.len(), 4);
        assert_eq!(floats.get_float_atomic("scale").unwrap(), 1.0);
    }

    #[test]
    fn test_generic_atomics_cover_every_type() {
        let mut cm = ChannelManager::new();
        cm.add_atomic(-7i8, "a").unwrap();
        cm.add_atomic(60_000u16, "b").unwrap();
        cm.add_atomic(4_000_000_000u32, "c").unwrap();
        cm.add_atomic(-2.5f64, "d").unwrap();
        assert_eq!(cm.get_atomic::<i8>("a").unwrap(), -7);
        assert_eq!(cm.get_atomic::<u16>("b").unwrap(), 60_000);
        assert_eq!(cm.get_atomic::<u32>("c").unwrap(), 4_000_000_000);
        assert_eq!(cm.get_atomic::<f64>("d").unwrap(), -2.5);
        assert_eq!(cm.num_channels::<f64>(), 1);
    }

    #[test]
    fn test_add_empty_channel_returns_shared_handle() {
        let mut cm = ChannelManager::new();
        let indices = cm.add_empty_index_channel("faces", 2, 3).unwrap();
        indices.set(1, 2, 42).unwrap();
        assert_eq!(cm.get_index_channel("faces").unwrap().get(1, 2).unwrap(), 42);

        assert_eq!(
            cm.add_empty_uchar_channel("bad", 1, 0).unwrap_err(),
            ChannelError::InvalidWidth
        );
        assert!(!cm.contains_key("bad"));
    }
}
