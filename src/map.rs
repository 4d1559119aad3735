//! A name-keyed collection of [`VariantChannel`]s.
//!
//! Entries are kept in key order (byte-wise string order). Every iteration
//! form, including the typed one and [`MultiChannelMap::keys`], visits keys in
//! that order.
//!
//! Besides the borrowing iterators the map hands out [`Cursor`]s: owned
//! position tokens that do not borrow the map, so entries can be erased while
//! walking it:
//!
//! ```
//! # use channel_store::{Channel, MultiChannelMap};
//! let mut map = MultiChannelMap::new();
//! map.insert("points", Channel::<f32>::new(4, 3).unwrap()).unwrap();
//! map.insert("colors", Channel::<u8>::new(4, 3).unwrap()).unwrap();
//!
//! let mut cursor = map.typed_begin::<f32>();
//! while cursor != map.end() {
//!     cursor = map.erase_at(cursor);
//! }
//! assert_eq!(map.len(), 1);
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::ops::Bound;

use tracing::{debug, trace};

use crate::channel::Channel;
use crate::element::{ChannelElement, ElementKind};
use crate::error::{ChannelError, Result};
use crate::variant::VariantChannel;

/// Position in a [`MultiChannelMap`].
///
/// A cursor remembers the key it stands on and whether it was opened for
/// whole-collection or type-filtered iteration. Advancing and erasing keep
/// that mode. Cursors compare by position only, so any end cursor equals
/// [`MultiChannelMap::end`].
///
/// Removing an entry never invalidates other cursors: a cursor whose own entry
/// is gone dereferences to `None` but still advances to the next entry after
/// its key.
#[derive(Debug, Clone)]
pub struct Cursor {
    key: Option<String>,
    filter: Option<ElementKind>,
}

impl Cursor {
    pub fn is_end(&self) -> bool {
        self.key.is_none()
    }

    /// The key the cursor stands on, `None` at the end.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The element type this cursor stops on, `None` for whole-collection cursors.
    pub fn filter(&self) -> Option<ElementKind> {
        self.filter
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Cursor {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiChannelMap {
    channels: BTreeMap<String, VariantChannel>,
}

impl MultiChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(key, channel)` pairs. Later pairs replace earlier
    /// ones with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<VariantChannel>,
    {
        let mut map = Self::new();
        for (key, channel) in pairs {
            map.insert(key, channel)?;
        }
        Ok(map)
    }

    /// Stores `channel` under `key`, returning the entry it replaced.
    ///
    /// The replaced entry releases its buffer handle; the buffer itself
    /// survives if it is held elsewhere.
    pub fn insert<K, V>(&mut self, key: K, channel: V) -> Result<Option<VariantChannel>>
    where
        K: Into<String>,
        V: Into<VariantChannel>,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(ChannelError::EmptyKey);
        }
        let channel = channel.into();
        let previous = self.channels.insert(key, channel);
        if let Some(old) = &previous {
            debug!(kind = %old.kind(), "replaced existing channel entry");
        }
        Ok(previous)
    }

    /// Returns the entry under `key`, inserting an empty `i8` channel first if
    /// there is none. Assign through the reference to set tag and buffer.
    pub fn entry_or_default<K: Into<String>>(&mut self, key: K) -> Result<&mut VariantChannel> {
        let key = key.into();
        if key.is_empty() {
            return Err(ChannelError::EmptyKey);
        }
        Ok(self.channels.entry(key).or_default())
    }

    /// The channel under `key` typed as `T`.
    pub fn get<T: ChannelElement>(&self, key: &str) -> Result<Channel<T>> {
        self.channels
            .get(key)
            .ok_or_else(|| ChannelError::KeyNotFound(key.to_string()))?
            .extract::<T>()
    }

    /// Like [`get`](Self::get), but a missing key and a wrong type both give `None`.
    pub fn get_optional<T: ChannelElement>(&self, key: &str) -> Option<Channel<T>> {
        self.channels.get(key)?.as_channel::<T>().cloned()
    }

    pub fn get_variant(&self, key: &str) -> Option<&VariantChannel> {
        self.channels.get(key)
    }

    pub fn get_variant_mut(&mut self, key: &str) -> Option<&mut VariantChannel> {
        self.channels.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.channels.contains_key(key)
    }

    /// Number of entries of all types.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn remove(&mut self, key: &str) -> Option<VariantChannel> {
        self.channels.remove(key)
    }

    /// Removes the entry under `key` if present. Returns whether one was removed.
    pub fn erase(&mut self, key: &str) -> bool {
        let removed = self.channels.remove(key).is_some();
        if removed {
            trace!(key, "erased channel");
        }
        removed
    }

    /// Keys of all entries holding `T`, in iteration order.
    pub fn keys<T: ChannelElement>(&self) -> Vec<String> {
        self.iter_typed::<T>().map(|(key, _)| key.to_string()).collect()
    }

    /// Same as `keys::<T>().len()` without building the list.
    pub fn num_channels<T: ChannelElement>(&self) -> usize {
        self.channels.values().filter(|v| v.is_type::<T>()).count()
    }

    /// All entries in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.channels.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut VariantChannel)> + '_ {
        self.channels.iter_mut().map(|(key, value)| (key.as_str(), value))
    }

    /// Entries holding `T`, in key order.
    pub fn iter_typed<T: ChannelElement>(&self) -> impl Iterator<Item = (&str, &Channel<T>)> + '_ {
        self.channels
            .iter()
            .filter_map(|(key, value)| Some((key.as_str(), value.as_channel::<T>()?)))
    }

    /// Inserts a handle to every `T` entry of `other`. Buffers are shared, so
    /// later erasures in `other` do not affect the copies. Returns the number
    /// of entries taken over.
    pub fn extend_typed_from<T: ChannelElement>(&mut self, other: &MultiChannelMap) -> usize {
        let mut count = 0;
        for (key, channel) in other.iter_typed::<T>() {
            self.channels.insert(key.to_string(), T::wrap(channel.clone()));
            count += 1;
        }
        count
    }

    /// Cursor on the first entry.
    pub fn begin(&self) -> Cursor {
        self.seek(Bound::Unbounded, None)
    }

    /// Cursor on the first entry holding `T`. Advancing it skips other types.
    pub fn typed_begin<T: ChannelElement>(&self) -> Cursor {
        self.seek(Bound::Unbounded, Some(T::KIND))
    }

    pub fn end(&self) -> Cursor {
        Cursor {
            key: None,
            filter: None,
        }
    }

    /// Whole-collection cursor on `key`, or the end cursor if it is absent.
    pub fn find(&self, key: &str) -> Cursor {
        match self.channels.get_key_value(key) {
            Some((key, _)) => Cursor {
                key: Some(key.clone()),
                filter: None,
            },
            None => self.end(),
        }
    }

    /// The entry under the cursor. `None` at the end, or if the entry has
    /// been removed since the cursor was positioned.
    pub fn entry_at(&self, cursor: &Cursor) -> Option<(&str, &VariantChannel)> {
        let (key, value) = self.channels.get_key_value(cursor.key.as_deref()?)?;
        match cursor.filter {
            Some(kind) if value.kind() != kind => None,
            _ => Some((key.as_str(), value)),
        }
    }

    /// The entry under the cursor typed as `T`.
    pub fn typed_entry_at<T: ChannelElement>(&self, cursor: &Cursor) -> Option<(&str, &Channel<T>)> {
        let (key, value) = self.entry_at(cursor)?;
        Some((key, value.as_channel::<T>()?))
    }

    /// Moves the cursor to the next entry of its iteration mode.
    pub fn advance(&self, cursor: &mut Cursor) {
        *cursor = self.next_after(cursor);
    }

    /// Removes the entry under the cursor and returns a cursor on the next
    /// entry of the same iteration mode. Erasing at the end is a no-op.
    pub fn erase_at(&mut self, cursor: Cursor) -> Cursor {
        let next = self.next_after(&cursor);
        if let Some(key) = cursor.key.as_deref() {
            self.erase(key);
        }
        next
    }

    fn next_after(&self, cursor: &Cursor) -> Cursor {
        match cursor.key.as_deref() {
            Some(key) => self.seek(Bound::Excluded(key), cursor.filter),
            None => cursor.clone(),
        }
    }

    fn seek(&self, from: Bound<&str>, filter: Option<ElementKind>) -> Cursor {
        let key = self
            .channels
            .range::<str, _>((from, Bound::Unbounded))
            .find(|(_, value)| filter.is_none_or(|kind| value.kind() == kind))
            .map(|(key, _)| key.clone());
        Cursor { key, filter }
    }
}

/// Borrowing iterator over `(key, channel)` pairs in key order.
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, VariantChannel>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a VariantChannel);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a MultiChannelMap {
    type Item = (&'a str, &'a VariantChannel);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for MultiChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, channel) in self {
            writeln!(
                f,
                "{key}: {} {} x {}",
                channel.type_name(),
                channel.num_elements(),
                channel.width()
            )?;
        }
        Ok(())
    }
}
