use std::cell::{Ref, RefMut};
use std::fmt;

use crate::channel::Channel;
use crate::element::{sealed, ChannelElement, ElementKind};
use crate::error::{ChannelError, Result};

macro_rules! variant_channel {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// Exactly one typed [`Channel`] drawn from the supported element set.
        ///
        /// The variant is the type tag; replacing the value swaps tag and
        /// buffer in one assignment. Cloning shares the buffer.
        #[derive(Debug, Clone, PartialEq)]
        pub enum VariantChannel {
            $($variant(Channel<$ty>),)+
        }

        $(
            impl sealed::Sealed for $ty {}

            impl ChannelElement for $ty {
                const KIND: ElementKind = ElementKind::$variant;

                fn wrap(channel: Channel<Self>) -> VariantChannel {
                    VariantChannel::$variant(channel)
                }

                fn peek(variant: &VariantChannel) -> Option<&Channel<Self>> {
                    match variant {
                        VariantChannel::$variant(channel) => Some(channel),
                        _ => None,
                    }
                }
            }

            impl From<Channel<$ty>> for VariantChannel {
                fn from(channel: Channel<$ty>) -> Self {
                    VariantChannel::$variant(channel)
                }
            }
        )+

        impl VariantChannel {
            /// Runtime tag of the active element type.
            pub fn kind(&self) -> ElementKind {
                match self {
                    $(VariantChannel::$variant(_) => ElementKind::$variant,)+
                }
            }

            pub fn num_elements(&self) -> usize {
                match self {
                    $(VariantChannel::$variant(channel) => channel.num_elements(),)+
                }
            }

            pub fn width(&self) -> usize {
                match self {
                    $(VariantChannel::$variant(channel) => channel.width(),)+
                }
            }

            /// Live handles on the active buffer, this one included.
            pub fn handle_count(&self) -> usize {
                match self {
                    $(VariantChannel::$variant(channel) => channel.handle_count(),)+
                }
            }

            /// Copies the active buffer; the result shares nothing with `self`.
            pub fn deep_clone(&self) -> Result<Self> {
                match self {
                    $(VariantChannel::$variant(channel) => channel.deep_clone().map(VariantChannel::$variant),)+
                }
            }
        }

        impl fmt::Display for VariantChannel {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(VariantChannel::$variant(channel) => fmt::Display::fmt(channel, f),)+
                }
            }
        }
    };
}

variant_channel! {
    I8 => i8,
    U8 => u8,
    I16 => i16,
    U16 => u16,
    I32 => i32,
    U32 => u32,
    F32 => f32,
    F64 => f64,
}

impl VariantChannel {
    /// Stable position of `T` in the supported type set.
    pub fn index_of<T: ChannelElement>() -> usize {
        T::INDEX
    }

    pub fn type_index(&self) -> usize {
        self.kind().index()
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_type<T: ChannelElement>(&self) -> bool {
        self.kind() == T::KIND
    }

    /// Borrows the typed channel, or `None` if another type is active.
    pub fn as_channel<T: ChannelElement>(&self) -> Option<&Channel<T>> {
        T::peek(self)
    }

    /// A new handle on the active buffer typed as `T`.
    pub fn extract<T: ChannelElement>(&self) -> Result<Channel<T>> {
        self.as_channel::<T>()
            .cloned()
            .ok_or_else(|| self.mismatch::<T>())
    }

    /// The raw row-major values typed as `T`.
    pub fn data<T: ChannelElement>(&self) -> Result<Ref<'_, [T]>> {
        self.as_channel::<T>()
            .ok_or_else(|| self.mismatch::<T>())?
            .data()
    }

    pub fn data_mut<T: ChannelElement>(&self) -> Result<RefMut<'_, [T]>> {
        self.as_channel::<T>()
            .ok_or_else(|| self.mismatch::<T>())?
            .data_mut()
    }

    /// Replaces tag and buffer with `channel`.
    pub fn assign<T: ChannelElement>(&mut self, channel: Channel<T>) {
        *self = T::wrap(channel);
    }

    pub(crate) fn mismatch<T: ChannelElement>(&self) -> ChannelError {
        ChannelError::TypeMismatch {
            expected: T::KIND.name(),
            found: self.type_name(),
        }
    }
}

/// An empty `0 x 1` channel of the first supported type (`i8`).
impl Default for VariantChannel {
    fn default() -> Self {
        VariantChannel::I8(Channel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{FloatChannel, UCharChannel};

    fn kinds_matching(variant: &VariantChannel) -> Vec<ElementKind> {
        let checks = [
            (variant.is_type::<i8>(), ElementKind::I8),
            (variant.is_type::<u8>(), ElementKind::U8),
            (variant.is_type::<i16>(), ElementKind::I16),
            (variant.is_type::<u16>(), ElementKind::U16),
            (variant.is_type::<i32>(), ElementKind::I32),
            (variant.is_type::<u32>(), ElementKind::U32),
            (variant.is_type::<f32>(), ElementKind::F32),
            (variant.is_type::<f64>(), ElementKind::F64),
        ];
        checks
            .into_iter()
            .filter(|(matches, _)| *matches)
            .map(|(_, kind)| kind)
            .collect()
    }

    #[test]
    fn test_is_type_matches_exactly_one_type() {
        let variants: Vec<VariantChannel> = vec![
            Channel::<i8>::new(1, 1).unwrap().into(),
            Channel::<u8>::new(1, 1).unwrap().into(),
            Channel::<i16>::new(1, 1).unwrap().into(),
            Channel::<u16>::new(1, 1).unwrap().into(),
            Channel::<i32>::new(1, 1).unwrap().into(),
            Channel::<u32>::new(1, 1).unwrap().into(),
            Channel::<f32>::new(1, 1).unwrap().into(),
            Channel::<f64>::new(1, 1).unwrap().into(),
        ];
        for (index, variant) in variants.iter().enumerate() {
            assert_eq!(variant.type_index(), index);
            assert_eq!(kinds_matching(variant), vec![variant.kind()]);
        }
    }

    #[test]
    fn test_index_of() {
        assert_eq!(VariantChannel::index_of::<f32>(), 6);
        assert_eq!(VariantChannel::index_of::<u8>(), 1);
        assert_eq!(VariantChannel::index_of::<f64>(), 7);
    }

    #[test]
    fn test_extract_shares_buffer() {
        let points: FloatChannel = Channel::new(10, 3).unwrap();
        let variant = VariantChannel::from(points.clone());
        assert_eq!(variant.num_elements(), 10);
        assert_eq!(variant.width(), 3);

        let extracted = variant.extract::<f32>().unwrap();
        assert!(extracted.shares_buffer(&points));
        extracted.set(0, 0, 5.0).unwrap();
        assert_eq!(variant.data::<f32>().unwrap()[0], 5.0);
    }

    #[test]
    fn test_wrong_type_access_fails() {
        let colors: UCharChannel = Channel::new(4, 3).unwrap();
        let variant = VariantChannel::from(colors);

        let expected = ChannelError::TypeMismatch {
            expected: "f32",
            found: "u8",
        };
        assert_eq!(variant.extract::<f32>().unwrap_err(), expected);
        assert_eq!(variant.data::<f32>().unwrap_err(), expected);
        assert!(variant.as_channel::<f32>().is_none());
    }

    #[test]
    fn test_assign_replaces_tag_and_buffer() {
        let mut variant = VariantChannel::from(Channel::<u8>::new(2, 2).unwrap());
        let before = variant.extract::<u8>().unwrap();
        assert_eq!(before.handle_count(), 2);

        variant.assign(Channel::<f64>::new(5, 1).unwrap());
        assert!(variant.is_type::<f64>());
        assert_eq!(variant.num_elements(), 5);
        assert_eq!(variant.width(), 1);
        assert!(variant.extract::<u8>().is_err());
        assert_eq!(before.handle_count(), 1);
    }

    #[test]
    fn test_default_is_empty_first_type() {
        let variant = VariantChannel::default();
        assert!(variant.is_type::<i8>());
        assert_eq!(variant.num_elements(), 0);
        assert_eq!(variant.width(), 1);
    }

    #[test]
    fn test_display_delegates() {
        let variant = VariantChannel::from(Channel::<u8>::new(7, 3).unwrap());
        assert_eq!(variant.to_string(), "Channel<u8>[7 x 3]");
    }
}
