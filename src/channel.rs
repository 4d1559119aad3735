//! Flat, homogeneously typed attribute buffers viewed as rows x columns.
//!
//! A [`Channel`] is a handle. Cloning it hands out another handle to the same
//! buffer, so a write through any clone is visible through all of them. The
//! buffer is dropped together with its last handle. Use
//! [`Channel::deep_clone`] when an independent copy is wanted.

use std::any::type_name;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{ChannelError, Result};

pub struct Channel<T> {
    num_elements: usize,
    width: usize,
    data: Rc<RefCell<Vec<T>>>,
}

impl<T: Copy + Default> Channel<T> {
    /// Allocates `num_elements` rows of `width` default-valued elements.
    pub fn new(num_elements: usize, width: usize) -> Result<Self> {
        let len = checked_len(num_elements, width)?;
        Ok(Self::from_parts(num_elements, width, vec![T::default(); len]))
    }

    /// Wraps an existing row-major buffer without copying it.
    pub fn from_vec(num_elements: usize, width: usize, data: Vec<T>) -> Result<Self> {
        let len = checked_len(num_elements, width)?;
        if data.len() != len {
            return Err(ChannelError::BufferLength {
                len: data.len(),
                num_elements,
                width,
            });
        }
        Ok(Self::from_parts(num_elements, width, data))
    }

    /// Reads the value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let offset = self.offset(row, col)?;
        Ok(self.buffer()?[offset])
    }

    /// Writes `value` at `(row, col)`.
    pub fn set(&self, row: usize, col: usize, value: T) -> Result<()> {
        let offset = self.offset(row, col)?;
        self.buffer_mut()?[offset] = value;
        Ok(())
    }

    pub fn fill(&self, value: T) -> Result<()> {
        self.buffer_mut()?.fill(value);
        Ok(())
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        Ok(self.buffer()?.clone())
    }

    /// Copies the buffer into a new, unshared channel.
    pub fn deep_clone(&self) -> Result<Self> {
        Ok(Self::from_parts(self.num_elements, self.width, self.to_vec()?))
    }
}

fn checked_len(num_elements: usize, width: usize) -> Result<usize> {
    if width == 0 {
        return Err(ChannelError::InvalidWidth);
    }
    num_elements
        .checked_mul(width)
        .ok_or(ChannelError::ShapeOverflow {
            num_elements,
            width,
        })
}

impl<T> Channel<T> {
    fn from_parts(num_elements: usize, width: usize, data: Vec<T>) -> Self {
        Self {
            num_elements,
            width,
            data: Rc::new(RefCell::new(data)),
        }
    }

    fn buffer(&self) -> Result<Ref<'_, Vec<T>>> {
        self.data
            .try_borrow()
            .map_err(|_| ChannelError::BufferBorrowed)
    }

    fn buffer_mut(&self) -> Result<RefMut<'_, Vec<T>>> {
        self.data
            .try_borrow_mut()
            .map_err(|_| ChannelError::BufferBorrowed)
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        self.check_row(row)?;
        if col >= self.width {
            return Err(ChannelError::IndexOutOfRange {
                index: col,
                len: self.width,
            });
        }
        Ok(row * self.width + col)
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.num_elements {
            return Err(ChannelError::IndexOutOfRange {
                index: row,
                len: self.num_elements,
            });
        }
        Ok(())
    }

    /// Number of rows.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Number of columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Total number of scalar values, `num_elements * width`.
    pub fn len(&self) -> usize {
        self.num_elements * self.width
    }

    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    /// Borrows row `index` as a slice of `width` values.
    ///
    /// The returned guard keeps the buffer borrowed. While it is alive, any
    /// write through this or another handle fails with `BufferBorrowed`.
    pub fn row(&self, index: usize) -> Result<Ref<'_, [T]>> {
        self.check_row(index)?;
        let start = index * self.width;
        let end = start + self.width;
        Ok(Ref::map(self.buffer()?, |data| &data[start..end]))
    }

    /// Mutable view of row `index`. Writes are seen by every handle.
    pub fn row_mut(&self, index: usize) -> Result<RefMut<'_, [T]>> {
        self.check_row(index)?;
        let start = index * self.width;
        let end = start + self.width;
        Ok(RefMut::map(self.buffer_mut()?, |data| &mut data[start..end]))
    }

    /// The whole row-major buffer.
    pub fn data(&self) -> Result<Ref<'_, [T]>> {
        Ok(Ref::map(self.buffer()?, |data| data.as_slice()))
    }

    pub fn data_mut(&self) -> Result<RefMut<'_, [T]>> {
        Ok(RefMut::map(self.buffer_mut()?, |data| data.as_mut_slice()))
    }

    /// True if both handles point at the same buffer.
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Number of live handles on this buffer, this one included.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.data)
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            num_elements: self.num_elements,
            width: self.width,
            data: Rc::clone(&self.data),
        }
    }
}

/// An empty `0 x 1` channel.
impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::from_parts(0, 1, Vec::new())
    }
}

/// Shape and values. A buffer that is mutably borrowed compares unequal.
impl<T: PartialEq> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.num_elements != other.num_elements || self.width != other.width {
            return false;
        }
        match (self.buffer(), other.buffer()) {
            (Ok(lhs), Ok(rhs)) => *lhs == *rhs,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("type", &type_name::<T>())
            .field("num_elements", &self.num_elements)
            .field("width", &self.width)
            .field("handles", &self.handle_count())
            .finish()
    }
}

impl<T> fmt::Display for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel<{}>[{} x {}]",
            type_name::<T>(),
            self.num_elements,
            self.width
        )
    }
}

pub type CharChannel = Channel<i8>;
pub type UCharChannel = Channel<u8>;
pub type ShortChannel = Channel<i16>;
pub type UShortChannel = Channel<u16>;
pub type IntChannel = Channel<i32>;
pub type IndexChannel = Channel<u32>;
pub type FloatChannel = Channel<f32>;
pub type DoubleChannel = Channel<f64>;

pub type UCharChannelOptional = Option<UCharChannel>;
pub type IndexChannelOptional = Option<IndexChannel>;
pub type FloatChannelOptional = Option<FloatChannel>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_channel_is_zeroed() {
        let channel: FloatChannel = Channel::new(4, 3).unwrap();
        assert_eq!(channel.num_elements(), 4);
        assert_eq!(channel.width(), 3);
        assert_eq!(channel.len(), 12);
        assert!(channel.data().unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        assert_eq!(
            Channel::<u8>::new(10, 0).unwrap_err(),
            ChannelError::InvalidWidth
        );
        assert_eq!(
            Channel::<u8>::from_vec(0, 0, vec![]).unwrap_err(),
            ChannelError::InvalidWidth
        );
    }

    #[test]
    fn test_zero_rows_is_valid() {
        let channel = Channel::<i32>::new(0, 2).unwrap();
        assert!(channel.is_empty());
        assert!(channel.data().unwrap().is_empty());
        assert!(channel.row(0).is_err());
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = Channel::from_vec(2, 3, vec![1u16; 5]).unwrap_err();
        assert_eq!(
            err,
            ChannelError::BufferLength {
                len: 5,
                num_elements: 2,
                width: 3
            }
        );

        let channel = Channel::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(&*channel.row(1).unwrap(), &[3, 4]);
    }

    #[test]
    fn test_row_access_and_bounds() {
        let channel: UCharChannel = Channel::new(3, 2).unwrap();
        {
            let mut row = channel.row_mut(1).unwrap();
            row[0] = 7;
            row[1] = 9;
        }
        assert_eq!(&*channel.row(1).unwrap(), &[7, 9]);
        assert_eq!(channel.get(1, 1).unwrap(), 9);

        assert_eq!(
            channel.row(3).unwrap_err(),
            ChannelError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            channel.set(0, 2, 1).unwrap_err(),
            ChannelError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn test_clone_shares_buffer() {
        let original: FloatChannel = Channel::new(2, 3).unwrap();
        let copy = original.clone();
        assert!(copy.shares_buffer(&original));
        assert_eq!(original.handle_count(), 2);

        copy.set(1, 2, 4.5).unwrap();
        assert_eq!(original.get(1, 2).unwrap(), 4.5);

        original.row_mut(0).unwrap()[0] = -1.0;
        assert_eq!(copy.get(0, 0).unwrap(), -1.0);

        drop(copy);
        assert_eq!(original.handle_count(), 1);
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let original: DoubleChannel = Channel::new(2, 1).unwrap();
        original.fill(1.0).unwrap();
        let copy = original.deep_clone().unwrap();
        assert!(!copy.shares_buffer(&original));
        assert_eq!(copy, original);

        copy.set(0, 0, 2.0).unwrap();
        assert_eq!(original.get(0, 0).unwrap(), 1.0);
        assert_ne!(copy, original);
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let huge = 1usize << 63;
        assert_eq!(
            Channel::<u8>::from_vec(huge, 2, vec![]).unwrap_err(),
            ChannelError::ShapeOverflow {
                num_elements: huge,
                width: 2
            }
        );
        assert!(matches!(
            Channel::<f64>::new(usize::MAX, 3),
            Err(ChannelError::ShapeOverflow { .. })
        ));
    }

    #[test]
    fn test_write_while_shared_row_is_read() {
        let points: FloatChannel = Channel::from_vec(2, 1, vec![1.0, 2.0]).unwrap();
        let points2 = points.clone();

        let row0 = points.row(0).unwrap();
        assert_eq!(
            points2.set(1, 0, row0[0] + 1.0).unwrap_err(),
            ChannelError::BufferBorrowed
        );
        assert!(points2.row_mut(1).is_err());
        assert!(points2.data_mut().is_err());
        assert!(points2.fill(0.0).is_err());
        // shared reads are fine
        assert_eq!(points2.get(1, 0).unwrap(), 2.0);
        drop(row0);

        points2.set(1, 0, 3.0).unwrap();
        assert_eq!(points.get(1, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_read_while_shared_row_is_written() {
        let colors: UCharChannel = Channel::new(2, 3).unwrap();
        let alias = colors.clone();

        let mut row = colors.row_mut(0).unwrap();
        row[0] = 9;
        assert_eq!(alias.get(0, 0).unwrap_err(), ChannelError::BufferBorrowed);
        assert_eq!(alias.to_vec().unwrap_err(), ChannelError::BufferBorrowed);
        assert!(alias.deep_clone().is_err());
        assert_ne!(alias, colors);
        drop(row);

        assert_eq!(alias.get(0, 0).unwrap(), 9);
        assert_eq!(alias, colors);
    }

    #[test]
    fn test_display() {
        let channel: FloatChannel = Channel::new(10000, 3).unwrap();
        assert_eq!(channel.to_string(), "Channel<f32>[10000 x 3]");
    }
}
