//! The value model: which types may be loaded from a stream by a plain byte copy, and how their
//! on-disk byte order maps to the machine representation.
//!
//! * [`Pod`] types have a fixed, platform-independent width and bit layout. Any byte pattern of
//!   that width is a valid value, so loading one is a bounded copy into a zeroed instance.
//! * [`Endian`] types can be stored in either byte order; the caller picks one per call.
//! * [`FixedEndian`] types have exactly one stored representation, e.g. single bytes, byte arrays,
//!   or the `zerocopy::byteorder` wrappers such as `U32<BigEndian>`.
//!
//! The set of implementations is closed. `usize` and `isize` are deliberately absent, since their
//! width depends on the target.

use zerocopy::byteorder::{ByteOrder, F32, F64, I128, I16, I32, I64, U128, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes};

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width value that can be loaded and stored by copying its bytes.
///
/// The byte copy itself is done through `zerocopy`: a zeroed instance is created with
/// [`FromZeros::new_zeroed`](zerocopy::FromZeros::new_zeroed) and its bytes are filled in place.
pub trait Pod: FromBytes + IntoBytes + Immutable + Copy + sealed::Sealed {}

/// A [`Pod`] value that may be stored in either little-endian or big-endian order.
///
/// `from_*_disk` takes a value whose bytes were copied verbatim from storage and returns the
/// machine value. `to_*_disk` is the inverse, producing a value whose in-memory bytes are the
/// stored form.
pub trait Endian: Pod {
    /// Interprets a raw little-endian value.
    fn from_le_disk(disk: Self) -> Self;
    /// Interprets a raw big-endian value.
    fn from_be_disk(disk: Self) -> Self;
    /// Produces the little-endian stored form of a value.
    fn to_le_disk(self) -> Self;
    /// Produces the big-endian stored form of a value.
    fn to_be_disk(self) -> Self;
}

/// A [`Pod`] value with exactly one stored representation.
pub trait FixedEndian: Pod {
    /// Interprets a raw stored value.
    fn from_disk(disk: Self) -> Self;
    /// Produces the stored form of a value.
    fn to_disk(self) -> Self;
}

macro_rules! impl_endian_int {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl Pod for $t {}

            impl Endian for $t {
                #[inline(always)]
                fn from_le_disk(disk: Self) -> Self {
                    <$t>::from_le(disk)
                }

                #[inline(always)]
                fn from_be_disk(disk: Self) -> Self {
                    <$t>::from_be(disk)
                }

                #[inline(always)]
                fn to_le_disk(self) -> Self {
                    <$t>::to_le(self)
                }

                #[inline(always)]
                fn to_be_disk(self) -> Self {
                    <$t>::to_be(self)
                }
            }
        )*
    };
}

impl_endian_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

// Floats are swapped as the unsigned integer of the same width, bit pattern preserved.
macro_rules! impl_endian_float {
    ($($t:ty => $bits:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl Pod for $t {}

            impl Endian for $t {
                #[inline(always)]
                fn from_le_disk(disk: Self) -> Self {
                    <$t>::from_bits(<$bits>::from_le(disk.to_bits()))
                }

                #[inline(always)]
                fn from_be_disk(disk: Self) -> Self {
                    <$t>::from_bits(<$bits>::from_be(disk.to_bits()))
                }

                #[inline(always)]
                fn to_le_disk(self) -> Self {
                    <$t>::from_bits(self.to_bits().to_le())
                }

                #[inline(always)]
                fn to_be_disk(self) -> Self {
                    <$t>::from_bits(self.to_bits().to_be())
                }
            }
        )*
    };
}

impl_endian_float!(f32 => u32, f64 => u64);

impl FixedEndian for u8 {
    #[inline(always)]
    fn from_disk(disk: Self) -> Self {
        disk
    }

    #[inline(always)]
    fn to_disk(self) -> Self {
        self
    }
}

impl FixedEndian for i8 {
    #[inline(always)]
    fn from_disk(disk: Self) -> Self {
        disk
    }

    #[inline(always)]
    fn to_disk(self) -> Self {
        self
    }
}

impl<const N: usize> sealed::Sealed for [u8; N] {}
impl<const N: usize> Pod for [u8; N] {}

impl<const N: usize> FixedEndian for [u8; N] {
    #[inline(always)]
    fn from_disk(disk: Self) -> Self {
        disk
    }

    #[inline(always)]
    fn to_disk(self) -> Self {
        self
    }
}

// The byteorder wrappers keep their bytes in the declared order at all times, so the stored form
// and the in-memory form are the same bytes. Use `.get()` to obtain the machine value.
macro_rules! impl_fixed_wrapper {
    ($($w:ident),*) => {
        $(
            impl<O: ByteOrder> sealed::Sealed for $w<O> {}
            impl<O: ByteOrder> Pod for $w<O> {}

            impl<O: ByteOrder> FixedEndian for $w<O> {
                #[inline(always)]
                fn from_disk(disk: Self) -> Self {
                    disk
                }

                #[inline(always)]
                fn to_disk(self) -> Self {
                    self
                }
            }
        )*
    };
}

impl_fixed_wrapper!(U16, U32, U64, U128, I16, I32, I64, I128, F32, F64);
