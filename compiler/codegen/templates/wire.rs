//! Wire support shared by the generated client and server: conversions
//! between domain values and their wire representation, and the frame
//! envelope carried by streams.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value could not be converted between its domain and wire forms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

/// Conversion from a wire value into a domain value.
pub trait FromWire<W>: Sized {
    /// Convert, failing when the wire value does not fit the domain type.
    fn from_wire(wire: W) -> Result<Self, ConversionError>;
}

/// Conversion from a domain value into a wire value.
pub trait IntoWire<W> {
    /// Convert, failing when the domain value does not fit the wire type.
    fn into_wire(self) -> Result<W, ConversionError>;
}

/// One message of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Frame<T> {
    /// The next item
    Item(T),
    /// The sender finished cleanly
    End,
    /// The sender failed; no further items follow
    Error(String),
}

macro_rules! identity {
    ($($ty:ty),*) => {$(
        impl FromWire<$ty> for $ty {
            fn from_wire(wire: $ty) -> Result<Self, ConversionError> { Ok(wire) }
        }

        impl IntoWire<$ty> for $ty {
            fn into_wire(self) -> Result<$ty, ConversionError> { Ok(self) }
        }
    )*};
}

identity!(i64, f64, bool, String, u8, (), DateTime<Utc>);

macro_rules! integer {
    ($($ty:ty),*) => {$(
        impl FromWire<i64> for $ty {
            fn from_wire(wire: i64) -> Result<Self, ConversionError> {
                <$ty>::try_from(wire).map_err(|_| {
                    ConversionError(format!("{} does not fit in {}", wire, stringify!($ty)))
                })
            }
        }

        impl IntoWire<i64> for $ty {
            fn into_wire(self) -> Result<i64, ConversionError> {
                i64::try_from(self).map_err(|_| {
                    ConversionError(format!("{} does not fit in a wire integer", self))
                })
            }
        }
    )*};
}

integer!(i8, i16, i32, i128, isize, u8, u16, u32, u64, u128, usize);

impl FromWire<f64> for f32 {
    fn from_wire(wire: f64) -> Result<Self, ConversionError> { Ok(wire as f32) }
}

impl IntoWire<f64> for f32 {
    fn into_wire(self) -> Result<f64, ConversionError> { Ok(f64::from(self)) }
}

impl FromWire<DateTime<Utc>> for SystemTime {
    fn from_wire(wire: DateTime<Utc>) -> Result<Self, ConversionError> { Ok(wire.into()) }
}

impl IntoWire<DateTime<Utc>> for SystemTime {
    fn into_wire(self) -> Result<DateTime<Utc>, ConversionError> { Ok(self.into()) }
}

impl<D: FromWire<W>, W> FromWire<Option<W>> for Option<D> {
    fn from_wire(wire: Option<W>) -> Result<Self, ConversionError> {
        wire.map(D::from_wire).transpose()
    }
}

impl<D: IntoWire<W>, W> IntoWire<Option<W>> for Option<D> {
    fn into_wire(self) -> Result<Option<W>, ConversionError> {
        self.map(D::into_wire).transpose()
    }
}

impl<D: FromWire<W>, W> FromWire<W> for Box<D> {
    fn from_wire(wire: W) -> Result<Self, ConversionError> { D::from_wire(wire).map(Box::new) }
}

impl<D: IntoWire<W>, W> IntoWire<W> for Box<D> {
    fn into_wire(self) -> Result<W, ConversionError> { (*self).into_wire() }
}

impl<D: FromWire<W>, W> FromWire<W> for Arc<D> {
    fn from_wire(wire: W) -> Result<Self, ConversionError> { D::from_wire(wire).map(Arc::new) }
}

impl<D: IntoWire<W> + Clone, W> IntoWire<W> for Arc<D> {
    fn into_wire(self) -> Result<W, ConversionError> {
        Arc::try_unwrap(self).unwrap_or_else(|shared| (*shared).clone()).into_wire()
    }
}

macro_rules! sequence {
    ($($seq:ident $(: $bound:path)?),*) => {$(
        impl<D: FromWire<W> $(+ $bound)?, W> FromWire<Vec<W>> for $seq<D> {
            fn from_wire(wire: Vec<W>) -> Result<Self, ConversionError> {
                wire.into_iter().map(D::from_wire).collect()
            }
        }

        impl<D: IntoWire<W>, W> IntoWire<Vec<W>> for $seq<D> {
            fn into_wire(self) -> Result<Vec<W>, ConversionError> {
                self.into_iter().map(D::into_wire).collect()
            }
        }
    )*};
}

sequence!(Vec, VecDeque, BTreeSet: Ord);

impl<D: FromWire<W> + Eq + Hash, W> FromWire<Vec<W>> for HashSet<D> {
    fn from_wire(wire: Vec<W>) -> Result<Self, ConversionError> {
        wire.into_iter().map(D::from_wire).collect()
    }
}

impl<D: IntoWire<W>, W> IntoWire<Vec<W>> for HashSet<D> {
    fn into_wire(self) -> Result<Vec<W>, ConversionError> {
        self.into_iter().map(D::into_wire).collect()
    }
}

impl<K, V, WK, WV> FromWire<BTreeMap<WK, WV>> for BTreeMap<K, V>
where
    K: FromWire<WK> + Ord,
    V: FromWire<WV>,
{
    fn from_wire(wire: BTreeMap<WK, WV>) -> Result<Self, ConversionError> {
        wire.into_iter().map(|(key, value)| Ok((K::from_wire(key)?, V::from_wire(value)?))).collect()
    }
}

impl<K, V, WK, WV> IntoWire<BTreeMap<WK, WV>> for BTreeMap<K, V>
where
    K: IntoWire<WK>,
    V: IntoWire<WV>,
    WK: Ord,
{
    fn into_wire(self) -> Result<BTreeMap<WK, WV>, ConversionError> {
        self.into_iter().map(|(key, value)| Ok((key.into_wire()?, value.into_wire()?))).collect()
    }
}

impl<K, V, WK, WV> FromWire<BTreeMap<WK, WV>> for HashMap<K, V>
where
    K: FromWire<WK> + Eq + Hash,
    V: FromWire<WV>,
{
    fn from_wire(wire: BTreeMap<WK, WV>) -> Result<Self, ConversionError> {
        wire.into_iter().map(|(key, value)| Ok((K::from_wire(key)?, V::from_wire(value)?))).collect()
    }
}

impl<K, V, WK, WV> IntoWire<BTreeMap<WK, WV>> for HashMap<K, V>
where
    K: IntoWire<WK>,
    V: IntoWire<WV>,
    WK: Ord,
{
    fn into_wire(self) -> Result<BTreeMap<WK, WV>, ConversionError> {
        self.into_iter().map(|(key, value)| Ok((key.into_wire()?, value.into_wire()?))).collect()
    }
}
