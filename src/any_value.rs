use crate::conversion;
use crate::meta_type::{MetaType, MetaValue, Payload};
use crate::Error;
use std::any::Any;
use std::fmt;

/// A type-erased value that preserves its type information.
///
/// A `Variant` holds exactly one value of some runtime-identified type, or
/// nothing at all (the invalid state). It owns its storage.
///
/// # Examples
///
/// ```
/// use sovran_assoc::{MetaType, Variant};
///
/// let number = Variant::new(42i32);
/// assert!(number.is::<i32>());
/// assert_eq!(number.downcast_ref::<i32>(), Some(&42));
///
/// // Conversions are explicit and lossless
/// assert_eq!(number.value::<i64>(), 42);
/// assert_eq!(number.value::<String>(), "42");
/// assert!(number.convert(MetaType::of::<u8>()).is_ok());
/// assert!(Variant::new(300i32).convert(MetaType::of::<u8>()).is_err());
/// ```
pub struct Variant {
    meta_type: MetaType,
    value: Option<Payload>,
}

impl Variant {
    /// Create a new Variant holding `value`
    pub fn new<T: MetaValue>(value: T) -> Self {
        Self {
            meta_type: MetaType::of::<T>(),
            value: Some(Box::new(value)),
        }
    }

    /// The invalid (empty) Variant
    pub const fn invalid() -> Self {
        Self {
            meta_type: MetaType::INVALID,
            value: None,
        }
    }

    /// Create a Variant holding the default value of `meta_type`.
    ///
    /// An invalid meta type yields the invalid Variant.
    pub fn from_meta_type(meta_type: MetaType) -> Self {
        Self {
            meta_type,
            value: meta_type.create(),
        }
    }

    pub(crate) fn from_payload(meta_type: MetaType, value: Payload) -> Self {
        Self {
            meta_type,
            value: Some(value),
        }
    }

    /// A Variant of `meta_type` holding a copy of `data`.
    pub(crate) fn from_data(meta_type: MetaType, data: &dyn Any) -> Self {
        Self {
            meta_type,
            value: meta_type.clone_payload(data),
        }
    }

    pub fn meta_type(&self) -> MetaType {
        self.meta_type
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Check if the contained value is of type T
    pub fn is<T: 'static>(&self) -> bool {
        self.meta_type.is::<T>()
    }

    /// Raw access to the stored value
    pub fn data(&self) -> Option<&dyn Any> {
        self.value.as_deref().map(|value| value as &dyn Any)
    }

    /// Raw mutable access to the stored value
    pub fn data_mut(&mut self) -> Option<&mut dyn Any> {
        self.value.as_deref_mut().map(|value| value as &mut dyn Any)
    }

    /// Get a reference to the contained value if it is of type T
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.as_deref()?.downcast_ref::<T>()
    }

    /// Get a mutable reference to the contained value if it is of type T
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.as_deref_mut()?.downcast_mut::<T>()
    }

    /// Returns the value converted to `T`, or `T::default()` if it can't be.
    pub fn value<T: MetaValue>(&self) -> T {
        self.try_value().unwrap_or_default()
    }

    /// Returns the value converted to `T`.
    ///
    /// # Errors
    ///
    /// - Returns `Error::TypeMismatch` if the Variant is invalid
    /// - Returns `Error::Unconvertible` if no lossless conversion to `T` exists
    pub fn try_value<T: MetaValue>(&self) -> Result<T, Error> {
        if let Some(value) = self.downcast_ref::<T>() {
            return Ok(value.clone());
        }
        let converted = self.convert(MetaType::of::<T>())?;
        converted
            .downcast_ref::<T>()
            .cloned()
            .ok_or(Error::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: converted.meta_type.name(),
            })
    }

    /// Returns a copy of this value converted to `target`.
    ///
    /// Converting to the `Variant` meta type wraps the value instead of
    /// converting it. A Variant that holds another Variant is unwrapped first.
    ///
    /// # Errors
    ///
    /// - Returns `Error::TypeMismatch` if this Variant or `target` is invalid
    /// - Returns `Error::Unconvertible` if no lossless conversion exists
    /// - Returns `Error::LockError` if the conversion table is poisoned
    pub fn convert(&self, target: MetaType) -> Result<Variant, Error> {
        let Some(value) = self.data() else {
            return Err(Error::TypeMismatch {
                expected: target.name(),
                found: self.meta_type.name(),
            });
        };
        if !target.is_valid() {
            return Err(Error::TypeMismatch {
                expected: target.name(),
                found: self.meta_type.name(),
            });
        }
        if target == self.meta_type {
            return Ok(self.clone());
        }
        if target.is::<Variant>() {
            return Ok(Variant::new(self.clone()));
        }
        if let Some(inner) = self.downcast_ref::<Variant>() {
            return inner.convert(target);
        }
        conversion::convert(value, self.meta_type, target)
    }

    /// Returns true if `convert(target)` would succeed.
    pub fn can_convert(&self, target: MetaType) -> bool {
        self.convert(target).is_ok()
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        Self {
            meta_type: self.meta_type,
            value: self
                .data()
                .and_then(|value| self.meta_type.clone_payload(value)),
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::invalid()
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        if self.meta_type != other.meta_type {
            return false;
        }
        match (self.data(), other.data()) {
            (Some(lhs), Some(rhs)) => self.meta_type.equals(lhs, rhs),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Some(value) => {
                write!(f, "Variant({}, ", self.meta_type.name())?;
                self.meta_type.debug(value, f)?;
                f.write_str(")")
            }
            None => f.write_str("Variant(<invalid>)"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::new(value)
                }
            }
        )*
    };
}

impl_from!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String);

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::new(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typed_access() {
        let mut value = Variant::new(42i32);
        assert!(value.is_valid());
        assert!(value.is::<i32>());
        assert_eq!(value.downcast_ref::<i64>(), None);

        *value.downcast_mut::<i32>().unwrap() = 7;
        assert_eq!(value.downcast_ref::<i32>(), Some(&7));
    }

    #[test]
    fn test_invalid_variant() {
        let value = Variant::invalid();
        assert!(!value.is_valid());
        assert!(value.data().is_none());
        assert_eq!(value, Variant::default());
        assert_eq!(value.value::<i32>(), 0);
        assert!(matches!(
            value.try_value::<i32>(),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_meta_type_is_default() {
        assert_eq!(
            Variant::from_meta_type(MetaType::of::<String>()),
            Variant::from("")
        );
        assert!(!Variant::from_meta_type(MetaType::INVALID).is_valid());
    }

    #[test]
    fn test_from_data_copies() {
        let stored = vec![1u8, 2];
        let copy = Variant::from_data(MetaType::of::<Vec<u8>>(), &stored);
        assert_eq!(copy.downcast_ref::<Vec<u8>>(), Some(&stored));
        assert!(!Variant::from_data(MetaType::INVALID, &stored).is_valid());
    }

    #[test]
    fn test_equality_requires_same_type() {
        assert_eq!(Variant::from(1i32), Variant::from(1i32));
        assert_ne!(Variant::from(1i32), Variant::from(1i64));
        assert_ne!(Variant::from(1i32), Variant::from(2i32));
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Variant::from("hello");
        let mut copy = original.clone();
        copy.downcast_mut::<String>().unwrap().push('!');
        assert_eq!(original.value::<String>(), "hello");
        assert_eq!(copy.value::<String>(), "hello!");
    }

    #[test]
    fn test_nested_variant() {
        let inner = Variant::from(5u8);
        let wrapped = inner.convert(MetaType::of::<Variant>()).unwrap();
        assert!(wrapped.is::<Variant>());
        assert_eq!(wrapped.downcast_ref::<Variant>(), Some(&inner));
        assert_eq!(wrapped.value::<i32>(), 5);
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", Variant::from(3i32)), "Variant(i32, 3)");
        assert_eq!(format!("{:?}", Variant::invalid()), "Variant(<invalid>)");
    }
}
