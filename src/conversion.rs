//! The explicit conversion table used by [`Variant::convert`](crate::Variant::convert).
//!
//! Conversions are keyed by (source type, target type) and must be lossless:
//! a converter returns `None` whenever the value does not survive the trip.
//! The table starts out with the scalar conversions and can be extended with
//! [`register_converter`].

use crate::meta_type::{MetaType, MetaValue, Payload};
use crate::{Error, Variant};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

type ErasedConverter = Arc<dyn Fn(&dyn Any) -> Option<Payload> + Send + Sync>;

static CONVERTERS: LazyLock<RwLock<HashMap<(TypeId, TypeId), ErasedConverter>>> =
    LazyLock::new(|| {
        let mut table = HashMap::new();
        builtin::install(&mut table);
        RwLock::new(table)
    });

fn erase<Src: MetaValue, Dst: MetaValue>(f: fn(&Src) -> Option<Dst>) -> ErasedConverter {
    Arc::new(move |value: &dyn Any| {
        let value = value.downcast_ref::<Src>()?;
        f(value).map(|converted| Box::new(converted) as Payload)
    })
}

fn insert<Src: MetaValue, Dst: MetaValue>(
    table: &mut HashMap<(TypeId, TypeId), ErasedConverter>,
    f: fn(&Src) -> Option<Dst>,
) {
    table.insert((TypeId::of::<Src>(), TypeId::of::<Dst>()), erase(f));
}

/// Registers a conversion from `Src` to `Dst`, replacing any existing one.
///
/// The converter should return `None` when the value can't be represented
/// in the target type.
///
/// # Examples
///
/// ```
/// use sovran_assoc::{register_converter, Variant};
///
/// #[derive(Clone, Default, PartialEq, Debug)]
/// struct Celsius(f64);
///
/// register_converter::<f64, Celsius>(|value| Some(Celsius(*value)))?;
/// assert_eq!(Variant::from(21.5f64).value::<Celsius>(), Celsius(21.5));
/// # Ok::<(), sovran_assoc::Error>(())
/// ```
///
/// # Errors
///
/// Returns `Error::LockError` if the conversion table lock is poisoned.
pub fn register_converter<Src: MetaValue, Dst: MetaValue>(
    f: fn(&Src) -> Option<Dst>,
) -> Result<(), Error> {
    let mut table = CONVERTERS.write().map_err(|_| Error::LockError)?;
    insert(&mut table, f);
    tracing::trace!(
        from = std::any::type_name::<Src>(),
        to = std::any::type_name::<Dst>(),
        "registered converter"
    );
    Ok(())
}

/// Returns true if a converter from `from` to `to` is registered.
pub fn has_converter(from: MetaType, to: MetaType) -> bool {
    let (Some(from), Some(to)) = (from.type_id(), to.type_id()) else {
        return false;
    };
    CONVERTERS
        .read()
        .map(|table| table.contains_key(&(from, to)))
        .unwrap_or(false)
}

pub(crate) fn convert(value: &dyn Any, from: MetaType, to: MetaType) -> Result<Variant, Error> {
    let unconvertible = Error::Unconvertible {
        from: from.name(),
        to: to.name(),
    };
    let (Some(from_id), Some(to_id)) = (from.type_id(), to.type_id()) else {
        return Err(unconvertible);
    };
    let converter = {
        let table = CONVERTERS.read().map_err(|_| Error::LockError)?;
        table.get(&(from_id, to_id)).cloned()
    };
    let converter = converter.ok_or_else(|| unconvertible.clone())?;
    match converter(value) {
        Some(converted) => Ok(Variant::from_payload(to, converted)),
        None => Err(unconvertible),
    }
}

mod builtin {
    use super::{insert, ErasedConverter};
    use std::any::TypeId;
    use std::collections::HashMap;

    type Table = HashMap<(TypeId, TypeId), ErasedConverter>;

    macro_rules! integer_to_integer {
        (@each $table:ident, $from:ty; $($to:ty),*) => {
            $( insert::<$from, $to>($table, |v| <$to>::try_from(*v).ok()); )*
        };
        ($table:ident; $($from:ty),*) => {
            $(
                integer_to_integer!(
                    @each $table, $from;
                    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
                );
            )*
        };
    }

    // Compared through i128 so that saturating casts can't fake a round trip.
    macro_rules! integer_to_float {
        ($table:ident; $($from:ty),*) => {
            $(
                insert::<$from, f64>($table, |v| {
                    let converted = *v as f64;
                    (converted as i128 == *v as i128).then_some(converted)
                });
                insert::<$from, f32>($table, |v| {
                    let converted = *v as f32;
                    (converted as i128 == *v as i128).then_some(converted)
                });
            )*
        };
    }

    macro_rules! float_to_integer {
        (@each $table:ident, $from:ty; $($to:ty),*) => {
            $(
                insert::<$from, $to>($table, |v| {
                    if !v.is_finite() || v.fract() != 0.0 {
                        return None;
                    }
                    <$to>::try_from(*v as i128).ok()
                });
            )*
        };
        ($table:ident; $($from:ty),*) => {
            $(
                float_to_integer!(
                    @each $table, $from;
                    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
                );
            )*
        };
    }

    macro_rules! integer_and_bool {
        ($table:ident; $($ty:ty),*) => {
            $(
                insert::<$ty, bool>($table, |v| match *v {
                    0 => Some(false),
                    1 => Some(true),
                    _ => None,
                });
                insert::<bool, $ty>($table, |v| Some(<$ty>::from(*v)));
            )*
        };
    }

    macro_rules! string_and_scalar {
        ($table:ident; $($ty:ty),*) => {
            $(
                insert::<$ty, String>($table, |v| Some(v.to_string()));
                insert::<String, $ty>($table, |v| v.trim().parse::<$ty>().ok());
            )*
        };
    }

    pub(super) fn install(table: &mut Table) {
        integer_to_integer!(table; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        integer_to_float!(table; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        float_to_integer!(table; f32, f64);
        integer_and_bool!(table; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        string_and_scalar!(
            table;
            bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
        );

        insert::<f32, f64>(table, |v| Some(f64::from(*v)));
        insert::<f64, f32>(table, |v| {
            let converted = *v as f32;
            (f64::from(converted) == *v || v.is_nan()).then_some(converted)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted<T: MetaValue>(value: Variant) -> Option<T> {
        value.convert(MetaType::of::<T>()).ok()?.downcast_ref::<T>().cloned()
    }

    #[test]
    fn test_integer_conversions_are_lossless() {
        assert_eq!(converted::<i64>(Variant::from(42i32)), Some(42));
        assert_eq!(converted::<u8>(Variant::from(255i64)), Some(255));
        assert_eq!(converted::<u8>(Variant::from(256i64)), None);
        assert_eq!(converted::<u32>(Variant::from(-1i32)), None);
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(converted::<i32>(Variant::from(3.0f64)), Some(3));
        assert_eq!(converted::<i32>(Variant::from(3.5f64)), None);
        assert_eq!(converted::<i8>(Variant::from(1000.0f64)), None);
        assert_eq!(converted::<f64>(Variant::from(7i32)), Some(7.0));
        assert_eq!(converted::<f64>(Variant::from(i64::MAX - 1)), None);
        assert_eq!(converted::<f64>(Variant::from(i64::MAX)), None);
        assert_eq!(converted::<i64>(Variant::from(9.3e18f64)), None);
        assert_eq!(converted::<f32>(Variant::from(0.5f64)), Some(0.5));
        assert_eq!(converted::<f32>(Variant::from(0.1f64)), None);
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(converted::<bool>(Variant::from(1u8)), Some(true));
        assert_eq!(converted::<bool>(Variant::from(0i64)), Some(false));
        assert_eq!(converted::<bool>(Variant::from(2i32)), None);
        assert_eq!(converted::<i32>(Variant::from(true)), Some(1));
        assert_eq!(converted::<bool>(Variant::from("true")), Some(true));
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(converted::<String>(Variant::from(12i32)), Some("12".to_string()));
        assert_eq!(converted::<i32>(Variant::from(" 12 ")), Some(12));
        assert_eq!(converted::<i32>(Variant::from("twelve")), None);
        assert_eq!(converted::<char>(Variant::from("x")), Some('x'));
        assert_eq!(converted::<String>(Variant::from('x')), Some("x".to_string()));
    }

    #[test]
    fn test_missing_converter() {
        let err = Variant::from(1i32)
            .convert(MetaType::of::<Vec<i32>>())
            .unwrap_err();
        assert!(matches!(err, Error::Unconvertible { .. }));
        assert!(!has_converter(MetaType::of::<i32>(), MetaType::of::<Vec<i32>>()));
        assert!(has_converter(MetaType::of::<i32>(), MetaType::of::<i64>()));
    }

    #[test]
    fn test_register_converter() -> Result<(), Error> {
        #[derive(Clone, Default, PartialEq, Debug)]
        struct Meters(u32);

        assert!(!Variant::from(5u32).can_convert(MetaType::of::<Meters>()));
        register_converter::<u32, Meters>(|v| Some(Meters(*v)))?;
        assert_eq!(converted::<Meters>(Variant::from(5u32)), Some(Meters(5)));
        Ok(())
    }
}
