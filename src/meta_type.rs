use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// Boxed payload of a [`Variant`](crate::Variant).
pub(crate) type Payload = Box<dyn Any + Send + Sync>;

/// Types that can live inside a [`Variant`](crate::Variant).
///
/// Implemented for every type that is `Clone + Default + PartialEq + Debug`
/// and thread-safe; there is nothing to implement by hand.
pub trait MetaValue: Any + Clone + Default + PartialEq + fmt::Debug + Send + Sync {}

impl<T> MetaValue for T where T: Any + Clone + Default + PartialEq + fmt::Debug + Send + Sync {}

/// The erased operations for one concrete type.
pub(crate) struct MetaTypeInfo {
    type_id: fn() -> TypeId,
    name: fn() -> &'static str,
    create: fn() -> Payload,
    clone: fn(&dyn Any) -> Payload,
    assign: fn(&mut dyn Any, &dyn Any),
    equals: fn(&dyn Any, &dyn Any) -> bool,
    debug: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

struct InfoOf<T>(PhantomData<T>);

impl<T: MetaValue> InfoOf<T> {
    const INFO: MetaTypeInfo = MetaTypeInfo {
        type_id: TypeId::of::<T>,
        name: std::any::type_name::<T>,
        create: create::<T>,
        clone: clone::<T>,
        assign: assign::<T>,
        equals: equals::<T>,
        debug: debug::<T>,
    };
}

fn create<T: MetaValue>() -> Payload {
    Box::new(T::default())
}

fn clone<T: MetaValue>(value: &dyn Any) -> Payload {
    match value.downcast_ref::<T>() {
        Some(value) => Box::new(value.clone()),
        None => Box::new(T::default()),
    }
}

fn assign<T: MetaValue>(slot: &mut dyn Any, value: &dyn Any) {
    if let (Some(slot), Some(value)) = (slot.downcast_mut::<T>(), value.downcast_ref::<T>()) {
        slot.clone_from(value);
    }
}

fn equals<T: MetaValue>(lhs: &dyn Any, rhs: &dyn Any) -> bool {
    match (lhs.downcast_ref::<T>(), rhs.downcast_ref::<T>()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    }
}

fn debug<T: MetaValue>(value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(value) => fmt::Debug::fmt(value, f),
        None => f.write_str("<mismatched payload>"),
    }
}

/// Runtime identity of a type, plus the operations needed to handle it erased.
///
/// A `MetaType` is either valid, describing exactly one Rust type, or
/// [`MetaType::INVALID`], which associative descriptors use to say "this
/// container has no mapped value".
#[derive(Clone, Copy)]
pub struct MetaType(Option<&'static MetaTypeInfo>);

impl MetaType {
    /// The invalid meta type.
    pub const INVALID: MetaType = MetaType(None);

    /// Returns the meta type of `T`.
    pub const fn of<T: MetaValue>() -> Self {
        MetaType(Some(&InfoOf::<T>::INFO))
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// The `TypeId` of the described type, `None` for the invalid meta type.
    pub fn type_id(&self) -> Option<TypeId> {
        self.0.map(|info| (info.type_id)())
    }

    /// The type name, or `"<invalid>"`.
    pub fn name(&self) -> &'static str {
        self.0.map_or("<invalid>", |info| (info.name)())
    }

    /// Returns true if this meta type describes `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == Some(TypeId::of::<T>())
    }

    pub(crate) fn create(&self) -> Option<Payload> {
        self.0.map(|info| (info.create)())
    }

    pub(crate) fn clone_payload(&self, value: &dyn Any) -> Option<Payload> {
        self.0.map(|info| (info.clone)(value))
    }

    /// Overwrites `slot` with a copy of `value`. Does nothing unless both are
    /// of the described type.
    pub(crate) fn assign(&self, slot: &mut dyn Any, value: &dyn Any) {
        if let Some(info) = self.0 {
            (info.assign)(slot, value);
        }
    }

    pub(crate) fn equals(&self, lhs: &dyn Any, rhs: &dyn Any) -> bool {
        self.0.is_some_and(|info| (info.equals)(lhs, rhs))
    }

    pub(crate) fn debug(&self, value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(info) => (info.debug)(value, f),
            None => f.write_str("<invalid>"),
        }
    }
}

impl PartialEq for MetaType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for MetaType {}

impl Default for MetaType {
    fn default() -> Self {
        MetaType::INVALID
    }
}

impl fmt::Debug for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaType({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(MetaType::of::<i32>(), MetaType::of::<i32>());
        assert_ne!(MetaType::of::<i32>(), MetaType::of::<i64>());
        assert!(MetaType::of::<String>().is::<String>());
        assert!(!MetaType::of::<String>().is::<&str>());
    }

    #[test]
    fn test_invalid() {
        let invalid = MetaType::INVALID;
        assert!(!invalid.is_valid());
        assert_eq!(invalid.type_id(), None);
        assert_eq!(invalid.name(), "<invalid>");
        assert!(invalid.create().is_none());
        assert_eq!(invalid, MetaType::default());
    }

    #[test]
    fn test_erased_operations() {
        let meta = MetaType::of::<String>();
        let created = meta.create().unwrap();
        assert_eq!(created.downcast_ref::<String>(), Some(&String::new()));

        let original = "hello".to_string();
        let copy = meta.clone_payload(&original).unwrap();
        assert!(meta.equals(&original, &*copy));
        assert!(!meta.equals(&original, &42i32));
    }

    #[test]
    fn test_assign() {
        let meta = MetaType::of::<String>();
        let mut slot = "old".to_string();
        meta.assign(&mut slot, &"new".to_string());
        assert_eq!(slot, "new");

        meta.assign(&mut slot, &7i32);
        assert_eq!(slot, "new");
        MetaType::INVALID.assign(&mut slot, &"ignored".to_string());
        assert_eq!(slot, "new");
    }
}
