use crate::association::MetaAssociation;
use crate::coercer::Coercer;
use crate::cursor::Seek;
use crate::iterator::{retrieve_element, ConstIterator, Iter, IterMut};
use crate::registry;
use crate::{Error, Variant};
use std::any::Any;
use std::fmt;

enum Binding<'a> {
    Const(&'a Variant),
    Mut(&'a mut Variant),
}

/// An iterable view of an associative container held in a [`Variant`].
///
/// The view borrows the Variant; the container is never copied, so iterating
/// observes the live container and mutating writes straight into it.
///
/// Keys and values are passed as Variants and coerced to the container's key
/// and mapped types. Lookups (`find`, `contains_key`) treat an unconvertible
/// key as absent. Everything else substitutes the default value of the
/// expected type for an unconvertible argument.
///
/// A Variant that doesn't hold a registered container yields an empty view
/// on which every operation does nothing. So does mutation through a view
/// created with [`new`](AssociativeIterable::new), which binds read-only.
///
/// # Examples
///
/// ```
/// use sovran_assoc::{AssociativeIterable, Variant, VariantMap};
///
/// let mut map = VariantMap::new();
/// map.insert("a".to_string(), Variant::from(1i32));
/// let mut value = Variant::new(map);
///
/// let mut iterable = AssociativeIterable::new_mut(&mut value);
/// iterable.set_value(&"b".into(), &2i32.into());
/// assert!(iterable.contains_key(&"b".into()));
/// assert_eq!(iterable.value(&"a".into()), Variant::from(1i32));
///
/// for it in iterable.iter() {
///     println!("{:?} => {:?}", it.key(), it.get());
/// }
/// ```
pub struct AssociativeIterable<'a> {
    meta: Option<&'static MetaAssociation>,
    binding: Binding<'a>,
}

impl<'a> AssociativeIterable<'a> {
    /// Creates a read-only view of the container in `value`.
    pub fn new(value: &'a Variant) -> Self {
        Self {
            meta: Self::resolve(value),
            binding: Binding::Const(value),
        }
    }

    /// Creates a view of the container in `value` that can modify it.
    pub fn new_mut(value: &'a mut Variant) -> Self {
        Self {
            meta: Self::resolve(value),
            binding: Binding::Mut(value),
        }
    }

    /// Like [`new`](AssociativeIterable::new), but refuses values that don't
    /// hold a registered associative container.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAssociative` if no descriptor is registered for the
    /// value's type.
    pub fn try_new(value: &'a Variant) -> Result<Self, Error> {
        let iterable = Self::new(value);
        match iterable.meta {
            Some(_) => Ok(iterable),
            None => Err(Error::NotAssociative(value.meta_type().name().to_string())),
        }
    }

    /// Like [`new_mut`](AssociativeIterable::new_mut), but refuses values
    /// that don't hold a registered associative container.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAssociative` if no descriptor is registered for the
    /// value's type.
    pub fn try_new_mut(value: &'a mut Variant) -> Result<Self, Error> {
        let Some(meta) = Self::resolve(value) else {
            return Err(Error::NotAssociative(value.meta_type().name().to_string()));
        };
        Ok(Self {
            meta: Some(meta),
            binding: Binding::Mut(value),
        })
    }

    fn resolve(value: &Variant) -> Option<&'static MetaAssociation> {
        let meta = registry::resolve(value.meta_type());
        if meta.is_none() {
            tracing::debug!(
                type_name = value.meta_type().name(),
                "variant does not hold a registered associative container"
            );
        }
        meta
    }

    /// The descriptor of the underlying container, if it is registered.
    pub fn meta_container(&self) -> Option<&'static MetaAssociation> {
        self.meta
    }

    /// Returns true if this view was created with mutable access.
    pub fn can_mutate(&self) -> bool {
        matches!(self.binding, Binding::Mut(_))
    }

    fn const_iterable(&self) -> Option<&dyn Any> {
        match &self.binding {
            Binding::Const(value) => value.data(),
            Binding::Mut(value) => value.data(),
        }
    }

    fn mutable_iterable(
        &mut self,
        operation: &'static str,
    ) -> Option<(&'static MetaAssociation, &mut dyn Any)> {
        let Some(meta) = self.meta else {
            tracing::warn!(operation, "no associative container to modify");
            return None;
        };
        match &mut self.binding {
            Binding::Mut(value) => value.data_mut().map(|container| (meta, container)),
            Binding::Const(_) => {
                tracing::warn!(
                    operation,
                    container = meta.container_name(),
                    "associative container is bound read-only"
                );
                None
            }
        }
    }

    /// The number of entries in the container.
    pub fn size(&self) -> usize {
        match (self.meta, self.const_iterable()) {
            (Some(meta), Some(container)) => meta.size(container),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        if let Some((meta, container)) = self.mutable_iterable("clear") {
            meta.clear(container);
        }
    }

    fn const_at(&self, seek: Seek<'_>) -> ConstIterator<'_> {
        ConstIterator::new(self.meta, self.const_iterable(), seek)
    }

    /// An iterator at the first entry.
    pub fn begin(&self) -> ConstIterator<'_> {
        self.const_at(Seek::Begin)
    }

    /// An iterator past the last entry.
    pub fn end(&self) -> ConstIterator<'_> {
        self.const_at(Seek::End)
    }

    /// Same as [`begin`](AssociativeIterable::begin).
    pub fn const_begin(&self) -> ConstIterator<'_> {
        self.begin()
    }

    /// Same as [`end`](AssociativeIterable::end).
    pub fn const_end(&self) -> ConstIterator<'_> {
        self.end()
    }

    fn mutable_at(&mut self, seek: Seek<'_>, operation: &'static str) -> IterMut<'_> {
        match self.mutable_iterable(operation) {
            Some((meta, container)) => IterMut::new(meta, container, seek),
            None => IterMut::empty(),
        }
    }

    /// A mutable iterator at the first entry.
    pub fn mutable_begin(&mut self) -> IterMut<'_> {
        self.mutable_at(Seek::Begin, "mutable_begin")
    }

    /// A mutable iterator past the last entry.
    pub fn mutable_end(&mut self) -> IterMut<'_> {
        self.mutable_at(Seek::End, "mutable_end")
    }

    /// Walks the container front to back.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.begin(), self.size())
    }

    /// An iterator at `key`, or [`end`](AssociativeIterable::end) if the key
    /// is absent or can't be converted to the key type.
    pub fn find(&self, key: &Variant) -> ConstIterator<'_> {
        let (Some(meta), Some(container)) = (self.meta, self.const_iterable()) else {
            return self.end();
        };
        let mut coercer = Coercer::new();
        match coercer.convert(key, meta.key_meta_type()) {
            Some(key) => ConstIterator::new(Some(meta), Some(container), Seek::Key(key)),
            None => self.end(),
        }
    }

    /// A mutable iterator at `key`, or the end position if the key is absent
    /// or can't be converted to the key type.
    pub fn mutable_find(&mut self, key: &Variant) -> IterMut<'_> {
        let Some(meta) = self.meta else {
            return self.mutable_at(Seek::End, "mutable_find");
        };
        let mut coercer = Coercer::new();
        match coercer.convert(key, meta.key_meta_type()) {
            Some(key) => self.mutable_at(Seek::Key(key), "mutable_find"),
            None => self.mutable_at(Seek::End, "mutable_find"),
        }
    }

    /// Returns true if the container has an entry for `key`. An
    /// unconvertible key is never contained.
    pub fn contains_key(&self, key: &Variant) -> bool {
        let (Some(meta), Some(container)) = (self.meta, self.const_iterable()) else {
            return false;
        };
        let mut coercer = Coercer::new();
        coercer
            .convert(key, meta.key_meta_type())
            .is_some_and(|key| meta.contains_key(container, key))
    }

    /// Inserts `key` with a default mapped value.
    ///
    /// An existing entry for `key` has its mapped value reset to the default.
    /// An unconvertible key is replaced by the key type's default value.
    pub fn insert_key(&mut self, key: &Variant) {
        let Some((meta, container)) = self.mutable_iterable("insert_key") else {
            return;
        };
        let mut coercer = Coercer::new();
        meta.insert_key(container, coercer.coerce(key, meta.key_meta_type()));
    }

    /// Removes the entry for `key`, if any. An unconvertible key is replaced
    /// by the key type's default value.
    pub fn remove_key(&mut self, key: &Variant) {
        let Some((meta, container)) = self.mutable_iterable("remove_key") else {
            return;
        };
        let mut coercer = Coercer::new();
        meta.remove_key(container, coercer.coerce(key, meta.key_meta_type()));
    }

    /// The value mapped to `key`, or a default value of the mapped type if the
    /// key is absent. An unconvertible key is replaced by the key type's
    /// default value.
    ///
    /// Set-like containers have no mapped values and return the invalid
    /// Variant.
    pub fn value(&self, key: &Variant) -> Variant {
        let (Some(meta), Some(container)) = (self.meta, self.const_iterable()) else {
            return Variant::invalid();
        };
        let mut coercer = Coercer::new();
        let key = coercer.coerce(key, meta.key_meta_type());
        retrieve_element(meta.mapped_meta_type(), |out| {
            meta.mapped_at_key(container, key, out)
        })
    }

    /// Maps `key` to `mapped`, inserting the entry if needed.
    ///
    /// Both arguments are coerced; unconvertible ones are replaced by the
    /// default value of their expected type. For set-like containers only
    /// the key is inserted.
    pub fn set_value(&mut self, key: &Variant, mapped: &Variant) {
        let Some((meta, container)) = self.mutable_iterable("set_value") else {
            return;
        };
        let mut key_coercer = Coercer::new();
        let mut mapped_coercer = Coercer::new();
        let mapped: &dyn Any = if meta.has_mapped_type() {
            mapped_coercer.coerce(mapped, meta.mapped_meta_type())
        } else {
            &()
        };
        meta.set_mapped_at_key(container, key_coercer.coerce(key, meta.key_meta_type()), mapped);
    }
}

impl fmt::Debug for AssociativeIterable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociativeIterable")
            .field("meta", &self.meta)
            .field("size", &self.size())
            .field("mutable", &self.can_mutate())
            .finish()
    }
}

impl<'i> IntoIterator for &'i AssociativeIterable<'_> {
    type Item = ConstIterator<'i>;
    type IntoIter = Iter<'i>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Variant {
    /// A read-only [`AssociativeIterable`] over this value.
    pub fn associative_iterable(&self) -> AssociativeIterable<'_> {
        AssociativeIterable::new(self)
    }

    /// A mutable [`AssociativeIterable`] over this value.
    pub fn associative_iterable_mut(&mut self) -> AssociativeIterable<'_> {
        AssociativeIterable::new_mut(self)
    }
}
