use crate::cursor::{self, Cursor, CursorMut, Seek};
use crate::meta_type::{MetaType, MetaValue};
use indexmap::{IndexMap, IndexSet};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// How far an iterator over a container may move.
///
/// Categories are ordered: each one supports everything the previous one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IteratorCategory {
    /// Single pass, forward only
    Input,
    /// Multi pass, forward only
    Forward,
    /// Forward and backward, one step at a time
    Bidirectional,
    /// Arbitrary jumps and distances
    RandomAccess,
}

impl IteratorCategory {
    pub fn can_retreat(self) -> bool {
        self >= IteratorCategory::Bidirectional
    }

    pub fn can_jump(self) -> bool {
        self == IteratorCategory::RandomAccess
    }
}

/// A concrete associative container that can be driven through a
/// [`MetaAssociation`].
///
/// Elements are reached through cursors, which must step to a neighbouring
/// element without rescanning the container.
///
/// Set-like containers use `()` as their mapped type and set `HAS_MAPPED`
/// to false.
pub trait AssociativeContainer: Any + Send + Sync + Sized {
    type Key: MetaValue;
    type Mapped: MetaValue;

    const HAS_MAPPED: bool = true;
    const CATEGORY: IteratorCategory;

    fn size(&self) -> usize;
    fn clear(&mut self);

    fn contains(&self, key: &Self::Key) -> bool;

    /// Inserts `key` with a default mapped value, resetting the mapped value
    /// if the key is already present.
    fn insert_key(&mut self, key: Self::Key);
    fn remove_key(&mut self, key: &Self::Key);

    fn mapped(&self, key: &Self::Key) -> Option<&Self::Mapped>;
    /// Sets the mapped value for `key`, inserting the key if needed.
    fn set_mapped(&mut self, key: Self::Key, mapped: Self::Mapped);

    /// A read-only cursor at `seek`. A key that isn't present seeks the end.
    fn cursor(&self, seek: Seek<'_, Self::Key>) -> Box<dyn Cursor<'_> + '_>;
    fn cursor_mut(&mut self, seek: Seek<'_, Self::Key>) -> Box<dyn CursorMut + '_>;
}

type ErasedCursor = for<'a, 'k> fn(&'a dyn Any, Seek<'k>) -> Option<Box<dyn Cursor<'a> + 'a>>;
type ErasedCursorMut =
    for<'a, 'k> fn(&'a mut dyn Any, Seek<'k>) -> Option<Box<dyn CursorMut + 'a>>;

/// The runtime descriptor of one concrete associative container type.
///
/// Every operation takes the container, keys and values as `dyn Any` and
/// is only meaningful when they are of the types this descriptor was built
/// for. A mismatched argument makes the operation a no-op returning an empty
/// result; [`AssociativeIterable`](crate::AssociativeIterable) never passes one.
pub struct MetaAssociation {
    container_type_id: fn() -> TypeId,
    container_name: fn() -> &'static str,
    key_meta_type: MetaType,
    mapped_meta_type: MetaType,
    category: IteratorCategory,

    size: fn(&dyn Any) -> usize,
    clear: fn(&mut dyn Any),
    cursor: ErasedCursor,
    cursor_mut: ErasedCursorMut,
    contains_key: fn(&dyn Any, &dyn Any) -> bool,
    insert_key: fn(&mut dyn Any, &dyn Any),
    remove_key: fn(&mut dyn Any, &dyn Any),
    mapped_at_key: fn(&dyn Any, &dyn Any, &mut dyn Any),
    set_mapped_at_key: fn(&mut dyn Any, &dyn Any, &dyn Any),
}

struct DescriptorOf<C>(PhantomData<C>);

impl<C: AssociativeContainer> DescriptorOf<C> {
    const ASSOCIATION: MetaAssociation = MetaAssociation {
        container_type_id: TypeId::of::<C>,
        container_name: std::any::type_name::<C>,
        key_meta_type: MetaType::of::<C::Key>(),
        mapped_meta_type: if C::HAS_MAPPED {
            MetaType::of::<C::Mapped>()
        } else {
            MetaType::INVALID
        },
        category: C::CATEGORY,
        size: shim::size::<C>,
        clear: shim::clear::<C>,
        cursor: shim::cursor::<C>,
        cursor_mut: shim::cursor_mut::<C>,
        contains_key: shim::contains_key::<C>,
        insert_key: shim::insert_key::<C>,
        remove_key: shim::remove_key::<C>,
        mapped_at_key: shim::mapped_at_key::<C>,
        set_mapped_at_key: shim::set_mapped_at_key::<C>,
    };
}

impl MetaAssociation {
    /// Returns the descriptor for `C`.
    pub fn of<C: AssociativeContainer>() -> &'static MetaAssociation {
        &DescriptorOf::<C>::ASSOCIATION
    }

    pub fn container_type_id(&self) -> TypeId {
        (self.container_type_id)()
    }

    pub fn container_name(&self) -> &'static str {
        (self.container_name)()
    }

    pub fn key_meta_type(&self) -> MetaType {
        self.key_meta_type
    }

    /// The mapped type, invalid for set-like containers.
    pub fn mapped_meta_type(&self) -> MetaType {
        self.mapped_meta_type
    }

    pub fn has_mapped_type(&self) -> bool {
        self.mapped_meta_type.is_valid()
    }

    pub fn iterator_category(&self) -> IteratorCategory {
        self.category
    }

    pub fn size(&self, container: &dyn Any) -> usize {
        (self.size)(container)
    }

    pub fn clear(&self, container: &mut dyn Any) {
        (self.clear)(container)
    }

    /// A read-only cursor into `container`.
    ///
    /// A key of the wrong type seeks the end. Returns `None` if `container`
    /// isn't of this descriptor's type.
    pub fn cursor<'a>(
        &self,
        container: &'a dyn Any,
        seek: Seek<'_>,
    ) -> Option<Box<dyn Cursor<'a> + 'a>> {
        (self.cursor)(container, seek)
    }

    /// A cursor into `container` that can write mapped values.
    pub fn cursor_mut<'a>(
        &self,
        container: &'a mut dyn Any,
        seek: Seek<'_>,
    ) -> Option<Box<dyn CursorMut + 'a>> {
        (self.cursor_mut)(container, seek)
    }

    pub fn contains_key(&self, container: &dyn Any, key: &dyn Any) -> bool {
        (self.contains_key)(container, key)
    }

    pub fn insert_key(&self, container: &mut dyn Any, key: &dyn Any) {
        (self.insert_key)(container, key)
    }

    pub fn remove_key(&self, container: &mut dyn Any, key: &dyn Any) {
        (self.remove_key)(container, key)
    }

    /// Writes the value mapped to `key` into `out`, or the default value if
    /// the key is absent.
    pub fn mapped_at_key(&self, container: &dyn Any, key: &dyn Any, out: &mut dyn Any) {
        (self.mapped_at_key)(container, key, out)
    }

    pub fn set_mapped_at_key(&self, container: &mut dyn Any, key: &dyn Any, mapped: &dyn Any) {
        (self.set_mapped_at_key)(container, key, mapped)
    }
}

impl fmt::Debug for MetaAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaAssociation")
            .field("container", &self.container_name())
            .field("key", &self.key_meta_type)
            .field("mapped", &self.mapped_meta_type)
            .field("category", &self.category)
            .finish()
    }
}

// Monomorphic entry points stored in the descriptor.
mod shim {
    use super::AssociativeContainer;
    use crate::cursor::{Cursor, CursorMut, Seek};
    use std::any::Any;

    fn typed_seek<'k, K: Any>(seek: Seek<'k>) -> Seek<'k, K> {
        match seek {
            Seek::Begin => Seek::Begin,
            Seek::End => Seek::End,
            Seek::Key(key) => key.downcast_ref::<K>().map_or(Seek::End, Seek::Key),
        }
    }

    pub(super) fn size<C: AssociativeContainer>(c: &dyn Any) -> usize {
        c.downcast_ref::<C>().map_or(0, C::size)
    }

    pub(super) fn clear<C: AssociativeContainer>(c: &mut dyn Any) {
        if let Some(c) = c.downcast_mut::<C>() {
            c.clear();
        }
    }

    pub(super) fn cursor<'a, C: AssociativeContainer>(
        c: &'a dyn Any,
        seek: Seek<'_>,
    ) -> Option<Box<dyn Cursor<'a> + 'a>> {
        let c = c.downcast_ref::<C>()?;
        Some(c.cursor(typed_seek(seek)))
    }

    pub(super) fn cursor_mut<'a, C: AssociativeContainer>(
        c: &'a mut dyn Any,
        seek: Seek<'_>,
    ) -> Option<Box<dyn CursorMut + 'a>> {
        let c = c.downcast_mut::<C>()?;
        Some(c.cursor_mut(typed_seek(seek)))
    }

    pub(super) fn contains_key<C: AssociativeContainer>(c: &dyn Any, key: &dyn Any) -> bool {
        match (c.downcast_ref::<C>(), key.downcast_ref::<C::Key>()) {
            (Some(c), Some(key)) => c.contains(key),
            _ => false,
        }
    }

    pub(super) fn insert_key<C: AssociativeContainer>(c: &mut dyn Any, key: &dyn Any) {
        if let (Some(c), Some(key)) = (c.downcast_mut::<C>(), key.downcast_ref::<C::Key>()) {
            c.insert_key(key.clone());
        }
    }

    pub(super) fn remove_key<C: AssociativeContainer>(c: &mut dyn Any, key: &dyn Any) {
        if let (Some(c), Some(key)) = (c.downcast_mut::<C>(), key.downcast_ref::<C::Key>()) {
            c.remove_key(key);
        }
    }

    pub(super) fn mapped_at_key<C: AssociativeContainer>(
        c: &dyn Any,
        key: &dyn Any,
        out: &mut dyn Any,
    ) {
        let Some(out) = out.downcast_mut::<C::Mapped>() else {
            return;
        };
        let mapped = match (c.downcast_ref::<C>(), key.downcast_ref::<C::Key>()) {
            (Some(c), Some(key)) => c.mapped(key),
            _ => None,
        };
        *out = mapped.cloned().unwrap_or_default();
    }

    pub(super) fn set_mapped_at_key<C: AssociativeContainer>(
        c: &mut dyn Any,
        key: &dyn Any,
        mapped: &dyn Any,
    ) {
        let (Some(c), Some(key)) = (c.downcast_mut::<C>(), key.downcast_ref::<C::Key>()) else {
            return;
        };
        match mapped.downcast_ref::<C::Mapped>() {
            Some(mapped) => c.set_mapped(key.clone(), mapped.clone()),
            None if !C::HAS_MAPPED => c.insert_key(key.clone()),
            None => {}
        }
    }
}

impl<K, V> AssociativeContainer for HashMap<K, V>
where
    K: MetaValue + Eq + Hash,
    V: MetaValue,
{
    type Key = K;
    type Mapped = V;

    const CATEGORY: IteratorCategory = IteratorCategory::Forward;

    fn size(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        HashMap::clear(self)
    }

    fn contains(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn insert_key(&mut self, key: K) {
        self.insert(key, V::default());
    }

    fn remove_key(&mut self, key: &K) {
        self.remove(key);
    }

    fn mapped(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn set_mapped(&mut self, key: K, mapped: V) {
        self.insert(key, mapped);
    }

    fn cursor(&self, seek: Seek<'_, K>) -> Box<dyn Cursor<'_> + '_> {
        cursor::hashed(self, seek)
    }

    fn cursor_mut(&mut self, seek: Seek<'_, K>) -> Box<dyn CursorMut + '_> {
        cursor::hashed_mut(self, seek)
    }
}

impl<K, V> AssociativeContainer for BTreeMap<K, V>
where
    K: MetaValue + Ord,
    V: MetaValue,
{
    type Key = K;
    type Mapped = V;

    const CATEGORY: IteratorCategory = IteratorCategory::Bidirectional;

    fn size(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        BTreeMap::clear(self)
    }

    fn contains(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn insert_key(&mut self, key: K) {
        self.insert(key, V::default());
    }

    fn remove_key(&mut self, key: &K) {
        self.remove(key);
    }

    fn mapped(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn set_mapped(&mut self, key: K, mapped: V) {
        self.insert(key, mapped);
    }

    fn cursor(&self, seek: Seek<'_, K>) -> Box<dyn Cursor<'_> + '_> {
        cursor::ordered(self, seek)
    }

    fn cursor_mut(&mut self, seek: Seek<'_, K>) -> Box<dyn CursorMut + '_> {
        cursor::ordered_mut(self, seek)
    }
}

impl<K, V> AssociativeContainer for IndexMap<K, V>
where
    K: MetaValue + Eq + Hash,
    V: MetaValue,
{
    type Key = K;
    type Mapped = V;

    const CATEGORY: IteratorCategory = IteratorCategory::RandomAccess;

    fn size(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        IndexMap::clear(self)
    }

    fn contains(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn insert_key(&mut self, key: K) {
        self.insert(key, V::default());
    }

    fn remove_key(&mut self, key: &K) {
        self.shift_remove(key);
    }

    fn mapped(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn set_mapped(&mut self, key: K, mapped: V) {
        self.insert(key, mapped);
    }

    fn cursor(&self, seek: Seek<'_, K>) -> Box<dyn Cursor<'_> + '_> {
        cursor::indexed(self, seek)
    }

    fn cursor_mut(&mut self, seek: Seek<'_, K>) -> Box<dyn CursorMut + '_> {
        cursor::indexed_mut(self, seek)
    }
}

// Set-like containers: no mapped value, so the mapped accessors are empty.
macro_rules! impl_set_container {
    (
        $set:ident,
        [$($bound:tt)+],
        $category:expr,
        $remove:ident,
        $cursor:ident,
        $cursor_mut:ident
    ) => {
        impl<K> AssociativeContainer for $set<K>
        where
            K: MetaValue + $($bound)+,
        {
            type Key = K;
            type Mapped = ();

            const HAS_MAPPED: bool = false;
            const CATEGORY: IteratorCategory = $category;

            fn size(&self) -> usize {
                self.len()
            }

            fn clear(&mut self) {
                $set::clear(self)
            }

            fn contains(&self, key: &K) -> bool {
                $set::contains(self, key)
            }

            fn insert_key(&mut self, key: K) {
                self.insert(key);
            }

            fn remove_key(&mut self, key: &K) {
                self.$remove(key);
            }

            fn mapped(&self, _key: &K) -> Option<&()> {
                None
            }

            fn set_mapped(&mut self, key: K, _mapped: ()) {
                self.insert(key);
            }

            fn cursor(&self, seek: Seek<'_, K>) -> Box<dyn Cursor<'_> + '_> {
                cursor::$cursor(self, seek)
            }

            fn cursor_mut(&mut self, seek: Seek<'_, K>) -> Box<dyn CursorMut + '_> {
                cursor::$cursor_mut(self, seek)
            }
        }
    };
}

impl_set_container!(HashSet, [Eq + Hash], IteratorCategory::Forward, remove, hashed, hashed_mut);
impl_set_container!(BTreeSet, [Ord], IteratorCategory::Bidirectional, remove, ordered, ordered_mut);
impl_set_container!(
    IndexSet,
    [Eq + Hash],
    IteratorCategory::RandomAccess,
    shift_remove,
    indexed,
    indexed_mut
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variant;

    fn sample() -> BTreeMap<String, i32> {
        BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
    }

    #[test]
    fn test_descriptor_types() {
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();
        assert_eq!(meta.key_meta_type(), MetaType::of::<String>());
        assert_eq!(meta.mapped_meta_type(), MetaType::of::<i32>());
        assert_eq!(meta.iterator_category(), IteratorCategory::Bidirectional);
        assert_eq!(meta.container_type_id(), TypeId::of::<BTreeMap<String, i32>>());

        let set = MetaAssociation::of::<HashSet<u8>>();
        assert!(!set.has_mapped_type());
        assert_eq!(set.iterator_category(), IteratorCategory::Forward);
    }

    #[test]
    fn test_descriptor_is_shared() {
        let first = MetaAssociation::of::<HashMap<i64, String>>();
        let second = MetaAssociation::of::<HashMap<i64, String>>();
        assert_eq!(first.container_type_id(), second.container_type_id());
        assert_eq!(first.key_meta_type(), second.key_meta_type());
    }

    fn key_at(meta: &MetaAssociation, container: &dyn Any, seek: Seek<'_>) -> Option<String> {
        let cursor = meta.cursor(container, seek)?;
        cursor.key()?.downcast_ref::<String>().cloned()
    }

    #[test]
    fn test_cursor_access() {
        let map = sample();
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();

        assert_eq!(key_at(meta, &map, Seek::Begin), Some("a".to_string()));
        assert_eq!(key_at(meta, &map, Seek::Key(&"b".to_string())), Some("b".to_string()));
        assert_eq!(key_at(meta, &map, Seek::Key(&"z".to_string())), None);
        assert_eq!(key_at(meta, &map, Seek::End), None);

        let mut cursor = meta.cursor(&map, Seek::Begin).expect("matching container");
        assert_eq!(cursor.mapped().and_then(|m| m.downcast_ref::<i32>()), Some(&1));
        cursor.advance();
        assert_eq!(cursor.mapped().and_then(|m| m.downcast_ref::<i32>()), Some(&2));
    }

    #[test]
    fn test_cursor_rejects_mismatched_arguments() {
        let map = sample();
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();

        assert!(meta.cursor(&5i32, Seek::Begin).is_none());
        // A key of the wrong type seeks the end
        assert_eq!(key_at(meta, &map, Seek::Key(&1i32)), None);
    }

    #[test]
    fn test_cursor_writes_through() {
        let mut map = sample();
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();
        {
            let mut cursor = meta
                .cursor_mut(&mut map, Seek::Key(&"b".to_string()))
                .expect("matching container");
            if let Some(slot) = cursor.mapped_mut().and_then(|m| m.downcast_mut::<i32>()) {
                *slot = 20;
            }
        }
        assert_eq!(map.get("b"), Some(&20));
    }

    #[test]
    fn test_keyed_mutation() {
        let mut map = sample();
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();

        meta.set_mapped_at_key(&mut map, &"c".to_string(), &3i32);
        assert_eq!(map.get("c"), Some(&3));

        meta.insert_key(&mut map, &"a".to_string());
        assert_eq!(map.get("a"), Some(&0));

        meta.remove_key(&mut map, &"b".to_string());
        assert!(!meta.contains_key(&map, &"b".to_string()));

        let mut out = -1i32;
        meta.mapped_at_key(&map, &"missing".to_string(), &mut out);
        assert_eq!(out, 0);
    }

    #[test]
    fn test_mismatched_arguments_are_ignored() {
        let mut map = sample();
        let meta = MetaAssociation::of::<BTreeMap<String, i32>>();

        assert!(!meta.contains_key(&map, &1i32));
        meta.insert_key(&mut map, &1i32);
        meta.set_mapped_at_key(&mut map, &"a".to_string(), &"not a number".to_string());
        assert_eq!(map, sample());

        let not_a_map = Variant::from(1i32);
        assert_eq!(meta.size(&not_a_map), 0);
    }

    #[test]
    fn test_index_containers() {
        let mut map = IndexMap::from([(3u32, 'c'), (1u32, 'a'), (2u32, 'b')]);
        let meta = MetaAssociation::of::<IndexMap<u32, char>>();
        assert!(meta.iterator_category().can_jump());
        {
            let cursor = meta.cursor(&map, Seek::Key(&2u32)).expect("matching container");
            assert_eq!(cursor.index(), Some(2));
        }

        meta.remove_key(&mut map, &3u32);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);

        let mut set = IndexSet::from(["x".to_string()]);
        let meta = MetaAssociation::of::<IndexSet<String>>();
        meta.insert_key(&mut set, &"y".to_string());
        assert_eq!(meta.size(&set), 2);
        let cursor = meta
            .cursor(&set, Seek::Key(&"y".to_string()))
            .expect("matching container");
        assert_eq!(cursor.index(), Some(1));
        assert!(cursor.mapped().is_none());
    }

    #[test]
    fn test_category_order() {
        assert!(!IteratorCategory::Input.can_retreat());
        assert!(!IteratorCategory::Forward.can_retreat());
        assert!(IteratorCategory::Bidirectional.can_retreat());
        assert!(!IteratorCategory::Bidirectional.can_jump());
        assert!(IteratorCategory::RandomAccess.can_retreat());
    }
}
