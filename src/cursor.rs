//! Positions inside concrete containers.
//!
//! A cursor borrows its container and knows how to reach the neighbouring
//! element without rescanning: ordered containers step by key range, hashed
//! containers keep the container's own iterator, and indexed containers keep
//! an index. Positions are erased to `dyn Any` keys and values so that
//! [`MetaAssociation`](crate::MetaAssociation) can hand them out for any
//! container type.

use crate::association::AssociativeContainer;
use crate::meta_type::MetaValue;
use indexmap::{IndexMap, IndexSet};
use std::any::Any;
use std::collections::{hash_map, hash_set, BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::iter::Map;
use std::ops::Bound::{Excluded, Unbounded};

/// Where a new cursor starts.
pub enum Seek<'k, K: ?Sized = dyn Any> {
    /// The first element
    Begin,
    /// Past the last element
    End,
    /// The element with this key, or the end if there is none
    Key(&'k K),
}

/// A read-only position inside a container.
///
/// At the end position `key` and `mapped` return `None`. Moving past either
/// end leaves the cursor where it is.
pub trait Cursor<'a>: 'a {
    fn key(&self) -> Option<&dyn Any>;

    /// The mapped value, always `None` for set-like containers.
    fn mapped(&self) -> Option<&dyn Any>;

    fn advance(&mut self);

    fn retreat(&mut self);

    /// Moves by `steps` elements, one at a time unless the container can jump.
    fn jump(&mut self, steps: isize) {
        for _ in 0..steps.unsigned_abs() {
            if steps < 0 {
                self.retreat();
            } else {
                self.advance();
            }
        }
    }

    /// The ordinal of this position, for random-access containers only.
    fn index(&self) -> Option<usize> {
        None
    }

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a>;
}

/// A position inside a container that can write the mapped value in place.
pub trait CursorMut {
    fn key(&self) -> Option<&dyn Any>;

    fn mapped(&self) -> Option<&dyn Any>;

    fn mapped_mut(&mut self) -> Option<&mut dyn Any>;

    fn advance(&mut self);

    fn retreat(&mut self);

    fn jump(&mut self, steps: isize) {
        for _ in 0..steps.unsigned_abs() {
            if steps < 0 {
                self.retreat();
            } else {
                self.advance();
            }
        }
    }

    fn index(&self) -> Option<usize> {
        None
    }
}

type Entry<'a, C> = (
    &'a <C as AssociativeContainer>::Key,
    Option<&'a <C as AssociativeContainer>::Mapped>,
);

type EntryMut<'a, C> = (
    &'a <C as AssociativeContainer>::Key,
    Option<&'a mut <C as AssociativeContainer>::Mapped>,
);

fn erased<T: Any>(value: &T) -> &dyn Any {
    value
}

fn erased_mut<T: Any>(value: &mut T) -> &mut dyn Any {
    value
}

/// Keyed lookups shared by the ordered and hashed cursors.
pub(crate) trait Keyed: AssociativeContainer {
    /// The stored key equal to `key`, with its mapped value.
    fn entry(&self, key: &Self::Key) -> Option<Entry<'_, Self>>;
    fn mapped_mut(&mut self, key: &Self::Key) -> Option<&mut Self::Mapped>;
}

pub(crate) trait Ordered: Keyed {
    fn first(&self) -> Option<Entry<'_, Self>>;
    fn last(&self) -> Option<Entry<'_, Self>>;
    fn after(&self, key: &Self::Key) -> Option<Entry<'_, Self>>;
    fn before(&self, key: &Self::Key) -> Option<Entry<'_, Self>>;
}

pub(crate) trait Hashed: Keyed {
    type Entries<'a>: Iterator<Item = Entry<'a, Self>> + Clone
    where
        Self: 'a;
    type EntriesMut<'a>: Iterator<Item = EntryMut<'a, Self>>
    where
        Self: 'a;

    fn entries(&self) -> Self::Entries<'_>;
    fn entries_mut(&mut self) -> Self::EntriesMut<'_>;
}

pub(crate) trait Indexed: AssociativeContainer {
    fn entry_at(&self, index: usize) -> Option<Entry<'_, Self>>;
    fn mapped_at_mut(&mut self, index: usize) -> Option<&mut Self::Mapped>;
    fn index_of(&self, key: &Self::Key) -> Option<usize>;
}

// Ordered containers: the cursor is the current entry, neighbours are found
// by key range.

struct OrderedCursor<'a, C: Ordered> {
    container: &'a C,
    current: Option<Entry<'a, C>>,
}

impl<'a, C: Ordered> Cursor<'a> for OrderedCursor<'a, C> {
    fn key(&self) -> Option<&dyn Any> {
        self.current.map(|(key, _)| erased(key))
    }

    fn mapped(&self) -> Option<&dyn Any> {
        self.current.and_then(|(_, mapped)| mapped).map(erased)
    }

    fn advance(&mut self) {
        if let Some((key, _)) = self.current {
            self.current = self.container.after(key);
        }
    }

    fn retreat(&mut self) {
        let previous = match self.current {
            Some((key, _)) => self.container.before(key),
            None => self.container.last(),
        };
        if previous.is_some() {
            self.current = previous;
        }
    }

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(OrderedCursor {
            container: self.container,
            current: self.current,
        })
    }
}

struct OrderedCursorMut<'a, C: Ordered> {
    container: &'a mut C,
    current: Option<C::Key>,
}

impl<C: Ordered> CursorMut for OrderedCursorMut<'_, C> {
    fn key(&self) -> Option<&dyn Any> {
        let key = self.current.as_ref()?;
        self.container.entry(key).map(|(key, _)| erased(key))
    }

    fn mapped(&self) -> Option<&dyn Any> {
        let key = self.current.as_ref()?;
        self.container.entry(key).and_then(|(_, mapped)| mapped).map(erased)
    }

    fn mapped_mut(&mut self) -> Option<&mut dyn Any> {
        let key = self.current.as_ref()?;
        self.container.mapped_mut(key).map(erased_mut)
    }

    fn advance(&mut self) {
        let Some(key) = &self.current else {
            return;
        };
        let next = self.container.after(key).map(|(key, _)| key.clone());
        self.current = next;
    }

    fn retreat(&mut self) {
        let previous = match &self.current {
            Some(key) => self.container.before(key),
            None => self.container.last(),
        };
        if let Some((key, _)) = previous {
            self.current = Some(key.clone());
        }
    }
}

pub(crate) fn ordered<'a, C: Ordered>(
    container: &'a C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn Cursor<'a> + 'a> {
    let current = match seek {
        Seek::Begin => container.first(),
        Seek::End => None,
        Seek::Key(key) => container.entry(key),
    };
    Box::new(OrderedCursor { container, current })
}

pub(crate) fn ordered_mut<'a, C: Ordered>(
    container: &'a mut C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn CursorMut + 'a> {
    let current = match seek {
        Seek::Begin => container.first().map(|(key, _)| key.clone()),
        Seek::End => None,
        Seek::Key(key) => container.entry(key).map(|(key, _)| key.clone()),
    };
    Box::new(OrderedCursorMut { container, current })
}

// Hashed containers: walking keeps the container's iterator. A cursor made by
// key lookup has no iterator yet and picks one up on its first step.

struct HashCursor<'a, C: Hashed> {
    container: &'a C,
    walk: Option<C::Entries<'a>>,
    current: Option<Entry<'a, C>>,
}

impl<'a, C: Hashed> Cursor<'a> for HashCursor<'a, C> {
    fn key(&self) -> Option<&dyn Any> {
        self.current.map(|(key, _)| erased(key))
    }

    fn mapped(&self) -> Option<&dyn Any> {
        self.current.and_then(|(_, mapped)| mapped).map(erased)
    }

    fn advance(&mut self) {
        let Some((current, _)) = self.current else {
            return;
        };
        let container = self.container;
        let walk = self.walk.get_or_insert_with(|| {
            let mut entries = container.entries();
            for (key, _) in entries.by_ref() {
                if std::ptr::eq(key, current) {
                    break;
                }
            }
            entries
        });
        self.current = walk.next();
    }

    fn retreat(&mut self) {}

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(HashCursor {
            container: self.container,
            walk: self.walk.clone(),
            current: self.current,
        })
    }
}

enum HashState<'a, C: Hashed> {
    Located(&'a mut C, C::Key),
    Walking(C::EntriesMut<'a>, Option<EntryMut<'a, C>>),
}

struct HashCursorMut<'a, C: Hashed> {
    state: Option<HashState<'a, C>>,
}

impl<C: Hashed> CursorMut for HashCursorMut<'_, C> {
    fn key(&self) -> Option<&dyn Any> {
        match self.state.as_ref()? {
            HashState::Located(container, key) => {
                container.entry(key).map(|(key, _)| erased(key))
            }
            HashState::Walking(_, current) => current.as_ref().map(|(key, _)| erased(*key)),
        }
    }

    fn mapped(&self) -> Option<&dyn Any> {
        match self.state.as_ref()? {
            HashState::Located(container, key) => {
                container.entry(key).and_then(|(_, mapped)| mapped).map(erased)
            }
            HashState::Walking(_, current) => current
                .as_ref()
                .and_then(|(_, mapped)| mapped.as_deref())
                .map(erased),
        }
    }

    fn mapped_mut(&mut self) -> Option<&mut dyn Any> {
        match self.state.as_mut()? {
            HashState::Located(container, key) => {
                container.mapped_mut(key).map(erased_mut)
            }
            HashState::Walking(_, current) => current
                .as_mut()
                .and_then(|(_, mapped)| mapped.as_deref_mut())
                .map(erased_mut),
        }
    }

    fn advance(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.state = Some(match state {
            HashState::Located(container, located) => {
                let mut entries = container.entries_mut();
                for (key, _) in entries.by_ref() {
                    if *key == located {
                        break;
                    }
                }
                let current = entries.next();
                HashState::Walking(entries, current)
            }
            HashState::Walking(mut entries, Some(_)) => {
                let current = entries.next();
                HashState::Walking(entries, current)
            }
            end @ HashState::Walking(_, None) => end,
        });
    }

    fn retreat(&mut self) {}
}

pub(crate) fn hashed<'a, C: Hashed>(
    container: &'a C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn Cursor<'a> + 'a> {
    let (walk, current) = match seek {
        Seek::Begin => {
            let mut entries = container.entries();
            let first = entries.next();
            (Some(entries), first)
        }
        Seek::End => (None, None),
        Seek::Key(key) => (None, container.entry(key)),
    };
    Box::new(HashCursor {
        container,
        walk,
        current,
    })
}

pub(crate) fn hashed_mut<'a, C: Hashed>(
    container: &'a mut C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn CursorMut + 'a> {
    let state = match seek {
        Seek::Begin => {
            let mut entries = container.entries_mut();
            let first = entries.next();
            HashState::Walking(entries, first)
        }
        Seek::Key(key) if container.contains(key) => HashState::Located(container, key.clone()),
        _ => HashState::Walking(container.entries_mut(), None),
    };
    Box::new(HashCursorMut { state: Some(state) })
}

// Indexed containers: the cursor is an index, clamped to `0..=size`.

struct IndexCursor<'a, C: Indexed> {
    container: &'a C,
    index: usize,
}

impl<'a, C: Indexed> Cursor<'a> for IndexCursor<'a, C> {
    fn key(&self) -> Option<&dyn Any> {
        self.container.entry_at(self.index).map(|(key, _)| erased(key))
    }

    fn mapped(&self) -> Option<&dyn Any> {
        self.container
            .entry_at(self.index)
            .and_then(|(_, mapped)| mapped)
            .map(erased)
    }

    fn advance(&mut self) {
        self.jump(1);
    }

    fn retreat(&mut self) {
        self.jump(-1);
    }

    fn jump(&mut self, steps: isize) {
        self.index = self
            .index
            .saturating_add_signed(steps)
            .min(self.container.size());
    }

    fn index(&self) -> Option<usize> {
        Some(self.index)
    }

    fn boxed_clone(&self) -> Box<dyn Cursor<'a> + 'a> {
        Box::new(IndexCursor {
            container: self.container,
            index: self.index,
        })
    }
}

struct IndexCursorMut<'a, C: Indexed> {
    container: &'a mut C,
    index: usize,
}

impl<C: Indexed> CursorMut for IndexCursorMut<'_, C> {
    fn key(&self) -> Option<&dyn Any> {
        self.container.entry_at(self.index).map(|(key, _)| erased(key))
    }

    fn mapped(&self) -> Option<&dyn Any> {
        self.container
            .entry_at(self.index)
            .and_then(|(_, mapped)| mapped)
            .map(erased)
    }

    fn mapped_mut(&mut self) -> Option<&mut dyn Any> {
        self.container.mapped_at_mut(self.index).map(erased_mut)
    }

    fn advance(&mut self) {
        self.jump(1);
    }

    fn retreat(&mut self) {
        self.jump(-1);
    }

    fn jump(&mut self, steps: isize) {
        self.index = self
            .index
            .saturating_add_signed(steps)
            .min(self.container.size());
    }

    fn index(&self) -> Option<usize> {
        Some(self.index)
    }
}

fn seek_index<C: Indexed>(container: &C, seek: Seek<'_, C::Key>) -> usize {
    match seek {
        Seek::Begin => 0,
        Seek::End => container.size(),
        Seek::Key(key) => container.index_of(key).unwrap_or(container.size()),
    }
}

pub(crate) fn indexed<'a, C: Indexed>(
    container: &'a C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn Cursor<'a> + 'a> {
    let index = seek_index(container, seek);
    Box::new(IndexCursor { container, index })
}

pub(crate) fn indexed_mut<'a, C: Indexed>(
    container: &'a mut C,
    seek: Seek<'_, C::Key>,
) -> Box<dyn CursorMut + 'a> {
    let index = seek_index(container, seek);
    Box::new(IndexCursorMut { container, index })
}

fn with_mapped<'a, K, V>((key, mapped): (&'a K, &'a V)) -> (&'a K, Option<&'a V>) {
    (key, Some(mapped))
}

fn with_mapped_mut<'a, K, V>((key, mapped): (&'a K, &'a mut V)) -> (&'a K, Option<&'a mut V>) {
    (key, Some(mapped))
}

fn key_only<K, M>(key: &K) -> (&K, Option<M>) {
    (key, None)
}

impl<K, V> Keyed for HashMap<K, V>
where
    K: MetaValue + Eq + Hash,
    V: MetaValue,
{
    fn entry(&self, key: &K) -> Option<(&K, Option<&V>)> {
        self.get_key_value(key).map(with_mapped)
    }

    fn mapped_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }
}

impl<K, V> Hashed for HashMap<K, V>
where
    K: MetaValue + Eq + Hash,
    V: MetaValue,
{
    type Entries<'a> =
        Map<hash_map::Iter<'a, K, V>, fn((&'a K, &'a V)) -> (&'a K, Option<&'a V>)>
    where
        Self: 'a;
    type EntriesMut<'a> =
        Map<hash_map::IterMut<'a, K, V>, fn((&'a K, &'a mut V)) -> (&'a K, Option<&'a mut V>)>
    where
        Self: 'a;

    fn entries(&self) -> Self::Entries<'_> {
        self.iter().map(with_mapped as fn(_) -> _)
    }

    fn entries_mut(&mut self) -> Self::EntriesMut<'_> {
        self.iter_mut().map(with_mapped_mut as fn(_) -> _)
    }
}

impl<K> Keyed for HashSet<K>
where
    K: MetaValue + Eq + Hash,
{
    fn entry(&self, key: &K) -> Option<(&K, Option<&()>)> {
        self.get(key).map(key_only)
    }

    fn mapped_mut(&mut self, _key: &K) -> Option<&mut ()> {
        None
    }
}

impl<K> Hashed for HashSet<K>
where
    K: MetaValue + Eq + Hash,
{
    type Entries<'a> = Map<hash_set::Iter<'a, K>, fn(&'a K) -> (&'a K, Option<&'a ()>)>
    where
        Self: 'a;
    type EntriesMut<'a> =
        Map<hash_set::Iter<'a, K>, fn(&'a K) -> (&'a K, Option<&'a mut ()>)>
    where
        Self: 'a;

    fn entries(&self) -> Self::Entries<'_> {
        self.iter().map(key_only as fn(_) -> _)
    }

    fn entries_mut(&mut self) -> Self::EntriesMut<'_> {
        self.iter().map(key_only as fn(_) -> _)
    }
}

impl<K, V> Keyed for BTreeMap<K, V>
where
    K: MetaValue + Ord,
    V: MetaValue,
{
    fn entry(&self, key: &K) -> Option<(&K, Option<&V>)> {
        self.get_key_value(key).map(with_mapped)
    }

    fn mapped_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }
}

impl<K, V> Ordered for BTreeMap<K, V>
where
    K: MetaValue + Ord,
    V: MetaValue,
{
    fn first(&self) -> Option<(&K, Option<&V>)> {
        self.first_key_value().map(with_mapped)
    }

    fn last(&self) -> Option<(&K, Option<&V>)> {
        self.last_key_value().map(with_mapped)
    }

    fn after(&self, key: &K) -> Option<(&K, Option<&V>)> {
        self.range::<K, _>((Excluded(key), Unbounded))
            .next()
            .map(with_mapped)
    }

    fn before(&self, key: &K) -> Option<(&K, Option<&V>)> {
        self.range::<K, _>(..key).next_back().map(with_mapped)
    }
}

impl<K> Keyed for BTreeSet<K>
where
    K: MetaValue + Ord,
{
    fn entry(&self, key: &K) -> Option<(&K, Option<&()>)> {
        self.get(key).map(key_only)
    }

    fn mapped_mut(&mut self, _key: &K) -> Option<&mut ()> {
        None
    }
}

impl<K> Ordered for BTreeSet<K>
where
    K: MetaValue + Ord,
{
    fn first(&self) -> Option<(&K, Option<&()>)> {
        BTreeSet::first(self).map(key_only)
    }

    fn last(&self) -> Option<(&K, Option<&()>)> {
        BTreeSet::last(self).map(key_only)
    }

    fn after(&self, key: &K) -> Option<(&K, Option<&()>)> {
        self.range::<K, _>((Excluded(key), Unbounded))
            .next()
            .map(key_only)
    }

    fn before(&self, key: &K) -> Option<(&K, Option<&()>)> {
        self.range::<K, _>(..key).next_back().map(key_only)
    }
}

impl<K, V> Indexed for IndexMap<K, V>
where
    K: MetaValue + Eq + Hash,
    V: MetaValue,
{
    fn entry_at(&self, index: usize) -> Option<(&K, Option<&V>)> {
        self.get_index(index).map(with_mapped)
    }

    fn mapped_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.get_index_mut(index).map(|(_, mapped)| mapped)
    }

    fn index_of(&self, key: &K) -> Option<usize> {
        self.get_index_of(key)
    }
}

impl<K> Indexed for IndexSet<K>
where
    K: MetaValue + Eq + Hash,
{
    fn entry_at(&self, index: usize) -> Option<(&K, Option<&()>)> {
        self.get_index(index).map(key_only)
    }

    fn mapped_at_mut(&mut self, _index: usize) -> Option<&mut ()> {
        None
    }

    fn index_of(&self, key: &K) -> Option<usize> {
        self.get_index_of(key)
    }
}
