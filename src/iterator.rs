use crate::association::{IteratorCategory, MetaAssociation};
use crate::coercer::Coercer;
use crate::cursor::{Cursor, CursorMut, Seek};
use crate::meta_type::MetaType;
use crate::Variant;
use std::any::Any;
use std::fmt;
use std::ops::Deref;

/// An opaque position inside an associative container.
///
/// Positions compare equal when they refer to the same element of the same
/// container. All end positions of one container are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    container: usize,
    element: Option<usize>,
}

fn address<T: ?Sized>(value: &T) -> usize {
    value as *const T as *const () as usize
}

impl Position {
    fn new(container: usize, key: Option<&dyn Any>) -> Self {
        Position {
            container,
            element: key.map(address),
        }
    }
}

/// Builds a Variant of `meta_type` and lets `fill` write into its storage.
///
/// A `Variant`-typed slot is filled in place, so the caller gets the stored
/// variant rather than a variant wrapping it.
pub(crate) fn retrieve_element(meta_type: MetaType, fill: impl FnOnce(&mut dyn Any)) -> Variant {
    if meta_type.is::<Variant>() {
        let mut result = Variant::invalid();
        fill(&mut result);
        return result;
    }
    let mut result = Variant::from_meta_type(meta_type);
    if let Some(data) = result.data_mut() {
        fill(data);
    }
    result
}

// A copy of the element at a cursor. The end position reads as a default value.
fn element(meta_type: MetaType, data: Option<&dyn Any>) -> Variant {
    match data {
        Some(data) => match data.downcast_ref::<Variant>() {
            Some(stored) => stored.clone(),
            None => Variant::from_data(meta_type, data),
        },
        None => retrieve_element(meta_type, |_| {}),
    }
}

fn dereference(
    meta: &MetaAssociation,
    key: Option<&dyn Any>,
    mapped: Option<&dyn Any>,
) -> Variant {
    if meta.has_mapped_type() {
        element(meta.mapped_meta_type(), mapped)
    } else {
        element(meta.key_meta_type(), key)
    }
}

fn check_move(meta: Option<&MetaAssociation>, steps: isize) {
    let category = meta.map_or(IteratorCategory::Input, MetaAssociation::iterator_category);
    debug_assert!(
        steps >= 0 || category.can_retreat(),
        "{:?} iterators can't move backwards",
        category
    );
    debug_assert!(
        steps.unsigned_abs() <= 1 || category.can_jump(),
        "{:?} iterators can't jump",
        category
    );
}

/// A read-only iterator into an associative container.
///
/// Dereferencing with [`get`](ConstIterator::get) yields the mapped value, or
/// the key for set-like containers. Moving an iterator beyond what the
/// container's [`IteratorCategory`] allows, or reading the end position, is a
/// caller error and is only checked in debug builds.
pub struct ConstIterator<'a> {
    meta: Option<&'static MetaAssociation>,
    container: usize,
    cursor: Option<Box<dyn Cursor<'a> + 'a>>,
}

impl<'a> ConstIterator<'a> {
    pub(crate) fn new(
        meta: Option<&'static MetaAssociation>,
        container: Option<&'a dyn Any>,
        seek: Seek<'_>,
    ) -> Self {
        let cursor = match (meta, container) {
            (Some(meta), Some(container)) => meta.cursor(container, seek),
            _ => None,
        };
        Self {
            meta,
            container: container.map_or(0, address),
            cursor,
        }
    }

    fn key_data(&self) -> Option<&dyn Any> {
        self.cursor.as_ref().and_then(|cursor| cursor.key())
    }

    fn mapped_data(&self) -> Option<&dyn Any> {
        self.cursor.as_ref().and_then(|cursor| cursor.mapped())
    }

    fn index(&self) -> usize {
        self.cursor
            .as_ref()
            .and_then(|cursor| cursor.index())
            .unwrap_or(0)
    }

    pub fn position(&self) -> Position {
        Position::new(self.container, self.key_data())
    }

    pub fn is_end(&self) -> bool {
        self.key_data().is_none()
    }

    /// The key at this position.
    pub fn key(&self) -> Variant {
        match self.meta {
            Some(meta) => element(meta.key_meta_type(), self.key_data()),
            None => Variant::invalid(),
        }
    }

    /// The mapped value at this position, or the invalid Variant if the
    /// container has no mapped values.
    pub fn value(&self) -> Variant {
        match self.meta {
            Some(meta) => element(meta.mapped_meta_type(), self.mapped_data()),
            None => Variant::invalid(),
        }
    }

    /// The mapped value, or the key if the container has no mapped values.
    pub fn get(&self) -> Variant {
        match self.meta {
            Some(meta) => dereference(meta, self.key_data(), self.mapped_data()),
            None => Variant::invalid(),
        }
    }

    /// Pointer-style access to the same element as [`get`](ConstIterator::get).
    pub fn pointer(&self) -> VariantConstPointer {
        VariantConstPointer(self.get())
    }

    /// Moves to the next element.
    pub fn advance(&mut self) -> &mut Self {
        check_move(self.meta, 1);
        if let Some(cursor) = &mut self.cursor {
            cursor.advance();
        }
        self
    }

    /// Moves to the previous element. Requires a bidirectional container.
    pub fn retreat(&mut self) -> &mut Self {
        check_move(self.meta, -1);
        if let Some(cursor) = &mut self.cursor {
            cursor.retreat();
        }
        self
    }

    /// Moves by `steps` elements. Requires a random-access container.
    pub fn advance_by(&mut self, steps: isize) -> &mut Self {
        check_move(self.meta, steps);
        if let Some(cursor) = &mut self.cursor {
            cursor.jump(steps);
        }
        self
    }

    /// The number of steps from `self` to `other`. Requires a random-access
    /// container.
    pub fn distance(&self, other: &ConstIterator<'_>) -> isize {
        debug_assert!(self
            .meta
            .map_or(true, |meta| meta.iterator_category().can_jump()));
        other.index() as isize - self.index() as isize
    }
}

impl<'a> Clone for ConstIterator<'a> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta,
            container: self.container,
            cursor: self.cursor.as_ref().map(|cursor| cursor.boxed_clone()),
        }
    }
}

impl PartialEq for ConstIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

impl PartialEq<Position> for ConstIterator<'_> {
    fn eq(&self, other: &Position) -> bool {
        self.position() == *other
    }
}

impl fmt::Debug for ConstIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstIterator")
            .field("key", &self.key())
            .field("end", &self.is_end())
            .finish()
    }
}

/// The result of [`ConstIterator::pointer`]; dereferences to the element.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantConstPointer(Variant);

impl Deref for VariantConstPointer {
    type Target = Variant;

    fn deref(&self) -> &Variant {
        &self.0
    }
}

/// A mutable iterator into an associative container.
///
/// Elements are read and written through [`VariantRef`] proxies, which go
/// straight to the container's storage.
pub struct IterMut<'a> {
    meta: Option<&'static MetaAssociation>,
    container: usize,
    cursor: Option<Box<dyn CursorMut + 'a>>,
}

impl<'a> IterMut<'a> {
    pub(crate) fn new(
        meta: &'static MetaAssociation,
        container: &'a mut dyn Any,
        seek: Seek<'_>,
    ) -> Self {
        let location = address(&*container);
        Self {
            meta: Some(meta),
            container: location,
            cursor: meta.cursor_mut(container, seek),
        }
    }

    /// An iterator that is already at the end and never moves.
    pub(crate) fn empty() -> Self {
        Self {
            meta: None,
            container: 0,
            cursor: None,
        }
    }

    fn key_data(&self) -> Option<&dyn Any> {
        self.cursor.as_ref().and_then(|cursor| cursor.key())
    }

    pub fn position(&self) -> Position {
        Position::new(self.container, self.key_data())
    }

    pub fn is_end(&self) -> bool {
        self.key_data().is_none()
    }

    /// The key at this position.
    pub fn key(&self) -> Variant {
        match self.meta {
            Some(meta) => element(meta.key_meta_type(), self.key_data()),
            None => Variant::invalid(),
        }
    }

    /// The mapped value at this position.
    ///
    /// For set-like containers the returned reference is an invalid sink:
    /// it reads as the invalid Variant and ignores writes.
    pub fn value(&mut self) -> VariantRef<'_> {
        let has_mapped = self.meta.is_some_and(MetaAssociation::has_mapped_type);
        if has_mapped {
            self.get()
        } else {
            VariantRef { target: None }
        }
    }

    /// The current element: the mapped value, or the key for set-like
    /// containers.
    pub fn get(&mut self) -> VariantRef<'_> {
        let target = match (self.meta, self.cursor.as_deref_mut()) {
            (Some(meta), Some(cursor)) => Some(Target { meta, cursor }),
            _ => None,
        };
        VariantRef { target }
    }

    /// Moves to the next element.
    pub fn advance(&mut self) -> &mut Self {
        check_move(self.meta, 1);
        if let Some(cursor) = &mut self.cursor {
            cursor.advance();
        }
        self
    }

    /// Moves to the previous element. Requires a bidirectional container.
    pub fn retreat(&mut self) -> &mut Self {
        check_move(self.meta, -1);
        if let Some(cursor) = &mut self.cursor {
            cursor.retreat();
        }
        self
    }

    /// Moves by `steps` elements. Requires a random-access container.
    pub fn advance_by(&mut self, steps: isize) -> &mut Self {
        check_move(self.meta, steps);
        if let Some(cursor) = &mut self.cursor {
            cursor.jump(steps);
        }
        self
    }
}

impl PartialEq for IterMut<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

impl PartialEq<Position> for IterMut<'_> {
    fn eq(&self, other: &Position) -> bool {
        self.position() == *other
    }
}

impl fmt::Debug for IterMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut")
            .field("key", &self.key())
            .field("end", &self.is_end())
            .finish()
    }
}

struct Target<'r> {
    meta: &'static MetaAssociation,
    cursor: &'r mut dyn CursorMut,
}

/// A read/write proxy for one element of a container.
///
/// The proxy holds no value of its own: [`read`](VariantRef::read) fetches
/// the element from the container and [`write`](VariantRef::write) stores
/// into it.
pub struct VariantRef<'r> {
    target: Option<Target<'r>>,
}

impl VariantRef<'_> {
    /// Returns false for the sink handed out by set-like containers.
    pub fn is_valid(&self) -> bool {
        self.target.is_some()
    }

    /// The mapped value, or the key if the container has no mapped values.
    pub fn read(&self) -> Variant {
        match &self.target {
            Some(target) => {
                dereference(target.meta, target.cursor.key(), target.cursor.mapped())
            }
            None => Variant::invalid(),
        }
    }

    /// Stores `value`, coerced to the mapped type, at this element.
    ///
    /// Does nothing for containers without mapped values or at the end
    /// position.
    pub fn write(&mut self, value: &Variant) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        if !target.meta.has_mapped_type() {
            return;
        }
        let mapped_type = target.meta.mapped_meta_type();
        let mut coercer = Coercer::new();
        let mapped = coercer.coerce(value, mapped_type);
        if let Some(slot) = target.cursor.mapped_mut() {
            mapped_type.assign(slot, mapped);
        }
    }
}

impl fmt::Debug for VariantRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VariantRef").field(&self.read()).finish()
    }
}

/// Walks a container front to back, yielding a [`ConstIterator`] per element.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    front: ConstIterator<'a>,
    len: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(begin: ConstIterator<'a>, len: usize) -> Self {
        Self { front: begin, len }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = ConstIterator<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let current = self.front.clone();
        self.front.advance();
        self.len -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl ExactSizeIterator for Iter<'_> {}
