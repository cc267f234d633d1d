//! # sovran-assoc
//!
//! Type-erased access to associative containers held in dynamic values.
//!
//! `sovran-assoc` lets generic code iterate, query and modify a map or set
//! whose key and value types are only known at runtime. The container lives
//! inside a [`Variant`]; an [`AssociativeIterable`] looks up the container's
//! descriptor once and then drives every operation through it, converting
//! the caller's keys and values to the types the container expects.
//!
//! ## Key Features
//!
//! - **One interface for every container**: `HashMap`, `BTreeMap`,
//!   `IndexMap` and their set counterparts all look the same
//! - **No copies**: iteration and mutation work on the live container
//! - **Write-through iterators**: mutable iterators hand out [`VariantRef`]
//!   proxies that store straight into the container
//! - **Fail-soft**: malformed keys and values fall back to well-defined
//!   defaults instead of erroring
//! - **Extensible**: register your own containers and conversions
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_assoc::{register_association, AssociativeIterable, Error, Variant};
//! use std::collections::HashMap;
//!
//! fn main() -> Result<(), Error> {
//!     // Make the container type known to the registry
//!     register_association::<HashMap<String, i32>>()?;
//!
//!     let mut scores = HashMap::new();
//!     scores.insert("alice".to_string(), 10);
//!     let mut value = Variant::new(scores);
//!
//!     // Generic code only sees a Variant
//!     let mut iterable = AssociativeIterable::try_new_mut(&mut value)?;
//!     iterable.set_value(&"bob".into(), &"7".into()); // "7" is converted to 7
//!     assert_eq!(iterable.value(&"bob".into()), Variant::from(7i32));
//!
//!     // Unconvertible keys are simply not found
//!     assert!(!iterable.contains_key(&Variant::new(vec![1u8])));
//!
//!     for it in iterable.iter() {
//!         println!("{:?} => {:?}", it.key(), it.value());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Writing Through Iterators
//!
//! ```rust
//! use sovran_assoc::{Variant, VariantMap};
//!
//! let mut map = VariantMap::new();
//! map.insert("count".to_string(), Variant::from(1i32));
//! let mut value = Variant::new(map);
//!
//! let mut iterable = value.associative_iterable_mut();
//! {
//!     let mut it = iterable.mutable_find(&"count".into());
//!     if !it.is_end() {
//!         let current: i32 = it.get().read().value();
//!         it.get().write(&Variant::from(current + 1));
//!     }
//! }
//!
//! assert_eq!(iterable.value(&"count".into()), Variant::from(2i32));
//! ```
//!
//! ### Sets
//!
//! ```rust
//! use sovran_assoc::{register_association, Variant};
//! use std::collections::BTreeSet;
//!
//! register_association::<BTreeSet<u32>>().unwrap();
//! let value = Variant::new(BTreeSet::from([3u32, 1, 2]));
//! let iterable = value.associative_iterable();
//!
//! // Without a mapped type, dereferencing yields the key
//! let keys: Vec<u32> = iterable.iter().map(|it| it.get().value()).collect();
//! assert_eq!(keys, vec![1, 2, 3]);
//! assert!(!iterable.meta_container().unwrap().has_mapped_type());
//! ```

mod any_value;
mod association;
mod coercer;
mod conversion;
mod cursor;
mod error;
mod iterable;
mod iterator;
mod meta_type;
mod registry;

pub use any_value::Variant;
pub use association::{AssociativeContainer, IteratorCategory, MetaAssociation};
pub use coercer::Coercer;
pub use conversion::{has_converter, register_converter};
pub use cursor::{Cursor, CursorMut, Seek};
pub use error::Error;
pub use iterable::AssociativeIterable;
pub use iterator::{ConstIterator, Iter, IterMut, Position, VariantConstPointer, VariantRef};
pub use meta_type::{MetaType, MetaValue};
pub use registry::{is_associative, register_association, resolve, VariantHash, VariantMap};
