//! Process-wide lookup from a container's runtime type to its descriptor.

use crate::association::{AssociativeContainer, MetaAssociation};
use crate::meta_type::MetaType;
use crate::{Error, Variant};
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{LazyLock, RwLock};

/// An ordered map of variants keyed by string, registered by default
pub type VariantMap = BTreeMap<String, Variant>;

/// A hashed map of variants keyed by string, registered by default
pub type VariantHash = HashMap<String, Variant>;

static ASSOCIATIONS: LazyLock<RwLock<HashMap<TypeId, &'static MetaAssociation>>> =
    LazyLock::new(|| {
        let mut table = HashMap::new();
        for meta in [
            MetaAssociation::of::<VariantMap>(),
            MetaAssociation::of::<VariantHash>(),
        ] {
            table.insert(meta.container_type_id(), meta);
        }
        RwLock::new(table)
    });

/// Makes `C` reachable through [`AssociativeIterable`](crate::AssociativeIterable).
///
/// Registering the same type twice is harmless.
///
/// # Examples
///
/// ```
/// use sovran_assoc::{register_association, resolve, MetaType};
/// use std::collections::HashMap;
///
/// assert!(resolve(MetaType::of::<HashMap<u32, bool>>()).is_none());
/// register_association::<HashMap<u32, bool>>()?;
/// assert!(resolve(MetaType::of::<HashMap<u32, bool>>()).is_some());
/// # Ok::<(), sovran_assoc::Error>(())
/// ```
///
/// # Errors
///
/// Returns `Error::LockError` if the registry lock is poisoned.
pub fn register_association<C: AssociativeContainer>() -> Result<(), Error> {
    let meta = MetaAssociation::of::<C>();
    let mut table = ASSOCIATIONS.write().map_err(|_| Error::LockError)?;
    if table.insert(meta.container_type_id(), meta).is_none() {
        tracing::trace!(container = meta.container_name(), "registered association");
    }
    Ok(())
}

/// Returns the descriptor registered for `meta_type`, if any.
pub fn resolve(meta_type: MetaType) -> Option<&'static MetaAssociation> {
    let type_id = meta_type.type_id()?;
    let table = ASSOCIATIONS.read().ok()?;
    table.get(&type_id).copied()
}

/// Returns true if `meta_type` is a registered associative container.
pub fn is_associative(meta_type: MetaType) -> bool {
    resolve(meta_type).is_some()
}
