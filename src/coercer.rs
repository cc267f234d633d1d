use crate::meta_type::MetaType;
use crate::Variant;
use std::any::Any;

/// Turns a [`Variant`] into raw storage of an expected type.
///
/// A coercer owns the temporary produced by a conversion, so the references
/// it hands out live exactly as long as the coercer borrow does.
///
/// [`convert`](Coercer::convert) reports failure with `None`; callers that
/// need *some* value use [`coerce`](Coercer::coerce), which falls back to the
/// target type's default value.
#[derive(Debug, Default)]
pub struct Coercer {
    converted: Variant,
}

// Target of `coerce` when there is no target type at all.
static NO_VALUE: () = ();

impl Coercer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `value` as raw storage of type `target`, converting if needed.
    ///
    /// A `target` of the `Variant` meta type yields `value` itself.
    pub fn convert<'a>(
        &'a mut self,
        value: &'a Variant,
        target: MetaType,
    ) -> Option<&'a dyn Any> {
        if !target.is_valid() {
            return None;
        }
        if value.meta_type() == target {
            return value.data();
        }
        if target.is::<Variant>() {
            return Some(value as &dyn Any);
        }
        match value.convert(target) {
            Ok(converted) => {
                self.converted = converted;
                self.converted.data()
            }
            Err(err) => {
                tracing::debug!(
                    from = value.meta_type().name(),
                    to = target.name(),
                    %err,
                    "variant conversion failed"
                );
                None
            }
        }
    }

    /// Like [`convert`](Coercer::convert), but never fails: an unconvertible
    /// value is replaced by the default value of `target`.
    pub fn coerce<'a>(&'a mut self, value: &'a Variant, target: MetaType) -> &'a dyn Any {
        if value.meta_type() == target {
            if let Some(data) = value.data() {
                return data;
            }
        }
        if target.is::<Variant>() {
            return value;
        }
        self.converted = match value.convert(target) {
            Ok(converted) => converted,
            Err(err) => {
                tracing::debug!(
                    from = value.meta_type().name(),
                    to = target.name(),
                    %err,
                    "coercing unconvertible value to default"
                );
                Variant::from_meta_type(target)
            }
        };
        self.converted.data().unwrap_or(&NO_VALUE)
    }
}
