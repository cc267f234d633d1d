use sovran_assoc::{
    register_association, register_converter, AssociativeIterable, Error, Variant, VariantMap,
};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
struct Priority(u8);

/// Demonstrates driving differently-typed containers through one generic API
fn main() -> Result<(), Error> {
    register_association::<HashMap<String, Priority>>()?;
    register_association::<BTreeSet<String>>()?;
    register_converter::<String, Priority>(|name| match name.as_str() {
        "low" => Some(Priority(1)),
        "normal" => Some(Priority(5)),
        "high" => Some(Priority(9)),
        _ => None,
    })?;

    // A settings document with dynamically-typed values
    let mut settings = VariantMap::new();
    settings.insert("theme".to_string(), Variant::from("dark"));
    settings.insert("font_size".to_string(), Variant::from(14u32));
    let mut settings = Variant::new(settings);

    // Per-queue priorities, configured from strings
    let mut queues = Variant::new(HashMap::<String, Priority>::new());

    // Tags without values
    let mut tags = Variant::new(BTreeSet::from(["rust".to_string()]));

    apply(&mut settings, &[("font_size", "16"), ("language", "en-US")])?;
    apply(&mut queues, &[("email", "high"), ("reports", "low"), ("audit", "urgent")])?;
    apply(&mut tags, &[("variant", ""), ("assoc", "")])?;

    println!("settings:");
    dump(&settings)?;
    println!("\nqueues:");
    dump(&queues)?;
    println!("\ntags:");
    dump(&tags)?;

    // Bump every font size through a write-through iterator
    let mut iterable = settings.associative_iterable_mut();
    {
        let mut it = iterable.mutable_find(&"font_size".into());
        if !it.is_end() {
            let size: u32 = it.get().read().value();
            it.get().write(&Variant::from(size + 2));
        }
    }
    println!("\nfont_size is now {:?}", iterable.value(&"font_size".into()));

    Ok(())
}

/// Stores each (key, value) pair into whatever container `target` holds
fn apply(target: &mut Variant, entries: &[(&str, &str)]) -> Result<(), Error> {
    let mut iterable = AssociativeIterable::try_new_mut(target)?;
    for (key, value) in entries {
        iterable.set_value(&(*key).into(), &(*value).into());
    }
    Ok(())
}

/// Prints every entry of the container held in `source`
fn dump(source: &Variant) -> Result<(), Error> {
    let iterable = AssociativeIterable::try_new(source)?;
    for it in &iterable {
        if iterable.meta_container().is_some_and(|meta| meta.has_mapped_type()) {
            println!("  {:?} => {:?}", it.key(), it.value());
        } else {
            println!("  {:?}", it.key());
        }
    }
    println!("  ({} entries)", iterable.size());
    Ok(())
}
