use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use sovran_assoc::{
    register_association, AssociativeIterable, Error, MetaType, Variant, VariantHash, VariantMap,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

fn string_int_map() -> Result<Variant, Error> {
    register_association::<HashMap<String, i32>>()?;
    let mut map = HashMap::new();
    map.insert("a".to_string(), 1);
    map.insert("b".to_string(), 2);
    Ok(Variant::new(map))
}

#[test]
fn test_basic_operations() -> Result<(), Error> {
    let mut value = string_int_map()?;
    let mut iterable = AssociativeIterable::try_new_mut(&mut value)?;

    assert_eq!(iterable.value(&"a".into()), Variant::from(1i32));

    iterable.set_value(&"c".into(), &3i32.into());
    assert_eq!(iterable.value(&"c".into()), Variant::from(3i32));
    assert!(iterable.contains_key(&"c".into()));

    iterable.remove_key(&"b".into());
    assert!(!iterable.contains_key(&"b".into()));
    assert!(iterable.contains_key(&"a".into()));

    // Inserting an existing key resets its value
    iterable.insert_key(&"a".into());
    assert_eq!(iterable.value(&"a".into()), Variant::from(0i32));
    assert_eq!(iterable.size(), 2);

    Ok(())
}

#[test]
fn test_find_present_and_absent() -> Result<(), Error> {
    let value = string_int_map()?;
    let iterable = AssociativeIterable::try_new(&value)?;

    for key in ["a", "b"] {
        let it = iterable.find(&key.into());
        assert!(!it.is_end());
        assert_eq!(it.key(), Variant::from(key));
        assert!(iterable.contains_key(&key.into()));
    }

    let missing = iterable.find(&"zzz".into());
    assert_eq!(missing, iterable.end());
    assert!(!iterable.contains_key(&"zzz".into()));

    Ok(())
}

#[test]
fn test_insert_key_is_idempotent() -> Result<(), Error> {
    let mut once = string_int_map()?;
    let mut twice = once.clone();

    once.associative_iterable_mut().insert_key(&"a".into());
    {
        let mut iterable = twice.associative_iterable_mut();
        iterable.insert_key(&"a".into());
        iterable.insert_key(&"a".into());
    }

    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_set_value_round_trip() -> Result<(), Error> {
    let mut value = string_int_map()?;
    let mut iterable = value.associative_iterable_mut();

    // Existing key, new key, and a value that needs converting
    iterable.set_value(&"a".into(), &10i32.into());
    iterable.set_value(&"new".into(), &11i32.into());
    iterable.set_value(&"converted".into(), &"12".into());

    assert_eq!(iterable.value(&"a".into()), Variant::from(10i32));
    assert_eq!(iterable.value(&"new".into()), Variant::from(11i32));
    assert_eq!(iterable.value(&"converted".into()), Variant::from(12i32));
    Ok(())
}

#[test]
fn test_remove_key_always_removes() -> Result<(), Error> {
    let mut value = string_int_map()?;
    let mut iterable = value.associative_iterable_mut();

    for key in ["a", "never-there"] {
        iterable.remove_key(&key.into());
        assert!(!iterable.contains_key(&key.into()));
    }
    assert_eq!(iterable.size(), 1);
    Ok(())
}

#[test]
fn test_value_of_missing_key_is_default() -> Result<(), Error> {
    let value = string_int_map()?;
    let iterable = value.associative_iterable();
    assert_eq!(iterable.value(&"missing".into()), Variant::from(0i32));
    // Reading never inserts
    assert_eq!(iterable.size(), 2);
    Ok(())
}

#[test]
fn test_fail_soft_keys() -> Result<(), Error> {
    register_association::<BTreeMap<i32, String>>()?;
    let mut value = Variant::new(BTreeMap::from([(0, "zero".to_string()), (1, "one".to_string())]));
    let mut iterable = value.associative_iterable_mut();
    let bad_key = Variant::from("not a number");

    // Lookups report absence rather than matching the default key 0
    assert!(!iterable.contains_key(&bad_key));
    assert_eq!(iterable.find(&bad_key), iterable.end());

    // Value-producing and mutating operations use the default key 0
    assert_eq!(iterable.value(&bad_key), Variant::from("zero"));

    iterable.set_value(&bad_key, &"ZERO".into());
    assert_eq!(iterable.value(&0i32.into()), Variant::from("ZERO"));

    iterable.set_value(&1i32.into(), &Variant::invalid());
    assert_eq!(iterable.value(&1i32.into()), Variant::from(""));

    iterable.remove_key(&bad_key);
    assert!(!iterable.contains_key(&0i32.into()));

    iterable.insert_key(&bad_key);
    assert_eq!(iterable.value(&0i32.into()), Variant::from(""));
    assert_eq!(iterable.size(), 2);

    Ok(())
}

#[test]
fn test_key_conversion() -> Result<(), Error> {
    register_association::<HashMap<u64, bool>>()?;
    let mut value = Variant::new(HashMap::from([(7u64, true)]));
    let mut iterable = value.associative_iterable_mut();

    assert!(iterable.contains_key(&7i32.into()));
    assert!(iterable.contains_key(&"7".into()));
    assert!(!iterable.contains_key(&(-7i32).into()));

    iterable.set_value(&8u8.into(), &1i32.into());
    assert_eq!(iterable.value(&"8".into()), Variant::from(true));
    Ok(())
}

#[test]
fn test_variant_maps() {
    let mut map = VariantMap::new();
    map.insert("name".to_string(), Variant::from("sovran"));
    map.insert("size".to_string(), Variant::from(3u32));
    let mut value = Variant::new(map);

    let mut iterable = value.associative_iterable_mut();
    let meta = iterable.meta_container().expect("VariantMap is registered");
    assert_eq!(meta.mapped_meta_type(), MetaType::of::<Variant>());

    // Values keep their own type
    assert_eq!(iterable.value(&"size".into()), Variant::from(3u32));
    iterable.set_value(&"size".into(), &4i64.into());
    assert_eq!(iterable.value(&"size".into()), Variant::from(4i64));

    // Missing entries read as the invalid Variant
    assert!(!iterable.value(&"missing".into()).is_valid());

    let mut hash = VariantHash::new();
    hash.insert("k".to_string(), Variant::from(1.5f64));
    let value = Variant::new(hash);
    assert_eq!(
        value.associative_iterable().value(&"k".into()),
        Variant::from(1.5f64)
    );
}

#[test]
fn test_sets() -> Result<(), Error> {
    register_association::<HashSet<String>>()?;
    let mut value = Variant::new(HashSet::from(["x".to_string()]));
    let mut iterable = value.associative_iterable_mut();

    let meta = iterable.meta_container().expect("registered");
    assert!(!meta.mapped_meta_type().is_valid());

    iterable.insert_key(&"y".into());
    iterable.set_value(&"z".into(), &123i32.into());
    assert_eq!(iterable.size(), 3);
    assert!(!iterable.value(&"x".into()).is_valid());

    assert_eq!(iterable.find(&"y".into()).get(), Variant::from("y"));

    iterable.remove_key(&"x".into());
    assert!(!iterable.contains_key(&"x".into()));
    Ok(())
}

#[test]
fn test_unconvertible_key_is_not_contained() -> Result<(), Error> {
    let value = string_int_map()?;
    let iterable = value.associative_iterable();
    let bytes = Variant::new(vec![1u8]);

    assert!(!iterable.contains_key(&bytes));
    assert_eq!(iterable.find(&bytes), iterable.end());
    // Converts to "1.5", which is a valid but absent key
    assert!(!iterable.contains_key(&Variant::from(1.5f64)));
    Ok(())
}

#[test]
fn test_set_proxy_writes_are_ignored() -> Result<(), Error> {
    register_association::<BTreeSet<char>>()?;
    let mut value = Variant::new(BTreeSet::from(['a', 'b']));
    {
        let mut iterable = value.associative_iterable_mut();
        let mut it = iterable.mutable_begin();
        assert_eq!(it.get().read(), Variant::from('a'));
        it.value().write(&Variant::from('q'));
        it.get().write(&Variant::from('q'));
    }
    assert_eq!(
        value.downcast_ref::<BTreeSet<char>>(),
        Some(&BTreeSet::from(['a', 'b']))
    );
    Ok(())
}

#[test]
fn test_unregistered_container() {
    let mut value = Variant::new(vec![1, 2, 3]);
    assert!(matches!(
        AssociativeIterable::try_new_mut(&mut value),
        Err(Error::NotAssociative(_))
    ));

    let mut iterable = AssociativeIterable::new_mut(&mut value);
    assert!(iterable.meta_container().is_none());
    iterable.insert_key(&1i32.into());
    iterable.set_value(&1i32.into(), &2i32.into());
    iterable.clear();
    assert_eq!(iterable.size(), 0);
    assert_eq!(iterable.begin(), iterable.end());
    assert!(iterable.mutable_begin().is_end());

    assert_eq!(value.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
}

#[test]
fn test_invalid_variant() {
    let mut value = Variant::invalid();
    let mut iterable = value.associative_iterable_mut();
    assert!(iterable.is_empty());
    iterable.set_value(&"a".into(), &"b".into());
    assert!(!iterable.contains_key(&"a".into()));
}

#[test]
fn test_clear() -> Result<(), Error> {
    register_association::<IndexMap<String, f64>>()?;
    let mut value = Variant::new(IndexMap::from([("half".to_string(), 0.5)]));
    let mut iterable = value.associative_iterable_mut();
    assert!(!iterable.is_empty());
    iterable.clear();
    assert!(iterable.is_empty());
    assert_eq!(iterable.begin(), iterable.end());
    Ok(())
}

#[test]
fn test_no_copy_before_iterating() -> Result<(), Error> {
    let mut value = string_int_map()?;
    value
        .associative_iterable_mut()
        .set_value(&"live".into(), &99i32.into());

    let map = value
        .downcast_ref::<HashMap<String, i32>>()
        .expect("still a HashMap");
    assert_eq!(map.get("live"), Some(&99));
    Ok(())
}
