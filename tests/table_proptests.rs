// Table property tests over the public API.
//
// Property 1: values without a destructor are dropped, never leaked.
//  - Model: each key owns an Rc token; the table holds clones.
//  - Invariant: strong_count(token) == 1 + (key present in table).
//  - Operations: add, add_unique, delete; finally drop the table.
//
// Property 2: iteration covers exactly the stored key set, for both key
// kinds, regardless of insertion order.
use proptest::prelude::*;
use seeded_hashmap::Table;
use std::collections::BTreeSet;
use std::rc::Rc;

// Property 1: drop accounting through Rc strong counts.
proptest! {
    #[test]
    fn prop_values_are_dropped(keys in 1usize..=6, ops in proptest::collection::vec((0u8..=2u8, 0usize..100usize), 1..100)) {
        let tokens: Vec<Rc<()>> = (0..keys).map(|_| Rc::new(())).collect();
        let mut present = vec![false; keys];
        let mut t: Table<String, Rc<()>> = Table::new();

        for (op, raw_k) in ops {
            let k = raw_k % keys;
            let key = format!("k{}", k);
            match op {
                // Overwrite drops the previous clone.
                0 => {
                    prop_assert!(t.add(key, tokens[k].clone()).is_ok());
                    present[k] = true;
                }
                // Rejected clone comes back inside the error and drops with it.
                1 => {
                    let res = t.add_unique(key, tokens[k].clone());
                    prop_assert_eq!(res.is_err(), present[k]);
                    present[k] = true;
                }
                2 => {
                    prop_assert_eq!(t.delete(key.as_str()).is_ok(), present[k]);
                    present[k] = false;
                }
                _ => unreachable!(),
            }

            for (i, tok) in tokens.iter().enumerate() {
                prop_assert_eq!(Rc::strong_count(tok), 1 + usize::from(present[i]));
            }
            prop_assert_eq!(t.count(), present.iter().filter(|p| **p).count());
        }

        drop(t);
        prop_assert!(tokens.iter().all(|tok| Rc::strong_count(tok) == 1));
    }
}

// Property 2: iteration equals the inserted key set.
proptest! {
    #[test]
    fn prop_iteration_covers_key_set(
        ints in proptest::collection::btree_set(any::<u32>(), 0..300),
        strs in proptest::collection::btree_set("[a-zA-Z0-9]{1,12}", 0..300),
    ) {
        let mut ti: Table<u32, ()> = Table::new();
        for k in &ints {
            prop_assert!(ti.add_unique(*k, ()).is_ok());
        }
        let seen: BTreeSet<u32> = ti.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(ti.iter().count(), ints.len());
        prop_assert_eq!(seen, ints);

        let mut ts: Table<&str, usize> = Table::new();
        for (i, k) in strs.iter().enumerate() {
            prop_assert!(ts.add(k.as_str(), i).is_ok());
        }
        let seen: BTreeSet<String> = ts.iter().map(|(k, _)| k.to_string()).collect();
        prop_assert_eq!(ts.count(), strs.len());
        prop_assert_eq!(&seen, &strs);
    }
}
