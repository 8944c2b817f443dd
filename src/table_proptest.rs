#![cfg(test)]

// Property tests for Table kept inside the crate so they can reach the
// bucket layout and the process strategy directly.

use crate::bucket::{bucket_index, STEP};
use crate::error::Error;
use crate::iter::Cursor;
use crate::strategy::TableKey;
use crate::table::Table;
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

// Pool-indexed operations so that shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Add(usize, i32),
    AddUnique(usize, i32),
    Delete(usize),
    Find(usize),
    Iterate,
}

fn arb_ops(pool_len: usize) -> impl Strategy<Value = Vec<Op>> {
    let idx = 0..pool_len;
    let op = prop_oneof![
        (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Add(i, v)),
        (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::AddUnique(i, v)),
        idx.clone().prop_map(Op::Delete),
        idx.prop_map(Op::Find),
        Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..80)
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::btree_set("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let pool: Vec<String> = pool.into_iter().collect();
        let n = pool.len();
        arb_ops(n).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Released (key, value) pairs in release order.
type Released = Rc<RefCell<Vec<(String, i32)>>>;

fn tracked_table(released: &Released) -> Table<String, i32> {
    let pending: Rc<RefCell<Option<i32>>> = Rc::default();
    let (pv, pk, out) = (pending.clone(), pending, released.clone());
    Table::builder()
        .value_destructor(move |v: i32| {
            let prev = pv.borrow_mut().replace(v);
            assert!(prev.is_none(), "two values released without a key");
        })
        .key_destructor(move |k: String| {
            let v = pk.borrow_mut().take().expect("value released before key");
            out.borrow_mut().push((k, v));
        })
        .build()
}

// Runs `ops` against `sut` and a BTreeMap model, checking after every step:
// - count/is_empty parity and find parity for the touched key;
// - overwrite and delete release exactly the displaced pair, value first;
// - a rejected add_unique releases nothing and returns the pair;
// - a full cursor pass yields the model's key set exactly once each.
// Finally the table is dropped and the remaining pairs must be released.
fn run_state_machine(
    mut sut: Table<String, i32>,
    released: &Released,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: BTreeMap<String, i32> = BTreeMap::new();
    let mut expected: Vec<(String, i32)> = Vec::new();

    for op in ops {
        match op {
            Op::Add(i, v) => {
                let k = pool[i].clone();
                if let Some(old) = model.insert(k.clone(), v) {
                    expected.push((k.clone(), old));
                }
                prop_assert!(sut.add(k, v).is_ok());
            }
            Op::AddUnique(i, v) => {
                let k = &pool[i];
                match sut.add_unique(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!model.contains_key(k));
                        model.insert(k.clone(), v);
                    }
                    Err(e) => {
                        prop_assert_eq!(e.kind(), Error::AlreadyExists);
                        prop_assert!(model.contains_key(k));
                        prop_assert_eq!(e.into_inner(), (k.clone(), v));
                    }
                }
            }
            Op::Delete(i) => {
                let k = &pool[i];
                match model.remove(k) {
                    Some(old) => {
                        prop_assert_eq!(sut.delete(k.as_str()), Ok(()));
                        expected.push((k.clone(), old));
                    }
                    None => prop_assert_eq!(sut.delete(k.as_str()), Err(Error::NotFound)),
                }
            }
            Op::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k.as_str()), model.get(k));
                prop_assert_eq!(sut.contains_key(k.as_str()), model.contains_key(k));
            }
            Op::Iterate => {
                let mut seen = BTreeSet::new();
                let mut c = Cursor::new();
                while let Some((k, v)) = c.next(&sut) {
                    prop_assert_eq!(model.get(k), Some(v));
                    prop_assert!(seen.insert(k.clone()), "key yielded twice");
                }
                prop_assert_eq!(seen.len(), model.len());
            }
        }

        prop_assert_eq!(sut.count(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert_eq!(&*released.borrow(), &expected);
    }

    let stats = sut.stats();
    prop_assert_eq!(stats.entries, model.len());
    prop_assert_eq!(stats.allocated_slots % STEP as usize, 0);

    drop(sut);
    let tail: BTreeMap<String, i32> = released.borrow()[expected.len()..].iter().cloned().collect();
    prop_assert_eq!(released.borrow().len(), expected.len() + model.len());
    prop_assert_eq!(tail, model);
    Ok(())
}

// Property: state-machine equivalence against BTreeMap with destructor
// accounting. Every pair that leaves the table is released exactly once.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let released: Released = Rc::default();
        let sut = tracked_table(&released);
        run_state_machine(sut, &released, &pool, ops)?;
    }
}

// Keys that all land in the same bucket under the process seed. This
// stresses comparator resolution and in-bucket compaction on delete.
fn crowded_pool(size: usize) -> Vec<String> {
    let strategy = Table::<String, i32>::new().strategy();
    let target = bucket_index(strategy.hash("seed-key".as_key()));
    (0u32..)
        .map(|i| format!("c{i}"))
        .filter(|k| bucket_index(strategy.hash(k.as_key())) == target)
        .take(size)
        .collect()
}

// Property: same invariants as above with every key in one bucket.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_single_bucket(ops in arb_ops(8)) {
        let pool = crowded_pool(8);
        let released: Released = Rc::default();
        let sut = tracked_table(&released);
        run_state_machine(sut, &released, &pool, ops)?;
    }
}

// Property: integer keys agree with the model across signed handles.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_integer_keys(entries in proptest::collection::vec((any::<i64>(), any::<u8>()), 0..200)) {
        let mut sut: Table<i64, u8> = Table::new();
        let mut model = BTreeMap::new();
        for (k, v) in entries {
            sut.add(k, v).map_err(|e| TestCaseError::fail(e.to_string()))?;
            model.insert(k, v);
        }
        prop_assert_eq!(sut.count(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(sut.find(k), Some(v));
        }
        let seen: BTreeMap<i64, u8> = sut.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(seen, model);
    }
}
