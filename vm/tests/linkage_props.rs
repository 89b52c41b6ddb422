//! Property-based tests for the global table and primitive registry.
//!
//! Growth must never disturb existing slots, and registration must hand out
//! gap-free indices in call order.

use memory::Value;
use proptest::prelude::*;
use vm::{GlobalTable, LinkError, Machine, NativeObj, PrimitiveRegistry, RuntimeError};

fn nop(_vm: &mut Machine<'_>, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::nil())
}

fn small_int() -> impl Strategy<Value = i64> {
    -1_000_000i64..1_000_000
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_growth_preserves_slots(
        steps in prop::collection::vec((0usize..64, small_int()), 1..32)
    ) {
        let mut table = GlobalTable::new();
        let mut expected: Vec<Option<i64>> = Vec::new();
        let mut len = 0usize;

        for (grow_by, value) in steps {
            len += grow_by;
            table.ensure_capacity(len);
            expected.resize(len, None);
            prop_assert_eq!(table.len(), len);

            if len > 0 {
                let slot = (value.unsigned_abs() as usize) % len;
                table.set(slot, Value::int(value)).unwrap();
                expected[slot] = Some(value);
            }

            for (i, want) in expected.iter().enumerate() {
                let got = table.get(i).unwrap();
                match want {
                    Some(n) => prop_assert_eq!(got.as_int(), Some(*n)),
                    None => prop_assert!(got.is_empty()),
                }
            }
        }
    }

    #[test]
    fn prop_out_of_range_access_fails(len in 0usize..128, past in 0usize..16) {
        let mut table = GlobalTable::new();
        table.ensure_capacity(len);
        let index = len + past;
        prop_assert_eq!(table.get(index), Err(LinkError::OutOfRange { index, len }));
        prop_assert_eq!(
            table.set(index, Value::nil()),
            Err(LinkError::OutOfRange { index, len })
        );
    }

    #[test]
    fn prop_register_yields_sequential_indices(
        arities in prop::collection::vec(-1isize..4, 0..48),
        past in 0usize..8,
    ) {
        let mut registry = PrimitiveRegistry::new();
        for (i, arity) in arities.iter().enumerate() {
            let index = registry.register(NativeObj::new(format!("p{i}"), nop, *arity));
            prop_assert_eq!(index as usize, i);
        }
        prop_assert_eq!(registry.count(), arities.len());

        for (i, arity) in arities.iter().enumerate() {
            let entry = registry.lookup(i).unwrap();
            prop_assert_eq!(&entry.name, &format!("p{i}"));
            prop_assert_eq!(entry.arity, *arity);
        }

        let index = arities.len() + past;
        prop_assert_eq!(
            registry.lookup(index).unwrap_err(),
            LinkError::UnknownPrimitive { index, count: arities.len() }
        );
    }
}
