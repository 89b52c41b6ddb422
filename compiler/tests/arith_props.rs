use compiler::{compile, SymbolEnv};
use proptest::prelude::*;
use vm::{BytecodeBackend, ProgramImage, Reifier};

fn eval_int(source: &str) -> Option<i64> {
    let image = ProgramImage::with_stdlib();
    let mut reifier = Reifier::new(image.clone());
    reifier.install_backend(BytecodeBackend);
    let env = SymbolEnv::with_primitives(&image.primitives.borrow());
    let fragment = compile(source, &env).ok()?;
    let unit = reifier.reify(&fragment.bytes, fragment.size_hint).ok()?;
    let mut out = Vec::new();
    unit.run(&mut out, None).ok()?.value.as_int()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_arithmetic_matches_host(a in -10_000i64..10_000, b in -10_000i64..10_000, c in 1i64..100) {
        let source = format!("({a}) * ({b}) + ({a}) - ({b}) / {c}");
        // Division truncates toward zero, as in the host
        let expected = a * b + a - b / c;
        prop_assert_eq!(eval_int(&source), Some(expected));
    }

    #[test]
    fn prop_comparisons_agree(a in -1_000i64..1_000, b in -1_000i64..1_000) {
        let source = format!("if ({a}) < ({b}) {{ 1 }} else {{ if ({a}) == ({b}) {{ 0 }} else {{ 2 }} }}");
        let expected = match a.cmp(&b) {
            std::cmp::Ordering::Less => 1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 2,
        };
        prop_assert_eq!(eval_int(&source), Some(expected));
    }
}
