use std::cell::RefCell;
use std::rc::Rc;

use memory::Value;
use vm::opcode::instruction::{encode_abc, encode_abx};
use vm::{
    BytecodeBackend, Constant, Executable, LinkError, LoaderError, OpCode, ProgramImage,
    Prototype, Reifier,
};

fn abx(op: OpCode, a: u8, bx: u16) -> u32 {
    encode_abx(op.as_u8(), a, bx)
}

fn abc(op: OpCode, a: u8, b: u8, c: u8) -> u32 {
    encode_abc(op.as_u8(), a, b, c)
}

/// `return 42`
fn answer_unit() -> Executable {
    let mut main = Prototype::new("main");
    main.max_slots = 1;
    main.constants = vec![Constant::Int(42)];
    main.code = vec![abx(OpCode::LoadConst, 0, 0), abc(OpCode::Return, 0, 0, 0)];
    Executable::from_main(main)
}

#[test]
fn reify_before_install_is_not_initialized() {
    let mut reifier = Reifier::new(ProgramImage::with_stdlib());
    assert!(!reifier.is_initialized());
    let err = reifier.reify(&[0x01, 0x02], 2).unwrap_err();
    assert_eq!(err, LinkError::ToplevelNotInitialized);
    assert!(err.to_string().starts_with("Toplevel not initialized"));
}

#[test]
fn recording_backend_sees_exact_arguments_once() {
    let calls: Rc<RefCell<Vec<(Vec<u8>, usize)>>> = Rc::default();
    let image = ProgramImage::with_stdlib();
    let mut reifier = Reifier::new(image.clone());

    let log = Rc::clone(&calls);
    reifier.install_backend(move |bytes: &[u8], size: usize| {
        log.borrow_mut().push((bytes.to_vec(), size));
        Ok::<_, LoaderError>(answer_unit())
    });

    let unit = reifier.reify(&[0x01, 0x02], 2).unwrap();
    assert_eq!(*calls.borrow(), vec![(vec![0x01, 0x02], 2)]);
    assert!(unit.image().same_as(&image));

    // The unit observes the live table rather than a copy
    image.globals.borrow_mut().ensure_capacity(1);
    unit.set_global(0, Value::int(7)).unwrap();
    assert_eq!(image.globals.borrow().get(0).unwrap().as_int(), Some(7));

    let mut out = Vec::new();
    let outcome = unit.run(&mut out, None).unwrap();
    assert_eq!(outcome.value.as_int(), Some(42));
    assert!(outcome.writes.is_empty());
    assert!(reifier.release_reified(unit).is_ok());
}

#[test]
fn later_growth_is_visible_to_earlier_units() {
    let image = ProgramImage::with_stdlib();
    let mut reifier = Reifier::new(image.clone());
    reifier.install_backend(BytecodeBackend);

    // `return global[3]`
    let mut main = Prototype::new("main");
    main.max_slots = 1;
    main.code = vec![abx(OpCode::GetGlobal, 0, 3), abc(OpCode::Return, 0, 0, 0)];
    let exe = Executable::from_main(main);
    let unit = reifier
        .reify(&exe.to_bytes(), exe.instruction_count())
        .unwrap();

    let mut out = Vec::new();
    assert!(unit.run(&mut out, None).is_err());

    image.globals.borrow_mut().ensure_capacity(4);
    image.globals.borrow_mut().set(3, Value::int(11)).unwrap();
    assert_eq!(unit.run(&mut out, None).unwrap().value.as_int(), Some(11));
}

#[test]
fn backend_failure_is_malformed_unit() {
    let mut reifier = Reifier::new(ProgramImage::new());
    reifier.install_backend(BytecodeBackend);
    let err = reifier.reify(b"not bytecode", 0).unwrap_err();
    assert!(matches!(err, LinkError::MalformedUnit(_)), "{err:?}");
    // Still installed: the next turn can succeed
    assert!(reifier.is_initialized());
    let exe = answer_unit();
    assert!(reifier.reify(&exe.to_bytes(), 2).is_ok());
}

#[test]
fn second_install_replaces_backend() {
    let mut reifier = Reifier::new(ProgramImage::new());
    reifier.install_backend(|_: &[u8], _: usize| {
        Err::<Executable, _>(LoaderError::Format("first".into()))
    });
    reifier.install_backend(|_: &[u8], _: usize| Ok::<_, LoaderError>(answer_unit()));
    assert!(reifier.reify(&[], 0).is_ok());
}

#[test]
fn function_constants_link_to_heap_handles() {
    let image = ProgramImage::with_stdlib();
    let mut reifier = Reifier::new(image.clone());
    reifier.install_backend(BytecodeBackend);

    // fn double(x) { x + x }  then  return double(21)
    let mut double = Prototype::new("double");
    double.arity = 1;
    double.max_slots = 2;
    double.code = vec![abc(OpCode::Add, 1, 0, 0), abc(OpCode::Return, 1, 0, 0)];

    let mut main = Prototype::new("main");
    main.max_slots = 2;
    main.constants = vec![Constant::Function(0), Constant::Int(21)];
    main.code = vec![
        abx(OpCode::LoadConst, 0, 0),
        abx(OpCode::LoadConst, 1, 1),
        abc(OpCode::Call, 0, 0, 1),
        abc(OpCode::Return, 0, 0, 0),
    ];
    let exe = Executable {
        strings: vec![],
        prototypes: vec![double],
        main,
    };

    let unit = reifier.reify(&exe.to_bytes(), 6).unwrap();
    assert_eq!(unit.functions().len(), 1);
    let mut out = Vec::new();
    assert_eq!(unit.run(&mut out, None).unwrap().value.as_int(), Some(42));
}
