use memory::{Function, Heap, Value};

#[test]
fn handles_are_never_reused() {
    let mut heap = Heap::new();

    let idx1 = heap.alloc_string("Hello".to_string());
    let idx2 = heap.alloc_string("World".to_string());

    assert_ne!(idx1, idx2, "append-only heap must not recycle handles");
    assert_eq!(heap.get_string(idx1).unwrap(), "Hello");
    assert_eq!(heap.get_string(idx2).unwrap(), "World");
}

#[test]
fn import_strings_preserves_order() {
    let mut heap = Heap::new();
    heap.alloc_string("pre".into());
    let handles = heap.import_strings(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(handles, vec![1, 2]);
    assert_eq!(heap.get_string(handles[1]).unwrap(), "b");
}

#[test]
fn functions_can_be_filled_after_allocation() {
    let mut heap = Heap::new();
    let handle = heap.alloc_function(Function {
        name: "f".into(),
        arity: 1,
        max_slots: 2,
        chunk: vec![],
        constants: vec![],
    });
    heap.get_function_mut(handle)
        .unwrap()
        .constants
        .push(Value::function(handle));

    let f = heap.get_function(handle).unwrap();
    assert_eq!(f.constants[0].as_handle(), Some(handle));
    assert!(f.constants[0].is_function());
    assert!(heap.get_function(handle + 1).is_none());
}
