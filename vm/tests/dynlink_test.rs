use proptest::prelude::*;
use vm::{CurrentLibraries, DynamicLibraryStub, SymbolNotFound};

proptest! {
    #[test]
    fn prop_open_close_never_fails(name in ".*") {
        let mut stub = DynamicLibraryStub::new();
        let handle = stub.open_library(&name);
        prop_assert_eq!(handle.name(), name.as_str());
        stub.close_library(handle);
    }

    #[test]
    fn prop_lookup_is_always_not_found(library in "[a-z]{0,12}", symbol in ".*") {
        let mut stub = DynamicLibraryStub::new();
        let handle = stub.open_library(&library);
        let result = stub.lookup_symbol(&handle, &symbol);
        prop_assert_eq!(
            result,
            Err(SymbolNotFound { library: library.clone(), symbol: symbol.clone() })
        );
        stub.close_library(handle);
    }
}

#[test]
fn symbol_names_are_never_evaluated() {
    let mut stub = DynamicLibraryStub::new();
    let result = stub.with_library("libc", |stub, lib| {
        stub.lookup_symbol(lib, "print(\"pwned\")")
    });
    assert!(result.is_err());
}

#[test]
fn no_libraries_are_resident() {
    let mut stub = DynamicLibraryStub::new();
    let handle = stub.open_library("libm.so");
    assert_eq!(
        stub.current_libraries(),
        CurrentLibraries {
            count: 0,
            handles: vec![]
        }
    );
    stub.close_library(handle);
}
