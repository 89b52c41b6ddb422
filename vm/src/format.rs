//! Value rendering for `print` and the toplevel's result lines.

use memory::{Heap, Value};

use crate::native::PrimitiveRegistry;

/// Render `val` the way `print` shows it: strings without quotes.
pub fn display_value(heap: &Heap, primitives: &PrimitiveRegistry, val: Value) -> String {
    if val.is_string() {
        return val
            .as_handle()
            .and_then(|h| heap.get_string(h))
            .cloned()
            .unwrap_or_else(|| "<bad string>".into());
    }
    render(heap, primitives, val)
}

/// Render `val` as a toplevel result: strings quoted and escaped.
pub fn repr_value(heap: &Heap, primitives: &PrimitiveRegistry, val: Value) -> String {
    if val.is_string() {
        return match val.as_handle().and_then(|h| heap.get_string(h)) {
            Some(s) => format!("{s:?}"),
            None => "<bad string>".into(),
        };
    }
    render(heap, primitives, val)
}

fn render(heap: &Heap, primitives: &PrimitiveRegistry, val: Value) -> String {
    match val {
        v if v.is_int() => v.as_int().map(|n| n.to_string()).unwrap_or_default(),
        v if v.is_bool() => v.as_bool().map(|b| b.to_string()).unwrap_or_default(),
        v if v.is_nil() => "nil".to_string(),
        v if v.is_empty() => "<unbound>".to_string(),
        v if v.is_function() => match v.as_handle().and_then(|h| heap.get_function(h)) {
            Some(f) => format!("<fn {}/{}>", f.name, f.arity),
            None => "<bad fn>".into(),
        },
        v if v.is_native() => {
            let Some(index) = v.as_handle() else {
                return "<bad primitive>".into();
            };
            match primitives.lookup(index as usize) {
                Ok(n) => format!("<primitive {}>", n.name),
                Err(_) => format!("<primitive #{index}>"),
            }
        }
        _ => format!("{:?}", val), // Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_quoted_only_in_repr() {
        let mut heap = Heap::new();
        let registry = PrimitiveRegistry::new();
        let h = heap.alloc_string("a\"b".into());
        assert_eq!(display_value(&heap, &registry, Value::string(h)), "a\"b");
        assert_eq!(repr_value(&heap, &registry, Value::string(h)), "\"a\\\"b\"");
    }

    #[test]
    fn primitives_render_by_name() {
        let heap = Heap::new();
        let registry = PrimitiveRegistry::with_stdlib();
        assert_eq!(
            repr_value(&heap, &registry, Value::native(0)),
            "<primitive print>"
        );
        assert_eq!(
            repr_value(&heap, &registry, Value::native(99)),
            "<primitive #99>"
        );
    }
}
