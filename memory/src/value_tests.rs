#[cfg(test)]
mod tests {
    use crate::value::{I60_MAX, I60_MIN};
    use crate::Value;

    #[test]
    fn test_tagged_int_basics() {
        let v = Value::int(123);
        assert!(v.is_int());
        assert!(!v.is_obj());
        assert_eq!(v.as_int(), Some(123));

        let v_neg = Value::int(-99);
        assert_eq!(v_neg.as_int(), Some(-99));
    }

    #[test]
    fn test_tagged_int_i60_range() {
        assert_eq!(Value::int(I60_MAX).as_int(), Some(I60_MAX));
        assert_eq!(Value::int(I60_MIN).as_int(), Some(I60_MIN));
        assert!(Value::checked_int(I60_MAX + 1).is_none());
        assert!(Value::checked_int(I60_MIN - 1).is_none());
        assert_eq!(Value::checked_int(-7).and_then(|v| v.as_int()), Some(-7));
    }

    #[test]
    fn test_empty_sentinel_is_distinct() {
        let e = Value::empty();
        assert!(e.is_empty());
        assert!(!e.is_nil());
        assert!(!e.is_obj());
        assert_ne!(e, Value::nil());
        assert_eq!(Value::default(), e);
    }

    #[test]
    fn test_tagged_bools_and_falsiness() {
        assert_eq!(Value::bool(true).as_bool(), Some(true));
        assert_eq!(Value::bool(false).as_bool(), Some(false));
        assert!(Value::bool(false).is_falsey());
        assert!(Value::nil().is_falsey());
        assert!(!Value::int(0).is_falsey());
    }

    #[test]
    fn test_object_handles() {
        let s = Value::string(42);
        assert!(s.is_string());
        assert_eq!(s.as_handle(), Some(42));

        let f = Value::function(7);
        assert!(f.is_function());
        assert_eq!(f.as_handle(), Some(7));

        let n = Value::native(3);
        assert!(n.is_native());
        assert_eq!(n.as_handle(), Some(3));
        assert_eq!(Value::int(3).as_handle(), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::int(1).type_name(), "int");
        assert_eq!(Value::bool(true).type_name(), "bool");
        assert_eq!(Value::string(0).type_name(), "string");
        assert_eq!(Value::function(0).type_name(), "fn");
        assert_eq!(Value::native(0).type_name(), "primitive");
        assert_eq!(Value::nil().type_name(), "nil");
    }
}
