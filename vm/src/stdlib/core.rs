use crate::error::RuntimeError;
use crate::machine::Machine;
use memory::Value;

fn expect_int(val: &Value, what: &str) -> Result<i64, RuntimeError> {
    val.as_int().ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("{what} expects int, got {}", val.type_name()))
    })
}

pub fn native_print(vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(|arg| vm.val_to_string(arg))
        .collect::<Vec<_>>()
        .join(" ");
    vm.write_line(&line)?;
    Ok(Value::nil())
}

pub fn native_len(vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::ArityMismatch(
            "len() takes exactly 1 argument".into(),
        ));
    }
    let val = &args[0];

    if val.is_string() {
        let handle = val
            .as_handle()
            .ok_or(RuntimeError::TypeMismatch("bad string handle".into()))?;
        let s = vm
            .heap
            .get_string(handle)
            .ok_or(RuntimeError::SystemError("Dangling string handle".into()))?;
        Ok(Value::int(s.chars().count() as i64))
    } else {
        Err(RuntimeError::TypeMismatch("len() expects String".into()))
    }
}

pub fn native_typeof(vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::ArityMismatch(
            "typeof() takes exactly 1 argument".into(),
        ));
    }
    let handle = vm.heap.alloc_string(args[0].type_name().to_string());
    Ok(Value::string(handle))
}

pub fn native_assert(_vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::ArityMismatch(
            "assert() takes exactly 1 argument".into(),
        ));
    }
    if !args[0].as_bool().unwrap_or(false) {
        return Err(RuntimeError::AssertionFailed);
    }
    Ok(Value::nil())
}

pub fn native_to_string(vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::ArityMismatch(
            "to_string() takes exactly 1 argument".into(),
        ));
    }
    if args[0].is_string() {
        return Ok(args[0]);
    }
    let s = vm.val_to_string(&args[0]);
    let handle = vm.heap.alloc_string(s);
    Ok(Value::string(handle))
}

pub fn native_abs(_vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    let [val] = args else {
        return Err(RuntimeError::ArityMismatch(
            "abs() takes exactly 1 argument".into(),
        ));
    };
    let n = expect_int(val, "abs()")?;
    // |I60_MIN| is outside the i60 range
    Value::checked_int(n.abs()).ok_or(RuntimeError::IntegerOverflow)
}

pub fn native_min(_vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    let [a, b] = args else {
        return Err(RuntimeError::ArityMismatch(
            "min() takes exactly 2 arguments".into(),
        ));
    };
    let (x, y) = (expect_int(a, "min()")?, expect_int(b, "min()")?);
    Ok(Value::int(x.min(y)))
}

pub fn native_max(_vm: &mut Machine<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
    let [a, b] = args else {
        return Err(RuntimeError::ArityMismatch(
            "max() takes exactly 2 arguments".into(),
        ));
    };
    let (x, y) = (expect_int(a, "max()")?, expect_int(b, "max()")?);
    Ok(Value::int(x.max(y)))
}
