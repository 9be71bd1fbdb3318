//! Builtin functions
//!
//! Builtins live in a fixed-order table; a builtin's index in [`BUILTINS`] is
//! the operand of `GetBuiltin`. Argument mistakes are reported as
//! [`Value::Error`] values rather than halting the VM.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Native function signature
pub type BuiltinFn = fn(&[Value]) -> Value;

/// A named native function
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// All builtins, in index order
pub static BUILTINS: [Builtin; 10] = [
    Builtin { name: "len", func: len },
    Builtin { name: "print", func: print },
    Builtin { name: "push", func: push },
    Builtin { name: "first", func: first },
    Builtin { name: "last", func: last },
    Builtin { name: "rest", func: rest },
    Builtin { name: "typeof", func: type_of },
    Builtin { name: "str", func: str },
    Builtin { name: "int", func: int },
    Builtin { name: "float", func: float },
];

/// Builtin at `index`
pub fn get(index: usize) -> Option<&'static Builtin> {
    BUILTINS.get(index)
}

/// Builtin named `name`
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Check if a name refers to a builtin
pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

fn wrong_arg_count(want: usize, got: usize) -> Option<Value> {
    (want != got).then(|| {
        Value::error(format!(
            "wrong number of arguments: want={}, got={}",
            want, got
        ))
    })
}

fn unsupported(name: &str, arg: &Value) -> Value {
    Value::error(format!(
        "argument to `{}` not supported, got {}",
        name,
        arg.type_name()
    ))
}

fn must_be_array(name: &str, arg: &Value) -> Value {
    Value::error(format!(
        "argument to `{}` must be ARRAY, got {}",
        name,
        arg.type_name()
    ))
}

/// Length of a string (in characters) or an array
fn len(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::String(s) => Value::Integer(s.chars().count() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        other => unsupported("len", other),
    }
}

/// Write the arguments to stdout separated by spaces
fn print(args: &[Value]) -> Value {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Value::Null
}

/// New array with one more element; the argument array is unchanged
fn push(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(2, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Array(elements) => {
            let mut extended = Vec::with_capacity(elements.len() + 1);
            extended.extend(elements.iter().cloned());
            extended.push(args[1].clone());
            Value::array(extended)
        }
        other => must_be_array("push", other),
    }
}

fn first(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Array(elements) => elements.first().cloned().unwrap_or(Value::Null),
        other => must_be_array("first", other),
    }
}

fn last(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Array(elements) => elements.last().cloned().unwrap_or(Value::Null),
        other => must_be_array("last", other),
    }
}

/// All but the first element; null for an empty array
fn rest(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Array(elements) if elements.is_empty() => Value::Null,
        Value::Array(elements) => Value::array(elements[1..].to_vec()),
        other => must_be_array("rest", other),
    }
}

fn type_of(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    Value::string(args[0].type_name())
}

fn str(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::String(s) => Value::String(Arc::clone(s)),
        other => Value::string(other.to_string()),
    }
}

/// Convert to an integer; floats truncate toward zero
fn int(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Integer(n) => Value::Integer(*n),
        Value::Float(n) => Value::Integer(*n as i64),
        Value::Boolean(b) => Value::Integer(*b as i64),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::error(format!("could not parse {:?} as INTEGER", s.as_str())),
        },
        other => unsupported("int", other),
    }
}

fn float(args: &[Value]) -> Value {
    if let Some(err) = wrong_arg_count(1, args.len()) {
        return err;
    }
    match &args[0] {
        Value::Integer(n) => Value::Float(*n as f64),
        Value::Float(n) => Value::Float(*n),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => Value::Float(n),
            Err(_) => Value::error(format!("could not parse {:?} as FLOAT", s.as_str())),
        },
        other => unsupported("float", other),
    }
}
