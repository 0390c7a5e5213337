// Truthiness for time_wait_return

use std::collections::{BTreeMap, HashMap, HashSet};

/// Values that can be judged "present" without a separate predicate
///
/// Falsy: `false`, `None`, zero, empty strings and collections, and the JSON
/// values `null`, `false`, `0`, `""`, `[]`, `{}`.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl<T: Truthy + ?Sized> Truthy for Box<T> {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for [T] {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Truthy for HashMap<K, V, S> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Truthy for BTreeMap<K, V> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T, S> Truthy for HashSet<T, S> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

macro_rules! truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for serde_json::Value {
    fn is_truthy(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f.is_truthy()),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }
}
