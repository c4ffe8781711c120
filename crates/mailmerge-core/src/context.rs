//! Data contexts that placeholders are resolved against.
//!
//! A context answers lookups by name with a tagged result, so callers can
//! tell a missing value from one that is present but null. Adapters are
//! provided for string maps, `serde_json::Value` and any `Serialize` type.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Cultures that write decimals with a comma.
const DECIMAL_COMMA_CULTURES: &[&str] = &[
    "cs", "da", "de", "es", "fi", "fr", "id", "it", "nb", "nl", "pl", "pt", "ru", "sv", "tr",
    "uk",
];

/// Scalar value found in a data context.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl Value {
    /// Formats the value for the given culture (e.g. "en-US", "de").
    #[must_use]
    pub fn format(&self, culture: &str) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Float(x) => {
                let formatted = x.to_string();
                if uses_decimal_comma(culture) {
                    formatted.replace('.', ",")
                } else {
                    formatted
                }
            }
        }
    }
}

fn uses_decimal_comma(culture: &str) -> bool {
    let language = culture
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    DECIMAL_COMMA_CULTURES.contains(&language.as_str())
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Result of looking up a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The name exists and has a value.
    Present(Value),
    /// The name exists but holds no value.
    Null,
    /// The name does not exist.
    Absent,
}

/// Something placeholders can be looked up in.
///
/// `path` is a placeholder name as written, possibly dotted (`order.id`).
pub trait DataContext {
    /// Looks up a value by name.
    fn lookup(&self, path: &str) -> Lookup;
}

impl<C: DataContext + ?Sized> DataContext for &C {
    fn lookup(&self, path: &str) -> Lookup {
        (**self).lookup(path)
    }
}

impl DataContext for () {
    fn lookup(&self, _path: &str) -> Lookup {
        Lookup::Absent
    }
}

impl<S: BuildHasher> DataContext for HashMap<String, String, S> {
    fn lookup(&self, path: &str) -> Lookup {
        self.get(path)
            .map_or(Lookup::Absent, |v| Lookup::Present(Value::Text(v.clone())))
    }
}

impl DataContext for BTreeMap<String, String> {
    fn lookup(&self, path: &str) -> Lookup {
        self.get(path)
            .map_or(Lookup::Absent, |v| Lookup::Present(Value::Text(v.clone())))
    }
}

impl DataContext for serde_json::Value {
    fn lookup(&self, path: &str) -> Lookup {
        let mut current = self;
        for segment in path.split('.') {
            let next = match current {
                Self::Object(map) => map.get(segment),
                Self::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Lookup::Absent,
            }
        }

        match current {
            Self::Null => Lookup::Null,
            Self::String(s) => Lookup::Present(Value::Text(s.clone())),
            Self::Bool(b) => Lookup::Present(Value::Bool(*b)),
            Self::Number(n) => n.as_i64().map_or_else(
                || Lookup::Present(Value::Float(n.as_f64().unwrap_or(f64::NAN))),
                |i| Lookup::Present(Value::Integer(i)),
            ),
            other => Lookup::Present(Value::Text(other.to_string())),
        }
    }
}

/// Context built from any serializable value, such as a plain struct.
///
/// Field names follow the value's serde representation.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedContext(serde_json::Value);

impl SerializedContext {
    /// Captures the current state of `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn new<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Self)
    }
}

impl DataContext for SerializedContext {
    fn lookup(&self, path: &str) -> Lookup {
        self.0.lookup(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_lookup() {
        let mut map = HashMap::new();
        map.insert("Name".to_string(), "Ann".to_string());
        assert_eq!(map.lookup("Name"), Lookup::Present(Value::from("Ann")));
        assert_eq!(map.lookup("name"), Lookup::Absent);
    }

    #[test]
    fn test_json_dotted_lookup() {
        let ctx = json!({
            "customer": {"name": "Ann", "tags": ["vip", "new"], "phone": null},
            "total": 12.5,
            "count": 3
        });
        assert_eq!(ctx.lookup("customer.name"), Lookup::Present(Value::from("Ann")));
        assert_eq!(ctx.lookup("customer.tags.1"), Lookup::Present(Value::from("new")));
        assert_eq!(ctx.lookup("customer.phone"), Lookup::Null);
        assert_eq!(ctx.lookup("customer.email"), Lookup::Absent);
        assert_eq!(ctx.lookup("count"), Lookup::Present(Value::Integer(3)));
        assert_eq!(ctx.lookup("total"), Lookup::Present(Value::Float(12.5)));
    }

    #[test]
    fn test_serialized_struct() {
        #[derive(Serialize)]
        struct Recipient {
            first_name: &'static str,
            active: bool,
        }

        let ctx = SerializedContext::new(&Recipient {
            first_name: "Bo",
            active: true,
        })
        .unwrap();
        assert_eq!(ctx.lookup("first_name"), Lookup::Present(Value::from("Bo")));
        assert_eq!(ctx.lookup("active"), Lookup::Present(Value::Bool(true)));
    }

    #[test]
    fn test_culture_formatting() {
        let value = Value::Float(3.5);
        assert_eq!(value.format("en-US"), "3.5");
        assert_eq!(value.format("de-DE"), "3,5");
        assert_eq!(value.format("fr"), "3,5");
        assert_eq!(Value::Integer(1200).format("de"), "1200");
    }
}
