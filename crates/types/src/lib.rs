use heck::MixedCase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    #[error("Empty resource name")]
    EmptyResourceName,
}

/// Primary key of a single record.
///
/// Identifiers are never null. Numeric keys are kept in their decimal form so
/// that `1` and `"1"` address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawIdentifier", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form, as it appears in a URL path or query
    pub fn encoded(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

/// Wire forms accepted for an identifier: `"abc"` or `42`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl From<RawIdentifier> for Identifier {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Text(s) => Self(s),
            RawIdentifier::Unsigned(n) => Self(n.to_string()),
            RawIdentifier::Signed(n) => Self(n.to_string()),
        }
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for Identifier {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

macro_rules! identifier_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Identifier {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

identifier_from_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a record type, e.g. "testRecord" or "test-record"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a new ResourceName with validation
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();

        if name.is_empty() {
            return Err(TypeError::EmptyResourceName);
        }

        if name.contains(|c: char| c == '/' || c == '?' || c == '#' || c.is_whitespace()) {
            return Err(TypeError::InvalidResourceName(name));
        }

        Ok(Self(name))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower camel case form of the name ("test-record" -> "testRecord")
    pub fn camelized(&self) -> String {
        self.0.to_mixed_case()
    }

    /// URL path segment and payload key for a collection of this type
    /// ("testRecord" -> "testRecords")
    pub fn path_for_type(&self) -> String {
        pluralize(&self.camelized())
    }
}

fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if lower.ends_with('y') {
        let before_y = lower.chars().rev().nth(1);
        if matches!(before_y, Some(c) if !"aeiou".contains(c)) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

impl FromStr for ResourceName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_from_numbers_and_strings() {
        assert_eq!(Identifier::from(1), Identifier::from("1"));
        assert_eq!(Identifier::from(1024usize).as_str(), "1024");
        assert_eq!(Identifier::from(-7i64).as_str(), "-7");
        assert_eq!(Identifier::from("my-id:1").to_string(), "my-id:1");
    }

    #[test]
    fn test_identifier_encoding_round_trip() {
        let id = Identifier::from("my-id:1");
        assert_eq!(id.encoded(), "my-id%3A1");

        let decoded = urlencoding::decode(&id.encoded()).unwrap().into_owned();
        assert_eq!(Identifier::from(decoded), id);

        let spaced = Identifier::from("a b/c&d");
        assert_eq!(spaced.encoded(), "a%20b%2Fc%26d");
    }

    #[test]
    fn test_identifier_deserialize() {
        let ids: Vec<Identifier> = serde_json::from_str(r#"["abc", 12, -3]"#).unwrap();
        assert_eq!(ids, vec!["abc".into(), 12.into(), (-3).into()]);

        let json = serde_json::to_string(&Identifier::from(5)).unwrap();
        assert_eq!(json, r#""5""#);
    }

    #[test]
    fn test_resource_name_validation() {
        assert!(ResourceName::new("testRecord").is_ok());
        assert_eq!(ResourceName::new(""), Err(TypeError::EmptyResourceName));
        assert!(matches!(
            ResourceName::new("test/record"),
            Err(TypeError::InvalidResourceName(_))
        ));
        assert!("test record".parse::<ResourceName>().is_err());
    }

    #[test]
    fn test_path_for_type() {
        let cases = [
            ("testRecord", "testRecords"),
            ("test-record", "testRecords"),
            ("test_record", "testRecords"),
            ("category", "categories"),
            ("day", "days"),
            ("box", "boxes"),
            ("address", "addresses"),
            ("branch", "branches"),
        ];

        for (name, expected) in cases {
            let resource = ResourceName::new(name).unwrap();
            assert_eq!(resource.path_for_type(), expected, "path for {}", name);
        }
    }
}
