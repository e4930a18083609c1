//! Address → display name table maintained by the operator.
//!
//! The file format is line oriented:
//!
//! ```text
//! # comments and blank lines are ignored
//! operator_self  me@gmail.com
//! alice@gmail.com        Alice
//! alice.work@corp.com    Alice
//! bob@gmail.com
//! ```
//!
//! Everything after the first run of whitespace is the display name, so
//! names may contain spaces. An address with no name is unmapped and renders
//! as itself. Several addresses may share a name; their conversations then
//! land in the same transcript.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{GchatError, ParseErrorKind, Result};
use crate::message::normalize_address;

/// Distinguished key naming the operator's own address.
pub const OPERATOR_KEY: &str = "operator_self";

/// Immutable alias table, passed explicitly to the resolver and renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    names: BTreeMap<String, String>,
    operator: Option<String>,
}

impl AliasMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the alias file format.
    ///
    /// # Errors
    ///
    /// Returns [`GchatError::InvalidAlias`] for an `operator_self` line
    /// without an address.
    pub fn parse_str(content: &str) -> Result<Self> {
        let mut map = Self::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            if key == OPERATOR_KEY {
                let address = normalize_address(value);
                if address.is_empty() {
                    return Err(GchatError::invalid_alias(
                        line_no,
                        "operator_self needs an address",
                    ));
                }
                map.operator = Some(address);
                continue;
            }

            let address = normalize_address(key);
            if map.names.contains_key(&address) {
                debug!(line = line_no, address = %address, "alias redefined, last entry wins");
            }
            map.names.insert(address, value.to_string());
        }

        Ok(map)
    }

    /// Reads and parses an alias file.
    ///
    /// Errors inside the file come back as [`GchatError::Parse`] carrying
    /// the path; a missing or unreadable file is [`GchatError::Io`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = String::from_utf8(fs::read(path)?)
            .map_err(|e| GchatError::alias_parse(e, Some(path.to_path_buf())))?;

        Self::parse_str(&content).map_err(|e| match e {
            GchatError::InvalidAlias { line, message } => GchatError::alias_parse(
                ParseErrorKind::Entry { line, message },
                Some(path.to_path_buf()),
            ),
            other => other,
        })
    }

    /// Adds or replaces an alias.
    #[must_use]
    pub fn with_alias(mut self, address: &str, name: &str) -> Self {
        self.insert(address, name);
        self
    }

    /// Sets the operator's own address.
    #[must_use]
    pub fn with_operator(mut self, address: &str) -> Self {
        let address = normalize_address(address);
        self.operator = (!address.is_empty()).then_some(address);
        self
    }

    /// Adds or replaces an alias in place.
    pub fn insert(&mut self, address: &str, name: &str) {
        self.names
            .insert(normalize_address(address), name.trim().to_string());
    }

    /// The operator's address, if the file names one.
    pub fn operator_self(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    /// The alias for an address, if one is set and non-empty.
    pub fn alias(&self, address: &str) -> Option<&str> {
        self.names
            .get(address)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Display name for an address, falling back to the address itself.
    pub fn display_name<'a>(&'a self, address: &'a str) -> &'a str {
        self.alias(address).unwrap_or(address)
    }

    /// Number of listed addresses, mapped or not.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no address is listed and no operator is set.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.operator.is_none()
    }

    /// Iterates `(address, name)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders a starter alias file listing every address, one per line,
    /// with no names filled in.
    ///
    /// ```
    /// use gchatlog::AliasMap;
    ///
    /// let text = AliasMap::template(["bob@x.com", "me@x.com"], Some("me@x.com"));
    /// let map = AliasMap::parse_str(&text).unwrap();
    ///
    /// assert_eq!(map.operator_self(), Some("me@x.com"));
    /// assert_eq!(map.display_name("bob@x.com"), "bob@x.com");
    /// ```
    pub fn template<'a, I>(addresses: I, operator: Option<&str>) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<String> = addresses.into_iter().map(normalize_address).collect();
        sorted.sort();
        sorted.dedup();

        let mut out = String::new();
        out.push_str("# gchatlog alias map\n");
        out.push_str("#\n");
        out.push_str("# Write a name after any address to show that name instead of the\n");
        out.push_str("# address in transcripts. Several addresses may share one name.\n");
        out.push_str("# Addresses left without a name are shown as they are.\n");
        out.push('\n');
        match operator {
            Some(op) => {
                let _ = writeln!(out, "{OPERATOR_KEY} {}", normalize_address(op));
            }
            None => {
                let _ = writeln!(out, "# {OPERATOR_KEY} you@example.com");
            }
        }
        out.push('\n');
        for address in sorted.iter().filter(|a| !a.is_empty()) {
            out.push_str(address);
            out.push('\n');
        }
        out
    }
}

impl FromStr for AliasMap {
    type Err = GchatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let map = AliasMap::parse_str(
            "# header\n\noperator_self Me@Gmail.com\nalice@gmail.com   Alice Smith\nbob@gmail.com\n",
        )
        .unwrap();

        assert_eq!(map.operator_self(), Some("me@gmail.com"));
        assert_eq!(map.display_name("alice@gmail.com"), "Alice Smith");
        assert_eq!(map.display_name("bob@gmail.com"), "bob@gmail.com");
        assert_eq!(map.display_name("carol@gmail.com"), "carol@gmail.com");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_keys_normalized() {
        let map = AliasMap::parse_str("Alice@Gmail.com/Talk\tAl\n").unwrap();
        assert_eq!(map.alias("alice@gmail.com"), Some("Al"));
    }

    #[test]
    fn test_non_injective() {
        let map = AliasMap::new()
            .with_alias("a@x.com", "Alice")
            .with_alias("alice@y.com", "Alice");
        assert_eq!(map.display_name("a@x.com"), map.display_name("alice@y.com"));
    }

    #[test]
    fn test_operator_without_address() {
        let err = AliasMap::parse_str("a@x.com A\noperator_self\n").unwrap_err();
        assert!(err.is_invalid_alias());
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_last_entry_wins() {
        let map = AliasMap::parse_str("a@x.com One\na@x.com Two\n").unwrap();
        assert_eq!(map.display_name("a@x.com"), "Two");
    }

    #[test]
    fn test_empty_map() {
        let map: AliasMap = "".parse().unwrap();
        assert!(map.is_empty());
        assert!(map.operator_self().is_none());
    }

    #[test]
    fn test_template_without_operator() {
        let text = AliasMap::template(["b@x.com", "A@x.com", "b@x.com"], None);
        assert!(text.contains("# operator_self"));
        let map = AliasMap::parse_str(&text).unwrap();
        assert!(map.operator_self().is_none());
        let listed: Vec<&str> = map.iter().map(|(a, _)| a).collect();
        assert_eq!(listed, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.txt");
        fs::write(&path, "operator_self me@x.com\nbob@x.com Bob\n").unwrap();

        let map = AliasMap::load(&path).unwrap();
        assert_eq!(map.operator_self(), Some("me@x.com"));
        assert_eq!(map.display_name("bob@x.com"), "Bob");
    }

    #[test]
    fn test_load_reports_path_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.txt");
        fs::write(&path, "bob@x.com Bob\noperator_self\n").unwrap();

        let err = AliasMap::load(&path).unwrap_err();
        assert!(err.is_parse());
        let display = err.to_string();
        assert!(display.contains("aliases.txt"));
        assert!(display.contains("line 2"));
    }

    #[test]
    fn test_load_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.txt");
        fs::write(&path, [b'a', 0xff, b'\n']).unwrap();

        let err = AliasMap::load(&path).unwrap_err();
        assert!(matches!(
            err,
            GchatError::Parse {
                source: ParseErrorKind::Encoding(_),
                ..
            }
        ));
    }

    #[test]
    fn test_load_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AliasMap::load(dir.path().join("nope.txt")).unwrap_err().is_io());
    }
}
