//! Environment variable remapping.
//!
//! Providers read their configuration from fixed variable names, while the
//! host may supply those values under names of its own (per-profile
//! prefixes and the like). An [`EnvMapping`] copies each source variable to
//! its destination name once, before the provider is constructed.
//!
//! The mapping is evaluated by pure functions ([`EnvMapping::resolve`],
//! [`EnvMapping::apply_to`]); [`EnvMapping::apply`] is the only part that
//! touches the process environment.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One `source -> dest` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvMapEntry {
    pub source: String,
    pub dest: String,
}

impl EnvMapEntry {
    pub fn new(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Check both names are usable as environment variable names.
    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() || self.dest.is_empty() {
            return Err(Error::Config(format!(
                "env mapping '{self}' has an empty variable name"
            )));
        }
        if !is_valid_name(&self.source) || !is_valid_name(&self.dest) {
            return Err(Error::Config(format!(
                "env mapping '{self}' contains '=' or a NUL byte in a variable name"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EnvMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.source, self.dest)
    }
}

impl FromStr for EnvMapEntry {
    type Err = Error;

    /// Parses `SRC=DST`.
    fn from_str(s: &str) -> Result<Self> {
        let (source, dest) = s
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("env mapping '{s}' is not SRC=DST")))?;
        let entry = Self::new(source.trim(), dest.trim());
        entry.validate()?;
        Ok(entry)
    }
}

/// Ordered source-to-destination mapping, unique on the destination name.
///
/// Serialized as a list of entries. Deserialization validates every entry
/// and collapses duplicate destinations the way [`EnvMapping::insert`] does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EnvMapEntry>", into = "Vec<EnvMapEntry>")]
pub struct EnvMapping {
    entries: Vec<EnvMapEntry>,
}

impl EnvMapping {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a pair. A pair already writing to `dest` is replaced in place.
    pub fn insert(&mut self, source: impl Into<String>, dest: impl Into<String>) {
        let entry = EnvMapEntry::new(source, dest);
        if let Some(existing) = self.entries.iter_mut().find(|e| e.dest == entry.dest) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvMapEntry> {
        self.entries.iter()
    }

    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compute the `(dest, value)` assignments the mapping produces.
    ///
    /// Every source is looked up through `lookup`, so all reads see the
    /// environment as it was before any write. Unset sources produce no
    /// assignment; a source set to the empty string does.
    pub fn resolve<V, F>(&self, lookup: F) -> Vec<(String, V)>
    where
        F: Fn(&str) -> Option<V>,
    {
        self.entries
            .iter()
            .filter_map(|entry| lookup(&entry.source).map(|value| (entry.dest.clone(), value)))
            .collect()
    }

    /// Apply the mapping to an environment snapshot, returning the new one.
    pub fn apply_to(&self, env: &HashMap<String, String>) -> HashMap<String, String> {
        let mut next = env.clone();
        next.extend(self.resolve(|name| env.get(name).cloned()));
        next
    }

    /// Apply the mapping to the current process environment.
    ///
    /// Must run before any other thread is started: plugin binaries call it
    /// from `main` ahead of building the async runtime.
    pub fn apply(&self) {
        // Values stay as OsString so non-UTF-8 bytes are copied unchanged.
        let assignments: Vec<(String, OsString)> =
            self.resolve(|name: &str| std::env::var_os(name));
        for (dest, value) in assignments {
            if !is_valid_name(&dest) {
                warn!(dest = %dest, "Skipping environment mapping with invalid destination name");
                continue;
            }
            debug!(dest = %dest, "Applying environment mapping");
            // SAFETY: called during single-threaded startup, before the
            // runtime or any provider exists. `dest` is non-empty and free of
            // '=' and NUL, and values read from the environment hold no NUL.
            #[allow(unsafe_code)]
            unsafe {
                std::env::set_var(&dest, &value);
            }
        }
    }
}

impl TryFrom<Vec<EnvMapEntry>> for EnvMapping {
    type Error = Error;

    fn try_from(entries: Vec<EnvMapEntry>) -> Result<Self> {
        let mut mapping = Self::new();
        for entry in entries {
            entry.validate()?;
            mapping.insert(entry.source, entry.dest);
        }
        Ok(mapping)
    }
}

impl From<EnvMapping> for Vec<EnvMapEntry> {
    fn from(mapping: EnvMapping) -> Self {
        mapping.entries
    }
}

impl FromIterator<EnvMapEntry> for EnvMapping {
    fn from_iter<I: IntoIterator<Item = EnvMapEntry>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for entry in iter {
            mapping.insert(entry.source, entry.dest);
        }
        mapping
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '\0'])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn copies_source_over_existing_dest() {
        let mut mapping = EnvMapping::new();
        mapping.insert("ACME_FOO", "ACME_BAR");
        let next = mapping.apply_to(&env(&[("ACME_FOO", "test"), ("ACME_BAR", "old")]));
        assert_eq!(next.get("ACME_BAR").map(String::as_str), Some("test"));
        assert_eq!(next.get("ACME_FOO").map(String::as_str), Some("test"));
    }

    #[test]
    fn unset_source_leaves_dest_alone() {
        let mut mapping = EnvMapping::new();
        mapping.insert("ACME_MISSING", "ACME_BAR");
        let next = mapping.apply_to(&env(&[("ACME_BAR", "keep")]));
        assert_eq!(next.get("ACME_BAR").map(String::as_str), Some("keep"));
    }

    #[test]
    fn empty_source_overwrites_dest() {
        let mut mapping = EnvMapping::new();
        mapping.insert("ACME_EMPTY", "ACME_BAR");
        let next = mapping.apply_to(&env(&[("ACME_EMPTY", ""), ("ACME_BAR", "old")]));
        assert_eq!(next.get("ACME_BAR").map(String::as_str), Some(""));
    }

    #[test]
    fn reads_see_original_environment() {
        let mut mapping = EnvMapping::new();
        mapping.insert("A", "B");
        mapping.insert("B", "C");
        let next = mapping.apply_to(&env(&[("A", "from-a"), ("B", "from-b")]));
        assert_eq!(next.get("B").map(String::as_str), Some("from-a"));
        assert_eq!(next.get("C").map(String::as_str), Some("from-b"));
    }

    #[test]
    fn insert_is_unique_on_dest() {
        let mut mapping = EnvMapping::new();
        mapping.insert("ONE", "DST");
        mapping.insert("OTHER", "X");
        mapping.insert("TWO", "DST");
        assert_eq!(mapping.len(), 2);
        let entries: Vec<_> = mapping.iter().map(ToString::to_string).collect();
        assert_eq!(entries, vec!["TWO=DST", "OTHER=X"]);
    }

    #[test]
    fn parses_entry() {
        let entry: EnvMapEntry = "PROFILE_AWS_KEY=AWS_ACCESS_KEY_ID".parse().unwrap();
        assert_eq!(entry.source, "PROFILE_AWS_KEY");
        assert_eq!(entry.dest, "AWS_ACCESS_KEY_ID");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!("NOEQUALS".parse::<EnvMapEntry>().is_err());
        assert!("=DST".parse::<EnvMapEntry>().is_err());
        assert!("SRC=".parse::<EnvMapEntry>().is_err());
        assert!("SRC=A=B".parse::<EnvMapEntry>().is_err());
    }

    #[test]
    fn deserializes_from_list() {
        let mapping: EnvMapping =
            serde_json::from_str(r#"[{"source":"SRC","dest":"DST"}]"#).unwrap();
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn deserialize_keeps_last_entry_per_dest() {
        let mapping: EnvMapping = serde_json::from_str(
            r#"[{"source":"A","dest":"D"},{"source":"B","dest":"D"},{"source":"C","dest":"E"}]"#,
        )
        .unwrap();
        let entries: Vec<_> = mapping.iter().map(ToString::to_string).collect();
        assert_eq!(entries, vec!["B=D", "C=E"]);
    }

    #[test]
    fn deserialize_rejects_invalid_names() {
        let err = serde_json::from_str::<EnvMapping>(r#"[{"source":"X=Y","dest":""}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("empty variable name"), "{err}");
        assert!(
            serde_json::from_str::<EnvMapping>(r#"[{"source":"X=Y","dest":"Z"}]"#).is_err()
        );
    }

    #[test]
    fn serializes_as_entry_list() {
        let mapping: EnvMapping = [EnvMapEntry::new("SRC", "DST")].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&mapping).unwrap(),
            r#"[{"source":"SRC","dest":"DST"}]"#
        );
    }

    #[cfg(unix)]
    #[test]
    fn apply_copies_non_utf8_values_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        const SRC: &str = "DNSBRIDGE_ENV_TEST_RAW_SRC";
        const DST: &str = "DNSBRIDGE_ENV_TEST_RAW_DST";
        let raw = OsStr::from_bytes(b"zone-\xff\xfe");
        // SAFETY: these variable names are used by this test only.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var(SRC, raw);
        }

        let mapping: EnvMapping = [EnvMapEntry::new(SRC, DST)].into_iter().collect();
        mapping.apply();

        assert_eq!(std::env::var_os(DST).as_deref(), Some(raw));
    }

    #[test]
    fn apply_writes_process_environment() {
        const SRC: &str = "DNSBRIDGE_ENV_TEST_FOO";
        const DST: &str = "DNSBRIDGE_ENV_TEST_BAR";
        // SAFETY: these variable names are used by this test only.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var(SRC, "test");
            std::env::set_var(DST, "previous");
        }

        let mapping: EnvMapping = [EnvMapEntry::new(SRC, DST)].into_iter().collect();
        mapping.apply();

        assert_eq!(std::env::var(DST).unwrap(), "test");
    }
}
