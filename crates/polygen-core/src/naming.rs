//! Candidate type names and case conversion.
//!
//! A [`TypeName`] is not a final identifier. It describes the names a type
//! would like to have, in priority order. The [`crate::name_resolver`] turns
//! a batch of them into unique identifiers.

use serde::{Deserialize, Serialize};

/// Candidate names attached to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeName {
    /// A single name. `/` separates path segments, e.g. `components/schemas/Pet`.
    Single(String),
    /// Fallbacks, the first viable one wins.
    Fallback(Vec<TypeName>),
    /// A nested name wrapped with an optional prefix and suffix.
    Modified {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<Box<TypeName>>,
        name: Box<TypeName>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<Box<TypeName>>,
    },
}

impl TypeName {
    pub fn modified(prefix: Option<TypeName>, name: TypeName, suffix: Option<TypeName>) -> Self {
        TypeName::Modified {
            prefix: prefix.map(Box::new),
            name: Box::new(name),
            suffix: suffix.map(Box::new),
        }
    }

    /// Raw candidates in priority order, each split into path segments.
    ///
    /// A path `schemas/a` yields `["a"]` before `["schemas", "a"]`.
    pub fn raw_candidates(&self) -> Vec<Vec<String>> {
        match self {
            TypeName::Single(value) => path_candidates(value),
            TypeName::Fallback(names) => names.iter().flat_map(|n| n.raw_candidates()).collect(),
            TypeName::Modified {
                prefix,
                name,
                suffix,
            } => {
                let prefixes = affixes(prefix.as_deref());
                let suffixes = affixes(suffix.as_deref());
                let mut out = Vec::new();
                for segments in name.raw_candidates() {
                    for p in &prefixes {
                        for s in &suffixes {
                            let mut combined = segments.clone();
                            if let Some(first) = combined.first_mut() {
                                first.insert_str(0, p);
                            }
                            if let Some(last) = combined.last_mut() {
                                last.push_str(s);
                            }
                            out.push(combined);
                        }
                    }
                }
                out
            }
        }
    }

    /// Every candidate formatted with [`prefixed_pascal_case`].
    pub fn candidates(&self) -> Vec<String> {
        self.raw_candidates()
            .iter()
            .map(|segments| format_segments(segments, false))
            .collect()
    }

    /// The preferred formatted name, if any candidate exists.
    pub fn primary(&self) -> Option<String> {
        self.candidates().into_iter().next()
    }

    /// True if both names share at least one formatted candidate.
    pub fn overlaps(&self, other: &TypeName) -> bool {
        let ours = self.candidates();
        other.candidates().iter().any(|c| ours.contains(c))
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        TypeName::Single(value.to_string())
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        TypeName::Single(value)
    }
}

fn path_candidates(value: &str) -> Vec<Vec<String>> {
    let parts: Vec<&str> = value.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Vec::new();
    }
    (0..parts.len())
        .rev()
        .map(|start| parts[start..].iter().map(|p| p.to_string()).collect())
        .collect()
}

fn affixes(name: Option<&TypeName>) -> Vec<String> {
    match name {
        None => vec![String::new()],
        Some(name) => {
            let joined: Vec<String> = name.raw_candidates().into_iter().map(|s| s.concat()).collect();
            if joined.is_empty() {
                vec![String::new()]
            } else {
                joined
            }
        }
    }
}

/// Join raw path segments into one identifier.
pub fn format_segments(segments: &[String], keep_punctuation: bool) -> String {
    if keep_punctuation {
        segments.concat()
    } else {
        segments.iter().map(|s| prefixed_pascal_case(s)).collect()
    }
}

/// PascalCase that keeps leading underscores and existing capitals.
///
/// # Examples
/// ```
/// use polygen_core::naming::prefixed_pascal_case;
/// assert_eq!(prefixed_pascal_case("pet"), "Pet");
/// assert_eq!(prefixed_pascal_case("_meta"), "_Meta");
/// assert_eq!(prefixed_pascal_case("my-http_client"), "MyHttpClient");
/// assert_eq!(prefixed_pascal_case("HTTPServer"), "HTTPServer");
/// assert_eq!(prefixed_pascal_case("aSUF"), "ASUF");
/// ```
pub fn prefixed_pascal_case(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let underscores = &name[..name.len() - trimmed.len()];
    let mut out = String::from(underscores);
    out.push_str(&to_pascal_case(trimmed));
    out
}

/// PascalCase conversion splitting on punctuation and whitespace.
///
/// Letters inside a word are preserved, so acronyms survive.
///
/// # Examples
/// ```
/// use polygen_core::naming::to_pascal_case;
/// assert_eq!(to_pascal_case("value"), "Value");
/// assert_eq!(to_pascal_case("ObjectMeta"), "ObjectMeta");
/// assert_eq!(to_pascal_case("item.kind"), "ItemKind");
/// ```
pub fn to_pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}
