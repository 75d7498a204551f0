//! Payload classification.
//!
//! A payload is *structured* when it contains the marker `LPA` (any case) and
//! splits on `$` into at least three segments whose last one is non-empty
//! after trimming. The trailing segment, sanitised to `[A-Za-z0-9_-]`, becomes
//! the stable identifier. Nothing else about the payload is checked.

use crate::storage::CacheKey;

const MARKER: &str = "LPA";
const DELIMITER: char = '$';
const MIN_SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Structured { identifier: String },
    Unstructured,
}

impl Classification {
    pub fn is_structured(&self) -> bool {
        matches!(self, Classification::Structured { .. })
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Classification::Structured { identifier } => Some(identifier),
            Classification::Unstructured => None,
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        match self {
            Classification::Structured { identifier } => CacheKey::Stable(identifier.clone()),
            Classification::Unstructured => CacheKey::Volatile,
        }
    }
}

pub fn classify(payload: &str) -> Classification {
    if !payload.to_ascii_uppercase().contains(MARKER) {
        return Classification::Unstructured;
    }

    let segments: Vec<&str> = payload.split(DELIMITER).collect();
    if segments.len() < MIN_SEGMENTS {
        return Classification::Unstructured;
    }

    let trailing = segments[segments.len() - 1].trim();
    if trailing.is_empty() {
        return Classification::Unstructured;
    }

    Classification::Structured { identifier: sanitize(trailing) }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with one `_` per UTF-16
/// code unit, so astral characters such as emoji become `__`.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push_str(&"_".repeat(c.len_utf16()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    #[test_case("LPA:1$SMDP$TEST_CODE", "TEST_CODE")]
    #[test_case("lpa:1$rsp.example.com$ ABC-123 ", "ABC-123")]
    #[test_case("LPA:1$smdp.io$a.b/c d", "a_b_c_d")]
    #[test_case("LPA:1$$$X", "X")]
    #[test_case("xxlpaxx$a$b", "b")]
    #[test_case("LPA:1$SMDP$Ünï", "_n_")]
    #[test_case("LPA:1$SMDP$GO🌎2", "GO__2")]
    fn test_structured(payload: &str, identifier: &str) {
        let class = classify(payload);
        assert!(class.is_structured());
        assert_eq!(class.identifier(), Some(identifier));
        assert_eq!(class.cache_key(), CacheKey::Stable(identifier.to_string()));
    }

    #[test_case("https://example.com" ; "no marker")]
    #[test_case("LPA:1$SMDP" ; "two segments")]
    #[test_case("LPA:1$SMDP$" ; "empty trailing")]
    #[test_case("LPA:1$SMDP$   " ; "blank trailing")]
    #[test_case("A$B$C" ; "segments without marker")]
    #[test_case("L P A$x$y" ; "broken marker")]
    fn test_unstructured(payload: &str) {
        let class = classify(payload);
        assert_eq!(class, Classification::Unstructured);
        assert_eq!(class.identifier(), None);
        assert_eq!(class.cache_key(), CacheKey::Volatile);
    }

    proptest! {
        #[test]
        fn proptest_structured_identifier_charset(
            head in "[^$]*",
            mid in "[^$]*",
            tail in "[^$]*[A-Za-z0-9][^$]*",
        ) {
            let payload = format!("LPA:{head}${mid}${tail}");
            let class = classify(&payload);
            let id = class.identifier().map(str::to_string);
            prop_assert!(id.is_some());
            let id = id.unwrap_or_default();
            prop_assert!(!id.is_empty());
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }

        #[test]
        fn proptest_markerless_is_unstructured(payload in "[^lLaA]*") {
            prop_assert_eq!(classify(&payload), Classification::Unstructured);
        }

        #[test]
        fn proptest_few_delimiters_is_unstructured(a in "[^$]*", b in "[^$]*") {
            let single = format!("LPA{a}");
            let double = format!("LPA{a}${b}");
            prop_assert_eq!(classify(&single), Classification::Unstructured);
            prop_assert_eq!(classify(&double), Classification::Unstructured);
        }
    }
}
