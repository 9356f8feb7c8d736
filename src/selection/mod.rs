//! Test method selection
//!
//! Turns the host's raw method specification into the `Class#method`
//! patterns that apply to one class. The raw form names classes separated
//! by `,`, a class and its methods separated by `#`, and methods separated
//! by `+`:
//!
//! ```text
//! com.acme.FooTest#testA+testB,com.acme.BarTest
//! ```
//!
//! Method patterns are filesystem-glob style (`*`, `?`, `[...]`) and are
//! matched against the class's declared public methods. A malformed or
//! non-matching specification degrades to fewer patterns, never to a
//! failed run.

use globset::Glob;

use crate::discovery::TestClass;

/// A resolved test class plus the patterns that apply to it for this run.
/// An empty pattern list means the class contributes a no-op test set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    pub class: TestClass,
    pub patterns: Vec<String>,
}

impl TestUnit {
    /// Resolve the patterns for `class` from the raw specification.
    pub fn resolve(class: TestClass, raw_spec: Option<&str>) -> Self {
        let patterns = patterns_for_class(&class, raw_spec);
        Self { class, patterns }
    }

    pub fn is_noop(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Compute the `Class#method` patterns that apply to `class`.
///
/// - No specification (or a blank one): the bare class name; every
///   method runs.
/// - A specification that names the class without `#`: bare class name.
/// - A specification that names the class with `#`: one pattern per
///   declared public method whose name glob-matches any of the `+`
///   separated method patterns, each method listed once.
/// - A multi-class specification that does not mention the class at all:
///   no patterns (the class is skipped as a no-op test set).
pub fn patterns_for_class(class: &TestClass, raw_spec: Option<&str>) -> Vec<String> {
    let raw = match raw_spec.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return vec![class.name.clone()],
    };

    match method_segment_for(&class.name, raw) {
        MethodSegment::AllMethods => vec![class.name.clone()],
        MethodSegment::NotMentioned => Vec::new(),
        MethodSegment::Methods(method_spec) => {
            let method_patterns: Vec<&str> = method_spec
                .split('+')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();

            let mut patterns = Vec::new();
            for method in &class.public_methods {
                let matched = method_patterns.iter().any(|p| glob_matches(p, method));
                if matched {
                    let pattern = format!("{}#{}", class.name, method);
                    if !patterns.contains(&pattern) {
                        patterns.push(pattern);
                    }
                }
            }
            patterns
        }
    }
}

enum MethodSegment {
    /// The class runs every method
    AllMethods,
    /// The specification names other classes only
    NotMentioned,
    /// The `+`-separated method list for this class
    Methods(String),
}

/// Locate the part of the raw specification that belongs to `class_name`.
fn method_segment_for(class_name: &str, raw: &str) -> MethodSegment {
    if !raw.contains('#') && !raw.contains(',') {
        // A plain method string applies to every class.
        return MethodSegment::Methods(raw.to_string());
    }

    for segment in raw.split(',') {
        let segment = segment.trim();
        let (name, methods) = match segment.find('#') {
            Some(hash) => (&segment[..hash], Some(&segment[hash + 1..])),
            None => (segment, None),
        };
        if name == class_name {
            return match methods {
                Some(methods) => MethodSegment::Methods(methods.to_string()),
                None => MethodSegment::AllMethods,
            };
        }
    }

    MethodSegment::NotMentioned
}

/// Glob-match a method pattern against a method name. A pattern that does
/// not compile as a glob falls back to literal comparison.
fn glob_matches(pattern: &str, name: &str) -> bool {
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(name),
        Err(_) => pattern == name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo_test() -> TestClass {
        TestClass::new(
            "com.acme.FooTest",
            &["testA", "testB", "testCorner", "helperIgnored"],
        )
    }

    #[test]
    fn test_no_spec_runs_everything() {
        assert_eq!(
            patterns_for_class(&foo_test(), None),
            vec!["com.acme.FooTest"]
        );
        assert_eq!(
            patterns_for_class(&foo_test(), Some("  ")),
            vec!["com.acme.FooTest"]
        );
    }

    #[test]
    fn test_plain_method_string_applies_to_any_class() {
        assert_eq!(
            patterns_for_class(&foo_test(), Some("testA")),
            vec!["com.acme.FooTest#testA"]
        );
    }

    #[test]
    fn test_explicit_methods() {
        let patterns =
            patterns_for_class(&foo_test(), Some("com.acme.FooTest#testA+testB"));
        assert_eq!(
            patterns,
            vec!["com.acme.FooTest#testA", "com.acme.FooTest#testB"]
        );
    }

    #[test]
    fn test_multi_class_spec() {
        let raw = "com.acme.FooTest#testA+testB,com.acme.BarTest";
        let foo = patterns_for_class(&foo_test(), Some(raw));
        assert_eq!(
            foo,
            vec!["com.acme.FooTest#testA", "com.acme.FooTest#testB"]
        );

        let bar = TestClass::new("com.acme.BarTest", &["testX"]);
        assert_eq!(
            patterns_for_class(&bar, Some(raw)),
            vec!["com.acme.BarTest"]
        );
    }

    #[test]
    fn test_class_not_mentioned_yields_no_patterns() {
        let other = TestClass::new("com.acme.OtherTest", &["testX"]);
        let raw = "com.acme.FooTest#testA,com.acme.BarTest";
        assert!(patterns_for_class(&other, Some(raw)).is_empty());
    }

    #[test]
    fn test_wildcard_matching() {
        let patterns = patterns_for_class(&foo_test(), Some("com.acme.FooTest#test*"));
        assert_eq!(
            patterns,
            vec![
                "com.acme.FooTest#testA",
                "com.acme.FooTest#testB",
                "com.acme.FooTest#testCorner"
            ]
        );
    }

    #[test]
    fn test_question_mark_wildcard() {
        let patterns = patterns_for_class(&foo_test(), Some("com.acme.FooTest#test?"));
        assert_eq!(
            patterns,
            vec!["com.acme.FooTest#testA", "com.acme.FooTest#testB"]
        );
    }

    #[test]
    fn test_overlapping_patterns_list_once() {
        let patterns =
            patterns_for_class(&foo_test(), Some("com.acme.FooTest#test*+testA"));
        assert_eq!(
            patterns,
            vec![
                "com.acme.FooTest#testA",
                "com.acme.FooTest#testB",
                "com.acme.FooTest#testCorner"
            ]
        );
    }

    #[test]
    fn test_empty_method_list_is_noop() {
        assert!(patterns_for_class(&foo_test(), Some("com.acme.FooTest#")).is_empty());
    }

    #[test]
    fn test_no_matching_method_is_noop() {
        assert!(
            patterns_for_class(&foo_test(), Some("com.acme.FooTest#nothingHere")).is_empty()
        );
    }

    #[test]
    fn test_unit_resolve() {
        let unit = TestUnit::resolve(foo_test(), Some("com.acme.FooTest#missing"));
        assert!(unit.is_noop());

        let unit = TestUnit::resolve(foo_test(), None);
        assert!(!unit.is_noop());
        assert_eq!(unit.patterns, vec!["com.acme.FooTest"]);
    }
}
