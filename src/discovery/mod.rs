//! Test discovery boundary
//!
//! The host integration discovers test classes and supplies their
//! metadata: class identity plus declared public method names. This module
//! holds the value types and the two collaborator seams around them: the
//! checker that filters discovered classes and the policy that orders the
//! surviving ones for execution.

use serde::{Deserialize, Serialize};

/// A discovered test class: identity plus declared public methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClass {
    /// Fully-qualified class name
    pub name: String,

    /// Declared public method names, in declaration order
    pub public_methods: Vec<String>,
}

impl TestClass {
    pub fn new(name: impl Into<String>, public_methods: &[&str]) -> Self {
        Self {
            name: name.into(),
            public_methods: public_methods.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// The ordered collection of classes scheduled for this run
#[derive(Debug, Clone, Default)]
pub struct TestsToRun {
    classes: Vec<TestClass>,
}

impl TestsToRun {
    pub fn new(classes: Vec<TestClass>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[TestClass] {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestClass> {
        self.classes.iter()
    }
}

/// Decides whether a discovered class is a runnable test class
pub trait TestChecker {
    fn accepts(&self, class: &TestClass) -> bool;
}

/// Keep the discovered classes the checker accepts, preserving order.
pub fn apply_filter(checker: &dyn TestChecker, discovered: Vec<TestClass>) -> TestsToRun {
    TestsToRun::new(
        discovered
            .into_iter()
            .filter(|c| checker.accepts(c))
            .collect(),
    )
}

/// Default checker: a test class has at least one public method and a
/// name ending in `Test` or `Tests`.
pub struct DefaultTestChecker;

impl TestChecker for DefaultTestChecker {
    fn accepts(&self, class: &TestClass) -> bool {
        if class.public_methods.is_empty() {
            return false;
        }
        let simple = class.name.rsplit('.').next().unwrap_or(&class.name);
        simple.ends_with("Test") || simple.ends_with("Tests")
    }
}

/// Orders test classes for execution
pub trait RunOrderPolicy {
    fn order(&self, classes: Vec<TestClass>) -> Vec<TestClass>;
}

/// Run classes in the order they were discovered
pub struct DeclaredOrder;

impl RunOrderPolicy for DeclaredOrder {
    fn order(&self, classes: Vec<TestClass>) -> Vec<TestClass> {
        classes
    }
}

/// Run classes in stable alphabetical order
pub struct AlphabeticalOrder;

impl RunOrderPolicy for AlphabeticalOrder {
    fn order(&self, mut classes: Vec<TestClass>) -> Vec<TestClass> {
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_checker() {
        let checker = DefaultTestChecker;
        assert!(checker.accepts(&TestClass::new("com.acme.FooTest", &["testA"])));
        assert!(checker.accepts(&TestClass::new("com.acme.FooTests", &["testA"])));
        assert!(!checker.accepts(&TestClass::new("com.acme.Helper", &["run"])));
        assert!(!checker.accepts(&TestClass::new("com.acme.EmptyTest", &[])));
    }

    #[test]
    fn test_apply_filter_preserves_order() {
        let discovered = vec![
            TestClass::new("com.acme.ZTest", &["a"]),
            TestClass::new("com.acme.Helper", &["a"]),
            TestClass::new("com.acme.ATest", &["a"]),
        ];
        let to_run = apply_filter(&DefaultTestChecker, discovered);
        let names: Vec<_> = to_run.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["com.acme.ZTest", "com.acme.ATest"]);
    }

    #[test]
    fn test_alphabetical_order() {
        let classes = vec![
            TestClass::new("com.acme.ZTest", &["a"]),
            TestClass::new("com.acme.ATest", &["a"]),
        ];
        let ordered = AlphabeticalOrder.order(classes);
        assert_eq!(ordered[0].name, "com.acme.ATest");
    }
}
