//! Declarative element locators
//!
//! A `LocatorTarget` names a UI element ("email field") and lists the
//! strategies that may find it, most precise first. Targets are immutable once
//! built; the catalog lives in `platform::targets`.

use std::fmt;

/// Query understood by every driver backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum By {
    Css(String),
    XPath(String),
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::Css(s) => write!(f, "css={}", s),
            By::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// One concrete way of finding an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `name` attribute match
    Name(String),
    /// `id` attribute match
    Id(String),
    Css(String),
    XPath(String),
    /// Position within the document-ordered list of `tag` elements
    Nth { tag: String, index: usize },
}

impl Locator {
    pub fn name(value: &str) -> Self {
        Locator::Name(value.to_string())
    }

    pub fn id(value: &str) -> Self {
        Locator::Id(value.to_string())
    }

    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Locator::XPath(expr.to_string())
    }

    pub fn nth(tag: &str, index: usize) -> Self {
        Locator::Nth {
            tag: tag.to_string(),
            index,
        }
    }

    /// Driver query returning the candidate list for this strategy
    pub fn query(&self) -> By {
        match self {
            Locator::Name(v) => By::Css(format!("[name='{}']", v)),
            Locator::Id(v) => By::Css(format!("[id='{}']", v)),
            Locator::Css(s) => By::Css(s.clone()),
            Locator::XPath(x) => By::XPath(x.clone()),
            Locator::Nth { tag, .. } => By::Css(tag.clone()),
        }
    }

    /// Only the candidate at this index counts; `None` means any candidate
    pub fn position(&self) -> Option<usize> {
        match self {
            Locator::Nth { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(x) => write!(f, "xpath={}", x),
            Locator::Nth { tag, index } => write!(f, "{}[{}]", tag, index),
        }
    }
}

/// What a candidate must satisfy to count as resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Exists in the DOM
    Present,
    /// Displayed and not disabled
    Interactable,
}

#[derive(Debug, Clone)]
pub struct LocatorTarget {
    name: String,
    strategies: Vec<Locator>,
    requirement: Requirement,
}

impl LocatorTarget {
    pub fn new(name: &str, requirement: Requirement, strategies: Vec<Locator>) -> Self {
        Self {
            name: name.to_string(),
            strategies,
            requirement,
        }
    }

    /// Target for a control the bot will click or type into
    pub fn interactable(name: &str, strategies: Vec<Locator>) -> Self {
        Self::new(name, Requirement::Interactable, strategies)
    }

    /// Target that only has to exist (indicators, read-only text)
    pub fn present(name: &str, strategies: Vec<Locator>) -> Self {
        Self::new(name, Requirement::Present, strategies)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategies(&self) -> &[Locator] {
        &self.strategies
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn describe_strategies(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_locators_become_css() {
        assert_eq!(Locator::name("email").query(), By::Css("[name='email']".into()));
        assert_eq!(Locator::id("password").query(), By::Css("[id='password']".into()));
        assert_eq!(Locator::nth("input", 1).query(), By::Css("input".into()));
        assert_eq!(Locator::nth("input", 1).position(), Some(1));
        assert_eq!(Locator::xpath("//button").position(), None);
    }

    #[test]
    fn test_target_describes_strategies_in_order() {
        let target = LocatorTarget::interactable(
            "email field",
            vec![Locator::name("email"), Locator::id("email"), Locator::nth("input", 0)],
        );
        assert_eq!(
            target.describe_strategies(),
            vec!["name=email", "id=email", "input[0]"]
        );
        assert_eq!(target.requirement(), Requirement::Interactable);
    }
}
