//! Ordered multi-strategy element resolution
//!
//! `resolve` walks a target's strategies in declaration order. Each strategy
//! gets an equal share of the timeout (at least one probe) and is polled until
//! a candidate meets the target's requirement. The first strategy that
//! produces one wins, so the same DOM always resolves through the same
//! strategy.

use super::driver::{Driver, ElementId};
use super::locator::{Locator, LocatorTarget, Requirement};
use super::session::Session;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub element: ElementId,
    /// Index of the winning strategy within the target
    pub strategy_index: usize,
    pub strategy: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ElementResolver {
    poll_interval: Duration,
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ElementResolver {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub async fn resolve(
        &self,
        session: &Session,
        target: &LocatorTarget,
        timeout: Duration,
    ) -> BotResult<ResolvedElement> {
        let driver = session.driver()?;
        let strategies = target.strategies();
        let share = if strategies.is_empty() {
            Duration::ZERO
        } else {
            timeout / strategies.len() as u32
        };

        for (index, locator) in strategies.iter().enumerate() {
            let deadline = Instant::now() + share;
            loop {
                if let Some(element) = probe_locator(driver, locator, target.requirement()).await {
                    logger::debug(
                        LogTag::Resolver,
                        &format!(
                            "'{}' resolved via strategy {} ({})",
                            target.name(),
                            index,
                            locator
                        ),
                    );
                    return Ok(ResolvedElement {
                        element,
                        strategy_index: index,
                        strategy: locator.to_string(),
                    });
                }

                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            }
            logger::verbose(
                LogTag::Resolver,
                &format!("'{}': strategy {} ({}) gave up", target.name(), index, locator),
            );
        }

        logger::debug(
            LogTag::Resolver,
            &format!("'{}' not found after {} strategies", target.name(), strategies.len()),
        );
        Err(BotError::LocatorNotFound {
            target: target.name().to_string(),
            attempted: target.describe_strategies(),
        })
    }

    /// Single non-waiting pass over every strategy
    pub async fn probe(
        &self,
        session: &Session,
        target: &LocatorTarget,
    ) -> BotResult<Option<ResolvedElement>> {
        let driver = session.driver()?;
        for (index, locator) in target.strategies().iter().enumerate() {
            if let Some(element) = probe_locator(driver, locator, target.requirement()).await {
                return Ok(Some(ResolvedElement {
                    element,
                    strategy_index: index,
                    strategy: locator.to_string(),
                }));
            }
        }
        Ok(None)
    }
}

/// First candidate of `locator` satisfying `requirement`, in document order
async fn probe_locator(
    driver: &dyn Driver,
    locator: &Locator,
    requirement: Requirement,
) -> Option<ElementId> {
    let candidates = match driver.find_all(&locator.query()).await {
        Ok(found) => found,
        Err(e) => {
            logger::verbose(LogTag::Resolver, &format!("{} probe failed: {}", locator, e));
            return None;
        }
    };

    let candidates: Vec<ElementId> = match locator.position() {
        Some(index) => candidates.get(index).copied().into_iter().collect(),
        None => candidates,
    };

    for element in candidates {
        if meets(driver, element, requirement).await {
            return Some(element);
        }
    }
    None
}

async fn meets(driver: &dyn Driver, element: ElementId, requirement: Requirement) -> bool {
    match requirement {
        Requirement::Present => true,
        Requirement::Interactable => {
            matches!(driver.is_displayed(element).await, Ok(true))
                && matches!(driver.is_enabled(element).await, Ok(true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{ready_session, FakeDriver, FakeElement};

    fn email_target() -> LocatorTarget {
        LocatorTarget::interactable(
            "email field",
            vec![
                Locator::name("email"),
                Locator::id("email"),
                Locator::xpath("//input[@type='email']"),
                Locator::nth("input", 0),
            ],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_strategy_wins_when_several_match() {
        let driver = FakeDriver::new();
        driver.add(FakeElement::new("by-id", "input").matches(&Locator::id("email")));
        driver.add(
            FakeElement::new("by-xpath", "input").matches(&Locator::xpath("//input[@type='email']")),
        );
        let session = ready_session(driver.clone());
        let resolver = ElementResolver::default();

        let first = resolver
            .resolve(&session, &email_target(), Duration::from_secs(4))
            .await
            .unwrap();
        assert_eq!(first.strategy_index, 1);
        assert_eq!(first.element, driver.id_of("by-id"));

        // same DOM, same answer
        for _ in 0..3 {
            let again = resolver
                .resolve(&session, &email_target(), Duration::from_secs(4))
                .await
                .unwrap();
            assert_eq!(again, first);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_positional_fallback_and_interactable_filter() {
        let driver = FakeDriver::new();
        driver.add(FakeElement::new("first-input", "input"));
        driver.add(
            FakeElement::new("hidden-email", "input")
                .matches(&Locator::name("email"))
                .hidden(),
        );
        let session = ready_session(driver.clone());

        let resolved = ElementResolver::default()
            .resolve(&session, &email_target(), Duration::from_secs(4))
            .await
            .unwrap();
        // name=email exists but is hidden, so only input[0] qualifies
        assert_eq!(resolved.strategy_index, 3);
        assert_eq!(resolved.element, driver.id_of("first-input"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempted_strategies() {
        let driver = FakeDriver::new();
        driver.add(
            FakeElement::new("disabled", "input")
                .matches(&Locator::name("email"))
                .disabled(),
        );
        let session = ready_session(driver);

        let target = LocatorTarget::interactable(
            "email field",
            vec![Locator::name("email"), Locator::id("email")],
        );
        let start = Instant::now();
        let err = ElementResolver::default()
            .resolve(&session, &target, Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(Instant::now() - start >= Duration::from_secs(2));
        match err {
            BotError::LocatorNotFound { target, attempted } => {
                assert_eq!(target, "email field");
                assert_eq!(attempted, vec!["name=email", "id=email"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_late_element_within_share() {
        let driver = FakeDriver::new();
        driver.add(
            FakeElement::new("late", "input")
                .matches(&Locator::name("email"))
                .appears_after(Duration::from_millis(700)),
        );
        driver.add(FakeElement::new("fallback", "input").matches(&Locator::id("email")));
        let session = ready_session(driver.clone());

        let target = LocatorTarget::interactable(
            "email field",
            vec![Locator::name("email"), Locator::id("email")],
        );
        let resolved = ElementResolver::default()
            .resolve(&session, &target, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(resolved.strategy_index, 0);
        assert_eq!(resolved.element, driver.id_of("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_still_probes_once() {
        let driver = FakeDriver::new();
        driver.add(FakeElement::new("email", "input").matches(&Locator::id("email")));
        let session = ready_session(driver);

        let resolved = ElementResolver::default()
            .resolve(&session, &email_target(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(resolved.strategy_index, 1);
    }
}
