//! Login state machine
//!
//! ```text
//! Unauthenticated -> ChallengePending -> CredentialsEntry -> Submitting
//!        \________________________________^                    |
//!                                                       VerifyingSuccess
//!                                                        /          \
//!                                               Authenticated      Failed
//! ```
//!
//! States only move forward; `Failed -> Unauthenticated` is the single way
//! back, taken when the flow is retried. Verification succeeds on the first
//! positive signal in priority order.

use super::account;
use super::targets;
use crate::browser::{DelayRange, ElementResolver, Session};
use crate::config::Config;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use crate::paths;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    ChallengePending,
    CredentialsEntry,
    Submitting,
    VerifyingSuccess,
    Authenticated,
    Failed,
}

impl AuthState {
    fn rank(&self) -> u8 {
        match self {
            AuthState::Unauthenticated => 0,
            AuthState::ChallengePending => 1,
            AuthState::CredentialsEntry => 2,
            AuthState::Submitting => 3,
            AuthState::VerifyingSuccess => 4,
            AuthState::Authenticated | AuthState::Failed => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Failed)
    }

    /// Forward moves, failure from any live state, and the retry reset
    pub fn can_transition_to(&self, next: AuthState) -> bool {
        match (self, next) {
            (AuthState::Failed, AuthState::Unauthenticated) => true,
            (from, _) if from.is_terminal() => false,
            (_, AuthState::Failed) => true,
            (from, to) => to.rank() > from.rank(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::ChallengePending => "challenge pending",
            AuthState::CredentialsEntry => "entering credentials",
            AuthState::Submitting => "submitting",
            AuthState::VerifyingSuccess => "verifying",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence that the login went through, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    BalanceIndicator,
    ProfileIndicator,
    TradingSurface,
    LeftLoginPage,
}

impl AuthSignal {
    pub const PRIORITY: [AuthSignal; 4] = [
        AuthSignal::BalanceIndicator,
        AuthSignal::ProfileIndicator,
        AuthSignal::TradingSurface,
        AuthSignal::LeftLoginPage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthSignal::BalanceIndicator => "balance indicator",
            AuthSignal::ProfileIndicator => "profile indicator",
            AuthSignal::TradingSurface => "trading surface",
            AuthSignal::LeftLoginPage => "left login page",
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        let auth = &config.auth;
        if auth.email.trim().is_empty() || auth.password.is_empty() {
            return None;
        }
        Some(Self::new(auth.email.trim(), &auth.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub login_url: String,
    pub login_url_markers: Vec<String>,
    /// Verification window after submit
    pub timeout: Duration,
    /// Resolve timeout for each login form control
    pub field_timeout: Duration,
    pub challenge_title_markers: Vec<String>,
    pub challenge_body_markers: Vec<String>,
    pub challenge_wait: Duration,
    pub challenge_max_checks: u32,
    pub settle: DelayRange,
    pub dismiss_cookie_banner: bool,
    pub debug_screenshots: bool,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.platform.login_url(),
            login_url_markers: config.platform.login_url_markers.clone(),
            timeout: Duration::from_secs(config.auth.timeout_secs),
            field_timeout: Duration::from_secs(config.browser.element_timeout_secs),
            challenge_title_markers: config.auth.challenge_title_markers.clone(),
            challenge_body_markers: config.auth.challenge_body_markers.clone(),
            challenge_wait: Duration::from_secs(config.auth.challenge_wait_secs),
            challenge_max_checks: config.auth.challenge_max_checks,
            settle: DelayRange::from_secs(config.auth.settle_min_secs, config.auth.settle_max_secs),
            dismiss_cookie_banner: config.auth.dismiss_cookie_banner,
            debug_screenshots: config.auth.debug_screenshots,
        }
    }
}

/// Result of one login attempt
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub state: AuthState,
    pub signal: Option<AuthSignal>,
    pub error: Option<String>,
}

pub struct AuthenticationFlow {
    settings: AuthSettings,
    resolver: ElementResolver,
    state: AuthState,
    signal: Option<AuthSignal>,
    last_error: Option<String>,
    history: Vec<AuthState>,
}

impl AuthenticationFlow {
    pub fn new(settings: AuthSettings, resolver: ElementResolver) -> Self {
        Self {
            settings,
            resolver,
            state: AuthState::Unauthenticated,
            signal: None,
            last_error: None,
            history: vec![AuthState::Unauthenticated],
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Signal that confirmed the last successful login
    pub fn signal(&self) -> Option<AuthSignal> {
        self.signal
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[AuthState] {
        &self.history
    }

    pub fn outcome(&self) -> AuthOutcome {
        AuthOutcome {
            authenticated: self.state == AuthState::Authenticated,
            state: self.state,
            signal: self.signal,
            error: self.last_error.clone(),
        }
    }

    fn advance(&mut self, next: AuthState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            logger::warning(
                LogTag::Auth,
                &format!("Ignoring auth transition {} -> {}", self.state, next),
            );
            return;
        }
        logger::debug(LogTag::Auth, &format!("{} -> {}", self.state, next));
        self.state = next;
        self.history.push(next);
    }

    /// Log in; `true` only when a success signal was observed
    pub async fn login(&mut self, session: &mut Session, credentials: &Credentials) -> bool {
        if self.state == AuthState::Authenticated && session.is_authenticated() {
            return true;
        }
        if self.state == AuthState::Failed {
            self.advance(AuthState::Unauthenticated);
        }
        self.signal = None;
        self.last_error = None;

        let result = self.run(session, credentials).await;
        if let Err(e) = result {
            logger::warning(LogTag::Auth, &format!("Login failed: {}", e));
            self.last_error = Some(e.to_string());
            self.advance(AuthState::Failed);
        }

        if self.settings.debug_screenshots {
            self.capture(session, "login_result").await;
        }

        let ok = self.state == AuthState::Authenticated;
        session.set_authenticated(ok);
        ok
    }

    async fn run(&mut self, session: &Session, credentials: &Credentials) -> BotResult<()> {
        logger::info(
            LogTag::Auth,
            &format!("Opening login page {}", self.settings.login_url),
        );
        session.goto(&self.settings.login_url).await?;
        session.pacing().action_pause().await;

        self.wait_out_challenge(session).await?;

        if self.settings.dismiss_cookie_banner {
            account::dismiss_cookie_banner(session, &self.resolver).await;
        }

        let email = self
            .resolver
            .resolve(session, &targets::EMAIL_FIELD, self.settings.field_timeout)
            .await?;
        self.advance(AuthState::CredentialsEntry);

        let driver = session.driver()?;
        let pacing = session.pacing();
        pacing
            .type_text(driver, email.element, &credentials.email)
            .await?;
        pacing.action_pause().await;

        let password = self
            .resolver
            .resolve(session, &targets::PASSWORD_FIELD, self.settings.field_timeout)
            .await?;
        pacing
            .type_text(driver, password.element, &credentials.password)
            .await?;
        pacing.action_pause().await;

        let submit = self
            .resolver
            .resolve(session, &targets::LOGIN_SUBMIT, self.settings.field_timeout)
            .await?;
        if self.settings.debug_screenshots {
            self.capture(session, "login_before_submit").await;
        }
        driver.click(submit.element).await?;
        self.advance(AuthState::Submitting);
        logger::info(LogTag::Auth, "Credentials submitted, waiting for the page to settle");

        pacing.pause(self.settings.settle).await;
        self.advance(AuthState::VerifyingSuccess);

        let signal = self.verify(session).await?;
        self.signal = Some(signal);
        self.advance(AuthState::Authenticated);
        logger::info(
            LogTag::Auth,
            &format!("Login confirmed by {}", signal.as_str()),
        );
        Ok(())
    }

    /// Re-check an anti-bot interstitial until it clears or the checks run out
    async fn wait_out_challenge(&mut self, session: &Session) -> BotResult<()> {
        let mut checks = 0u32;
        while self.challenge_present(session).await? {
            if checks >= self.settings.challenge_max_checks {
                let waited = self.settings.challenge_wait.as_secs() * checks as u64;
                return Err(BotError::ChallengeTimeout { seconds: waited });
            }
            self.advance(AuthState::ChallengePending);
            logger::info(
                LogTag::Auth,
                &format!(
                    "Anti-bot challenge detected, waiting {}s (check {}/{})",
                    self.settings.challenge_wait.as_secs(),
                    checks + 1,
                    self.settings.challenge_max_checks
                ),
            );
            tokio::time::sleep(self.settings.challenge_wait).await;
            checks += 1;
        }
        Ok(())
    }

    async fn challenge_present(&self, session: &Session) -> BotResult<bool> {
        let driver = session.driver()?;
        let title = driver.title().await?;
        if self
            .settings
            .challenge_title_markers
            .iter()
            .any(|m| title.contains(m.as_str()))
        {
            return Ok(true);
        }
        let source = driver.page_source().await?;
        Ok(self
            .settings
            .challenge_body_markers
            .iter()
            .any(|m| source.contains(m.as_str())))
    }

    /// Poll the success signals in priority order until one holds or time runs out
    async fn verify(&self, session: &Session) -> BotResult<AuthSignal> {
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            for signal in AuthSignal::PRIORITY {
                if self.signal_present(session, signal).await {
                    return Ok(signal);
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(BotError::AuthenticationFailed(format!(
                    "no login confirmation within {}s",
                    self.settings.timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.resolver.poll_interval().min(deadline - now)).await;
        }
    }

    async fn signal_present(&self, session: &Session, signal: AuthSignal) -> bool {
        let target = match signal {
            AuthSignal::BalanceIndicator => &*targets::BALANCE_INDICATOR,
            AuthSignal::ProfileIndicator => &*targets::PROFILE_INDICATOR,
            AuthSignal::TradingSurface => &*targets::TRADING_SURFACE,
            AuthSignal::LeftLoginPage => {
                return match session.driver() {
                    Ok(driver) => match driver.current_url().await {
                        Ok(url) => !self
                            .settings
                            .login_url_markers
                            .iter()
                            .any(|m| url.contains(m.as_str())),
                        Err(_) => false,
                    },
                    Err(_) => false,
                };
            }
        };
        matches!(self.resolver.probe(session, target).await, Ok(Some(_)))
    }

    async fn capture(&self, session: &Session, label: &str) {
        let path = paths::screenshot_path(label, chrono::Utc::now().timestamp());
        if let Err(e) = session.save_screenshot(&path).await {
            logger::debug(LogTag::Auth, &format!("Debug screenshot failed: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{ready_session, FakeDriver, FakeElement};
    use crate::browser::Locator;

    const LOGIN_URL: &str = "https://platform.test/sign-in";

    fn settings() -> AuthSettings {
        AuthSettings {
            login_url: LOGIN_URL.to_string(),
            login_url_markers: vec!["/sign-in".to_string(), "/login".to_string()],
            timeout: Duration::from_secs(30),
            field_timeout: Duration::from_secs(4),
            challenge_title_markers: vec!["Just a moment".to_string()],
            challenge_body_markers: vec!["Checking your browser".to_string()],
            challenge_wait: Duration::from_secs(15),
            challenge_max_checks: 2,
            settle: DelayRange::from_secs(10, 15),
            dismiss_cookie_banner: false,
            debug_screenshots: false,
        }
    }

    fn login_form(driver: &FakeDriver) {
        driver.add(FakeElement::new("email", "input").matches(&Locator::name("email")));
        driver.add(FakeElement::new("password", "input").matches(&Locator::name("password")));
        driver.add(
            FakeElement::new("submit", "button").matches(&Locator::xpath("//button[@type='submit']")),
        );
    }

    fn balance(driver: &FakeDriver, after: Duration) {
        driver.add(
            FakeElement::new("balance", "div")
                .matches(&Locator::css(".balance"))
                .text("$1,000.00")
                .appears_after(after),
        );
    }

    fn creds() -> Credentials {
        Credentials::new("op@example.com", "s3cret")
    }

    #[test]
    fn test_transitions_only_move_forward() {
        use AuthState::*;
        assert!(Unauthenticated.can_transition_to(ChallengePending));
        assert!(Unauthenticated.can_transition_to(CredentialsEntry));
        assert!(VerifyingSuccess.can_transition_to(Authenticated));
        assert!(Submitting.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Unauthenticated));
        assert!(!CredentialsEntry.can_transition_to(ChallengePending));
        assert!(!Authenticated.can_transition_to(Unauthenticated));
        assert!(!Failed.can_transition_to(Authenticated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_fills_form_and_confirms_on_balance() {
        let driver = FakeDriver::new();
        login_form(&driver);
        balance(&driver, Duration::from_secs(11));
        let mut session = ready_session(driver.clone());

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(flow.login(&mut session, &creds()).await);

        assert_eq!(flow.state(), AuthState::Authenticated);
        assert_eq!(flow.signal(), Some(AuthSignal::BalanceIndicator));
        assert!(session.is_authenticated());
        assert_eq!(driver.typed_into("email"), "op@example.com");
        assert_eq!(driver.typed_into("password"), "s3cret");
        assert!(driver.actions().contains(&"click:submit".to_string()));
        assert_eq!(
            flow.history(),
            &[
                AuthState::Unauthenticated,
                AuthState::CredentialsEntry,
                AuthState::Submitting,
                AuthState::VerifyingSuccess,
                AuthState::Authenticated,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_available_signal_wins() {
        // URL leaves the login page at 12s, balance shows up at 20s
        let driver = FakeDriver::new();
        login_form(&driver);
        balance(&driver, Duration::from_secs(20));
        driver.url_after(Duration::from_secs(12), "https://platform.test/trading/EURUSD");
        let mut session = ready_session(driver);

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(flow.login(&mut session, &creds()).await);
        assert_eq!(flow.signal(), Some(AuthSignal::LeftLoginPage));

        // both present at once: priority order decides
        let driver = FakeDriver::new();
        login_form(&driver);
        balance(&driver, Duration::from_secs(12));
        driver.url_after(Duration::from_secs(12), "https://platform.test/trading/EURUSD");
        let mut session = ready_session(driver);

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(flow.login(&mut session, &creds()).await);
        assert_eq!(flow.signal(), Some(AuthSignal::BalanceIndicator));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_before_timeout_fails() {
        let driver = FakeDriver::new();
        login_form(&driver);
        let mut session = ready_session(driver);

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(!flow.login(&mut session, &creds()).await);
        assert_eq!(flow.state(), AuthState::Failed);
        assert!(!session.is_authenticated());
        assert!(flow.outcome().error.is_some());

        // retry goes back through Unauthenticated
        assert!(!flow.login(&mut session, &creds()).await);
        let resets = flow
            .history()
            .iter()
            .filter(|s| **s == AuthState::Unauthenticated)
            .count();
        assert_eq!(resets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_clears_then_login_proceeds() {
        let driver = FakeDriver::new();
        login_form(&driver);
        driver.set_title("Just a moment...");
        driver.title_after(Duration::from_secs(10), "Platform");
        balance(&driver, Duration::from_secs(20));
        let mut session = ready_session(driver);

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(flow.login(&mut session, &creds()).await);
        assert_eq!(flow.history()[1], AuthState::ChallengePending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_challenge_times_out() {
        let driver = FakeDriver::new();
        login_form(&driver);
        driver.set_source("<p>Checking your browser before accessing</p>");
        let mut session = ready_session(driver.clone());

        let mut flow = AuthenticationFlow::new(settings(), ElementResolver::default());
        assert!(!flow.login(&mut session, &creds()).await);
        assert_eq!(flow.state(), AuthState::Failed);
        assert!(flow
            .outcome()
            .error
            .unwrap_or_default()
            .contains("challenge"));
        assert_eq!(driver.typed_into("email"), "");
    }
}
