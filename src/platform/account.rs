//! Account-level page helpers: cookie banner and demo switch

use super::targets;
use crate::browser::{ElementResolver, Session};
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use std::time::Duration;

const COOKIE_BANNER_TIMEOUT: Duration = Duration::from_secs(3);

/// Click "Accept" on a cookie banner if one shows up; never fails
pub async fn dismiss_cookie_banner(session: &Session, resolver: &ElementResolver) -> bool {
    let Ok(found) = resolver
        .resolve(session, &targets::COOKIE_ACCEPT, COOKIE_BANNER_TIMEOUT)
        .await
    else {
        return false;
    };
    let Ok(driver) = session.driver() else {
        return false;
    };

    match driver.click(found.element).await {
        Ok(()) => {
            logger::debug(LogTag::Auth, "Cookie banner dismissed");
            session.pacing().action_pause().await;
            true
        }
        Err(e) => {
            logger::debug(LogTag::Auth, &format!("Cookie banner click failed: {}", e));
            false
        }
    }
}

/// Open the account switcher from the balance indicator and pick the demo account
pub async fn switch_to_demo(
    session: &Session,
    resolver: &ElementResolver,
    timeout: Duration,
) -> BotResult<()> {
    if !session.is_authenticated() {
        return Err(BotError::NotAuthenticated);
    }
    let driver = session.driver()?;

    let menu = resolver
        .resolve(session, &targets::BALANCE_MENU, timeout)
        .await?;
    driver.click(menu.element).await?;
    session.pacing().action_pause().await;

    let demo = resolver
        .resolve(session, &targets::DEMO_ACCOUNT, timeout)
        .await?;
    driver.click(demo.element).await?;
    session.pacing().action_pause().await;

    logger::info(LogTag::Market, "Switched to demo account");
    Ok(())
}
