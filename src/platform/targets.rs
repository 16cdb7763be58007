//! Locator catalog for the trading platform
//!
//! Each target lists its strategies most precise first. The markup is not
//! under our control, so later strategies are progressively looser.

use crate::browser::{Locator, LocatorTarget};
use once_cell::sync::Lazy;

pub static EMAIL_FIELD: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "email field",
        vec![
            Locator::name("email"),
            Locator::id("email"),
            Locator::xpath(
                "//input[@type='email' or @placeholder='Email' or contains(@name,'email')]",
            ),
            Locator::nth("input", 0),
        ],
    )
});

pub static PASSWORD_FIELD: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "password field",
        vec![
            Locator::name("password"),
            Locator::id("password"),
            Locator::xpath("//input[@type='password' or contains(@name,'password')]"),
            Locator::nth("input", 1),
        ],
    )
});

pub static LOGIN_SUBMIT: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "login button",
        vec![
            Locator::xpath("//button[@type='submit']"),
            Locator::xpath(
                "//button[contains(text(),'Log') or contains(text(),'Sign') or contains(text(),'Enter')]",
            ),
            Locator::nth("button", 0),
            Locator::xpath(
                "//div[contains(@class,'button') or contains(@class,'btn')] | //a[contains(@class,'button') or contains(@class,'btn')]",
            ),
        ],
    )
});

pub static COOKIE_ACCEPT: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "cookie banner",
        vec![
            Locator::xpath("//button[contains(text(),'Accept')]"),
            Locator::xpath("//button[contains(@class,'cookie')]"),
        ],
    )
});

// Login verification signals, in priority order

pub static BALANCE_INDICATOR: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::present(
        "balance indicator",
        vec![
            Locator::css(".balance"),
            Locator::xpath("//div[contains(@class,'balance') or contains(text(),'$')]"),
        ],
    )
});

pub static PROFILE_INDICATOR: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::present(
        "profile indicator",
        vec![Locator::xpath(
            "//div[contains(@class,'profile') or contains(@class,'account')]",
        )],
    )
});

pub static TRADING_SURFACE: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::present(
        "trading surface",
        vec![Locator::xpath(
            "//div[contains(@class,'chart') or contains(@class,'trading')]",
        )],
    )
});

pub static PRICE_DISPLAY: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::present(
        "price display",
        vec![
            Locator::css(".current-price"),
            Locator::xpath(
                "//div[contains(@class,'price') and not(contains(@class,'price-change'))]",
            ),
            Locator::xpath("//span[contains(@class,'price')]"),
        ],
    )
});

// Trade panel

pub static UP_BUTTON: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "up button",
        vec![Locator::xpath(
            "//button[contains(@class,'up') or contains(@class,'call') or contains(text(),'Up') or contains(text(),'Call')]",
        )],
    )
});

pub static DOWN_BUTTON: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "down button",
        vec![Locator::xpath(
            "//button[contains(@class,'down') or contains(@class,'put') or contains(text(),'Down') or contains(text(),'Put')]",
        )],
    )
});

pub static AMOUNT_FIELD: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "amount field",
        vec![
            Locator::name("amount"),
            Locator::xpath("//input[@placeholder='Amount' or @type='number']"),
            Locator::xpath("//input[contains(@class,'amount')]"),
        ],
    )
});

pub static TRADE_SUBMIT: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "trade button",
        vec![Locator::xpath(
            "//button[contains(text(),'Place Trade') or contains(text(),'Trade Now') or contains(@class,'trade')]",
        )],
    )
});

// Account switcher

pub static BALANCE_MENU: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "balance menu",
        vec![
            Locator::css(".balance"),
            Locator::xpath("//div[contains(@class,'balance')]"),
        ],
    )
});

pub static DEMO_ACCOUNT: Lazy<LocatorTarget> = Lazy::new(|| {
    LocatorTarget::interactable(
        "demo account option",
        vec![
            Locator::xpath("//div[contains(text(),'Demo')]"),
            Locator::xpath("//a[contains(text(),'Demo')]"),
        ],
    )
});

/// Every catalog entry, for diagnostics
pub fn all_targets() -> Vec<&'static LocatorTarget> {
    vec![
        &*EMAIL_FIELD,
        &*PASSWORD_FIELD,
        &*LOGIN_SUBMIT,
        &*COOKIE_ACCEPT,
        &*BALANCE_INDICATOR,
        &*PROFILE_INDICATOR,
        &*TRADING_SURFACE,
        &*PRICE_DISPLAY,
        &*UP_BUTTON,
        &*DOWN_BUTTON,
        &*AMOUNT_FIELD,
        &*TRADE_SUBMIT,
        &*BALANCE_MENU,
        &*DEMO_ACCOUNT,
    ]
}

/// Case-insensitive lookup by target name
pub fn find_target(name: &str) -> Option<&'static LocatorTarget> {
    all_targets()
        .into_iter()
        .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
}
