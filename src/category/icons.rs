//! The fixed set of icons a category may use.
//!
//! Icons are grouped by what they usually represent so clients can show a
//! sensible picker. Each icon name maps to an asset path; unknown names map to
//! the fallback icon's asset.

use serde::Serialize;

/// An icon that categories may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Icon {
    /// The PascalCase identifier stored on categories.
    pub name: &'static str,
    /// The path of the icon's image, relative to the client's asset root.
    pub asset: &'static str,
}

/// Icons that share a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconGroup {
    /// The theme of the icons, e.g. "food".
    pub group: &'static str,
    /// The icons in the group.
    pub icons: &'static [Icon],
}

const fn icon(name: &'static str, asset: &'static str) -> Icon {
    Icon { name, asset }
}

/// The name of the icon shown when an icon name is not recognised.
pub const FALLBACK_ICON: &str = "CircleHelp";

const FALLBACK: Icon = icon(FALLBACK_ICON, "icons/circle-help.svg");

/// Every icon a category may use, grouped by theme.
pub static ICON_GROUPS: &[IconGroup] = &[
    IconGroup {
        group: "income",
        icons: &[
            icon("Wallet", "icons/wallet.svg"),
            icon("Banknote", "icons/banknote.svg"),
            icon("PiggyBank", "icons/piggy-bank.svg"),
            icon("Briefcase", "icons/briefcase.svg"),
            icon("TrendingUp", "icons/trending-up.svg"),
            icon("Gift", "icons/gift.svg"),
            icon("Coins", "icons/coins.svg"),
        ],
    },
    IconGroup {
        group: "food",
        icons: &[
            icon("Utensils", "icons/utensils.svg"),
            icon("Coffee", "icons/coffee.svg"),
            icon("Pizza", "icons/pizza.svg"),
            icon("ShoppingBasket", "icons/shopping-basket.svg"),
            icon("Apple", "icons/apple.svg"),
            icon("Beer", "icons/beer.svg"),
        ],
    },
    IconGroup {
        group: "shopping",
        icons: &[
            icon("ShoppingCart", "icons/shopping-cart.svg"),
            icon("ShoppingBag", "icons/shopping-bag.svg"),
            icon("Shirt", "icons/shirt.svg"),
            icon("Gem", "icons/gem.svg"),
        ],
    },
    IconGroup {
        group: "home",
        icons: &[
            icon("House", "icons/house.svg"),
            icon("Lightbulb", "icons/lightbulb.svg"),
            icon("Droplet", "icons/droplet.svg"),
            icon("Wifi", "icons/wifi.svg"),
            icon("Sofa", "icons/sofa.svg"),
            icon("Wrench", "icons/wrench.svg"),
        ],
    },
    IconGroup {
        group: "transport",
        icons: &[
            icon("Car", "icons/car.svg"),
            icon("Bus", "icons/bus.svg"),
            icon("Train", "icons/train.svg"),
            icon("Plane", "icons/plane.svg"),
            icon("Fuel", "icons/fuel.svg"),
            icon("Bike", "icons/bike.svg"),
        ],
    },
    IconGroup {
        group: "health",
        icons: &[
            icon("Heart", "icons/heart.svg"),
            icon("HeartPulse", "icons/heart-pulse.svg"),
            icon("Pill", "icons/pill.svg"),
            icon("Stethoscope", "icons/stethoscope.svg"),
            icon("Dumbbell", "icons/dumbbell.svg"),
        ],
    },
    IconGroup {
        group: "entertainment",
        icons: &[
            icon("Film", "icons/film.svg"),
            icon("Music", "icons/music.svg"),
            icon("Gamepad2", "icons/gamepad-2.svg"),
            icon("Tv", "icons/tv.svg"),
            icon("Ticket", "icons/ticket.svg"),
        ],
    },
    IconGroup {
        group: "education",
        icons: &[
            icon("GraduationCap", "icons/graduation-cap.svg"),
            icon("Book", "icons/book.svg"),
            icon("BookOpen", "icons/book-open.svg"),
            icon("School", "icons/school.svg"),
        ],
    },
    IconGroup {
        group: "generic",
        icons: &[
            icon("Tag", "icons/tag.svg"),
            icon("CreditCard", "icons/credit-card.svg"),
            icon("Receipt", "icons/receipt.svg"),
            icon("Landmark", "icons/landmark.svg"),
            icon("Repeat", "icons/repeat.svg"),
            icon("Star", "icons/star.svg"),
        ],
    },
    IconGroup {
        group: "fallback",
        icons: &[FALLBACK],
    },
];

fn find(name: &str) -> Option<&'static Icon> {
    ICON_GROUPS
        .iter()
        .flat_map(|group| group.icons.iter())
        .find(|icon| icon.name == name)
}

/// Whether `name` is one of the icons categories may use.
///
/// Matching is exact: "wallet" is not "Wallet".
pub fn is_allowed(name: &str) -> bool {
    find(name).is_some()
}

/// The asset path for `name`, or the fallback icon's asset if `name` is not
/// a known icon.
pub fn asset_for(name: &str) -> &'static str {
    find(name).unwrap_or(&FALLBACK).asset
}
