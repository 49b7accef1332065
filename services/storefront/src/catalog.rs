//! Static reward catalog and the viewer's selection

/// One purchasable option of a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOption {
    pub label: &'static str,
    /// `None` means the price is negotiated and nothing is deducted
    pub price: Option<u64>,
}

/// Catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItem {
    pub title: &'static str,
    pub badge: Option<&'static str>,
    pub note: Option<&'static str>,
    pub options: &'static [CatalogOption],
}

/// The storefront catalog
pub static CATALOG: [CatalogItem; 7] = [
    CatalogItem {
        title: "🥨 Snacks (Memes)",
        badge: Some("humor"),
        note: Some("Light content for a good mood ✨"),
        options: &[
            CatalogOption {
                label: "20 memes",
                price: Some(200),
            },
            CatalogOption {
                label: "45 memes",
                price: Some(400),
            },
        ],
    },
    CatalogItem {
        title: "🍿 Main course (Movies & Anime)",
        badge: Some("up to 2 hours"),
        note: Some("If it clicks, we watch the whole thing."),
        options: &[
            CatalogOption {
                label: "Movie / Cartoon",
                price: Some(750),
            },
            CatalogOption {
                label: "Anime / Series / TV show",
                price: Some(750),
            },
        ],
    },
    CatalogItem {
        title: "🌶️ Dessert (18+)",
        badge: Some("18+"),
        note: Some("Your pick or mine."),
        options: &[CatalogOption {
            label: "Adult anime / games on Boosty",
            price: Some(1000),
        }],
    },
    CatalogItem {
        title: "🎮 Gamer zone",
        badge: Some("2 hours"),
        note: Some("Free-to-play only for MMOs. If the game does not click, we stop after 2 hours."),
        options: &[CatalogOption {
            label: "I play YOUR game",
            price: Some(1500),
        }],
    },
    CatalogItem {
        title: "👑 Ultimate order",
        badge: Some("marathon"),
        note: Some("For the mightiest orders ✨"),
        options: &[CatalogOption {
            label: "12-hour stream",
            price: Some(5000),
        }],
    },
    CatalogItem {
        title: "🖌️ Drawings",
        badge: Some("art"),
        note: Some("Small drawings from your idea ✨"),
        options: &[CatalogOption {
            label: "Order a doodle",
            price: Some(3000),
        }],
    },
    CatalogItem {
        title: "🎁 Your own idea",
        badge: Some("proposal"),
        note: Some("As long as it is fun and within the rules ✨"),
        options: &[CatalogOption {
            label: "Let's discuss a custom order",
            price: None,
        }],
    },
];

/// Order description sent to the operator: `"<title> — <label> (<price> 🪙)"`
pub fn order_text(title: &str, option: &CatalogOption) -> String {
    match option.price {
        Some(price) => format!("{title} — {} ({price} 🪙)", option.label),
        None => format!("{title} — {}", option.label),
    }
}

/// The viewer's in-progress choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Composed description relayed with the order
    pub item_text: String,
    /// Item and option label without the price
    pub title: String,
    pub price: Option<u64>,
}

impl Selection {
    /// Select `option` of `item`
    pub fn new(item: &CatalogItem, option: &CatalogOption) -> Self {
        Self {
            item_text: order_text(item.title, option),
            title: format!("{} — {}", item.title, option.label),
            price: option.price,
        }
    }

    /// Price text shown next to the selection
    pub fn cost_label(&self) -> String {
        match self.price {
            Some(price) => format!("{price} 🪙"),
            None => "—".to_string(),
        }
    }
}

/// Select by position in [`CATALOG`]
pub fn select(item_index: usize, option_index: usize) -> Option<Selection> {
    let item = CATALOG.get(item_index)?;
    let option = item.options.get(option_index)?;
    Some(Selection::new(item, option))
}
