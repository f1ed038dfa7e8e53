//! Currency and category reference tables
//!
//! Fixed lookup tables the extraction and mapping stages share: currency
//! symbol/code resolution, per-platform host-to-currency maps, and the
//! per-platform category keyword buckets used for classification.
//!
//! Table order is part of the contract. Currency symbols are matched in
//! declaration order, so multi-character symbols ("R$", "E£", "GH₵") sit
//! before their single-character prefixes. Category buckets tie-break by
//! declaration order as well.

use crate::domain::platform::Platform;

/// Literal symbol/code → ISO 4217, longest-prefix entries first.
pub const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("R$", "BRL"),
    ("US$", "USD"),
    ("GH₵", "GHS"),
    ("E£", "EGP"),
    ("KSh", "KES"),
    ("USh", "UGX"),
    ("FCFA", "XOF"),
    ("$", "USD"),
    ("£", "GBP"),
    ("€", "EUR"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₦", "NGN"),
    ("₵", "GHS"),
];

/// ISO codes accepted verbatim when they appear in price text.
pub const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "INR", "NGN", "KES", "GHS", "EGP", "XOF", "UGX", "MAD", "TND",
    "DZD", "CAD", "AUD", "BRL", "MXN", "AED", "SAR", "SEK",
];

/// Resolve a currency from free-form price text, if any table entry hits.
#[must_use]
pub fn currency_from_text(text: &str) -> Option<&'static str> {
    for (symbol, iso) in CURRENCY_SYMBOLS {
        if text.contains(symbol) {
            return Some(iso);
        }
    }
    CURRENCY_CODES.iter().find(|code| text.contains(**code)).copied()
}

/// Platform-specific host suffix → currency.
#[must_use]
pub fn currency_for_host(platform: Platform, host: &str) -> Option<&'static str> {
    let table: &[(&str, &str)] = match platform {
        Platform::Amazon => &[
            ("amazon.com.br", "BRL"),
            ("amazon.com.mx", "MXN"),
            ("amazon.com.au", "AUD"),
            ("amazon.co.uk", "GBP"),
            ("amazon.co.jp", "JPY"),
            ("amazon.de", "EUR"),
            ("amazon.fr", "EUR"),
            ("amazon.it", "EUR"),
            ("amazon.es", "EUR"),
            ("amazon.nl", "EUR"),
            ("amazon.se", "SEK"),
            ("amazon.ca", "CAD"),
            ("amazon.in", "INR"),
            ("amazon.ae", "AED"),
            ("amazon.sa", "SAR"),
            ("amazon.eg", "EGP"),
            ("amazon.com", "USD"),
        ],
        Platform::Jumia => &[
            ("jumia.com.ng", "NGN"),
            ("jumia.co.ke", "KES"),
            ("jumia.com.eg", "EGP"),
            ("jumia.com.gh", "GHS"),
            ("jumia.com.tn", "TND"),
            ("jumia.ma", "MAD"),
            ("jumia.ci", "XOF"),
            ("jumia.sn", "XOF"),
            ("jumia.ug", "UGX"),
            ("jumia.dz", "DZD"),
        ],
    };

    let host = host.to_ascii_lowercase();
    table
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
        .map(|(_, iso)| *iso)
}

/// A category bucket and the keywords that vote for it.
#[derive(Debug, Clone, Copy)]
pub struct CategoryBucket {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Category buckets for a platform, in tie-break (declaration) order.
#[must_use]
pub const fn category_buckets(platform: Platform) -> &'static [CategoryBucket] {
    match platform {
        Platform::Amazon => AMAZON_CATEGORY_BUCKETS,
        Platform::Jumia => JUMIA_CATEGORY_BUCKETS,
    }
}

const AMAZON_CATEGORY_BUCKETS: &[CategoryBucket] = &[
    CategoryBucket {
        name: "Electronics",
        keywords: &[
            "electronics", "cell phones", "phone", "smartphone", "laptop", "computer", "tablet",
            "camera", "headphone", "earbud", "speaker", "television", "monitor", "console",
            "charger", "keyboard", "router",
        ],
    },
    CategoryBucket {
        name: "Fashion",
        keywords: &[
            "clothing", "fashion", "shoes", "apparel", "dress", "shirt", "jacket", "watch",
            "jewelry", "handbag", "sneaker", "boot",
        ],
    },
    CategoryBucket {
        name: "Home & Kitchen",
        keywords: &[
            "kitchen", "furniture", "appliance", "cookware", "bedding", "decor", "vacuum",
            "home improvement", "garden",
        ],
    },
    CategoryBucket {
        name: "Books",
        keywords: &["book", "paperback", "hardcover", "kindle", "novel", "audiobook"],
    },
    CategoryBucket {
        name: "Beauty",
        keywords: &["beauty", "makeup", "skincare", "fragrance", "shampoo", "cosmetic"],
    },
    CategoryBucket {
        name: "Sports & Outdoors",
        keywords: &["sports", "fitness", "outdoor", "exercise", "bicycle", "camping", "yoga"],
    },
    CategoryBucket {
        name: "Toys & Games",
        keywords: &["toy", "board game", "puzzle", "lego", "doll", "action figure"],
    },
];

const JUMIA_CATEGORY_BUCKETS: &[CategoryBucket] = &[
    CategoryBucket {
        name: "Phones & Tablets",
        keywords: &["phone", "smartphone", "tablet", "mobile", "android", "infinix", "tecno"],
    },
    CategoryBucket {
        name: "Electronics",
        keywords: &["electronics", "television", "audio", "speaker", "camera", "decoder"],
    },
    CategoryBucket {
        name: "Computing",
        keywords: &["laptop", "computer", "printer", "monitor", "desktop", "flash drive"],
    },
    CategoryBucket {
        name: "Appliances",
        keywords: &[
            "appliance", "fridge", "refrigerator", "blender", "microwave", "washing machine",
            "cooker", "air conditioner", "generator",
        ],
    },
    CategoryBucket {
        name: "Fashion",
        keywords: &["fashion", "shoes", "clothing", "dress", "watch", "bag", "sneaker"],
    },
    CategoryBucket {
        name: "Health & Beauty",
        keywords: &["beauty", "skincare", "makeup", "fragrance", "health", "supplement"],
    },
    CategoryBucket {
        name: "Home & Office",
        keywords: &["home", "office", "furniture", "kitchen", "decor", "bedding"],
    },
    CategoryBucket {
        name: "Groceries",
        keywords: &["grocery", "food", "drink", "beverage", "snack"],
    },
    CategoryBucket {
        name: "Baby Products",
        keywords: &["baby", "diaper", "stroller", "toddler"],
    },
];
