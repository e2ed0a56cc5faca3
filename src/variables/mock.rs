//! Mock data generators for `{{$name}}` placeholders.
//!
//! Interpolation hands the identifier after the `$` sigil to a
//! [`MockDataProvider`]. [`FakeData`] is the built-in provider; hosts may
//! plug in their own.

use chrono::{SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

/// Source of generated values for `{{$name}}` placeholders.
pub trait MockDataProvider: Send + Sync {
    /// Generates a value for `name` (without the `$` sigil).
    ///
    /// # Returns
    ///
    /// `None` when the provider does not know the name.
    fn generate(&self, name: &str) -> Option<String>;
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Torvalds", "Hamilton", "Ritchie", "Liskov", "Thompson",
    "Allen", "Dijkstra",
];

const WORDS: &[&str] = &[
    "alpha", "bridge", "cactus", "delta", "ember", "falcon", "glacier", "harbor", "island",
    "jungle", "kernel", "lantern", "meadow", "nebula", "orchid", "pepper",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

/// Built-in fake data generators.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeData;

impl FakeData {
    /// Names this provider understands.
    pub const NAMES: &'static [&'static str] = &[
        "guid",
        "randomUUID",
        "timestamp",
        "isoTimestamp",
        "randomInt",
        "randomBoolean",
        "randomAlphaNumeric",
        "randomHexColor",
        "randomIP",
        "randomFirstName",
        "randomLastName",
        "randomFullName",
        "randomUserName",
        "randomEmail",
        "randomWord",
    ];
}

fn pick(items: &[&str]) -> String {
    items
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

impl MockDataProvider for FakeData {
    fn generate(&self, name: &str) -> Option<String> {
        let mut rng = rand::thread_rng();
        let value = match name {
            "guid" | "randomUUID" => Uuid::new_v4().to_string(),
            "timestamp" => Utc::now().timestamp().to_string(),
            "isoTimestamp" => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "randomInt" => rng.gen_range(0..=1000).to_string(),
            "randomBoolean" => rng.gen_bool(0.5).to_string(),
            "randomAlphaNumeric" => char::from(rng.sample(Alphanumeric)).to_string(),
            "randomHexColor" => format!("#{:06x}", rng.gen_range(0..=0xFF_FFFF_u32)),
            "randomIP" => format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=254_u8),
                rng.gen::<u8>(),
                rng.gen::<u8>(),
                rng.gen_range(1..=254_u8)
            ),
            "randomFirstName" => pick(FIRST_NAMES),
            "randomLastName" => pick(LAST_NAMES),
            "randomFullName" => format!("{} {}", pick(FIRST_NAMES), pick(LAST_NAMES)),
            "randomUserName" => format!(
                "{}.{}{}",
                pick(FIRST_NAMES).to_lowercase(),
                pick(LAST_NAMES).to_lowercase(),
                rng.gen_range(1..100)
            ),
            "randomEmail" => format!(
                "{}.{}@{}",
                pick(FIRST_NAMES).to_lowercase(),
                pick(LAST_NAMES).to_lowercase(),
                pick(EMAIL_DOMAINS)
            ),
            "randomWord" => pick(WORDS),
            _ => return None,
        };
        Some(value)
    }
}
