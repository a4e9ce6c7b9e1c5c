use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry of the event catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub sub_types: Vec<String>,
    pub pricing: Pricing,
    pub features: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub base: f64,
    pub premium: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sub_types: Option<Vec<String>>,
    pub pricing: Option<PricingRequest>,
    pub features: Option<Vec<String>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PricingRequest {
    pub base: Option<f64>,
    pub premium: Option<f64>,
}

/// Validated catalog entry ready to be stored.
#[derive(Debug, Clone)]
pub struct NewEventType {
    pub name: String,
    pub description: String,
    pub sub_types: Vec<String>,
    pub pricing: Pricing,
    pub features: Vec<String>,
    pub image_url: Option<String>,
}

/// The kinds of event a booking can be made for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Wedding,
    Birthday,
    CarDecoration,
    TentSetup,
    Anniversary,
    BabyShower,
    Other,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Wedding,
        EventKind::Birthday,
        EventKind::CarDecoration,
        EventKind::TentSetup,
        EventKind::Anniversary,
        EventKind::BabyShower,
        EventKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Wedding => "wedding",
            EventKind::Birthday => "birthday",
            EventKind::CarDecoration => "car-decoration",
            EventKind::TentSetup => "tent-setup",
            EventKind::Anniversary => "anniversary",
            EventKind::BabyShower => "baby-shower",
            EventKind::Other => "other",
        }
    }

    /// Name of the catalog entry describing this kind.
    pub fn catalog_name(&self) -> Option<&'static str> {
        match self {
            EventKind::Wedding => Some("Wedding"),
            EventKind::Birthday => Some("Birthday Party"),
            EventKind::CarDecoration => Some("Car Decoration"),
            EventKind::TentSetup => Some("Tent & Stage Setup"),
            EventKind::Anniversary => Some("Anniversary"),
            EventKind::BabyShower => Some("Baby Shower"),
            EventKind::Other => None,
        }
    }

    /// Parses a kind slug, a catalog name, or a booking-form value such as
    /// `wedding-mehndi`. The second element is the sub-type implied by a
    /// combined form value, as written after the kind.
    pub fn parse(input: &str) -> Option<(EventKind, Option<String>)> {
        let slug = slugify(input);
        if slug.is_empty() {
            return None;
        }

        for kind in Self::ALL {
            if kind.aliases().any(|alias| alias == slug) {
                return Some((kind, None));
            }
        }

        // Longest alias first so "tent-stage-setup-..." is not read as "tent-...".
        let mut prefixed: Option<(EventKind, usize)> = None;
        for kind in Self::ALL {
            for alias in kind.aliases() {
                let matches = slug.len() > alias.len() + 1
                    && slug.starts_with(alias.as_str())
                    && slug.as_bytes()[alias.len()] == b'-';
                if matches && prefixed.map_or(true, |(_, len)| alias.len() > len) {
                    prefixed = Some((kind, alias.len()));
                }
            }
        }

        let (kind, len) = prefixed?;
        let rest = text_after_slug(input, &slug[..len])?;
        Some((kind, Some(rest)))
    }

    fn aliases(&self) -> impl Iterator<Item = String> {
        let slug = self.as_str().to_string();
        let catalog = self.catalog_name().map(slugify);
        std::iter::once(slug).chain(catalog)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercases and collapses every run of non-alphanumeric characters into a
/// single `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Returns the text of `input` following its shortest prefix that slugifies
/// to `prefix`, without the separators in between.
fn text_after_slug(input: &str, prefix: &str) -> Option<String> {
    let input = input.trim();
    let end = input
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(input.len()))
        .find(|&i| slugify(&input[..i]) == prefix)?;
    let rest = input[end..].trim_start_matches(|c: char| !c.is_alphanumeric());
    (!rest.is_empty()).then(|| rest.to_string())
}
