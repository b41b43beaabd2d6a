//! Prompt construction from a style descriptor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LEAD_IN: &str = "A painting of this photo";
const QUALITY_BOILERPLATE: &str = "masterpiece, highly detailed, fine art, best quality";
const DEFAULT_FRAGMENT: &str = "expressive brushwork, rich color palette, painterly texture";
const UNKNOWN_ARTIST: &str = "a classic master";

const ARTIST_KEYWORDS: &[(&str, &str)] = &[
    (
        "Vincent van Gogh",
        "swirling impasto brushstrokes, vivid yellows and deep blues, post-impressionist energy",
    ),
    (
        "Claude Monet",
        "soft broken brushwork, shimmering light on water, pastel impressionist palette",
    ),
    (
        "Pablo Picasso",
        "fragmented cubist planes, multiple viewpoints, bold geometric forms",
    ),
    (
        "Katsushika Hokusai",
        "ukiyo-e woodblock print, flat color areas, crisp outlines, Prussian blue waves",
    ),
    (
        "Gustav Klimt",
        "gold leaf ornamentation, mosaic patterns, art nouveau elegance",
    ),
    (
        "Frida Kahlo",
        "vibrant Mexican folk colors, symbolic flora, intimate surreal portraiture",
    ),
    (
        "Salvador Dali",
        "dreamlike surreal landscape, melting forms, hyperreal detail",
    ),
    (
        "Edvard Munch",
        "anguished expressionist swirls, blood-red sky, emotional distortion",
    ),
    (
        "Rembrandt van Rijn",
        "dramatic chiaroscuro, warm earthy tones, baroque lighting",
    ),
    (
        "Johannes Vermeer",
        "soft window light, luminous pearl tones, quiet Dutch interior",
    ),
    (
        "Andy Warhol",
        "pop art silkscreen, flat saturated colors, high contrast repetition",
    ),
    (
        "Jackson Pollock",
        "abstract drip painting, energetic splatter, layered enamel",
    ),
];

const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("impressionism", "loose visible brushstrokes, natural light, vibrant color"),
    (
        "post impressionism",
        "bold outlines, thick paint application, expressive color",
    ),
    ("cubism", "geometric shapes, fragmented perspective, muted palette"),
    ("surrealism", "dreamlike imagery, unexpected juxtapositions, precise rendering"),
    ("expressionism", "distorted forms, intense emotion, vivid color"),
    ("pop art", "bold flat colors, comic style outlines, graphic composition"),
    ("ukiyo e", "Japanese woodblock print, flat color, elegant line work"),
    ("renaissance", "classical composition, sfumato, balanced proportions"),
    ("baroque", "dramatic light and shadow, rich detail, dynamic movement"),
    ("art nouveau", "organic flowing lines, decorative patterns, ornamental borders"),
    ("abstract", "non-representational shapes, bold gestures, color fields"),
    ("realism", "faithful detail, natural tones, careful observation"),
];

/// The artistic style a photo should be rendered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub artist: String,
    pub category: String,
    pub title: String,
    /// Descriptive keywords supplied alongside the artist, if any
    #[serde(default)]
    pub keywords: Option<String>,
}

impl StyleDescriptor {
    pub fn new(
        artist: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            category: category.into(),
            title: title.into(),
            keywords: None,
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }
}

/// Keyword lookup tables used to build generation prompts.
///
/// Lookup order: exact artist name, then the descriptor's own keywords, then the
/// style category, then a generic default.
#[derive(Debug, Clone)]
pub struct PromptTable {
    artists: BTreeMap<String, String>,
    categories: BTreeMap<String, String>,
    default_fragment: String,
}

impl Default for PromptTable {
    fn default() -> Self {
        let mut table = Self::new(DEFAULT_FRAGMENT);
        for (artist, keywords) in ARTIST_KEYWORDS {
            table = table.with_artist(*artist, *keywords);
        }
        for (category, keywords) in CATEGORY_KEYWORDS {
            table = table.with_category(*category, *keywords);
        }
        table
    }
}

impl PromptTable {
    /// An empty table that always falls through to `default_fragment`
    pub fn new(default_fragment: impl Into<String>) -> Self {
        Self {
            artists: BTreeMap::new(),
            categories: BTreeMap::new(),
            default_fragment: default_fragment.into(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>, keywords: impl Into<String>) -> Self {
        self.artists.insert(artist.into(), keywords.into());
        self
    }

    pub fn with_category(
        mut self,
        category: impl AsRef<str>,
        keywords: impl Into<String>,
    ) -> Self {
        self.categories
            .insert(normalize_category(category.as_ref()), keywords.into());
        self
    }

    pub fn with_default(mut self, default_fragment: impl Into<String>) -> Self {
        self.default_fragment = default_fragment.into();
        self
    }

    /// Keyword fragment for a style
    pub fn fragment<'a>(&'a self, style: &'a StyleDescriptor) -> &'a str {
        if let Some(keywords) = self.artists.get(&style.artist) {
            return keywords;
        }

        if let Some(keywords) = style.keywords.as_deref().map(str::trim) {
            if !keywords.is_empty() {
                return keywords;
            }
        }

        self.categories
            .get(&normalize_category(&style.category))
            .map(String::as_str)
            .filter(|keywords| !keywords.trim().is_empty())
            .unwrap_or_else(|| self.default_fragment_or_builtin())
    }

    fn default_fragment_or_builtin(&self) -> &str {
        if self.default_fragment.trim().is_empty() {
            DEFAULT_FRAGMENT
        } else {
            &self.default_fragment
        }
    }

    /// Build the generation prompt for a style
    pub fn build_prompt(&self, style: &StyleDescriptor) -> String {
        let artist = [style.artist.trim(), style.title.trim()]
            .into_iter()
            .find(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_ARTIST);

        format!(
            "{} in the style of {}, {}, {}",
            LEAD_IN,
            artist,
            self.fragment(style),
            QUALITY_BOILERPLATE
        )
    }
}

/// Build a prompt using the built-in keyword tables
pub fn build_prompt(style: &StyleDescriptor) -> String {
    PromptTable::default().build_prompt(style)
}

/// "Post-Impressionism", "post_impressionism" and "post impressionism" share a key
fn normalize_category(category: &str) -> String {
    category
        .trim()
        .to_lowercase()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
