//! Genre and text normalization.
//!
//! Upstreams hand us genres in three shapes: bare display strings (legacy
//! GraphQL), tag objects with `slug`/`name_en`/`name_fa`, and relational join
//! rows that wrap a tag one level deep under `genres`. Everything is reduced
//! to [`GenreTag`]; shapes that yield no slug are dropped and counted.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::GenreTag;

/// Lowercase, trim, and join whitespace runs with single hyphens.
pub fn slugify(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Persian names for the genres that show up in practice.
const GENRE_TRANSLATIONS: &[(&str, &str)] = &[
    ("Action", "اکشن"),
    ("Adventure", "ماجراجویی"),
    ("Comedy", "کمدی"),
    ("Drama", "درام"),
    ("Ecchi", "اچی"),
    ("Fantasy", "فانتزی"),
    ("Horror", "ترسناک"),
    ("Mahou Shoujo", "دختر جادویی"),
    ("Mecha", "روباتی"),
    ("Music", "موسیقی"),
    ("Mystery", "معمایی"),
    ("Psychological", "روانشناختی"),
    ("Romance", "عاشقانه"),
    ("Sci-Fi", "علمی تخیلی"),
    ("Slice of Life", "برش از زندگی"),
    ("Sports", "ورزشی"),
    ("Supernatural", "ماوراء طبیعی"),
    ("Thriller", "هیجان‌انگیز"),
    ("School", "مدرسه‌ای"),
    ("Military", "نظامی"),
    ("Historical", "تاریخی"),
    ("Super Power", "ابرقدرت"),
    ("Demons", "شیاطین"),
    ("Magic", "جادویی"),
    ("Martial Arts", "هنرهای رزمی"),
    ("Space", "فضایی"),
    ("Vampire", "خون‌آشامی"),
];

/// Persian name for an English genre, matched on slug.
pub fn translate_genre(name: &str) -> Option<String> {
    let slug = slugify(name);
    GENRE_TRANSLATIONS
        .iter()
        .find(|(en, _)| slugify(en) == slug)
        .map(|(_, fa)| (*fa).to_string())
}

/// Normalize one raw genre value. `None` means the shape carried no slug.
pub fn normalize_genre(raw: &Value) -> Option<GenreTag> {
    match raw {
        Value::Object(map) if !map.contains_key("slug") => match map.get("genres") {
            // Relational join row: unwrap exactly one level.
            Some(inner) => normalize_shape(inner),
            None => from_object(map),
        },
        other => normalize_shape(other),
    }
}

fn normalize_shape(raw: &Value) -> Option<GenreTag> {
    match raw {
        Value::String(s) => from_display(s),
        Value::Object(map) => from_object(map),
        _ => None,
    }
}

/// Build a tag from a bare display name.
pub fn from_display(name: &str) -> Option<GenreTag> {
    let slug = slugify(name);
    if slug.is_empty() {
        return None;
    }
    Some(GenreTag {
        slug,
        name_en: Some(name.to_string()),
        name_fa: translate_genre(name),
    })
}

fn from_object(map: &Map<String, Value>) -> Option<GenreTag> {
    let name_en = coerce(map.get("name_en"))
        .or_else(|| coerce(map.get("nameEn")))
        .or_else(|| coerce(map.get("name")));
    let slug = coerce(map.get("slug"))
        .or_else(|| name_en.clone())
        .map(|s| slugify(&s))
        .filter(|s| !s.is_empty())?;
    let name_fa = coerce(map.get("name_fa"))
        .or_else(|| coerce(map.get("nameFa")))
        .or_else(|| name_en.as_deref().and_then(translate_genre));

    Some(GenreTag {
        slug,
        name_en,
        name_fa,
    })
}

/// Scalar → string; null, empty, and structured values → `None`.
fn coerce(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Result of normalizing a list of raw genres.
#[derive(Debug, Clone, Default)]
pub struct GenreList {
    /// Normalized tags in input order; duplicates are kept.
    pub tags: Vec<GenreTag>,
    /// Inputs dropped because no slug could be derived.
    pub dropped: usize,
}

/// Normalize a sequence of raw genres, dropping unusable shapes.
pub fn normalize_genre_list<'a>(raw: impl IntoIterator<Item = &'a Value>) -> GenreList {
    let mut list = GenreList::default();
    for value in raw {
        match normalize_genre(value) {
            Some(tag) => list.tags.push(tag),
            None => {
                tracing::debug!(raw = %value, "dropping genre without slug");
                list.dropped += 1;
            }
        }
    }
    list
}

/// Normalize a field that may be an array, a single genre, or null.
pub fn normalize_genre_field(raw: Option<&Value>) -> GenreList {
    match raw {
        Some(Value::Array(items)) => normalize_genre_list(items),
        Some(Value::Null) | None => GenreList::default(),
        Some(single) => normalize_genre_list(std::iter::once(single)),
    }
}

/// Localization seam for upstream free text (synopses).
pub trait TextLocalizer: Send + Sync {
    fn localize(&self, text: &str) -> String;
}

/// Returns the text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl TextLocalizer for Passthrough {
    fn localize(&self, text: &str) -> String {
        text.to_string()
    }
}

static RE_SEASON_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Season\s+(\d+)").expect("static regex"));

/// Shorten "Season N" to "SN" in display titles.
pub fn format_title(title: &str) -> String {
    RE_SEASON_SUFFIX.replace_all(title, "S$1").into_owned()
}

/// Persian display string for an airing status.
pub fn localize_status(status: &str) -> String {
    match status {
        "RELEASING" => "در حال پخش".into(),
        "FINISHED" => "پایان یافته".into(),
        "NOT_YET_RELEASED" => "هنوز پخش نشده".into(),
        "CANCELLED" => "لغو شده".into(),
        "HIATUS" => "متوقف شده".into(),
        other => other.to_string(),
    }
}
