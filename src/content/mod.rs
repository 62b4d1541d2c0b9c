//! Site content schemas.
//!
//! Every editable collection (stats, features, programs, ...) is an ordered
//! list of items implementing [`OrderedItem`]; every singleton page section
//! (hero, video, ...) implements [`SettingsDocument`]. Text that appears on
//! the public site in both languages is stored as a plain `*_uz` / `*_en`
//! field pair; the Uzbek side is mandatory and the English side falls back to
//! it when submitted blank.

pub mod items;
pub mod settings;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use items::{Country, FaqItem, Feature, Program, Stat, Step, Testimonial, Tip};
pub use settings::{AboutSettings, ContactSettings, FaqSettings, Hero, VideoSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uz,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Uz => "uz",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uz" => Ok(Language::Uz),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

/// Mutable view of one localized field pair inside an item.
pub struct LocalizedField<'a> {
    pub label: &'static str,
    pub required: bool,
    pub uz: &'a mut String,
    pub en: &'a mut String,
}

impl<'a> LocalizedField<'a> {
    pub fn required(label: &'static str, uz: &'a mut String, en: &'a mut String) -> Self {
        Self {
            label,
            required: true,
            uz,
            en,
        }
    }

    pub fn optional(label: &'static str, uz: &'a mut String, en: &'a mut String) -> Self {
        Self {
            label,
            required: false,
            uz,
            en,
        }
    }
}

/// Checks that every required Uzbek field is filled in. Returns the first
/// missing field as a user-facing message.
pub fn validate_localized(fields: &mut [LocalizedField<'_>]) -> Result<(), String> {
    for field in fields.iter() {
        if field.required && field.uz.trim().is_empty() {
            return Err(format!("{} (UZ) to'ldirilishi shart", field.label));
        }
    }
    Ok(())
}

/// Copies the Uzbek value into every blank English field.
pub fn apply_en_fallback(fields: &mut [LocalizedField<'_>]) {
    for field in fields.iter_mut() {
        if field.en.trim().is_empty() && !field.uz.trim().is_empty() {
            *field.en = field.uz.clone();
        }
    }
}

/// Declarative description of one ordered collection on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDescriptor {
    /// Backend resource segment, also used as the cache key.
    pub resource: &'static str,
    /// Prefix of client-generated ids.
    pub id_prefix: &'static str,
    /// Human-readable name for notices and the CLI.
    pub label: &'static str,
}

impl CollectionDescriptor {
    pub fn list_path(&self) -> String {
        format!("/{}/admin", self.resource)
    }

    pub fn upsert_path(&self) -> String {
        format!("/{}", self.resource)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("/{}/{}", self.resource, id)
    }

    pub fn reorder_path(&self) -> String {
        format!("/{}/reorder", self.resource)
    }
}

/// An item of an orderable collection. `id` is minted client-side and never
/// changes; `order` is a display hint the backend may renumber.
pub trait OrderedItem:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const DESCRIPTOR: CollectionDescriptor;

    /// Empty draft for the "Add" form.
    fn blank(id: String, order: i64) -> Self;
    fn id(&self) -> &str;
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>>;

    /// Non-localized required fields, checked after the localized ones.
    fn validate_extra(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A singleton page section with no id and no order; saved wholesale.
pub trait SettingsDocument:
    Clone + fmt::Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Backend resource segment (`GET /<resource>/admin`, `PUT /<resource>`).
    const RESOURCE: &'static str;
    const LABEL: &'static str;

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>>;
}

/// Submission-ready copy of an item: validated, with English fallbacks applied.
pub fn prepare_item<T: OrderedItem>(draft: &T) -> Result<T, String> {
    let mut item = draft.clone();
    validate_localized(&mut item.localized_fields())?;
    item.validate_extra()?;
    apply_en_fallback(&mut item.localized_fields());
    Ok(item)
}

pub fn prepare_document<T: SettingsDocument>(draft: &T) -> Result<T, String> {
    let mut doc = draft.clone();
    validate_localized(&mut doc.localized_fields())?;
    apply_en_fallback(&mut doc.localized_fields());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_fills_only_blank_english() {
        let mut title_uz = "Sarlavha".to_string();
        let mut title_en = "   ".to_string();
        let mut body_uz = "Matn".to_string();
        let mut body_en = "Text".to_string();
        let mut fields = vec![
            LocalizedField::required("Sarlavha", &mut title_uz, &mut title_en),
            LocalizedField::optional("Matn", &mut body_uz, &mut body_en),
        ];
        apply_en_fallback(&mut fields);
        drop(fields);
        assert_eq!(title_en, "Sarlavha");
        assert_eq!(body_en, "Text");
    }

    #[test]
    fn validation_names_first_missing_required_field() {
        let mut a_uz = String::new();
        let mut a_en = "filled".to_string();
        let mut b_uz = String::new();
        let mut b_en = String::new();
        let mut fields = vec![
            LocalizedField::optional("Izoh", &mut b_uz, &mut b_en),
            LocalizedField::required("Savol", &mut a_uz, &mut a_en),
        ];
        let err = validate_localized(&mut fields).unwrap_err();
        assert!(err.starts_with("Savol (UZ)"));
    }

    #[test]
    fn descriptor_paths() {
        let d = CollectionDescriptor {
            resource: "stats",
            id_prefix: "stat",
            label: "Statistika",
        };
        assert_eq!(d.list_path(), "/stats/admin");
        assert_eq!(d.upsert_path(), "/stats");
        assert_eq!(d.item_path("stat_1_abcde"), "/stats/stat_1_abcde");
        assert_eq!(d.reorder_path(), "/stats/reorder");
    }

    #[test]
    fn language_parses_case_insensitively() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert!("ru".parse::<Language>().is_err());
    }
}
