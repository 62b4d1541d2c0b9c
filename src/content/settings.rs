use serde::{Deserialize, Serialize};

use super::{LocalizedField, SettingsDocument};

/// Landing page hero. The background image has one variant per language.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hero {
    pub title_uz: String,
    pub title_en: String,
    pub subtitle_uz: String,
    pub subtitle_en: String,
    pub button_text_uz: String,
    pub button_text_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_en: Option<String>,
}

impl SettingsDocument for Hero {
    const RESOURCE: &'static str = "hero";
    const LABEL: &'static str = "Bosh sahifa";

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Sarlavha", &mut self.title_uz, &mut self.title_en),
            LocalizedField::optional("Kichik sarlavha", &mut self.subtitle_uz, &mut self.subtitle_en),
            LocalizedField::optional(
                "Tugma matni",
                &mut self.button_text_uz,
                &mut self.button_text_en,
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    pub title_uz: String,
    pub title_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub video_url: String,
}

impl SettingsDocument for VideoSettings {
    const RESOURCE: &'static str = "video";
    const LABEL: &'static str = "Video";

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Sarlavha", &mut self.title_uz, &mut self.title_en),
            LocalizedField::optional(
                "Tavsif",
                &mut self.description_uz,
                &mut self.description_en,
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSettings {
    pub phone: String,
    pub email: String,
    pub telegram: String,
    pub instagram: String,
    pub address_uz: String,
    pub address_en: String,
    pub working_hours_uz: String,
    pub working_hours_en: String,
}

impl SettingsDocument for ContactSettings {
    const RESOURCE: &'static str = "contact";
    const LABEL: &'static str = "Aloqa";

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Manzil", &mut self.address_uz, &mut self.address_en),
            LocalizedField::optional(
                "Ish vaqti",
                &mut self.working_hours_uz,
                &mut self.working_hours_en,
            ),
        ]
    }
}

/// "About us" section with a free-form image gallery.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutSettings {
    pub title_uz: String,
    pub title_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub gallery: Vec<String>,
}

impl SettingsDocument for AboutSettings {
    const RESOURCE: &'static str = "about";
    const LABEL: &'static str = "Biz haqimizda";

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Sarlavha", &mut self.title_uz, &mut self.title_en),
            LocalizedField::required(
                "Tavsif",
                &mut self.description_uz,
                &mut self.description_en,
            ),
        ]
    }
}

/// Heading shown above the FAQ list; the questions themselves are [`super::FaqItem`]s.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaqSettings {
    pub title_uz: String,
    pub title_en: String,
    pub subtitle_uz: String,
    pub subtitle_en: String,
}

impl SettingsDocument for FaqSettings {
    const RESOURCE: &'static str = "faq-settings";
    const LABEL: &'static str = "FAQ sozlamalari";

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Sarlavha", &mut self.title_uz, &mut self.title_en),
            LocalizedField::optional("Kichik sarlavha", &mut self.subtitle_uz, &mut self.subtitle_en),
        ]
    }
}
