use serde::{Deserialize, Serialize};

use super::{CollectionDescriptor, LocalizedField, OrderedItem};

/// Accessors shared by every item: each has an `id`, an `order` and a
/// `Default` impl for blank rows.
macro_rules! item_meta {
    () => {
        fn blank(id: String, order: i64) -> Self {
            Self {
                id,
                order,
                ..Default::default()
            }
        }

        fn id(&self) -> &str {
            &self.id
        }

        fn order(&self) -> i64 {
            self.order
        }

        fn set_order(&mut self, order: i64) {
            self.order = order;
        }
    };
}

/// Headline number on the landing page, e.g. `$10000 GRANT`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stat {
    pub id: String,
    pub value: i64,
    pub prefix: String,
    pub suffix: String,
    pub description_uz: String,
    pub description_en: String,
    pub order: i64,
}

impl OrderedItem for Stat {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "stats",
        id_prefix: "stat",
        label: "Statistika",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![LocalizedField::required(
            "Tavsif",
            &mut self.description_uz,
            &mut self.description_en,
        )]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feature {
    pub id: String,
    pub icon: String,
    pub title_uz: String,
    pub title_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub order: i64,
}

impl OrderedItem for Feature {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "features",
        id_prefix: "feature",
        label: "Afzalliklar",
    };

    item_meta!();

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

/// Study program card. Images are per language and uploaded separately.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Program {
    pub id: String,
    pub title_uz: String,
    pub title_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub duration_uz: String,
    pub duration_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_en: Option<String>,
    pub order: i64,
}

impl OrderedItem for Program {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "programs",
        id_prefix: "program",
        label: "Dasturlar",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Nomi", &mut self.title_uz, &mut self.title_en),
            LocalizedField::required(
                "Tavsif",
                &mut self.description_uz,
                &mut self.description_en,
            ),
            LocalizedField::optional("Davomiyligi", &mut self.duration_uz, &mut self.duration_en),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Country {
    pub id: String,
    pub name_uz: String,
    pub name_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub flag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_en: Option<String>,
    pub order: i64,
}

impl OrderedItem for Country {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "countries",
        id_prefix: "country",
        label: "Davlatlar",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Nomi", &mut self.name_uz, &mut self.name_en),
            LocalizedField::optional(
                "Tavsif",
                &mut self.description_uz,
                &mut self.description_en,
            ),
        ]
    }
}

/// "How it works" step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub id: String,
    pub icon: String,
    pub title_uz: String,
    pub title_en: String,
    pub description_uz: String,
    pub description_en: String,
    pub order: i64,
}

impl OrderedItem for Step {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "steps",
        id_prefix: "step",
        label: "Bosqichlar",
    };

    item_meta!();

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub program_uz: String,
    pub program_en: String,
    pub text_uz: String,
    pub text_en: String,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub order: i64,
}

impl Default for Testimonial {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            program_uz: String::new(),
            program_en: String::new(),
            text_uz: String::new(),
            text_en: String::new(),
            rating: 5,
            avatar: None,
            order: 0,
        }
    }
}

impl OrderedItem for Testimonial {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "testimonials",
        id_prefix: "testimonial",
        label: "Fikrlar",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Fikr matni", &mut self.text_uz, &mut self.text_en),
            LocalizedField::optional("Dastur", &mut self.program_uz, &mut self.program_en),
        ]
    }

    fn validate_extra(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Ism to'ldirilishi shart".into());
        }
        if !(1..=5).contains(&self.rating) {
            return Err("Baho 1 dan 5 gacha bo'lishi kerak".into());
        }
        Ok(())
    }
}

/// Video tip: a titled link to an external video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tip {
    pub id: String,
    pub title_uz: String,
    pub title_en: String,
    pub video_url: String,
    pub order: i64,
}

impl OrderedItem for Tip {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "tips",
        id_prefix: "tip",
        label: "Video maslahatlar",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![LocalizedField::required(
            "Sarlavha",
            &mut self.title_uz,
            &mut self.title_en,
        )]
    }

    fn validate_extra(&self) -> Result<(), String> {
        if self.video_url.trim().is_empty() {
            return Err("Video havolasi to'ldirilishi shart".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaqItem {
    pub id: String,
    pub question_uz: String,
    pub question_en: String,
    pub answer_uz: String,
    pub answer_en: String,
    pub order: i64,
}

impl OrderedItem for FaqItem {
    const DESCRIPTOR: CollectionDescriptor = CollectionDescriptor {
        resource: "faq",
        id_prefix: "faq",
        label: "Savol-javoblar",
    };

    item_meta!();

    fn localized_fields(&mut self) -> Vec<LocalizedField<'_>> {
        vec![
            LocalizedField::required("Savol", &mut self.question_uz, &mut self.question_en),
            LocalizedField::required("Javob", &mut self.answer_uz, &mut self.answer_en),
        ]
    }
}
