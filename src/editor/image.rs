use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use super::EditorError;
use crate::api::client::Gateway;
use crate::api::resources::ImageApi;
use crate::api::transport::FilePart;
use crate::content::{AboutSettings, Country, Hero, Language, OrderedItem, Program, SettingsDocument, Testimonial};
use crate::events::{Notifier, Operation};
use crate::query::{QueryClient, QueryKey};

pub const MB: usize = 1024 * 1024;
/// Hero, program and country images.
pub const LARGE_IMAGE_LIMIT: usize = 10 * MB;
/// Testimonial avatars and about-page gallery images.
pub const SMALL_IMAGE_LIMIT: usize = 5 * MB;
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

const FILE_FIELD: &str = "image";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Reads a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRejection {
    #[error("rasm hajmi {max_mb} MB dan oshmasligi kerak")]
    TooLarge { size: usize, max_mb: usize },
    #[error("faqat JPG, PNG, WEBP yoki GIF rasmlar qabul qilinadi ({0})")]
    UnsupportedType(String),
    #[error("fayl bo'sh")]
    Empty,
}

/// Where an image attaches. Language-specific slots carry the language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Hero(Language),
    Program { id: String, language: Language },
    Country { id: String, language: Language },
    TestimonialAvatar { id: String },
    AboutGallery,
}

impl ImageSlot {
    pub fn max_bytes(&self) -> usize {
        match self {
            ImageSlot::Hero(_) | ImageSlot::Program { .. } | ImageSlot::Country { .. } => {
                LARGE_IMAGE_LIMIT
            }
            ImageSlot::TestimonialAvatar { .. } | ImageSlot::AboutGallery => SMALL_IMAGE_LIMIT,
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            ImageSlot::Hero(language)
            | ImageSlot::Program { language, .. }
            | ImageSlot::Country { language, .. } => Some(*language),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            ImageSlot::Hero(_) => format!("/{}/image", Hero::RESOURCE),
            ImageSlot::Program { id, .. } => format!("/{}/{}/image", Program::DESCRIPTOR.resource, id),
            ImageSlot::Country { id, .. } => format!("/{}/{}/image", Country::DESCRIPTOR.resource, id),
            ImageSlot::TestimonialAvatar { id } => {
                format!("/{}/{}/avatar", Testimonial::DESCRIPTOR.resource, id)
            }
            ImageSlot::AboutGallery => format!("/{}/gallery", AboutSettings::RESOURCE),
        }
    }

    /// Cache entry that shows this image and must be refetched after a change.
    pub fn owner_key(&self) -> QueryKey {
        match self {
            ImageSlot::Hero(_) => QueryKey::Settings(Hero::RESOURCE),
            ImageSlot::Program { .. } => QueryKey::Collection(Program::DESCRIPTOR.resource),
            ImageSlot::Country { .. } => QueryKey::Collection(Country::DESCRIPTOR.resource),
            ImageSlot::TestimonialAvatar { .. } => {
                QueryKey::Collection(Testimonial::DESCRIPTOR.resource)
            }
            ImageSlot::AboutGallery => QueryKey::Settings(AboutSettings::RESOURCE),
        }
    }
}

/// Size and type checks done before any upload.
pub fn validate_image(slot: &ImageSlot, file: &ImageFile) -> Result<(), ImageRejection> {
    if file.bytes.is_empty() {
        return Err(ImageRejection::Empty);
    }
    let max = slot.max_bytes();
    if file.bytes.len() > max {
        return Err(ImageRejection::TooLarge {
            size: file.bytes.len(),
            max_mb: max / MB,
        });
    }
    let mime = file.content_type.to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) {
        return Err(ImageRejection::UnsupportedType(file.content_type.clone()));
    }
    Ok(())
}

/// Uploads and removals are separate calls from the owner's text upsert.
pub struct ImageUploader {
    api: ImageApi,
    query: Arc<QueryClient>,
    notifier: Notifier,
}

impl ImageUploader {
    pub fn new(gateway: Arc<Gateway>, query: Arc<QueryClient>, notifier: Notifier) -> Self {
        Self {
            api: ImageApi::new(gateway),
            query,
            notifier,
        }
    }

    /// Returns the stored image URL. A rejected file never reaches the network.
    pub async fn upload(&self, slot: &ImageSlot, file: ImageFile) -> Result<String, EditorError> {
        if let Err(rejection) = validate_image(slot, &file) {
            self.notifier.invalid(&rejection.to_string());
            return Err(rejection.into());
        }
        let mut fields = Vec::new();
        if let Some(language) = slot.language() {
            fields.push(("language".to_string(), language.as_str().to_string()));
        }
        let part = FilePart {
            field: FILE_FIELD.to_string(),
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
        };
        match self.api.upload(&slot.path(), part, fields).await {
            Ok(uploaded) => {
                self.notifier.success(Operation::Upload);
                self.query.invalidate(&slot.owner_key());
                Ok(uploaded.url)
            }
            Err(e) => {
                log::warn!("upload to {} failed: {}", slot.path(), e);
                self.notifier.failure(Operation::Upload);
                Err(e.into())
            }
        }
    }

    /// Removes the image in `slot`. Gallery images are addressed by URL.
    pub async fn remove(&self, slot: &ImageSlot, url: Option<&str>) -> Result<(), EditorError> {
        let mut query = Vec::new();
        if let Some(language) = slot.language() {
            query.push(("language", language.as_str().to_string()));
        }
        if let Some(url) = url {
            query.push(("url", url.to_string()));
        }
        match self.api.delete(&slot.path(), &query).await {
            Ok(()) => {
                self.notifier.success(Operation::RemoveImage);
                self.query.invalidate(&slot.owner_key());
                Ok(())
            }
            Err(e) => {
                log::warn!("removing image at {} failed: {}", slot.path(), e);
                self.notifier.failure(Operation::RemoveImage);
                Err(e.into())
            }
        }
    }
}
