//! Editing state for site content.
//!
//! [`CollectionEditor`] is the one implementation of the list + form +
//! delete + reorder workflow shared by every orderable collection;
//! [`SettingsEditor`] covers singleton sections; [`ImageUploader`] handles
//! image attachments, which are saved independently of the text fields.

pub mod collection;
pub mod image;
pub mod settings;

pub use collection::{CollectionEditor, EditorState, Form, FormMode};
pub use image::{ImageFile, ImageRejection, ImageSlot, ImageUploader};
pub use settings::SettingsEditor;

use crate::api::client::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Caught locally; nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error("no form is open")]
    NoActiveForm,
    #[error("nothing awaiting confirmation")]
    NothingToConfirm,
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error(transparent)]
    ImageRejected(#[from] ImageRejection),
    #[error(transparent)]
    Api(#[from] ApiError),
}
