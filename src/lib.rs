//! Headless admin client for the consulting site's content API.
//!
//! [`app::AppContext`] wires everything: a [`api::Gateway`] shared by all
//! screens, the [`session`] state it closes on a 401, the [`query`] cache,
//! and the [`events::Notifier`] that carries operator-facing notices.
//! Screens are plain structs: [`editor::CollectionEditor`] and
//! [`editor::SettingsEditor`] for site content, [`triage::ApplicationTriage`]
//! for leads, and [`chat::ConversationViewer`] for visitor chat.

pub mod api;
pub mod app;
pub mod chat;
pub mod cli;
pub mod confirm;
pub mod content;
pub mod editor;
pub mod events;
pub mod query;
pub mod session;
pub mod storage;
pub mod triage;
pub mod utils;

#[cfg(test)]
mod testing;
