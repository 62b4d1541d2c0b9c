//! Command-line front end.
//!
//! ```bash
//! consult-admin login -e admin@site.uz            # password from CONSULT_ADMIN_PASSWORD or -p
//! consult-admin items faq list
//! consult-admin items stats upsert new-stat.json
//! consult-admin settings hero put hero.json
//! consult-admin images upload program cover.webp --id program_1_abcde --language en
//! consult-admin applications list --status new --search Ali
//! consult-admin applications export --out ~/Downloads
//! consult-admin chat watch <od-id>
//! ```
//!
//! Every command except `login` and `logout` validates the stored session
//! first. Irreversible commands refuse to run without `--yes`.

use anyhow::{Context, bail};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::api::models::{Application, ApplicationStatus, ChatMessage, Conversation, User};
use crate::api::resources::{ApplicationsApi, ChatApi};
use crate::app::AppContext;
use crate::chat::{ConversationViewer, HISTORY_PAGE_SIZE, group_by_day, message_time};
use crate::confirm::IRREVERSIBLE_WARNING;
use crate::content::{
    AboutSettings, ContactSettings, Country, FaqItem, FaqSettings, Feature, Hero, Language,
    OrderedItem, Program, SettingsDocument, Stat, Step, Testimonial, Tip, VideoSettings,
};
use crate::editor::{CollectionEditor, ImageFile, ImageSlot, ImageUploader, SettingsEditor};
use crate::events::NoticeKind;
use crate::session::Phase;
use crate::triage::ApplicationTriage;

#[derive(Parser, Debug)]
#[command(name = "consult-admin")]
#[command(author, version, about = "Admin client for the consulting site backend")]
pub struct Cli {
    /// API base URL; overrides CONSULT_ADMIN_API_URL and the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "CONSULT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Change the account password
    Password {
        #[arg(long)]
        current: String,

        #[arg(long = "new")]
        new_password: String,
    },
    /// Edit an orderable content collection
    Items {
        #[arg(value_enum)]
        collection: CollectionKind,

        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Read or replace a singleton page section
    Settings {
        #[arg(value_enum)]
        document: DocumentKind,

        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Upload or remove images
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },
    /// Triage inbound applications
    Applications {
        #[command(subcommand)]
        action: ApplicationsAction,
    },
    /// Visitor chat
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    Stats,
    Features,
    Programs,
    Countries,
    Steps,
    Testimonials,
    Tips,
    Faq,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Hero,
    Video,
    Contact,
    About,
    FaqSettings,
}

#[derive(Subcommand, Debug)]
pub enum ItemsAction {
    /// Print the collection in display order
    List,
    /// Create or update an item from a JSON file (`-` reads stdin); a missing id creates a new item
    Upsert { file: PathBuf },
    /// Delete an item
    Delete {
        id: String,

        #[arg(long)]
        yes: bool,
    },
    /// Set the display order; every id exactly once
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Move the item at one position to another (1-based)
    Move { from: usize, to: usize },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Get,
    /// Merge fields from a JSON file into the document and save it
    Put { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageTarget {
    Hero,
    Program,
    Country,
    Avatar,
    Gallery,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    #[arg(value_enum)]
    pub target: ImageTarget,

    /// Owning item id (program, country, avatar)
    #[arg(long)]
    pub id: Option<String>,

    /// Image language (hero, program, country)
    #[arg(long)]
    pub language: Option<Language>,
}

#[derive(Subcommand, Debug)]
pub enum ImagesAction {
    Upload {
        #[command(flatten)]
        slot: ImageArgs,

        file: PathBuf,
    },
    Delete {
        #[command(flatten)]
        slot: ImageArgs,

        /// Gallery image to remove
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long)]
    pub status: Option<ApplicationStatus>,

    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ApplicationsAction {
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Counts by status
    Stats,
    /// Change the status of one application
    Status { id: String, status: ApplicationStatus },
    /// Change status and/or notes; unset values are kept
    Update {
        id: String,

        #[arg(long)]
        status: Option<ApplicationStatus>,

        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,

        #[arg(long)]
        yes: bool,
    },
    /// Write the listed page to applications_<date>.csv
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChatAction {
    List,
    Show { od_id: String },
    /// Follow the conversation list, and one thread if given, until Ctrl-C
    Watch { od_id: Option<String> },
    Send { od_id: String, text: String },
    Delete {
        od_id: String,

        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = AppContext::load(cli.api_url.as_deref())?;
    let mut notices = ctx.notifier.subscribe();
    let result = dispatch(&ctx, cli.command).await;
    while let Ok(notice) = notices.try_recv() {
        match notice.kind {
            NoticeKind::Success => eprintln!("✓ {}", notice.message),
            NoticeKind::Error => eprintln!("✗ {}", notice.message),
        }
    }
    result
}

async fn dispatch(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = ctx.session_store().login(&email, &password).await?;
            ctx.remember_api_url()?;
            println!("Signed in to {} as {}", ctx.api_url, user.email);
            return Ok(());
        }
        Command::Logout => {
            ctx.session_store().logout();
            println!("Signed out");
            return Ok(());
        }
        _ => {}
    }

    let user = require_session(ctx).await?;
    match command {
        Command::Login { .. } | Command::Logout => {}
        Command::Whoami => print_user(ctx, &user),
        Command::Password {
            current,
            new_password,
        } => {
            ctx.session_store()
                .change_password(&current, &new_password)
                .await?;
            println!("Password changed");
        }
        Command::Items { collection, action } => match collection {
            CollectionKind::Stats => items::<Stat>(ctx, action).await?,
            CollectionKind::Features => items::<Feature>(ctx, action).await?,
            CollectionKind::Programs => items::<Program>(ctx, action).await?,
            CollectionKind::Countries => items::<Country>(ctx, action).await?,
            CollectionKind::Steps => items::<Step>(ctx, action).await?,
            CollectionKind::Testimonials => items::<Testimonial>(ctx, action).await?,
            CollectionKind::Tips => items::<Tip>(ctx, action).await?,
            CollectionKind::Faq => items::<FaqItem>(ctx, action).await?,
        },
        Command::Settings { document, action } => match document {
            DocumentKind::Hero => settings::<Hero>(ctx, action).await?,
            DocumentKind::Video => settings::<VideoSettings>(ctx, action).await?,
            DocumentKind::Contact => settings::<ContactSettings>(ctx, action).await?,
            DocumentKind::About => settings::<AboutSettings>(ctx, action).await?,
            DocumentKind::FaqSettings => settings::<FaqSettings>(ctx, action).await?,
        },
        Command::Images { action } => images(ctx, action).await?,
        Command::Applications { action } => applications(ctx, action).await?,
        Command::Chat { action } => chat(ctx, action).await?,
    }
    Ok(())
}

/// Route guard: validates the stored token against the backend.
async fn require_session(ctx: &AppContext) -> anyhow::Result<User> {
    ctx.session_store().check_auth().await;
    ctx.session
        .require_user()
        .context("not signed in; run `consult-admin login` first")
}

fn confirm(yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("{}. Re-run with --yes to confirm.", IRREVERSIBLE_WARNING);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Copies the fields of `patch` over `base`. An empty `id` in the patch is ignored.
fn overlay<T: Serialize + DeserializeOwned>(base: &T, patch: &Value) -> anyhow::Result<T> {
    let mut merged = serde_json::to_value(base)?;
    let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) else {
        bail!("expected a JSON object");
    };
    for (key, value) in fields {
        if key == "id" && value.as_str().is_some_and(str::is_empty) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
    Ok(serde_json::from_value(merged)?)
}

fn print_user(ctx: &AppContext, user: &User) {
    println!("{}", user.email);
    if let Some(name) = &user.name {
        println!("  name: {}", name);
    }
    if let Some(role) = &user.role {
        println!("  role: {}", role);
    }
    println!("  api:  {}", ctx.api_url);
}

async fn items<T: OrderedItem>(ctx: &AppContext, action: ItemsAction) -> anyhow::Result<()> {
    let mut editor =
        CollectionEditor::<T>::new(ctx.gateway.clone(), ctx.query.clone(), ctx.notifier.clone());
    editor.load().await?;
    match action {
        ItemsAction::List => print_json(editor.items())?,
        ItemsAction::Upsert { file } => {
            let patch = read_json(&file)?;
            let existing = patch
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| editor.get(id).is_some())
                .map(str::to_string);
            match &existing {
                Some(id) => {
                    editor.begin_edit(id);
                }
                None => {
                    editor.begin_add();
                }
            }
            let draft = editor
                .form()
                .map(|form| form.draft.clone())
                .context("no open form")?;
            let merged = overlay(&draft, &patch)?;
            let id = merged.id().to_string();
            if let Some(draft) = editor.draft_mut() {
                *draft = merged;
            }
            editor.submit().await?;
            match editor.get(&id) {
                Some(saved) => print_json(saved)?,
                None => println!("{} {} saved", T::DESCRIPTOR.label, id),
            }
        }
        ItemsAction::Delete { id, yes } => {
            confirm(yes)?;
            editor.request_delete(&id);
            editor.confirm_delete().await?;
        }
        ItemsAction::Reorder { ids } => {
            editor.reorder(ids).await?;
            print_order(editor.items());
        }
        ItemsAction::Move { from, to } => {
            if from == 0 || to == 0 {
                bail!("positions start at 1");
            }
            editor.move_item(from - 1, to - 1).await?;
            print_order(editor.items());
        }
    }
    Ok(())
}

fn print_order<T: OrderedItem>(items: &[T]) {
    for item in items {
        println!("{:>3}  {}", item.order(), item.id());
    }
}

async fn settings<T: SettingsDocument>(ctx: &AppContext, action: SettingsAction) -> anyhow::Result<()> {
    let mut editor =
        SettingsEditor::<T>::new(ctx.gateway.clone(), ctx.query.clone(), ctx.notifier.clone());
    editor.load().await?;
    match action {
        SettingsAction::Get => print_json(editor.saved())?,
        SettingsAction::Put { file } => {
            let patch = read_json(&file)?;
            let merged = overlay(editor.saved(), &patch)?;
            *editor.draft_mut() = merged;
            if !editor.is_dirty() {
                println!("{}: nothing to change", T::LABEL);
                return Ok(());
            }
            editor.save().await?;
            print_json(editor.saved())?;
        }
    }
    Ok(())
}

fn image_slot(args: &ImageArgs) -> anyhow::Result<ImageSlot> {
    let id = || args.id.clone().context("--id is required for this image");
    let language = || args.language.context("--language is required for this image");
    Ok(match args.target {
        ImageTarget::Hero => ImageSlot::Hero(language()?),
        ImageTarget::Program => ImageSlot::Program {
            id: id()?,
            language: language()?,
        },
        ImageTarget::Country => ImageSlot::Country {
            id: id()?,
            language: language()?,
        },
        ImageTarget::Avatar => ImageSlot::TestimonialAvatar { id: id()? },
        ImageTarget::Gallery => ImageSlot::AboutGallery,
    })
}

async fn images(ctx: &AppContext, action: ImagesAction) -> anyhow::Result<()> {
    let uploader =
        ImageUploader::new(ctx.gateway.clone(), ctx.query.clone(), ctx.notifier.clone());
    match action {
        ImagesAction::Upload { slot, file } => {
            let slot = image_slot(&slot)?;
            let image = ImageFile::from_path(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let url = uploader.upload(&slot, image).await?;
            println!("{}", url);
        }
        ImagesAction::Delete { slot, url, yes } => {
            let slot = image_slot(&slot)?;
            if slot == ImageSlot::AboutGallery && url.is_none() {
                bail!("--url is required to remove a gallery image");
            }
            confirm(yes)?;
            uploader.remove(&slot, url.as_deref()).await?;
        }
    }
    Ok(())
}

fn apply_filter(triage: &mut ApplicationTriage, filter: &FilterArgs) {
    triage.set_status(filter.status);
    triage.set_search(filter.search.as_deref().unwrap_or_default());
    triage.set_page(filter.page);
}

fn print_application(app: &Application) {
    println!(
        "{}  {:<13}  {:<24}  {:<15}  {:<14}  {}",
        app.created_at.with_timezone(&Local).format("%d.%m.%Y %H:%M"),
        app.status.label(),
        app.name,
        app.phone,
        app.country,
        app.id
    );
    if !app.notes.is_empty() {
        println!("    {}", app.notes);
    }
}

async fn applications(ctx: &AppContext, action: ApplicationsAction) -> anyhow::Result<()> {
    let mut triage =
        ApplicationTriage::new(ctx.gateway.clone(), ctx.query.clone(), ctx.notifier.clone());
    match action {
        ApplicationsAction::List { filter } => {
            apply_filter(&mut triage, &filter);
            let page = triage.load().await?;
            for app in &page.items {
                print_application(app);
            }
            println!(
                "page {}/{}, {} total",
                page.pagination.page,
                page.pagination.pages.max(1),
                page.pagination.total
            );
        }
        ApplicationsAction::Stats => {
            let stats = triage.load_stats().await?;
            for status in ApplicationStatus::ALL {
                println!("{:<14} {}", status.label(), stats.count(status));
            }
            println!("{:<14} {}", "Jami", stats.total);
        }
        ApplicationsAction::Status { id, status } => {
            triage.update_status(&id, status).await?;
        }
        ApplicationsAction::Update { id, status, notes } => {
            let current = ApplicationsApi::new(ctx.gateway.clone()).get(&id).await?;
            let status = status.unwrap_or(current.status);
            let notes = notes.unwrap_or(current.notes);
            triage.update_detail(&id, status, &notes).await?;
        }
        ApplicationsAction::Delete { id, yes } => {
            confirm(yes)?;
            triage.request_delete(&id);
            triage.confirm_delete().await?;
        }
        ApplicationsAction::Export { filter, out } => {
            apply_filter(&mut triage, &filter);
            let rows = triage.load().await?.items.len();
            let export = triage
                .export_csv(Utc::now())
                .context("no page loaded")?;
            let path = out.join(&export.file_name);
            fs::write(&path, export.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} ({} rows)", path.display(), rows);
        }
    }
    Ok(())
}

fn print_conversation(c: &Conversation) {
    let who = if c.last_message_is_user { "visitor" } else { "you" };
    let unread = if c.unread_count > 0 {
        format!(" [{}]", c.unread_count)
    } else {
        String::new()
    };
    println!(
        "{}  {}{}  {}: {}",
        c.last_message_time.with_timezone(&Local).format("%d.%m %H:%M"),
        c.od_id,
        unread,
        who,
        c.last_message
    );
}

fn print_message(m: &ChatMessage) {
    let who = if m.is_user { "visitor" } else { "you" };
    println!("  {} {:>7}: {}", message_time(m.created_at, &Local), who, m.text);
}

fn print_history(messages: &[ChatMessage]) {
    for group in group_by_day(messages, &Local::now()) {
        println!("-- {} --", group.label);
        for m in &group.messages {
            print_message(m);
        }
    }
}

async fn chat(ctx: &AppContext, action: ChatAction) -> anyhow::Result<()> {
    let mut viewer = ConversationViewer::new(
        ctx.gateway.clone(),
        ctx.query.clone(),
        ctx.notifier.clone(),
    );
    match action {
        ChatAction::List => {
            viewer.refresh_list().await?;
            for c in viewer.conversations() {
                print_conversation(&c);
            }
            println!("unread: {}", viewer.unread_total());
        }
        ChatAction::Show { od_id } => {
            let history = ChatApi::new(ctx.gateway.clone())
                .history(&od_id, 1, HISTORY_PAGE_SIZE)
                .await?;
            if history.has_more {
                println!("(older messages not shown)");
            }
            print_history(&history.messages);
        }
        ChatAction::Watch { od_id } => watch(ctx, &mut viewer, od_id.as_deref()).await?,
        ChatAction::Send { od_id, text } => {
            viewer.select(&od_id);
            let sent = viewer.send_message(&text).await;
            viewer.stop();
            print_message(&sent?);
        }
        ChatAction::Delete { od_id, yes } => {
            confirm(yes)?;
            viewer.request_delete(&od_id);
            viewer.confirm_delete().await?;
        }
    }
    Ok(())
}

async fn watch(ctx: &AppContext, viewer: &mut ConversationViewer, od_id: Option<&str>) -> anyhow::Result<()> {
    let mut conversations = viewer.subscribe_conversations();
    let mut messages = viewer.subscribe_messages();
    let mut session = ctx.session.subscribe();
    let mut shown: HashSet<String> = HashSet::new();
    viewer.start();
    if let Some(od_id) = od_id {
        viewer.select(od_id);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = conversations.changed() => {
                let list = conversations.borrow_and_update().clone();
                println!("== {} conversations ==", list.len());
                for c in &list {
                    print_conversation(c);
                }
            }
            Ok(()) = messages.changed() => {
                let list = messages.borrow_and_update().clone();
                for m in list.iter().filter(|m| !shown.contains(&m.id)) {
                    print_message(m);
                }
                shown.extend(list.into_iter().map(|m| m.id));
            }
            Ok(()) = session.changed() => {
                if session.borrow_and_update().phase() == Phase::Anonymous {
                    viewer.stop();
                    bail!("session expired; sign in again");
                }
            }
        }
    }
    viewer.stop();
    Ok(())
}
