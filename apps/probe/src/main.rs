use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use session_core::{
    load_settings, ControllerSettings, MemoryPage, PageDeps, PageLayout, Session, SessionState,
    SessionUi, SupabaseClientFactory, Untranslated,
};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drives the session controller against a running origin on a headless page.
#[derive(Parser, Debug)]
struct Args {
    /// Origin serving `/api/auth/config`; overrides settings and env.
    #[arg(long)]
    origin: Option<String>,
    /// JSON session as stored by the browser, restored into the auth client.
    #[arg(long)]
    session: Option<PathBuf>,
    /// TOML page layout; defaults to the chat page.
    #[arg(long)]
    layout: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the session and print the projected page.
    Check,
    /// Click the logout control and report where the page navigated.
    Logout,
    /// Click the first profile trigger and print the dialog state.
    OpenProfile,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let settings = match &args.origin {
        Some(origin) => ControllerSettings::with_origin(origin)?,
        None => load_settings()?,
    };
    let layout = match &args.layout {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display()))?;
            PageLayout::from_toml_str(&raw)?
        }
        None => PageLayout::chat_page(),
    };

    let http = reqwest::Client::new();
    let factory = match &args.session {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read session {}", path.display()))?;
            let session: Session =
                serde_json::from_str(&raw).context("session file is not valid JSON")?;
            SupabaseClientFactory::with_session(http.clone(), session)
        }
        None => SupabaseClientFactory::new(http.clone()),
    };

    let page = MemoryPage::with_elements(layout.element_ids());
    let deps = PageDeps {
        page: Arc::new(page.clone()),
        navigator: Arc::new(page.clone()),
        factory: Arc::new(factory),
        translator: Arc::new(Untranslated),
        layout: layout.clone(),
    };
    let ui = SessionUi::start_with_http(&settings, deps, http).await;
    info!(origin = %settings.origin, "probe started");

    match args.command {
        Command::Check => {
            print_state(&ui.state());
            print_page(&page);
        }
        Command::Logout => {
            if !page.click(&layout.profile.logout) {
                bail!("page has no '{}' control", layout.profile.logout);
            }
            let mut states = WatchStream::new(ui.controller.watch());
            tokio::time::timeout(settings.client_wait * 2, async {
                while let Some(state) = states.next().await {
                    if state == SessionState::Unauthenticated && page.location().is_some() {
                        break;
                    }
                }
            })
            .await
            .context("logout did not complete")?;
            print_state(&ui.state());
            println!("navigated to {}", page.location().unwrap_or_default());
        }
        Command::OpenProfile => {
            let Some(trigger) = layout.surfaces.iter().find_map(|s| s.user_trigger.clone()) else {
                bail!("layout has no profile trigger");
            };
            page.click(&trigger);
            tokio::time::sleep(settings.modal_open_delay + Duration::from_millis(50)).await;
            let visibility = ui.modal.visibility();
            println!(
                "profile dialog: displayed={} animating_in={}",
                visibility.displayed, visibility.animating_in
            );
            print_page(&page);
        }
    }

    Ok(())
}

fn print_state(state: &SessionState) {
    match state {
        SessionState::Authenticated {
            user_id,
            email,
            avatar_url,
        } => println!(
            "authenticated user={user_id} email={} avatar={avatar_url}",
            email.as_deref().unwrap_or("-")
        ),
        SessionState::Unauthenticated => println!("unauthenticated"),
        SessionState::Unknown => println!("unknown"),
    }
}

fn print_page(page: &MemoryPage) {
    for (id, element) in page.render() {
        let mut line = format!(
            "{id:<20} {}",
            if element.visible { "shown " } else { "hidden" }
        );
        if !element.text.is_empty() {
            line.push_str(&format!(" text={:?}", element.text));
        }
        for (name, value) in &element.attributes {
            line.push_str(&format!(" {name}={value:?}"));
        }
        if !element.classes.is_empty() {
            let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
            line.push_str(&format!(" class={}", classes.join(" ")));
        }
        println!("{line}");
    }
}
