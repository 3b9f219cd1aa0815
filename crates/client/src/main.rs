//! `eventhub` command-line shell.
//!
//! Each invocation restores the persisted session, performs one action and
//! prints the resulting view and navbar.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use eventhub_client::{
    ClientConfig, FileStorage, HttpAuthGateway, IdentityStore, Navbar, Navigation, Navigator,
    View,
};

#[derive(Parser, Debug)]
#[command(name = "eventhub")]
#[command(about = "Session shell for the event management API")]
struct Cli {
    /// Event API base URL (overrides EVENTHUB_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Session state directory (overrides EVENTHUB_STATE_DIR)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current identity
    Whoami,
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Continue as a guest
    Guest {
        /// Display name for the guest session
        #[arg(long)]
        name: Option<String>,
    },
    /// End the current session
    Logout,
    /// Navigate to a path, e.g. /create-event
    Visit { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eventhub_observability::init_with_default("warn");

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url)?;
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }

    let storage = FileStorage::open(&config.state_dir)
        .with_context(|| format!("opening session state in {}", config.state_dir.display()))?;
    let gateway = HttpAuthGateway::new(&config.api_url, config.http_timeout)?;

    let store = IdentityStore::new(Arc::new(storage), Arc::new(gateway));
    store.restore();
    let navigator = Navigator::new(store);

    match cli.command {
        Command::Whoami => {
            let identity = navigator.store().current_identity();
            println!("identity: {}", identity.kind());
            if let Some(name) = identity.display_name() {
                println!("name:     {name}");
            }
            if let Some(role) = identity.role() {
                println!("role:     {role}");
            }
        }
        Command::Login { email, password } => {
            let navigation = navigator.submit_login(&email, &password).await?;
            report(&navigation);
        }
        Command::Guest { name } => {
            let navigation = match name {
                Some(name) => {
                    navigator.store().guest_login_as(&name);
                    navigator.go(View::Dashboard)
                }
                None => navigator.continue_as_guest(),
            };
            report(&navigation);
        }
        Command::Logout => report(&navigator.logout()),
        Command::Visit { path } => report(&navigator.navigate(&path)),
    }

    print_navbar(&Navbar::for_identity(&navigator.store().current_identity()));
    Ok(())
}

fn report(navigation: &Navigation) {
    if navigation.was_redirected() {
        println!(
            "{} -> redirected to {} ({})",
            navigation.requested.path(),
            navigation.view.path(),
            navigation.view.title()
        );
    } else {
        println!("{} ({})", navigation.view.path(), navigation.view.title());
    }
}

fn print_navbar(navbar: &Navbar) {
    println!();
    println!("[{}] {}", navbar.brand.label, navbar.labels().join(" | "));
    if let Some(name) = &navbar.signed_in_as {
        println!("signed in as {name}");
    }
}
