use clap::Parser;
use color_eyre::eyre::{self, eyre};
use range_console::{Console, ConsoleError};
use range_sdk::{Access, AdminClient, FileSessionStore, Router, Session, SessionGuard, HOME_PATH, LOGIN_PATH};
use std::sync::Arc;
use tracing::{debug, info};

mod config;
mod render;

use config::{Command, ConsoleConfig};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ConsoleConfig::parse();
    debug!(api_url = %config.api_url, session_file = %config.session_file.display(), "Loaded configuration");

    let store = Arc::new(FileSessionStore::new(config.session_file.clone()));
    let session = Arc::new(Session::new(store));
    session.init()?;

    let router = Arc::new(Router::new(start_location(&config.command)));
    let guard = Arc::new(SessionGuard::new(session.clone(), router));
    let client = Arc::new(AdminClient::with_timeout(
        config.api_url.clone(),
        guard.clone(),
        config.timeout(),
    )?);

    match config.command {
        Command::Login { username, password } => {
            let login = client.login(&username, &password).await?;
            guard.login(&login.token, &login.admin)?;
            info!(username = %login.admin.username, "Logged in");
            println!("Logged in as {}", render::identity(&login.admin));
        }
        Command::Logout => {
            guard.logout()?;
            println!("Logged out");
        }
        Command::Whoami => match session.identity() {
            Some(admin) => println!("{}", render::identity(&admin)),
            None => println!("Not logged in"),
        },
        Command::Instances(list) => {
            let Some(mut console) = mount(client, &guard, list.query())? else {
                return Ok(());
            };
            console.settle().await;
            report_list_error(&console, &guard)?;

            let registry = console.registry();
            println!(
                "{}",
                render::instance_table(
                    registry.rows(),
                    registry.total(),
                    registry.query().page,
                    registry.query().page_size
                )
            );
        }
        Command::Inspect { instance_id, tail, list } => {
            let Some(mut console) = mount(client, &guard, list.query())? else {
                return Ok(());
            };
            console.settle().await;
            report_list_error(&console, &guard)?;

            console.expand_with_tail(&instance_id, tail)?;
            console.settle().await;
            if !guard.is_authed() {
                return Err(eyre!("Session expired, run `range-admin login` again"));
            }
            let panel = console
                .panel(&instance_id)
                .ok_or_else(|| eyre!("Instance {instance_id} was removed from the page"))?;
            print!("{}", render::panel(panel));
        }
        Command::Overview => {
            if guard.require_auth() != Access::Granted {
                println!("Not logged in, run `range-admin login` first");
                return Ok(());
            }
            let stats = client.overview_stats().await?;
            print!("{}", render::overview(&stats));
        }
        Command::Submissions(args) => {
            if guard.require_auth() != Access::Granted {
                println!("Not logged in, run `range-admin login` first");
                return Ok(());
            }
            let page = client.list_submissions(&args.query()).await?;
            println!(
                "{}",
                render::submission_table(&page.list, page.total, page.page, page.page_size)
            );
        }
    }

    Ok(())
}

/// The console surface a subcommand stands on.
fn start_location(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => LOGIN_PATH,
        Command::Overview => HOME_PATH,
        Command::Submissions(_) => "/admin/submissions",
        _ => "/admin/instances",
    }
}

fn mount(
    client: Arc<AdminClient>,
    guard: &SessionGuard,
    query: range_common::InstanceQuery,
) -> eyre::Result<Option<Console>> {
    match Console::with_query(client, guard, query) {
        Ok(console) => Ok(Some(console)),
        Err(ConsoleError::NotAuthenticated) => {
            println!("Not logged in, run `range-admin login` first");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn report_list_error(console: &Console, guard: &SessionGuard) -> eyre::Result<()> {
    if !guard.is_authed() {
        return Err(eyre!("Session expired, run `range-admin login` again"));
    }
    match console.registry().error() {
        Some(error) => Err(eyre!("Failed to load instances: {error}")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_of(args: &[&str]) -> &'static str {
        start_location(&ConsoleConfig::try_parse_from(args).unwrap().command)
    }

    #[test]
    fn test_start_locations() {
        assert_eq!(location_of(&["range-admin", "overview"]), HOME_PATH);
        assert_eq!(location_of(&["range-admin", "login", "-u", "admin", "-p", "x"]), LOGIN_PATH);
        assert_eq!(location_of(&["range-admin", "instances"]), "/admin/instances");
    }
}
