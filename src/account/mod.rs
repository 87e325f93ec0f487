use anyhow::{Context, Result};
use dialoguer::{Input, Password};

use crate::api::auth::{self, AuthGateway, Credentials};
use crate::api::model::User;
use crate::common::config::AdminConfig;
use crate::common::progress::create_spinner;
use crate::session::{FileSessionStore, SessionRepository};
use crate::ui::prelude::*;

pub async fn handle_login(username: Option<String>, config: &AdminConfig) -> Result<()> {
    let mut store = FileSessionStore::open_default()?;

    let username = match username {
        Some(username) => username,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .context("reading username")?,
    };
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("reading password")?;

    let gateway = AuthGateway::new(&config.api_url)?;
    let spinner = create_spinner("Logging in...".to_string());

    match gateway.login(&Credentials { username, password }).await {
        Ok(outcome) => {
            spinner.finish_and_clear();
            store.save_token(&outcome.token)?;
            store.cache_user(&outcome.user)?;
            notify(
                Level::Success,
                "account.login",
                &format!("Logged in as {}.", outcome.user.username),
            );
            Ok(())
        }
        Err(err) => {
            spinner.finish_and_clear();
            notify(Level::Error, "account.login_failed", &err.notification_message());
            std::process::exit(1);
        }
    }
}

pub fn handle_logout() -> Result<()> {
    let mut store = FileSessionStore::open_default()?;
    auth::log_out(&mut store)?;
    emit(Level::Success, "account.logout", "Logged out.", None);
    Ok(())
}

pub async fn handle_register(
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    config: &AdminConfig,
) -> Result<()> {
    let gateway = AuthGateway::new(&config.api_url)?;

    let new_user = User {
        username,
        first_name,
        last_name,
        email,
        ..Default::default()
    };

    match gateway.register(&new_user).await {
        Ok(created) => {
            notify(
                Level::Success,
                "account.registered",
                &format!(
                    "{} registered successfully. Check {} for the generated password.",
                    created.display_name(),
                    created.email
                ),
            );
            Ok(())
        }
        Err(err) => {
            notify(
                Level::Error,
                "account.register_failed",
                &err.notification_message(),
            );
            std::process::exit(1);
        }
    }
}

/// Report the cached identity. Checking login state purges a stale
/// session as a side effect, so a dead token also cleans up here.
pub fn handle_whoami() -> Result<()> {
    let mut store = FileSessionStore::open_default()?;

    if !auth::is_logged_in(&mut store)? {
        emit(Level::Info, "account.anonymous", "Not logged in.", None);
        return Ok(());
    }

    let Some(user) = store.cached_user()? else {
        emit(
            Level::Warn,
            "account.no_profile",
            "Logged in, but no cached profile. Run 'uadm user list' to refresh.",
            None,
        );
        return Ok(());
    };

    if get_output_format() == OutputFormat::Json {
        println!("{}", serde_json::to_string(&user)?);
        return Ok(());
    }

    println!("{} ({})", user.display_name(), user.username);
    println!("  email: {}", user.email);
    println!("  role:  {}", user.role);
    let caps = user.capabilities();
    println!(
        "  can:   read{}{}{}",
        if caps.can_create { ", create" } else { "" },
        if caps.can_update { ", update" } else { "" },
        if caps.can_delete { ", delete" } else { "" },
    );
    Ok(())
}
