use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use dialoguer::Confirm;

use super::cli::{AddUserArgs, UpdateUserArgs, UserCommands};
use super::{DeleteOutcome, DirectoryView};
use crate::api::auth;
use crate::api::model::User;
use crate::api::users::{UserGateway, UserSubmission};
use crate::common::config::AdminConfig;
use crate::common::progress::{create_spinner, create_upload_bar};
use crate::session::{FileSessionStore, SessionRepository};
use crate::ui::prelude::*;

pub async fn handle_user_command(command: UserCommands, config: &AdminConfig) -> Result<()> {
    let store = FileSessionStore::open_default()?;
    let mut view = DirectoryView::new(store)?;

    if !auth::is_logged_in(view.store_mut())? {
        emit(
            Level::Error,
            "account.required",
            "Not logged in. Run 'uadm login' first.",
            None,
        );
        std::process::exit(1);
    }

    let token = view.store().token()?;
    let gateway = UserGateway::new(&config.api_url, token)?;

    match command {
        UserCommands::List { cached } => handle_list(&mut view, &gateway, cached).await,
        UserCommands::Search { term } => handle_search(&view, &term),
        UserCommands::Add(args) => handle_add(&mut view, &gateway, args).await,
        UserCommands::Update(args) => handle_update(&mut view, &gateway, args).await,
        UserCommands::Delete { target, yes } => {
            handle_delete(&mut view, &gateway, &target, yes).await
        }
        UserCommands::ResetPassword { email } => handle_reset_password(&gateway, &email).await,
        UserCommands::SetImage { username, file } => {
            handle_set_image(&mut view, &gateway, &username, file).await
        }
    }
}

/// Fetch the listing and apply it to the view. Background refreshes pass
/// `notify_on_success = false` so only explicit loads announce themselves.
async fn refresh_listing(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    notify_on_success: bool,
) -> Result<bool> {
    let generation = view.begin_refresh();
    let spinner = create_spinner("Refreshing user directory...".to_string());

    match gateway.list().await {
        Ok(users) => {
            spinner.finish_and_clear();
            let applied = view.apply_refresh(generation, users)?;
            if applied && notify_on_success {
                notify(
                    Level::Success,
                    "directory.loaded",
                    &format!("{} user(s) loaded successfully.", view.users().len()),
                );
            }
            Ok(true)
        }
        Err(err) => {
            spinner.finish_and_clear();
            view.fail_refresh(generation);
            notify(
                Level::Error,
                "directory.load_failed",
                &err.notification_message(),
            );
            Ok(false)
        }
    }
}

async fn handle_list(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    cached: bool,
) -> Result<()> {
    if !cached && !refresh_listing(view, gateway, true).await? {
        std::process::exit(1);
    }
    render_users(view.users())?;
    Ok(())
}

fn handle_search(view: &DirectoryView<FileSessionStore>, term: &str) -> Result<()> {
    let matches = view.search(term);
    if matches.is_empty() && !term.trim().is_empty() {
        emit(
            Level::Info,
            "directory.search.empty",
            &format!("No users match '{}'.", term.trim()),
            None,
        );
        return Ok(());
    }
    render_users(&matches)?;
    Ok(())
}

async fn handle_add(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    args: AddUserArgs,
) -> Result<()> {
    let user = User {
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        role: args.role,
        enabled: !args.disabled,
        not_locked: !args.locked,
        ..Default::default()
    };
    // A new account has no prior username for the backend to look up
    let submission = UserSubmission::from_user("", &user, args.image);

    match gateway.add(&submission).await {
        Ok(created) => {
            refresh_listing(view, gateway, false).await?;
            notify(
                Level::Success,
                "directory.added",
                &format!("{} added successfully.", created.display_name()),
            );
            Ok(())
        }
        Err(err) => {
            notify(Level::Error, "directory.add_failed", &err.notification_message());
            std::process::exit(1);
        }
    }
}

async fn handle_update(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    args: UpdateUserArgs,
) -> Result<()> {
    let Some(existing) = find_user(view, gateway, &args.username).await? else {
        notify(
            Level::Error,
            "directory.unknown_user",
            &format!("No user named '{}' in the directory.", args.username),
        );
        std::process::exit(1);
    };

    let mut updated = existing.clone();
    if let Some(username) = args.new_username {
        updated.username = username;
    }
    if let Some(first_name) = args.first_name {
        updated.first_name = first_name;
    }
    if let Some(last_name) = args.last_name {
        updated.last_name = last_name;
    }
    if let Some(email) = args.email {
        updated.email = email;
    }
    if let Some(role) = args.role {
        updated.role = role;
    }
    if args.enable {
        updated.enabled = true;
    } else if args.disable {
        updated.enabled = false;
    }
    if args.lock {
        updated.not_locked = false;
    } else if args.unlock {
        updated.not_locked = true;
    }

    // The pre-edit username lets the backend locate the record, so
    // renames stay possible
    let submission = UserSubmission::from_user(&existing.username, &updated, args.image);

    match gateway.update(&submission).await {
        Ok(saved) => {
            refresh_listing(view, gateway, false).await?;
            notify(
                Level::Success,
                "directory.updated",
                &format!("{} updated successfully.", saved.display_name()),
            );
            Ok(())
        }
        Err(err) => {
            notify(
                Level::Error,
                "directory.update_failed",
                &err.notification_message(),
            );
            std::process::exit(1);
        }
    }
}

async fn handle_delete(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    target: &str,
    yes: bool,
) -> Result<()> {
    let deleting_self = view.is_self(target)?;

    if !yes {
        let prompt = if deleting_self {
            format!("Delete your own account '{target}'? You will be logged out.")
        } else {
            format!("Delete user '{target}'?")
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("reading confirmation")?;
        if !confirmed {
            emit(Level::Info, "directory.delete.aborted", "Aborted.", None);
            return Ok(());
        }
    }

    match gateway.delete(target).await {
        Ok(envelope) => match view.conclude_delete(target)? {
            DeleteOutcome::LoggedOut => {
                emit(
                    Level::Info,
                    "account.logged_out",
                    "Your account was deleted and the session closed. Run 'uadm login' to sign in again.",
                    None,
                );
                Ok(())
            }
            DeleteOutcome::NeedsRefresh => {
                refresh_listing(view, gateway, false).await?;
                notify(Level::Success, "directory.deleted", &envelope.message);
                Ok(())
            }
        },
        Err(err) => {
            notify(
                Level::Error,
                "directory.delete_failed",
                &err.notification_message(),
            );
            std::process::exit(1);
        }
    }
}

async fn handle_reset_password(gateway: &UserGateway, email: &str) -> Result<()> {
    match gateway.reset_password(email).await {
        Ok(envelope) => {
            notify(Level::Success, "directory.reset_password", &envelope.message);
            Ok(())
        }
        Err(err) => {
            notify(
                Level::Error,
                "directory.reset_password_failed",
                &err.notification_message(),
            );
            std::process::exit(1);
        }
    }
}

async fn handle_set_image(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    username: &str,
    file: std::path::PathBuf,
) -> Result<()> {
    let Some(existing) = find_user(view, gateway, username).await? else {
        notify(
            Level::Error,
            "directory.unknown_user",
            &format!("No user named '{username}' in the directory."),
        );
        std::process::exit(1);
    };

    let size = std::fs::metadata(&file)
        .with_context(|| format!("reading {}", file.display()))?
        .len();

    let submission = UserSubmission::from_user(&existing.username, &existing, Some(file.clone()));

    let bar = create_upload_bar(size, format!("Uploading {}", file.display()));
    let bar_handle = bar.clone();
    let (tx, rx) = std::sync::mpsc::channel();

    let result = gateway
        .update_profile_image(&submission, move |progress| {
            bar_handle.set_position(progress.loaded);
            let _ = tx.send(progress);
        })
        .await;

    // Replay the progress events into the view state before the terminal
    // transition
    while let Ok(progress) = rx.try_recv() {
        view.record_upload_progress(progress.loaded, progress.total);
    }

    match result {
        Ok(updated) => {
            view.complete_upload(&updated)?;
            bar.finish_and_clear();
            notify(
                Level::Success,
                "directory.image_updated",
                &format!("{}'s profile image updated successfully.", updated.display_name()),
            );
            Ok(())
        }
        Err(err) => {
            bar.finish_and_clear();
            notify(
                Level::Error,
                "directory.image_failed",
                &err.notification_message(),
            );
            std::process::exit(1);
        }
    }
}

/// Look a user up in the cached listing, refreshing it silently when the
/// cache is empty
async fn find_user(
    view: &mut DirectoryView<FileSessionStore>,
    gateway: &UserGateway,
    username: &str,
) -> Result<Option<User>> {
    if view.users().is_empty() && !refresh_listing(view, gateway, false).await? {
        std::process::exit(1);
    }
    Ok(view.users().iter().find(|u| u.username == username).cloned())
}

fn render_users(users: &[User]) -> Result<()> {
    if get_output_format() == OutputFormat::Json {
        println!("{}", serde_json::to_string(users)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Username", "Name", "Email", "Role", "Enabled", "Locked", "Last login",
    ]);

    for user in users {
        table.add_row(vec![
            user.id.to_string(),
            user.username.clone(),
            user.display_name(),
            user.email.clone(),
            user.role.as_str().to_string(),
            if user.enabled { "yes" } else { "no" }.to_string(),
            if user.not_locked { "no" } else { "yes" }.to_string(),
            user.login_date_display
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!("{table}");
    Ok(())
}
