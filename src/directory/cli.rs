use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::api::model::Role;

pub fn parse_role(name: &str) -> Result<Role, String> {
    Role::from_name(name).ok_or_else(|| {
        format!(
            "unknown role '{name}' (expected one of USER, HR, MANAGER, ADMIN, SUPER_ADMIN)"
        )
    })
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List all users in the directory
    List {
        /// Show the cached listing without contacting the backend
        #[arg(long)]
        cached: bool,
    },

    /// Filter the cached listing by first name, last name or username
    Search {
        /// Substring to match, case-insensitive. An empty term shows the
        /// full listing.
        #[arg(default_value = "")]
        term: String,
    },

    /// Create a new user account
    Add(AddUserArgs),

    /// Update an existing account
    Update(UpdateUserArgs),

    /// Delete an account by id or username
    Delete {
        /// Numeric id or username of the account
        target: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask the backend to email a new password
    ResetPassword {
        email: String,
    },

    /// Upload a new profile image for an account
    SetImage {
        username: String,
        /// Image file to upload
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct AddUserArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    /// Role for the new account
    #[arg(long, value_parser = parse_role, default_value = "USER")]
    pub role: Role,
    /// Create the account disabled
    #[arg(long)]
    pub disabled: bool,
    /// Create the account locked
    #[arg(long)]
    pub locked: bool,
    /// Profile image to attach
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UpdateUserArgs {
    /// Username of the account to change
    pub username: String,
    /// New username
    #[arg(long = "rename-to")]
    pub new_username: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, value_parser = parse_role)]
    pub role: Option<Role>,
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,
    #[arg(long)]
    pub disable: bool,
    #[arg(long, conflicts_with = "unlock")]
    pub lock: bool,
    #[arg(long)]
    pub unlock: bool,
    /// Replace the profile image
    #[arg(long)]
    pub image: Option<PathBuf>,
}
