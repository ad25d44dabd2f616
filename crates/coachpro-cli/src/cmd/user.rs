use clap::Subcommand;
use coachpro_core::{auth, db, types::Role};
use std::path::Path;

use crate::output::{or_dash, print_json, print_table};

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Create a user
    Add {
        login: String,
        /// Display name (default: the login)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// administrator | editor | author | subscriber | coachpro_student | coachpro_coach | coachpro_admin
        #[arg(long, default_value = "coachpro_student")]
        role: String,
    },
    /// List all users
    List,
    /// Change a user's role
    Role { login: String, role: String },
    /// Issue a bearer token for the API
    Token { login: String },
}

pub fn run(root: &Path, subcmd: UserSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        UserSubcommand::Add {
            login,
            name,
            email,
            role,
        } => add(root, &login, name.as_deref(), email.as_deref(), &role, json),
        UserSubcommand::List => list(root, json),
        UserSubcommand::Role { login, role } => set_role(root, &login, &role, json),
        UserSubcommand::Token { login } => token(root, &login, json),
    }
}

fn add(
    root: &Path,
    login: &str,
    name: Option<&str>,
    email: Option<&str>,
    role: &str,
    json: bool,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let (_, mut store) = super::open(root)?;
    let user = store.create_user(login, name.unwrap_or(login), email, role)?;
    if json {
        print_json(&user)
    } else {
        println!("Created user '{}' (id {}, {})", user.login, user.id, user.role);
        Ok(())
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = super::open(root)?;
    let users = store.list_users()?;
    if json {
        return print_json(&users);
    }
    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }
    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.login.clone(),
                u.display_name.clone(),
                or_dash(u.email.as_deref()),
                u.role.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "LOGIN", "NAME", "EMAIL", "ROLE"], rows);
    Ok(())
}

fn set_role(root: &Path, login: &str, role: &str, json: bool) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let (_, mut store) = super::open(root)?;
    let user = store.set_user_role(login, role)?;
    if json {
        print_json(&user)
    } else {
        println!("'{}' is now {}", user.login, user.role);
        Ok(())
    }
}

fn token(root: &Path, login: &str, json: bool) -> anyhow::Result<()> {
    let (config, store) = super::open(root)?;
    let user = store.find_user_by_login(login)?;
    let ttl = config.auth.token_ttl();
    let token = auth::issue_token(config.auth.key(), user.id, ttl, db::now());
    if json {
        print_json(&serde_json::json!({
            "user_id": user.id,
            "token": token,
            "expires_in_hours": ttl.num_hours(),
        }))
    } else {
        println!("{token}");
        Ok(())
    }
}
