//! User administration commands
//!
//! Usage:
//!   micasa user add <NAME> [--full-name <FULL_NAME>] [--password <PW>]
//!   micasa user list [SEARCH] [--offset N] [--limit N] [--json]
//!   micasa user delete <ID>
//!   micasa user passwd <ID> [--password <PW>]
//!   micasa user login <NAME> [--password <PW>]
//!
//! Passwords fall back to `MICASA_PASSWORD`.

use clap::{Args, Subcommand};
use micasa_core::{CredentialHasher, ExError, ExErrorKind, User, UserId, UserRepository};
use micasa_core_types::{CancellationToken, Sensitive};
use micasa_store::{SqliteUserRepo, Store};

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user
    Add(AddArgs),
    /// Search users by name or full name
    List(ListArgs),
    /// Delete a user by id
    Delete(DeleteArgs),
    /// Set a new password
    Passwd(PasswdArgs),
    /// Check a name and password
    Login(LoginArgs),
}

#[derive(Debug, Args)]
pub struct PasswordArg {
    /// Password (prefer the environment variable)
    #[arg(long, env = "MICASA_PASSWORD", hide_env_values = true)]
    pub password: Option<Sensitive<String>>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Login name (stored lowercase)
    pub name: String,

    #[arg(long, default_value = "")]
    pub full_name: String,

    #[command(flatten)]
    pub password: PasswordArg,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Substring to match; empty lists everyone
    #[arg(default_value = "")]
    pub search: String,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    #[arg(long, default_value_t = 50)]
    pub limit: u32,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct PasswdArgs {
    pub id: String,

    #[command(flatten)]
    pub password: PasswordArg,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    pub name: String,

    #[command(flatten)]
    pub password: PasswordArg,
}

impl PasswordArg {
    fn require(self) -> Result<Sensitive<String>, ExError> {
        self.password
            .filter(|pw| !pw.is_empty())
            .ok_or_else(|| {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("read_password")
                    .with_message("password required (--password or MICASA_PASSWORD)")
            })
    }
}

/// Execute user command
pub fn execute(
    args: UserArgs,
    store: Store,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = SqliteUserRepo::new(store);
    match args.command {
        UserCommand::Add(add) => execute_add(&repo, add, cancel),
        UserCommand::List(list) => execute_list(&repo, list, cancel),
        UserCommand::Delete(delete) => {
            repo.delete(&UserId::new(delete.id), cancel)?;
            println!("Deleted");
            Ok(())
        }
        UserCommand::Passwd(passwd) => execute_passwd(&repo, passwd, cancel),
        UserCommand::Login(login) => execute_login(&repo, login, cancel),
    }
}

fn execute_add(
    repo: &SqliteUserRepo,
    args: AddArgs,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = args.password.require()?;
    let name = args.name.trim();
    if name.is_empty() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("add_user")
            .with_message("name must not be empty")
            .into());
    }

    let mut user = User::new(name, args.full_name);
    user.set_password(password.expose_str()).map_err(ExError::from)?;
    repo.create(&mut user, cancel)?;

    println!("{}", user.id);
    Ok(())
}

fn execute_list(
    repo: &SqliteUserRepo,
    args: ListArgs,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let users = repo.find(&args.search, args.offset, args.limit, cancel)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    for user in &users {
        println!("{}  {:<16}  {}", user.id, user.name, user.full_name);
    }
    if users.is_empty() {
        println!("No users found");
    }
    Ok(())
}

fn execute_passwd(
    repo: &SqliteUserRepo,
    args: PasswdArgs,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = args.password.require()?;
    let mut user = repo.get_by_id(&UserId::new(args.id), cancel)?;
    user.set_password(password.expose_str()).map_err(ExError::from)?;
    repo.update(&mut user, cancel)?;

    println!("Password updated");
    Ok(())
}

fn execute_login(
    repo: &SqliteUserRepo,
    args: LoginArgs,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = args.password.require()?;
    let mut user = repo.get_by_credentials(&args.name, password.expose_str(), cancel)?;

    // Upgrade hashes made under an older parameter set while the plaintext is at hand
    if CredentialHasher::default().needs_rehash(&user.password_hash) {
        user.set_password(password.expose_str()).map_err(ExError::from)?;
        repo.update(&mut user, cancel)?;
        tracing::info!(user_id = %user.id, "password hash upgraded");
    }

    println!("Authenticated as {} ({})", user.name, user.id);
    Ok(())
}
