mod credential_file;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tavern_admin::config::{BASE_URL_ENV, ConfigError};
use tavern_admin::types::{
    CurrencyRatePatch, NewAdventure, NewCurrencyRate, NewSignup, NewUser, Role, SignupPatch, SignupStatus, UserQuery,
};
use tavern_admin::{ApiError, Gateway, GatewayConfig, Session, TransportError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::credential_file::FileCredentialStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("cannot locate home directory; pass --credential-file or set TAVERN_ADMIN_CREDENTIAL_FILE")]
    NoCredentialPath,
    #[error("cannot read {}: {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("cannot infer image type of {}; pass --content-type", .0.display())]
    UnknownContentType(PathBuf),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tavern-admin", about = "Tavern admin REST CLI")]
struct Cli {
    #[arg(long, env = BASE_URL_ENV, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[arg(long, env = "TAVERN_ADMIN_CREDENTIAL_FILE", help = "Defaults to ~/.tavern-admin/credential")]
    credential_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a credential for later commands.
    Login {
        login: String,
        #[arg(long, env = "TAVERN_ADMIN_PASSWORD")]
        password: String,
        /// Make one authenticated request and discard the credential if it is rejected.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Forget the stored credential.
    Logout,
    /// Show whether a credential is stored.
    Status,
    Users(UsersCommand),
    Adventures(AdventuresCommand),
    Sessions(SessionsCommand),
    Signups(SignupsCommand),
    Currency(CurrencyCommand),
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    Get {
        id: i64,
    },
    Create {
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long = "role", value_parser = parse_role)]
        roles: Vec<Role>,
    },
    Delete {
        id: i64,
    },
    AddRole {
        id: i64,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    RemoveRole {
        id: i64,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

#[derive(Args, Debug)]
struct AdventuresCommand {
    #[command(subcommand)]
    command: AdventuresSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdventuresSubcommand {
    List,
    Get {
        id: i64,
    },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        dungeon_master_id: Option<i64>,
        #[arg(long)]
        max_players: Option<u32>,
        #[arg(long)]
        starts_at: Option<String>,
    },
    Delete {
        id: i64,
    },
    /// Upload a cover image.
    Cover {
        id: i64,
        path: PathBuf,
        #[arg(long, help = "Defaults to the type implied by the file extension")]
        content_type: Option<String>,
    },
    /// List sign-ups for an adventure.
    Signups {
        id: i64,
    },
    /// List sessions for an adventure.
    Sessions {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct SessionsCommand {
    #[command(subcommand)]
    command: SessionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionsSubcommand {
    List,
    Get { id: i64 },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct SignupsCommand {
    #[command(subcommand)]
    command: SignupsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SignupsSubcommand {
    Create {
        adventure_id: i64,
        user_id: i64,
        #[arg(long, value_parser = parse_status)]
        status: Option<SignupStatus>,
    },
    SetStatus {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: SignupStatus,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct CurrencyCommand {
    #[command(subcommand)]
    command: CurrencySubcommand,
}

#[derive(Subcommand, Debug)]
enum CurrencySubcommand {
    List,
    /// Update the rate, creating the currency if the backend does not know it.
    Set {
        code: String,
        rate: f64,
    },
    Delete {
        code: String,
    },
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        format!("unknown role `{raw}`; expected one of {}", known.join(", "))
    })
}

fn parse_status(raw: &str) -> Result<SignupStatus, String> {
    SignupStatus::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = SignupStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown status `{raw}`; expected one of {}", known.join(", "))
    })
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();

    let credential_path = match cli.credential_file {
        Some(path) => path,
        None => credential_file::default_path().ok_or(CliError::NoCredentialPath)?,
    };
    let session = Session::new(Arc::new(FileCredentialStore::new(credential_path)));
    let config = GatewayConfig::from_env()?.with_base_url(&cli.base_url);
    let gateway = Gateway::native(&config, session)?;

    match cli.command {
        Command::Login { login, password, check } => run_login(&gateway, &login, &password, check).await,
        Command::Logout => {
            gateway.session().clear_credential();
            print_json(&json!({ "authenticated": false }))
        }
        Command::Status => print_json(&json!({
            "authenticated": gateway.session().is_authenticated(),
            "base_url": gateway.base_url(),
        })),
        Command::Users(users) => run_users(&gateway, users.command).await,
        Command::Adventures(adventures) => run_adventures(&gateway, adventures.command).await,
        Command::Sessions(sessions) => run_sessions(&gateway, sessions.command).await,
        Command::Signups(signups) => run_signups(&gateway, signups.command).await,
        Command::Currency(currency) => run_currency(&gateway, currency.command).await,
    }
}

async fn run_login(gateway: &Gateway, login: &str, password: &str, check: bool) -> Result<(), CliError> {
    if login.contains(':') {
        return Err(ApiError::validation("Login must not contain ':'").into());
    }
    gateway.session().set_credential(login, password);
    if check {
        let probe = UserQuery { per_page: Some(1), ..UserQuery::default() };
        if let Err(err) = gateway.users().list(&probe).await {
            if err.is_unauthorized() {
                gateway.session().clear_credential();
            }
            return Err(err.into());
        }
    }
    print_json(&json!({ "authenticated": true, "login": login }))
}

async fn run_users(gateway: &Gateway, command: UsersSubcommand) -> Result<(), CliError> {
    let users = gateway.users();
    match command {
        UsersSubcommand::List { page, per_page, search, role } => {
            let query = UserQuery { page, per_page, search, role };
            print_json(&users.list(&query).await?)
        }
        UsersSubcommand::Get { id } => print_json(&users.get(id).await?),
        UsersSubcommand::Create { login, password, name, email, roles } => {
            let user = NewUser { login, password, name, email, roles };
            print_json(&users.create(&user).await?)
        }
        UsersSubcommand::Delete { id } => {
            users.remove(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        UsersSubcommand::AddRole { id, role } => {
            users.add_role(id, role).await?;
            print_json(&users.get(id).await?)
        }
        UsersSubcommand::RemoveRole { id, role } => {
            users.remove_role(id, role).await?;
            print_json(&users.get(id).await?)
        }
    }
}

async fn run_adventures(gateway: &Gateway, command: AdventuresSubcommand) -> Result<(), CliError> {
    let adventures = gateway.adventures();
    match command {
        AdventuresSubcommand::List => print_json(&adventures.list().await?),
        AdventuresSubcommand::Get { id } => print_json(&adventures.get(id).await?),
        AdventuresSubcommand::Create { title, description, dungeon_master_id, max_players, starts_at } => {
            let adventure = NewAdventure { title, description, dungeon_master_id, max_players, starts_at };
            print_json(&adventures.create(&adventure).await?)
        }
        AdventuresSubcommand::Delete { id } => {
            adventures.remove(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        AdventuresSubcommand::Cover { id, path, content_type } => {
            let content_type = match content_type {
                Some(content_type) => content_type,
                None => content_type_for(&path)
                    .ok_or_else(|| CliError::UnknownContentType(path.clone()))?
                    .to_owned(),
            };
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| CliError::ReadFile { path: path.clone(), source })?;
            print_json(&adventures.upload_cover(id, &content_type, data).await?)
        }
        AdventuresSubcommand::Signups { id } => print_json(&gateway.signups().list_for_adventure(id).await?),
        AdventuresSubcommand::Sessions { id } => print_json(&gateway.sessions().list_for_adventure(id).await?),
    }
}

async fn run_sessions(gateway: &Gateway, command: SessionsSubcommand) -> Result<(), CliError> {
    let sessions = gateway.sessions();
    match command {
        SessionsSubcommand::List => print_json(&sessions.list().await?),
        SessionsSubcommand::Get { id } => print_json(&sessions.get(id).await?),
        SessionsSubcommand::Delete { id } => {
            sessions.remove(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn run_signups(gateway: &Gateway, command: SignupsSubcommand) -> Result<(), CliError> {
    let signups = gateway.signups();
    match command {
        SignupsSubcommand::Create { adventure_id, user_id, status } => {
            let signup = NewSignup { adventure_id, user_id, status };
            print_json(&signups.create_for_adventure(adventure_id, &signup).await?)
        }
        SignupsSubcommand::SetStatus { id, status } => {
            let patch = SignupPatch { status: Some(status) };
            print_json(&signups.patch(id, &patch).await?)
        }
        SignupsSubcommand::Delete { id } => {
            signups.remove(id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

async fn run_currency(gateway: &Gateway, command: CurrencySubcommand) -> Result<(), CliError> {
    let currency = gateway.currency();
    match command {
        CurrencySubcommand::List => print_json(&currency.list().await?),
        CurrencySubcommand::Set { code, rate } => {
            let code = code.to_ascii_uppercase();
            match currency.patch(&code, &CurrencyRatePatch { rate }).await {
                Ok(updated) => print_json(&updated),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(%code, "currency not listed yet, creating");
                    let created = currency.create(&NewCurrencyRate { currency: code, rate }).await?;
                    print_json(&created)
                }
                Err(err) => Err(err.into()),
            }
        }
        CurrencySubcommand::Delete { code } => {
            let code = code.to_ascii_uppercase();
            currency.remove(&code).await?;
            print_json(&json!({ "deleted": code }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
