use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use petstore_client::{
    Acceptance, Backoff, DEFAULT_BASE_URL, DEFAULT_MAX_ATTEMPTS, HttpTransport, Method, Order,
    OrderStatus, ResourceClient, ResourceId, RetryOn, RetryPolicy, StatusCode, StoreApi,
    SuccessStatus, User, UserApi,
};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "petstore-cli",
    version,
    about = "Small blocking CLI for the Swagger pet-store API"
)]
struct Cli {
    /// Base URL for the API.
    #[arg(long, env = "PETSTORE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Maximum attempts per call, including the first.
    #[arg(long, env = "PETSTORE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Poll until exactly 200 OK, retrying every other status without delay.
    #[arg(long)]
    until_ok: bool,

    /// Per-request network timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Upper bound in seconds on the total time spent retrying one call.
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full user and order walkthrough against the service.
    Demo,
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage store orders.
    #[command(subcommand)]
    Order(OrderCommand),
    /// Show pet counts by status.
    Inventory,
    /// Send a raw request to an endpoint.
    Request(RequestArgs),
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Create a user from a JSON body.
    Create(BodyInput),
    /// Fetch a user by name.
    Get { username: String },
    /// Replace a user's data from a JSON body.
    Update {
        username: String,
        #[command(flatten)]
        body: BodyInput,
    },
    /// Delete a user by name.
    Delete { username: String },
}

#[derive(Debug, Subcommand)]
enum OrderCommand {
    /// Place an order from a JSON body.
    Create(BodyInput),
    /// Fetch an order by id.
    Get { id: i64 },
    /// Delete an order by id.
    Delete { id: i64 },
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// HTTP method (GET, POST, DELETE).
    method: String,

    /// Endpoint path relative to the base URL (for example: store/order).
    endpoint: String,

    /// Resource identifier appended to the endpoint.
    #[arg(long)]
    id: Option<String>,

    /// Treat the first response as final, whatever its status.
    #[arg(long)]
    accept_any_status: bool,

    #[command(flatten)]
    body: BodyInput,
}

#[derive(Debug, Args)]
struct BodyInput {
    /// JSON request body literal.
    #[arg(long, conflicts_with = "body_file")]
    body_json: Option<String>,

    /// Path to a file containing a JSON request body.
    #[arg(long, value_name = "PATH", conflicts_with = "body_json")]
    body_file: Option<PathBuf>,
}

/// Entry point for the CLI.
///
/// Parses arguments, installs logging, builds the client, dispatches the
/// subcommand and prints JSON output.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = build_client(&cli).context("failed to create client")?;

    let output = match &cli.command {
        Command::Demo => return run_demo(&client, cli.compact),
        Command::User(command) => run_user(client, command)?,
        Command::Order(command) => run_order(client, command)?,
        Command::Inventory => to_json(
            &StoreApi::from_client(client)
                .get_inventory()
                .context("failed to fetch inventory")?,
        )?,
        Command::Request(args) => send_request(&client, args)
            .with_context(|| format!("request failed: {} {}", args.method, args.endpoint))?,
    };

    print_json(&output, cli.compact).context("failed to print JSON output")?;
    Ok(())
}

/// Installs a stderr `fmt` subscriber so stdout carries only JSON.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(cli: &Cli) -> Result<ResourceClient> {
    let mut transport = HttpTransport::builder();
    if let Some(secs) = cli.timeout_secs {
        transport = transport.timeout(Duration::from_secs(secs));
    }

    let mut retry = RetryPolicy::builder().max_attempts(cli.max_attempts);
    if cli.until_ok {
        retry = retry
            .success(SuccessStatus::Exactly(StatusCode::OK))
            .retry_on(RetryOn::AnyFailure)
            .backoff(Backoff::none());
    }
    if let Some(secs) = cli.deadline_secs {
        retry = retry.deadline(Duration::from_secs(secs));
    }

    let client = ResourceClient::with_transport(&cli.base_url, transport.build()?)
        .with_context(|| format!("invalid base URL '{}'", cli.base_url))?
        .with_retry_policy(retry.build()?);
    Ok(client)
}

fn run_user(client: ResourceClient, command: &UserCommand) -> Result<Value> {
    let api = UserApi::from_client(client);
    match command {
        UserCommand::Create(body) => {
            let user: User = require_body(body)?;
            to_json(&api.create_user(&user).context("failed to create user")?)
        }
        UserCommand::Get { username } => to_json(
            &api.get_user(username)
                .with_context(|| format!("failed to fetch user '{username}'"))?,
        ),
        UserCommand::Update { username, body } => {
            let user: User = require_body(body)?;
            to_json(
                &api.update_user(username, &user)
                    .with_context(|| format!("failed to update user '{username}'"))?,
            )
        }
        UserCommand::Delete { username } => to_json(
            &api.delete_user(username)
                .with_context(|| format!("failed to delete user '{username}'"))?,
        ),
    }
}

fn run_order(client: ResourceClient, command: &OrderCommand) -> Result<Value> {
    let api = StoreApi::from_client(client);
    match command {
        OrderCommand::Create(body) => {
            let order: Order = require_body(body)?;
            to_json(&api.create_order(&order).context("failed to create order")?)
        }
        OrderCommand::Get { id } => to_json(
            &api.get_order(*id)
                .with_context(|| format!("failed to fetch order {id}"))?,
        ),
        OrderCommand::Delete { id } => to_json(
            &api.delete_order(*id)
                .with_context(|| format!("failed to delete order {id}"))?,
        ),
    }
}

/// Sends a raw request through the generic resource client.
fn send_request(client: &ResourceClient, args: &RequestArgs) -> Result<Value> {
    // Validate method eagerly so CLI errors are explicit before any network call.
    let method = Method::from_str(&args.method.to_ascii_uppercase())
        .with_context(|| format!("invalid HTTP method '{}'", args.method))?;
    if ![Method::GET, Method::POST, Method::DELETE].contains(&method) {
        bail!("unsupported HTTP method '{method}': expected GET, POST or DELETE");
    }
    let body = parse_body(&args.body).context("failed to parse request body input")?;
    let id = args.id.clone().map(ResourceId::from);
    let acceptance = if args.accept_any_status {
        Acceptance::AnyStatus
    } else {
        Acceptance::Success
    };

    let value = client
        .request(method, &args.endpoint, id, body, acceptance)
        .with_context(|| format!("HTTP request failed for endpoint '{}'", args.endpoint))?;
    Ok(value)
}

/// Walks through the user and order lifecycle, printing each result.
fn run_demo(client: &ResourceClient, compact: bool) -> Result<()> {
    let users = UserApi::from_client(client.clone());
    let store = StoreApi::from_client(client.clone());

    let mut user = User {
        id: Some(1),
        first_name: Some("John".to_owned()),
        last_name: Some("Doe".to_owned()),
        email: Some("johndoe@example.com".to_owned()),
        password: Some("password123".to_owned()),
        phone: Some("1234567890".to_owned()),
        user_status: Some(1),
        ..User::new("johndoe")
    };

    println!("Creating user...");
    print_json(&to_json(&users.create_user(&user)?)?, compact)?;

    println!("Fetching user...");
    print_json(&to_json(&users.get_user(&user.username)?)?, compact)?;

    println!("Updating user...");
    user.first_name = Some("Jonathan".to_owned());
    print_json(&to_json(&users.update_user(&user.username, &user)?)?, compact)?;

    println!("Deleting user...");
    print_json(&to_json(&users.delete_user(&user.username)?)?, compact)?;

    let order = Order {
        id: Some(1),
        pet_id: Some(10),
        quantity: Some(2),
        ship_date: Some("2024-10-14T00:00:00.000Z".to_owned()),
        status: Some(OrderStatus::Placed),
        complete: true,
    };

    println!("Placing order...");
    print_json(&to_json(&store.create_order(&order)?)?, compact)?;

    println!("Fetching order...");
    print_json(&to_json(&store.get_order(1)?)?, compact)?;

    println!("Deleting order...");
    print_json(&to_json(&store.delete_order(1)?)?, compact)?;

    println!("Fetching inventory...");
    print_json(&to_json(&store.get_inventory()?)?, compact)?;

    Ok(())
}

/// Parses a required JSON body into a typed payload.
fn require_body<T: serde::de::DeserializeOwned>(body: &BodyInput) -> Result<T> {
    let Some(value) = parse_body(body).context("failed to parse request body input")? else {
        bail!("a request body is required: use --body-json or --body-file");
    };
    serde_json::from_value(value).context("request body does not match the expected schema")
}

/// Parses an optional JSON body from inline text or a file path.
///
/// Exactly one of `--body-json` or `--body-file` may be set.
fn parse_body(body: &BodyInput) -> Result<Option<Value>> {
    match (&body.body_json, &body.body_file) {
        (Some(raw), None) => serde_json::from_str(raw)
            .context("failed to parse JSON from --body-json")
            .map(Some),
        (None, Some(path)) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read --body-file '{}'", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| {
                    format!("failed to parse JSON in --body-file '{}'", path.display())
                })
                .map(Some)
        }
        (None, None) => Ok(None),
        (Some(_), Some(_)) => bail!("use only one of --body-json or --body-file"),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("failed to render JSON")
}

/// Prints a JSON value either compact or pretty-formatted.
fn print_json(value: &Value, compact: bool) -> Result<()> {
    if compact {
        println!(
            "{}",
            serde_json::to_string(value).context("Failed to render JSON")?
        );
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to render JSON")?
        );
    }
    Ok(())
}
