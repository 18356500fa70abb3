//! Key manager client management CLI tool
//!
//! Registers, inspects, updates and removes applications through the key
//! manager HTTP API, and publishes scope sets to it.
//!
//! ## Usage Examples
//!
//! ```bash
//! keyman-client-management --user admin register \
//!   --name "Reporting App" \
//!   --grant-type authorization_code \
//!   --redirect-uri "https://app.example.com/callback"
//!
//! keyman-client-management --user admin get --client-id "client_id_here"
//!
//! keyman-client-management --user admin update --client-id "client_id_here" \
//!   --grant-type client_credentials
//!
//! keyman-client-management --user admin delete --client-id "client_id_here" --yes
//!
//! keyman-client-management --user admin sync-scopes --file scopes.json
//! ```
//!
//! The `sync-scopes` file holds `old_scope_keys`, `new_scopes`,
//! `old_uri_templates` and `new_uri_templates`.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error (network, parsing, etc.)
//! - 2: Application or scope management error
//! - 3: Authentication or authorization error

use clap::{Args, Parser, Subcommand, ValueEnum};
use keyman::{
    dcr::types::{RegistrationRequest, UpdateRequest},
    http::{AUTHENTICATED_USER_HEADER, SyncScopesRequest},
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::process;

/// Main CLI application structure
#[derive(Parser)]
#[command(
    name = "keyman-client-management",
    about = "Key manager client management CLI tool",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Base URL of the key manager server
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Username forwarded as the authenticated caller
    #[arg(long, help = "Username sent as the authenticated caller")]
    user: String,

    /// Enable verbose output
    #[arg(short, long, help = "Enable verbose output for debugging")]
    verbose: bool,

    /// Output format
    #[arg(
        long,
        value_enum,
        default_value = "json",
        help = "Output format for responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// JSON formatted output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// Human-readable table format
    Table,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Register a new application
    Register(RegisterArgs),
    /// Get an existing application
    Get(ClientIdArgs),
    /// Update an existing application
    Update(UpdateArgs),
    /// Delete an existing application
    Delete(DeleteArgs),
    /// Replace a published scope set with a new one
    SyncScopes(SyncScopesArgs),
    /// List registered scopes
    ListScopes,
    /// Get a registered scope
    GetScope(ScopeKeyArgs),
}

/// Arguments for application registration
#[derive(Args)]
struct RegisterArgs {
    /// Application name
    #[arg(long)]
    name: String,

    /// Redirect URI (can be specified multiple times)
    #[arg(long = "redirect-uri")]
    redirect_uris: Vec<String>,

    /// Grant type (can be specified multiple times)
    #[arg(long = "grant-type")]
    grant_types: Vec<String>,

    /// Owner recorded on the service provider, defaults to the caller
    #[arg(long)]
    owner: Option<String>,

    /// Service provider template
    #[arg(long)]
    template: Option<String>,

    /// Access token type
    #[arg(long)]
    token_type: Option<String>,

    /// Backchannel logout URI
    #[arg(long)]
    backchannel_logout_uri: Option<String>,

    /// Preset client identifier
    #[arg(long)]
    client_id: Option<String>,

    /// Preset client secret
    #[arg(long)]
    client_secret: Option<String>,
}

#[derive(Args)]
struct ClientIdArgs {
    /// Client identifier of the application
    #[arg(long)]
    client_id: String,
}

/// Arguments for application updates; omitted fields stay unchanged
#[derive(Args)]
struct UpdateArgs {
    /// Client identifier of the application
    #[arg(long)]
    client_id: String,

    /// New application name
    #[arg(long)]
    name: Option<String>,

    /// Redirect URI (can be specified multiple times; replaces the stored value)
    #[arg(long = "redirect-uri")]
    redirect_uris: Vec<String>,

    /// Grant type (can be specified multiple times; replaces the stored value)
    #[arg(long = "grant-type")]
    grant_types: Vec<String>,

    /// New owner
    #[arg(long)]
    owner: Option<String>,

    /// Access token type
    #[arg(long)]
    token_type: Option<String>,

    /// Backchannel logout URI
    #[arg(long)]
    backchannel_logout_uri: Option<String>,
}

#[derive(Args)]
struct DeleteArgs {
    /// Client identifier of the application
    #[arg(long)]
    client_id: String,

    /// Skip confirmation prompt
    #[arg(long, help = "Skip the confirmation prompt")]
    yes: bool,
}

#[derive(Args)]
struct SyncScopesArgs {
    /// JSON file describing the old and new scope sets
    #[arg(long)]
    file: String,
}

#[derive(Args)]
struct ScopeKeyArgs {
    /// Scope key
    #[arg(long)]
    key: String,
}

/// Application errors
#[derive(Debug)]
enum AppError {
    /// Network or HTTP client errors
    Network(reqwest::Error),
    /// JSON parsing or serialization errors
    Json(serde_json::Error),
    /// Application or scope management errors
    Management(String),
    /// Authentication errors
    Authentication(String),
    /// General application errors
    General(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Network(err) => write!(f, "Network error: {}", err),
            AppError::Json(err) => write!(f, "JSON error: {}", err),
            AppError::Management(msg) => write!(f, "Management error: {}", msg),
            AppError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            AppError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Network(_) | AppError::Json(_) | AppError::General(_) => 1,
            AppError::Management(_) => 2,
            AppError::Authentication(_) => 3,
        }
    }
}

/// Main application entry point
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new();

    let result = match &cli.command {
        Commands::Register(args) => register_application(&cli, &client, args).await,
        Commands::Get(args) => get_application(&cli, &client, args).await,
        Commands::Update(args) => update_application(&cli, &client, args).await,
        Commands::Delete(args) => delete_application(&cli, &client, args).await,
        Commands::SyncScopes(args) => sync_scopes(&cli, &client, args).await,
        Commands::ListScopes => list_scopes(&cli, &client).await,
        Commands::GetScope(args) => get_scope(&cli, &client, args).await,
    };

    match result {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(err.exit_code());
        }
    }
}

fn as_caller(cli: &Cli, request: RequestBuilder) -> RequestBuilder {
    request.header(AUTHENTICATED_USER_HEADER, &cli.user)
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

/// Turn a non-success response into an error carrying the server's description
async fn failure(response: Response, action: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let description = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value["error_description"].as_str().map(str::to_string))
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Authentication(format!(
            "{} failed with status {}: {}",
            action, status, description
        )),
        _ => AppError::Management(format!(
            "{} failed with status {}: {}",
            action, status, description
        )),
    }
}

async fn register_application(
    cli: &Cli,
    client: &Client,
    args: &RegisterArgs,
) -> Result<(), AppError> {
    let request = RegistrationRequest {
        application_owner: args.owner.clone(),
        client_name: args.name.clone(),
        sp_template_name: args.template.clone(),
        grant_types: args.grant_types.clone(),
        redirect_uris: args.redirect_uris.clone(),
        token_type: args.token_type.clone(),
        backchannel_logout_uri: args.backchannel_logout_uri.clone(),
        consumer_key: args.client_id.clone(),
        consumer_secret: args.client_secret.clone(),
    };

    if cli.verbose {
        eprintln!(
            "Registration request: {}",
            serde_json::to_string_pretty(&request)?
        );
    }

    let url = format!("{}/api/applications", cli.base_url);
    let response = as_caller(cli, client.post(&url)).json(&request).send().await?;

    if cli.verbose {
        eprintln!("Response status: {}", response.status());
    }

    match response.status() {
        StatusCode::CREATED | StatusCode::OK => {
            let application: Value = response.json().await?;
            output_response(&cli.format, &application)
        }
        _ => Err(failure(response, "Registration").await),
    }
}

async fn get_application(cli: &Cli, client: &Client, args: &ClientIdArgs) -> Result<(), AppError> {
    let url = format!("{}/api/applications/{}", cli.base_url, args.client_id);
    let response = as_caller(cli, client.get(&url)).send().await?;

    if cli.verbose {
        eprintln!("Response status: {}", response.status());
    }

    match response.status() {
        StatusCode::OK => {
            let application: Value = response.json().await?;
            output_response(&cli.format, &application)
        }
        _ => Err(failure(response, "Lookup").await),
    }
}

async fn update_application(
    cli: &Cli,
    client: &Client,
    args: &UpdateArgs,
) -> Result<(), AppError> {
    let request = UpdateRequest {
        application_owner: args.owner.clone(),
        client_name: args.name.clone(),
        grant_types: non_empty(&args.grant_types),
        redirect_uris: non_empty(&args.redirect_uris),
        token_type: args.token_type.clone(),
        backchannel_logout_uri: args.backchannel_logout_uri.clone(),
    };

    if cli.verbose {
        eprintln!("Update request: {}", serde_json::to_string_pretty(&request)?);
    }

    let url = format!("{}/api/applications/{}", cli.base_url, args.client_id);
    let response = as_caller(cli, client.put(&url)).json(&request).send().await?;

    if cli.verbose {
        eprintln!("Response status: {}", response.status());
    }

    match response.status() {
        StatusCode::OK => {
            let application: Value = response.json().await?;
            output_response(&cli.format, &application)
        }
        _ => Err(failure(response, "Update").await),
    }
}

async fn delete_application(
    cli: &Cli,
    client: &Client,
    args: &DeleteArgs,
) -> Result<(), AppError> {
    if !args.yes {
        println!(
            "Are you sure you want to delete application '{}'? (y/N)",
            args.client_id
        );
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::General(format!("Failed to read confirmation: {}", e)))?;

        let input = input.trim().to_lowercase();
        if input != "y" && input != "yes" {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let url = format!("{}/api/applications/{}", cli.base_url, args.client_id);
    let response = as_caller(cli, client.delete(&url)).send().await?;

    if cli.verbose {
        eprintln!("Response status: {}", response.status());
    }

    match response.status() {
        StatusCode::NO_CONTENT | StatusCode::OK => {
            println!("Application '{}' deleted successfully.", args.client_id);
            Ok(())
        }
        _ => Err(failure(response, "Deletion").await),
    }
}

async fn sync_scopes(cli: &Cli, client: &Client, args: &SyncScopesArgs) -> Result<(), AppError> {
    let contents = std::fs::read_to_string(&args.file)
        .map_err(|e| AppError::General(format!("Failed to read {}: {}", args.file, e)))?;
    let body: Value = serde_json::from_str(&contents)?;
    let request: SyncScopesRequest = serde_json::from_value(body.clone())?;

    if cli.verbose {
        eprintln!(
            "Removing {} scopes, publishing {} scopes",
            request.old_scope_keys.len(),
            request.new_scopes.len()
        );
    }

    let url = format!("{}/api/scopes/sync", cli.base_url);
    let response = as_caller(cli, client.post(&url)).json(&body).send().await?;

    if cli.verbose {
        eprintln!("Response status: {}", response.status());
    }

    match response.status() {
        StatusCode::NO_CONTENT | StatusCode::OK => {
            println!("Scopes synchronized.");
            Ok(())
        }
        _ => Err(failure(response, "Scope synchronization").await),
    }
}

async fn list_scopes(cli: &Cli, client: &Client) -> Result<(), AppError> {
    let url = format!("{}/api/scopes", cli.base_url);
    let response = as_caller(cli, client.get(&url)).send().await?;

    match response.status() {
        StatusCode::OK => {
            let scopes: Value = response.json().await?;
            output_response(&cli.format, &scopes)
        }
        _ => Err(failure(response, "Scope listing").await),
    }
}

async fn get_scope(cli: &Cli, client: &Client, args: &ScopeKeyArgs) -> Result<(), AppError> {
    let url = format!("{}/api/scopes/{}", cli.base_url, args.key);
    let response = as_caller(cli, client.get(&url)).send().await?;

    match response.status() {
        StatusCode::OK => {
            let scope: Value = response.json().await?;
            output_response(&cli.format, &scope)
        }
        _ => Err(failure(response, "Scope lookup").await),
    }
}

/// Output response data in the requested format
fn output_response<T: Serialize>(format: &OutputFormat, data: &T) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(data)?);
        }
        OutputFormat::JsonPretty => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Table => {
            let json_value: Value = serde_json::to_value(data)?;
            print_table(&json_value, 0);
        }
    }
    Ok(())
}

/// Print data in table format (recursive for nested objects)
fn print_table(value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) => {
                        println!("{}{}:", prefix, key);
                        print_table(val, indent + 1);
                    }
                    Value::Array(arr) => {
                        println!("{}{}:", prefix, key);
                        for item in arr {
                            print_table(item, indent + 1);
                        }
                    }
                    _ => {
                        println!("{}{}: {}", prefix, key, format_value(val));
                    }
                }
            }
        }
        _ => {
            println!("{}{}", prefix, format_value(value));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_else(|_| "invalid".to_string()),
    }
}
