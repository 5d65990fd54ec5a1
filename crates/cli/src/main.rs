//! Administrative CLI for Bazaar.

mod api_client;

use anyhow::{Context, Result};
use api_client::{
    ApiClient, CreateSellerRequest, CreateTokenRequest, DriftReport, ProductResponse,
    RepairRunResponse, UpdateApprovalRequest,
};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Format, Toml};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

#[derive(Parser)]
#[command(name = "bazaarctl")]
#[command(about = "Administrative CLI for Bazaar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ApiArgs {
    /// Server API URL (overrides client config)
    #[arg(long, env = "BAZAAR_SERVER")]
    server: Option<String>,

    /// API token (overrides client config)
    #[arg(long, env = "BAZAAR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Client config file path
    #[arg(long, env = "BAZAAR_CLIENT_CONFIG")]
    client_config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Product review commands
    Product {
        #[command(subcommand)]
        command: ProductCommands,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Approval counts per status
    Stats {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Visibility repair commands
    Repair {
        #[command(subcommand)]
        command: RepairCommands,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Seller account commands
    Seller {
        #[command(subcommand)]
        command: SellerCommands,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Token management commands
    Token {
        #[command(subcommand)]
        command: TokenCommands,
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Show current token identity
    Whoami {
        #[command(flatten)]
        api: ApiArgs,
    },
    /// Check server health and version
    Health {
        #[command(flatten)]
        api: ApiArgs,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// List products awaiting review
    List {
        /// Status to list (pending, under_review, approved, rejected)
        #[arg(long, default_value = "pending")]
        status: String,
        /// Only this seller's products
        #[arg(long)]
        seller: Option<String>,
        /// Maximum number of products to return
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one product with its approval columns
    Show { product_id: String },
    /// Approve a product and make it visible
    Approve {
        product_id: String,
        /// Internal reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a product and hide it
    Reject {
        product_id: String,
        /// Reason shown to the seller
        #[arg(short, long)]
        reason: Option<String>,
        /// Internal reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Move a product under review and hide it
    Review {
        product_id: String,
        /// Internal reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Move a product back to pending (visibility is left as is)
    Reset {
        product_id: String,
        /// Internal reviewer notes
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum RepairCommands {
    /// Run both repair sweeps now
    Run,
    /// List inconsistent products without changing them
    Report {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show recent repair runs
    History {
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum SellerCommands {
    /// Create a seller account
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Contact email
        #[arg(short, long)]
        email: String,
    },
    /// List seller accounts
    List,
    /// Show a seller account
    Show { seller_id: String },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Generate a token offline (outputs secret + hash)
    Generate {
        /// Description for the token
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Create a new token
    Create {
        /// Scopes to grant (comma-separated)
        #[arg(short, long)]
        scopes: String,
        /// Seller to bind the token to (required for seller:write)
        #[arg(long)]
        seller: Option<String>,
        /// Expiration in seconds
        #[arg(short, long)]
        expires_in: Option<u64>,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List tokens
    List {
        /// Only tokens bound to this seller
        #[arg(long)]
        seller: Option<String>,
    },
    /// Revoke a token
    Revoke {
        /// Token ID to revoke
        token_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let Cli { command } = Cli::parse();

    match command {
        Commands::Product { command, api } => handle_product_command(command, &api).await,
        Commands::Stats { api } => handle_stats_command(&api).await,
        Commands::Repair { command, api } => handle_repair_command(command, &api).await,
        Commands::Seller { command, api } => handle_seller_command(command, &api).await,
        Commands::Token { command, api } => handle_token_command(command, &api).await,
        Commands::Whoami { api } => handle_whoami_command(&api).await,
        Commands::Health { api } => handle_health_command(&api).await,
    }
}

/// Saved connection settings.
#[derive(Debug, serde::Deserialize, Default)]
#[serde(default)]
struct ClientConfig {
    server: Option<String>,
    token: Option<String>,
}

/// Resolve server URL and token: flags and env first, then the client config file.
async fn resolve_api_config(api: &ApiArgs) -> Result<(String, Option<String>)> {
    if let (Some(server), Some(token)) = (&api.server, &api.token) {
        return Ok((server.clone(), Some(token.clone())));
    }

    let config = load_client_config(&client_config_path(api.client_config.as_deref())?).await?;
    let server = api
        .server
        .clone()
        .or(config.server)
        .ok_or_else(|| anyhow::anyhow!("no server configured: use --server or BAZAAR_SERVER"))?;
    let token = api.token.clone().or(config.token);

    Ok((server, token))
}

async fn get_api_client(api: &ApiArgs) -> Result<ApiClient> {
    let (server, token) = resolve_api_config(api).await?;
    let token = token
        .ok_or_else(|| anyhow::anyhow!("no token configured: use --token or BAZAAR_TOKEN"))?;
    ApiClient::new(&normalize_base_url(&server)?, &token)
}

async fn handle_product_command(command: ProductCommands, api: &ApiArgs) -> Result<()> {
    let client = get_api_client(api).await?;

    let (product_id, request) = match command {
        ProductCommands::List {
            status,
            seller,
            limit,
        } => {
            let products = client
                .list_approval_queue(Some(&status), seller.as_deref(), limit)
                .await?;
            if products.is_empty() {
                println!("No {status} products.");
                return Ok(());
            }
            println!(
                "{:<38} {:<38} {:<13} {:<7} {:>10}  Name",
                "ID", "Seller", "Status", "Visible", "Price"
            );
            println!("{}", "-".repeat(130));
            for product in products {
                println!(
                    "{:<38} {:<38} {:<13} {:<7} {:>10}  {}",
                    product.product_id,
                    product.seller_id,
                    product.approval_status,
                    if product.is_active { "yes" } else { "no" },
                    format_price(product.price_cents),
                    product.name
                );
            }
            return Ok(());
        }
        ProductCommands::Show { product_id } => {
            let product = client.get_product(&product_id).await?;
            print_product(&product);
            return Ok(());
        }
        ProductCommands::Approve { product_id, notes } => {
            (product_id, decision("approved", None, notes))
        }
        ProductCommands::Reject {
            product_id,
            reason,
            notes,
        } => (product_id, decision("rejected", reason, notes)),
        ProductCommands::Review { product_id, notes } => {
            (product_id, decision("under_review", None, notes))
        }
        ProductCommands::Reset { product_id, notes } => {
            (product_id, decision("pending", None, notes))
        }
    };

    let response = client.update_approval(&product_id, request).await?;
    println!("{}", response.message);
    if response.notified {
        println!("Seller notified.");
    }
    println!();
    print_product(&response.product);
    Ok(())
}

fn decision(status: &str, reason: Option<String>, notes: Option<String>) -> UpdateApprovalRequest {
    UpdateApprovalRequest {
        approval_status: status.to_string(),
        rejection_reason: reason,
        admin_notes: notes,
    }
}

fn print_product(product: &ProductResponse) {
    println!("Product: {} ({})", product.name, product.product_id);
    println!("  Seller: {}", product.seller_id);
    println!("  Price: {}", format_price(product.price_cents));
    println!("  Stock: {}", product.stock_quantity);
    if let Some(category) = &product.category {
        println!("  Category: {category}");
    }
    println!("  Status: {}", product.approval_status);
    println!(
        "  Active: {}  Approved: {}",
        product.is_active, product.is_approved
    );
    if let Some(at) = &product.approved_at {
        println!("  Approved at: {at}");
    }
    if let Some(at) = &product.rejected_at {
        println!("  Rejected at: {at}");
    }
    if let Some(reason) = &product.rejection_reason {
        println!("  Rejection reason: {reason}");
    }
    if let Some(notes) = &product.admin_notes {
        println!("  Admin notes: {notes}");
    }
    if let Some(reviewer) = &product.reviewed_by {
        println!("  Reviewed by: {reviewer}");
    }
    println!("  Updated: {}", product.updated_at);
}

async fn handle_stats_command(api: &ApiArgs) -> Result<()> {
    let client = get_api_client(api).await?;
    let stats = client.approval_stats().await?;

    println!("Approval Statistics:");
    println!("  Pending: {}", stats.pending);
    println!("  Under review: {}", stats.under_review);
    println!("  Approved: {}", stats.approved);
    println!("  Rejected: {}", stats.rejected);
    println!("  Total: {}", stats.total);
    Ok(())
}

async fn handle_repair_command(command: RepairCommands, api: &ApiArgs) -> Result<()> {
    let client = get_api_client(api).await?;

    match command {
        RepairCommands::Run => {
            let response = client.run_repair().await?;
            println!("{}", response.message);
            print_repair_run(&response.run);
        }
        RepairCommands::Report { limit } => {
            let report = client.drift_report(limit).await?;
            render_drift_report(&report);
        }
        RepairCommands::History { limit } => {
            let runs = client.list_repair_runs(limit).await?;
            if runs.is_empty() {
                println!("No repair runs recorded.");
                return Ok(());
            }
            for run in &runs {
                print_repair_run(run);
            }
        }
    }
    Ok(())
}

fn print_repair_run(run: &RepairRunResponse) {
    println!("Run: {} ({})", run.run_id, run.trigger);
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {finished}");
    }
    println!("  Activated: {}", run.activated);
    println!("  Deactivated: {}", run.deactivated);
    if let Some(by) = &run.triggered_by {
        println!("  Triggered by: {by}");
    }
    if let Some(error) = &run.error {
        println!("  Error: {error}");
    }
}

fn render_drift_report(report: &DriftReport) {
    if report.total == 0 {
        println!("All products are consistent.");
        return;
    }

    println!(
        "{} inconsistent products ({} repairable by sweep)",
        report.total, report.repairable
    );
    for (drift, count) in &report.by_drift {
        println!("  {drift}: {count}");
    }
    println!();
    println!(
        "{:<38} {:<13} {:<7} {:<9} {:<20} Sweep",
        "ID", "Status", "Active", "Approved", "Drift"
    );
    println!("{}", "-".repeat(110));
    for entry in &report.products {
        println!(
            "{:<38} {:<13} {:<7} {:<9} {:<20} {}",
            entry.product_id,
            entry.approval_status,
            entry.is_active,
            entry.is_approved,
            entry.drift,
            entry.repaired_by.as_deref().unwrap_or("-")
        );
    }
}

async fn handle_seller_command(command: SellerCommands, api: &ApiArgs) -> Result<()> {
    let client = get_api_client(api).await?;

    match command {
        SellerCommands::Create { name, email } => {
            let seller = client
                .create_seller(CreateSellerRequest {
                    display_name: name,
                    email,
                })
                .await?;
            println!("Seller created: {} ({})", seller.display_name, seller.seller_id);
        }
        SellerCommands::List => {
            let sellers = client.list_sellers().await?;
            if sellers.is_empty() {
                println!("No sellers found.");
                return Ok(());
            }
            println!("{:<38} {:<32} {:<8} Name", "ID", "Email", "Active");
            println!("{}", "-".repeat(100));
            for seller in sellers {
                println!(
                    "{:<38} {:<32} {:<8} {}",
                    seller.seller_id, seller.email, seller.is_active, seller.display_name
                );
            }
        }
        SellerCommands::Show { seller_id } => {
            let seller = client.get_seller(&seller_id).await?;
            println!("Seller: {} ({})", seller.display_name, seller.seller_id);
            println!("  Email: {}", seller.email);
            println!("  Active: {}", seller.is_active);
            println!("  Created: {}", seller.created_at);
        }
    }
    Ok(())
}

async fn handle_token_command(command: TokenCommands, api: &ApiArgs) -> Result<()> {
    match command {
        TokenCommands::Generate { description } => handle_token_generate(description),
        TokenCommands::Create {
            scopes,
            seller,
            expires_in,
            description,
        } => {
            let client = get_api_client(api).await?;
            let scopes = parse_scopes(&scopes)?;

            let response = client
                .create_token(CreateTokenRequest {
                    scopes,
                    seller_id: seller,
                    expires_in_secs: expires_in,
                    description,
                })
                .await?;

            println!("Token created successfully!");
            println!("\nToken ID: {}", response.token_id);
            println!("Token secret: {}", response.token_secret);
            println!("\nIMPORTANT: Save this token secret now. It cannot be recovered.");
            if let Some(expires) = response.expires_at {
                println!("Expires: {expires}");
            }
            Ok(())
        }
        TokenCommands::List { seller } => {
            let client = get_api_client(api).await?;
            let tokens = client.list_tokens(seller.as_deref()).await?;

            if tokens.is_empty() {
                println!("No tokens found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<38} {:<30} {:<10} {:<20} Description",
                "ID", "Seller", "Scopes", "Status", "Last Used"
            );
            println!("{}", "-".repeat(150));

            let now = OffsetDateTime::now_utc();
            for token in tokens {
                let status = token_status(
                    token.revoked_at.as_deref(),
                    token.expires_at.as_deref(),
                    now,
                );
                println!(
                    "{:<38} {:<38} {:<30} {:<10} {:<20} {}",
                    token.token_id,
                    token.seller_id.as_deref().unwrap_or("-"),
                    token.scopes.join(","),
                    status,
                    token.last_used_at.as_deref().unwrap_or("-"),
                    token.description.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        TokenCommands::Revoke { token_id } => {
            let client = get_api_client(api).await?;
            client.revoke_token(&token_id).await?;
            println!("Token revoked: {token_id}");
            Ok(())
        }
    }
}

fn handle_token_generate(description: Option<String>) -> Result<()> {
    let token_secret = generate_token_secret();
    let token_hash = hash_token(&token_secret);

    println!("Token generated (save the secret - it cannot be recovered):\n");
    println!("  Secret: {token_secret}");
    println!("  Hash:   sha256:{token_hash}");
    if let Some(desc) = description {
        println!("  Description: {desc}");
    }
    println!("\nAdd to server.toml:");
    println!("  [admin]");
    println!("  token_hash = \"sha256:{token_hash}\"");

    Ok(())
}

async fn handle_whoami_command(api: &ApiArgs) -> Result<()> {
    let client = get_api_client(api).await?;
    let whoami = client.whoami().await?;

    println!("Token ID: {}", whoami.token_id);
    println!("Role: {}", whoami.role);
    if let Some(seller_id) = &whoami.seller_id {
        match &whoami.seller_name {
            Some(name) => println!("Seller: {name} ({seller_id})"),
            None => println!("Seller: {seller_id}"),
        }
    }
    println!("Scopes: {}", whoami.scopes.join(", "));
    match &whoami.expires_at {
        Some(expires_at) => println!("Expires: {expires_at}"),
        None => println!("Expires: never"),
    }
    Ok(())
}

async fn handle_health_command(api: &ApiArgs) -> Result<()> {
    let (server, token) = resolve_api_config(api).await?;
    let client = ApiClient::new(&normalize_base_url(&server)?, token.as_deref().unwrap_or(""))?;
    let health = client.health().await.context("health request failed")?;

    println!("Status: {}", health.status);
    println!("Server version: {}", health.version);
    println!("Client version: {}", env!("CARGO_PKG_VERSION"));

    if health.version != env!("CARGO_PKG_VERSION") {
        eprintln!(
            "Warning: version mismatch (server: {}, client: {})",
            health.version,
            env!("CARGO_PKG_VERSION")
        );
    }
    Ok(())
}

fn client_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME not set; set BAZAAR_CLIENT_CONFIG"))?;
            PathBuf::from(home).join(".config")
        }
    };

    Ok(base.join("bazaar").join("client.toml"))
}

async fn load_client_config(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|err| anyhow::anyhow!(err).context("failed to load client configuration"))
}

fn normalize_base_url(url: &str) -> Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("server URL must start with http:// or https://");
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn parse_scopes(scopes: &str) -> Result<Vec<String>> {
    let scopes: Vec<String> = scopes
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if scopes.is_empty() {
        anyhow::bail!("scopes cannot be empty");
    }
    Ok(scopes)
}

fn token_status(revoked_at: Option<&str>, expires_at: Option<&str>, now: OffsetDateTime) -> &'static str {
    if revoked_at.is_some() {
        return "revoked";
    }
    let expired = expires_at
        .and_then(|t| OffsetDateTime::parse(t, &time::format_description::well_known::Rfc3339).ok())
        .is_some_and(|t| t < now);
    if expired { "expired" } else { "active" }
}

fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

fn generate_token_secret() -> String {
    use base64::Engine;
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a token for storage.
fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
