use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use prodspec::api::CatalogClient;
use prodspec::data::{ImageSource, Product, ProductDraft};
use prodspec::database_ops::Db;
use prodspec::home::{AddItemState, HomeViewModel, UiState};
use prodspec::normalization::{format_price, ProductCategory};
use prodspec::util::env::{self as env_util, AppConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "prodspec", version, about = "Product catalog client with an offline cache")]
struct Cli {
    /// Override PRODSPEC_DB_PATH
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    /// Override PRODSPEC_API_BASE_URL
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    /// Print JSON instead of a table (defaults to PRODSPEC_JSON)
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Refresh from the remote catalog (falling back to the cache) and print the list
    List,
    /// Search cached products by name (case-insensitive substring)
    Search { query: String },
    /// Submit a new product, then refresh the list
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        tax: String,
        /// Local image to upload
        #[arg(long)]
        image: Option<PathBuf>,
        /// Content type of --image when it cannot be sniffed
        #[arg(long, requires = "image")]
        content_type: Option<String>,
    },
    /// Print the known product categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }
    if let Some(url) = cli.api_base_url {
        config.api_base_url = env_util::normalize_base_url(&url);
    }
    prodspec::logging::init_tracing(&config.log_filter)?;
    config.log_snapshot("prodspec");
    let json = cli.json || env_util::env_flag("PRODSPEC_JSON", false);

    match cli.command {
        Commands::Categories => {
            for c in ProductCategory::ALL {
                println!("{c}");
            }
        }
        Commands::List => {
            let vm = build_view_model(&config)?;
            let state = vm.spawn_load().await.context("load task panicked")?;
            print_state(&state, json)?;
        }
        Commands::Search { query } => {
            let vm = build_view_model(&config)?;
            let state = vm.spawn_search(query).await.context("search task panicked")?;
            print_state(&state, json)?;
        }
        Commands::Add {
            name,
            category,
            price,
            tax,
            image,
            content_type,
        } => {
            let category = ProductCategory::from_label(&category)
                .map(|c| c.label().to_string())
                .unwrap_or(category);
            let mut draft = ProductDraft::new(name, category, price, tax);
            if let Some(path) = image {
                let mut source = ImageSource::new(path);
                if let Some(ct) = content_type {
                    source = source.with_content_type(ct);
                }
                draft = draft.with_image(source);
            }
            let vm = build_view_model(&config)?;
            let outcome = vm.spawn_add_item(draft).await.context("add task panicked")?;
            if let Err(err) = outcome {
                bail!("{err}");
            }
            if let AddItemState::Added { product_name } = &*vm.add_item_state().borrow() {
                info!(product = %product_name, "product added");
                println!("Your {product_name} has been successfully added.");
            }
            print_state(&vm.current(), json)?;
        }
    }
    Ok(())
}

fn build_view_model(config: &AppConfig) -> Result<Arc<HomeViewModel>> {
    let store = Arc::new(
        Db::open(&config.db_path)
            .with_context(|| format!("open product store {}", config.db_path.display()))?,
    );
    let client = CatalogClient::new(&config.api_base_url, config.http_timeout)
        .context("build catalog client")?;
    Ok(Arc::new(HomeViewModel::new(
        Arc::new(client),
        store,
        config.cache_dir.clone(),
    )))
}

fn print_state(state: &UiState, json: bool) -> Result<()> {
    match state {
        UiState::Loading => println!("loading…"),
        UiState::Error(message) => bail!("{message}"),
        UiState::Success(products) if json => {
            println!("{}", serde_json::to_string_pretty(products)?);
        }
        UiState::Success(products) => print_table(products),
    }
    Ok(())
}

fn print_table(products: &[Product]) {
    if products.is_empty() {
        println!("no products");
        return;
    }
    println!(
        "{:>5}  {:<32} {:<16} {:>14} {:>12}",
        "id", "name", "category", "price", "tax"
    );
    for p in products {
        println!(
            "{:>5}  {:<32} {:<16} {:>14} {:>12}",
            p.id,
            p.product_name,
            p.product_type,
            format_price(p.price),
            format_price(p.tax)
        );
    }
}
