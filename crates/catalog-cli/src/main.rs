mod imports;
mod products;

use std::path::PathBuf;

use catalog_import::PipelineKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Product catalog admin command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect and remove catalog products
    Products {
        #[command(subcommand)]
        command: ProductsCommands,
    },
    /// Run a batch import from a spreadsheet, or from a directory of image files
    Import {
        /// Import kind: description, prices, image-urls, products, image-files
        kind: PipelineKind,
        /// Spreadsheet (.csv, .xlsx) or, for image-files, a directory
        path: PathBuf,
        /// Reconcile and report without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a price-update template workbook seeded with sample products
    Template {
        /// Output .xlsx path
        out: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert categories and brands from the reference data file
    Seed,
}

#[derive(Debug, Subcommand)]
enum ProductsCommands {
    /// List live products
    List {
        /// Case-insensitive description filter
        #[arg(long)]
        search: Option<String>,
        /// Maximum number of products to show
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Show one product
    Get { id: i64 },
    /// Soft-delete a product
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("catalog-cli: no command given; run with --help");
        return Ok(());
    };

    let config = catalog_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = catalog_db::PoolConfig::from_app_config(&config);
    let pool = catalog_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => run_db(&pool, &config, command).await?,
        Commands::Products { command } => match command {
            ProductsCommands::List { search, limit } => {
                products::run_products_list(&pool, search.as_deref(), limit).await?;
            }
            ProductsCommands::Get { id } => products::run_products_get(&pool, id).await?,
            ProductsCommands::Delete { id } => products::run_products_delete(&pool, id).await?,
        },
        Commands::Import {
            kind,
            path,
            dry_run,
        } => imports::run_import(&pool, &config, kind, &path, dry_run).await?,
        Commands::Template { out } => imports::run_template(&pool, &out).await?,
    }

    Ok(())
}

async fn run_db(
    pool: &sqlx::PgPool,
    config: &catalog_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            catalog_db::ping(pool).await?;
            println!("database: ok");
        }
        DbCommands::Migrate => {
            let applied = catalog_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let data = catalog_core::load_reference_data(&config.reference_data_path)?;
            let (categories, brands) = catalog_db::seed_reference_data(pool, &data).await?;
            tracing::info!(categories, brands, "reference data seeded");
            println!("seeded {categories} categories and {brands} brands");
        }
    }
    Ok(())
}
