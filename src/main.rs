use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;

use nutri_planner::PlannerService;
use nutri_planner::advisor::Fetched;
use nutri_planner::config::Config;
use nutri_planner::grocery::{ALL_CATEGORIES, CATEGORIES, GroceryList};
use nutri_planner::language::Language;
use nutri_planner::models::SubscriptionTier;
use nutri_planner::store::{self, FileStore, KeyValueStore, SessionStore};

#[derive(Parser)]
#[command(name = "nutri-planner")]
#[command(about = "Nutrition recommendations, weekly menus and grocery lists")]
struct Cli {
    /// Display language (en, es); overrides config
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Personalized nutrition recommendations
    Recommend,
    /// Weekly meal plan
    Menu,
    /// Saved grocery list (shown by default)
    Grocery {
        #[command(subcommand)]
        action: Option<GroceryAction>,
    },
    /// Why a food helps with a condition
    Explain { food: String, condition: String },
    /// Show or edit the stored health profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Save a Gemini API key for later runs
    SetKey { key: String },
    /// Switch plan (free, basic, premium)
    Subscribe { tier: String },
}

#[derive(Subcommand)]
enum GroceryAction {
    /// Show the saved list, fetching one first if there is none
    Show {
        /// Only show one category
        #[arg(long)]
        category: Option<String>,
    },
    /// Replace the saved list with one built from this week's menu
    Refresh,
    Add {
        name: String,
        #[arg(long, default_value = "Fruits")]
        category: String,
    },
    Toggle { id: i64 },
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    SetConditions { items: Vec<String> },
    SetRestrictions { items: Vec<String> },
    SetPreferences { items: Vec<String> },
}

fn fallback_note<T>(fetched: &Fetched<T>) {
    if let Some(reason) = fetched.reason() {
        println!("{}", format!("(offline suggestions: {reason})").yellow());
    }
}

fn check_category(category: &str, allow_all: bool) -> Result<()> {
    let known = CATEGORIES
        .iter()
        .filter(|c| allow_all || **c != ALL_CATEGORIES)
        .any(|c| c.eq_ignore_ascii_case(category));
    if !known {
        anyhow::bail!("Unknown category '{category}'. Known: {}", CATEGORIES.join(", "));
    }
    Ok(())
}

fn print_list(list: &GroceryList, category: Option<&str>) {
    for item in list.filtered(category) {
        let mark = if item.checked { "[x]" } else { "[ ]" };
        println!(
            "{} {:>14} {} {}",
            mark,
            item.id.to_string().dimmed(),
            item.name,
            format!("({})", item.category).dimmed()
        );
    }
    println!("{}", format!("{}/{} checked", list.checked_count(), list.len()).bold());
}

async fn refresh_groceries(service: &PlannerService) -> Result<GroceryList> {
    let menu = service.weekly_menu().await?;
    fallback_note(&menu);
    let list = service.grocery_list(menu.data()).await?;
    fallback_note(&list);
    Ok(list.into_inner())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(lang) = cli.lang.as_deref() {
        config.app.language = lang
            .parse::<Language>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage.dir.clone()));
    let service = PlannerService::open(&config, kv.clone()).await?;

    match cli.command {
        Commands::Recommend => {
            let recs = service.recommendations().await?;
            fallback_note(&recs);
            for rec in recs.data() {
                println!("{}", rec.title.green().bold());
                println!("  {}", rec.description);
                for benefit in &rec.benefits {
                    println!("  {} {}", "+".green(), benefit);
                }
                println!("  {} {}\n", "Foods:".bold(), rec.foods.join(", "));
            }
        }
        Commands::Menu => {
            let menu = service.weekly_menu().await?;
            fallback_note(&menu);
            for day in menu.data() {
                println!("{}", day.day.cyan().bold());
                for (slot, items) in [
                    ("breakfast", &day.meals.breakfast),
                    ("lunch", &day.meals.lunch),
                    ("dinner", &day.meals.dinner),
                    ("snacks", &day.meals.snacks),
                ] {
                    if !items.is_empty() {
                        println!("  {:<10} {}", slot.bold(), items.join(", "));
                    }
                }
            }
        }
        Commands::Grocery { action } => match action
            .unwrap_or(GroceryAction::Show { category: None })
        {
            GroceryAction::Show { category } => {
                if let Some(c) = category.as_deref() {
                    check_category(c, true)?;
                }
                let list = match service.saved_grocery_list().await? {
                    Some(list) => list,
                    None => refresh_groceries(&service).await?,
                };
                print_list(&list, category.as_deref());
            }
            GroceryAction::Refresh => {
                let list = refresh_groceries(&service).await?;
                print_list(&list, None);
            }
            GroceryAction::Add { name, category } => {
                check_category(&category, false)?;
                let item = service.add_grocery_item(&name, &category).await?;
                println!("{} {} ({})", "Added".green(), item.name, item.id);
            }
            GroceryAction::Toggle { id } => {
                let checked = service.toggle_grocery_item(id).await?;
                println!("Item {id} {}", if checked { "checked" } else { "unchecked" });
            }
            GroceryAction::Remove { id } => {
                let item = service.remove_grocery_item(id).await?;
                println!("{} {}", "Removed".red(), item.name);
            }
        },
        Commands::Explain { food, condition } => {
            let text = service.explain(&food, &condition).await;
            fallback_note(&text);
            println!("{}", text.data());
        }
        Commands::Profile { action } => {
            let profiles = service.profiles();
            let profile = match action {
                ProfileAction::Show => profiles.load().await?,
                ProfileAction::SetConditions { items } => {
                    profiles.update_health_conditions(items).await?
                }
                ProfileAction::SetRestrictions { items } => {
                    profiles.update_dietary_restrictions(items).await?
                }
                ProfileAction::SetPreferences { items } => {
                    profiles.update_food_preferences(items).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::SetKey { key } => {
            store::save_api_key(kv.as_ref(), &key).await?;
            println!("{}", "API key saved".green());
        }
        Commands::Subscribe { tier } => {
            let tier = tier
                .parse::<SubscriptionTier>()
                .map_err(|e| anyhow::anyhow!(e))?;
            let record = SessionStore::new(kv).set_subscription(tier).await?;
            println!("{}", serde_json::to_string_pretty(&record.subscription)?);
        }
    }

    Ok(())
}
