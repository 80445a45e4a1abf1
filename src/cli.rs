use anyhow::{bail, Context, Result};
use menusmith::{
    catalog::{Category, Item, ItemKey, ItemKind, StaticCatalog},
    config::AppConfig,
    engine::Engine,
    search::SearchMode,
    store::JsonFileStore,
    Resolution,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type CliEngine = Engine<StaticCatalog, JsonFileStore>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Default)]
struct GlobalOptions {
    format: Option<OutputFormat>,
    catalog: Option<PathBuf>,
    overrides: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

enum CliCommand {
    Parents,
    TopLevel,
    SetOrder {
        category: String,
        order: Option<i32>,
    },
    Children(String),
    Resolve(String),
    Items(String),
    SetChildren {
        parent: String,
        children: Vec<String>,
        replace: bool,
    },
    AddChild {
        parent: String,
        child: String,
    },
    RemoveChild {
        parent: String,
        child: String,
    },
    MoveChild {
        parent: String,
        child: String,
        index: usize,
    },
    ResetChildren(String),
    AddItem {
        category: String,
        key: ItemKey,
    },
    RemoveItem {
        category: String,
        key: ItemKey,
    },
    MoveItem {
        category: String,
        key: ItemKey,
        index: usize,
    },
    ResetItems(String),
    Skip(String),
    Unskip(String),
    ResetAll,
    Search {
        mode: SearchMode,
        query: String,
    },
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, tokens) = parse_global_options(&args)?;
    let command = parse_command(&tokens)?;
    match command {
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("menusmith v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = match global.data_dir.as_deref() {
                Some(dir) => AppConfig::load_or_create_in(dir)?,
                None => AppConfig::load_or_create()?,
            };
            init_tracing(&config);
            let format = global.format.unwrap_or(OutputFormat::Text);
            let mut engine = open_engine(&global, &config)?;
            run_command(&mut engine, command, format)
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_engine(global: &GlobalOptions, config: &AppConfig) -> Result<CliEngine> {
    let catalog_path = global
        .catalog
        .clone()
        .or_else(|| config.catalog_path().map(PathBuf::from))
        .context("no catalog configured (pass --catalog <path> or set catalog_path in config.json)")?;
    let catalog = StaticCatalog::load(&catalog_path)?;
    let overrides_path = global
        .overrides
        .clone()
        .unwrap_or_else(|| config.overrides_path());
    let store = JsonFileStore::new(overrides_path);
    let engine = Engine::initialize(catalog, store)?;
    Ok(engine)
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut global = GlobalOptions::default();
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let slot = match flag {
            "--format" | "--catalog" | "--overrides" | "--data-dir" => flag,
            _ => {
                tokens.push(arg.to_string());
                continue;
            }
        };
        let Some(value) = inline.or_else(|| iter.next().cloned()) else {
            bail!("{slot} requires a value");
        };
        match slot {
            "--format" => {
                let Some(format) = OutputFormat::parse(&value) else {
                    bail!("Unknown format: {value} (use 'text' or 'json')");
                };
                global.format = Some(format);
            }
            "--catalog" => global.catalog = Some(PathBuf::from(value)),
            "--overrides" => global.overrides = Some(PathBuf::from(value)),
            _ => global.data_dir = Some(PathBuf::from(value)),
        }
    }
    Ok((global, tokens))
}

fn parse_command(tokens: &[String]) -> Result<CliCommand> {
    let Some(head) = tokens.first() else {
        return Ok(CliCommand::Help);
    };
    let rest = tokens.get(1..).unwrap_or(&[]);
    let command = match head.as_str() {
        "help" | "--help" | "-h" => CliCommand::Help,
        "version" | "--version" | "-V" => CliCommand::Version,
        "parents" => CliCommand::Parents,
        "top-level" => CliCommand::TopLevel,
        "set-order" => {
            let category = arg(rest, 0, "category")?;
            let raw = arg(rest, 1, "order")?;
            let order = if raw == "clear" {
                None
            } else {
                Some(
                    raw.parse()
                        .with_context(|| format!("order must be a number or 'clear', got {raw}"))?,
                )
            };
            CliCommand::SetOrder { category, order }
        }
        "children" => CliCommand::Children(arg(rest, 0, "parent")?),
        "resolve" => CliCommand::Resolve(arg(rest, 0, "parent")?),
        "items" => CliCommand::Items(arg(rest, 0, "category")?),
        "set-children" => {
            let parent = arg(rest, 0, "parent")?;
            let mut replace = true;
            let mut children = Vec::new();
            for value in rest.iter().skip(1) {
                match value.as_str() {
                    "--append" => replace = false,
                    "--replace" => replace = true,
                    _ => children.push(value.to_string()),
                }
            }
            CliCommand::SetChildren {
                parent,
                children,
                replace,
            }
        }
        "add-child" => CliCommand::AddChild {
            parent: arg(rest, 0, "parent")?,
            child: arg(rest, 1, "child")?,
        },
        "remove-child" => CliCommand::RemoveChild {
            parent: arg(rest, 0, "parent")?,
            child: arg(rest, 1, "child")?,
        },
        "move-child" => CliCommand::MoveChild {
            parent: arg(rest, 0, "parent")?,
            child: arg(rest, 1, "child")?,
            index: index_arg(rest, 2)?,
        },
        "reset-children" => CliCommand::ResetChildren(arg(rest, 0, "parent")?),
        "add-item" => CliCommand::AddItem {
            category: arg(rest, 0, "category")?,
            key: item_key_arg(rest, 1)?,
        },
        "remove-item" => CliCommand::RemoveItem {
            category: arg(rest, 0, "category")?,
            key: item_key_arg(rest, 1)?,
        },
        "move-item" => CliCommand::MoveItem {
            category: arg(rest, 0, "category")?,
            key: item_key_arg(rest, 1)?,
            index: index_arg(rest, 3)?,
        },
        "reset-items" => CliCommand::ResetItems(arg(rest, 0, "category")?),
        "skip" => CliCommand::Skip(arg(rest, 0, "parent")?),
        "unskip" => CliCommand::Unskip(arg(rest, 0, "parent")?),
        "reset-all" => CliCommand::ResetAll,
        "search" => {
            let mode_name = arg(rest, 0, "mode")?;
            let Some(mode) = SearchMode::parse(&mode_name) else {
                bail!("Unknown search mode: {mode_name} (use 'buildable' or 'special')");
            };
            CliCommand::Search {
                mode,
                query: rest.get(1..).unwrap_or(&[]).join(" "),
            }
        }
        other => bail!("Unknown command: {other} (see 'menusmith help')"),
    };
    Ok(command)
}

fn arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing <{name}> argument"))
}

fn index_arg(args: &[String], index: usize) -> Result<usize> {
    let raw = arg(args, index, "index")?;
    raw.parse()
        .with_context(|| format!("index must be a non-negative number, got {raw}"))
}

fn item_key_arg(args: &[String], index: usize) -> Result<ItemKey> {
    let kind_name = arg(args, index, "kind")?;
    let Some(kind) = ItemKind::parse(&kind_name) else {
        bail!("Unknown item kind: {kind_name} (use 'placeable' or 'special')");
    };
    let ident = arg(args, index + 1, "key")?;
    Ok(ItemKey::new(kind, &ident))
}

fn run_command(engine: &mut CliEngine, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::Parents => {
            let parents = engine.parents_list();
            print_categories(&parents, format)
        }
        CliCommand::TopLevel => {
            let categories = engine.top_level_categories();
            print_categories(&categories, format)
        }
        CliCommand::SetOrder { category, order } => {
            require_category(engine, &category)?;
            engine.set_category_order(&category, order)?;
            print_categories(&engine.top_level_categories(), format)
        }
        CliCommand::Children(parent) => {
            require_category(engine, &parent)?;
            let children = engine.children_of(&parent);
            print_ids(&children, format)
        }
        CliCommand::Resolve(parent) => {
            require_category(engine, &parent)?;
            let resolution = engine.resolve(&parent);
            print_resolution(&resolution, format)
        }
        CliCommand::Items(category) => {
            require_category(engine, &category)?;
            let items = engine.items_for(&category);
            print_items(&items, format)
        }
        CliCommand::SetChildren {
            parent,
            children,
            replace,
        } => {
            require_category(engine, &parent)?;
            engine.set_children(&parent, &children, replace)?;
            print_ids(&engine.children_of(&parent), format)
        }
        CliCommand::AddChild { parent, child } => {
            require_category(engine, &parent)?;
            require_category(engine, &child)?;
            engine.add_child(&parent, &child)?;
            print_ids(&engine.children_of(&parent), format)
        }
        CliCommand::RemoveChild { parent, child } => {
            require_category(engine, &parent)?;
            engine.remove_child(&parent, &child)?;
            print_ids(&engine.children_of(&parent), format)
        }
        CliCommand::MoveChild {
            parent,
            child,
            index,
        } => {
            require_category(engine, &parent)?;
            require_category(engine, &child)?;
            engine.move_child_to_index(&parent, &child, index)?;
            print_ids(&engine.children_of(&parent), format)
        }
        CliCommand::ResetChildren(parent) => {
            require_category(engine, &parent)?;
            engine.reset_children(&parent)?;
            print_ids(&engine.children_of(&parent), format)
        }
        CliCommand::AddItem { category, key } => {
            require_category(engine, &category)?;
            engine.add_item(&category, &key)?;
            print_items(&engine.items_for(&category), format)
        }
        CliCommand::RemoveItem { category, key } => {
            require_category(engine, &category)?;
            engine.remove_item(&category, &key)?;
            print_items(&engine.items_for(&category), format)
        }
        CliCommand::MoveItem {
            category,
            key,
            index,
        } => {
            require_category(engine, &category)?;
            engine.move_item_to_index(&category, &key, index)?;
            print_items(&engine.items_for(&category), format)
        }
        CliCommand::ResetItems(category) => {
            require_category(engine, &category)?;
            engine.reset_items(&category)?;
            print_items(&engine.items_for(&category), format)
        }
        CliCommand::Skip(parent) => {
            require_category(engine, &parent)?;
            engine.set_parent_skipped(&parent, true)?;
            print_categories(&engine.parents_list(), format)
        }
        CliCommand::Unskip(parent) => {
            require_category(engine, &parent)?;
            engine.set_parent_skipped(&parent, false)?;
            print_categories(&engine.parents_list(), format)
        }
        CliCommand::ResetAll => {
            engine.reset_all()?;
            if format == OutputFormat::Text {
                println!("All overrides cleared.");
            }
            Ok(())
        }
        CliCommand::Search { mode, query } => {
            let choices = engine.search_choices(mode, &query);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&choices)?),
                OutputFormat::Text => {
                    for choice in choices {
                        println!("{:<32} {}", choice.label, choice.secondary);
                    }
                }
            }
            Ok(())
        }
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn require_category(engine: &CliEngine, id: &str) -> Result<()> {
    use menusmith::Catalog;
    if engine.catalog().category(id).is_none() {
        bail!("Unknown category: {id}");
    }
    Ok(())
}

#[derive(Serialize)]
struct CategoryListItem<'a> {
    id: &'a str,
    label: &'a str,
    order: i32,
}

fn print_categories(categories: &[Category], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let items: Vec<CategoryListItem> = categories
                .iter()
                .map(|category| CategoryListItem {
                    id: &category.id,
                    label: category.display_label(),
                    order: category.order,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            for category in categories {
                println!(
                    "{order:>6} {label:<28} {id}",
                    order = category.order,
                    label = category.display_label(),
                    id = category.id
                );
            }
        }
    }
    Ok(())
}

fn print_ids(ids: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ids)?),
        OutputFormat::Text => {
            for (index, id) in ids.iter().enumerate() {
                println!("{:>3} {id}", index + 1);
            }
        }
    }
    Ok(())
}

fn print_items(items: &[Item], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            for item in items {
                print_item_line(item, "");
            }
        }
    }
    Ok(())
}

fn print_item_line(item: &Item, indent: &str) {
    println!(
        "{indent}{kind:<9} {ident:<28} {label}",
        kind = item.kind().as_str(),
        ident = item.ident(),
        label = item.label()
    );
}

fn print_resolution(resolution: &Resolution, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(resolution)?),
        OutputFormat::Text => {
            for row in &resolution.rows {
                let id = row.node.category_id();
                let marker = if row.is_primary { "*" } else { " " };
                let mut flags = Vec::new();
                if row.node.is_proxy() {
                    flags.push("proxy");
                }
                if resolution.is_child_visible(id) {
                    flags.push("custom");
                }
                println!(
                    "{marker} {label:<28} {id:<24} {order:>7} {flags}",
                    label = row.node.label(),
                    order = row.node.sort_order(),
                    flags = flags.join(",")
                );
                for item in &row.items {
                    print_item_line(item, "      ");
                }
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("menusmith v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  menusmith parents                                List parents with children");
    println!("  menusmith top-level                              List tab categories");
    println!("  menusmith set-order <category> <order|clear>     Override a tab's order");
    println!("  menusmith children <parent>                      Effective child ids");
    println!("  menusmith resolve <parent>                       Rows shown for a parent");
    println!("  menusmith items <category>                       Effective item list");
    println!("  menusmith set-children <parent> [--append] <ids...>");
    println!("  menusmith add-child <parent> <child>");
    println!("  menusmith remove-child <parent> <child>");
    println!("  menusmith move-child <parent> <child> <index>");
    println!("  menusmith reset-children <parent>");
    println!("  menusmith add-item <category> <placeable|special> <key>");
    println!("  menusmith remove-item <category> <placeable|special> <key>");
    println!("  menusmith move-item <category> <placeable|special> <key> <index>");
    println!("  menusmith reset-items <category>");
    println!("  menusmith skip <parent> | unskip <parent>        Hide or show a parent");
    println!("  menusmith reset-all                              Clear every override");
    println!("  menusmith search <buildable|special> [query]     Choices for add-item");
    println!();
    println!("Global options:");
    println!("  --format <json|text>            Output format");
    println!("  --catalog <path>                Catalog JSON document");
    println!("  --overrides <path>              Overrides file (default: data dir)");
    println!("  --data-dir <path>               Config and data directory");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
}
