use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use sharebin::{
    filter, markers::MarkerSet, seed, staleness, BinStatus, BinStore, Category, FilterPredicates,
    NewBin,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("list");

    let store = BinStore::open(&db_path()?)?;

    match command {
        "seed" => run_seed(&store),
        "list" => run_list(&store, &args[2..]),
        "add" => run_add(&store, &args[2..]),
        "favorite" => run_favorite(&store, &args[2..]),
        "verify" => run_verify(&store, &args[2..], BinStatus::Verified),
        "missing" => run_verify(&store, &args[2..], BinStatus::Missing),
        "map" => run_map(&store, &args[2..]),
        "remind" => run_remind(&store),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            std::process::exit(1);
        }
    }
}

fn db_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("SHAREBIN_DB") {
        return Ok(PathBuf::from(path));
    }
    Ok(PathBuf::from("sharebin.db"))
}

fn print_usage() {
    eprintln!("Usage: sharebin <command>");
    eprintln!("  seed                      insert demo bins if the store is empty");
    eprintln!("  list [options] [query]    list bins (default command)");
    eprintln!("    --verified              only verified bins");
    eprintln!("    --category <name>       clothing|shoes|electronics|other (repeatable)");
    eprintln!("  add <name> <lat> <lon>    add a bin");
    eprintln!("  favorite <id> <on|off>    toggle favorite");
    eprintln!("  verify <id>               confirm the bin is present");
    eprintln!("  missing <id>              report the bin missing");
    eprintln!("  map [focus-id]            print the reconciled marker set");
    eprintln!("  remind                    count stale favorites");
}

fn run_seed(store: &BinStore) -> Result<()> {
    let seeded = seed::seed_if_empty(store, Utc::now())?;
    if seeded == 0 {
        println!("Store already has {} bins, nothing seeded", store.count());
    } else {
        println!("Seeded {seeded} demo bins");
    }
    Ok(())
}

fn run_list(store: &BinStore, args: &[String]) -> Result<()> {
    let mut filters = FilterPredicates::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verified" => filters.verified_only = true,
            "--category" => {
                let name = iter
                    .next()
                    .ok_or_else(|| anyhow!("--category needs a value"))?;
                let category = Category::parse(name)
                    .ok_or_else(|| anyhow!("unknown category: {name}"))?;
                filters.categories.set(category, true);
            }
            query => {
                if !filters.search.is_empty() {
                    filters.search.push(' ');
                }
                filters.search.push_str(query);
            }
        }
    }

    let snapshot = store.snapshot();
    let bins = filter::visible(&snapshot, &filters);
    if bins.is_empty() {
        println!("No bins match ({} total)", snapshot.len());
        return Ok(());
    }

    for bin in &bins {
        let favorite = if bin.is_favorite { "*" } else { " " };
        let operator = bin.operator.as_deref().unwrap_or("-");
        let categories: Vec<&str> = bin.accepted.iter().map(|c| c.as_str()).collect();
        println!(
            "{favorite} [{:>3}] {:<40} {:<28} {:<10} x{}  {}",
            bin.id,
            bin.name,
            operator,
            bin.status,
            bin.verification_count,
            categories.join(",")
        );
    }
    println!("{} of {} bins", bins.len(), snapshot.len());
    Ok(())
}

fn run_add(store: &BinStore, args: &[String]) -> Result<()> {
    let name = args.first().ok_or_else(|| anyhow!("add needs a name"))?;
    let latitude: f64 = args
        .get(1)
        .ok_or_else(|| anyhow!("add needs a latitude"))?
        .parse()
        .context("invalid latitude")?;
    let longitude: f64 = args
        .get(2)
        .ok_or_else(|| anyhow!("add needs a longitude"))?
        .parse()
        .context("invalid longitude")?;

    let bin = NewBin::new(name.clone(), latitude, longitude);
    bin.validate()?;
    let id = store.insert(bin)?;
    println!("Added bin {id}: {name}");
    Ok(())
}

fn run_favorite(store: &BinStore, args: &[String]) -> Result<()> {
    let id: i64 = args
        .first()
        .ok_or_else(|| anyhow!("favorite needs an id"))?
        .parse()
        .context("invalid id")?;
    let value = match args.get(1).map(String::as_str) {
        Some("on") | Some("true") => true,
        Some("off") | Some("false") => false,
        _ => return Err(anyhow!("favorite needs on|off")),
    };

    store.set_favorite(id, value)?;
    println!("Bin {id} favorite = {value}");
    Ok(())
}

fn run_verify(store: &BinStore, args: &[String], status: BinStatus) -> Result<()> {
    let id: i64 = args
        .first()
        .ok_or_else(|| anyhow!("command needs an id"))?
        .parse()
        .context("invalid id")?;

    store.record_verification(id, status, Utc::now())?;
    let bin = store
        .get(id)
        .ok_or_else(|| anyhow!("bin disappeared after update"))?;
    println!(
        "Bin {id} is now {} (verified {} times)",
        bin.status, bin.verification_count
    );
    Ok(())
}

fn run_map(store: &BinStore, args: &[String]) -> Result<()> {
    let focus = match args.first() {
        Some(raw) => Some(raw.parse::<i64>().context("invalid focus id")?),
        None => None,
    };

    let mut markers = MarkerSet::new();
    markers.reconcile(&store.snapshot(), focus);

    for marker in markers.iter() {
        let focused = if marker.focused { " <- focused" } else { "" };
        println!(
            "[{:>3}] ({:.4}, {:.4}) {}{focused}",
            marker.id, marker.latitude, marker.longitude, marker.label
        );
    }
    println!("{} markers", markers.len());
    Ok(())
}

fn run_remind(store: &BinStore) -> Result<()> {
    let snapshot = store.snapshot();
    let now = Utc::now();
    let threshold = staleness::default_threshold();
    let stale = staleness::stale_favorites(&snapshot, now, threshold);

    // This count is what the notification collaborator would receive.
    println!("{} favorite bin(s) need re-verification", stale.len());
    for bin in stale {
        match bin.last_verified_at {
            Some(last) => {
                let days = (now - last).num_days();
                println!("  [{:>3}] {} - last verified {days} days ago", bin.id, bin.name);
            }
            None => println!("  [{:>3}] {} - never verified", bin.id, bin.name),
        }
    }
    Ok(())
}
