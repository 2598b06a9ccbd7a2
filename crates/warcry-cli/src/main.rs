//! Warcry data CLI
//!
//! Command-line tool for loading, checking, resolving and exporting Warcry warband fragments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warcry_core::{
    load_directory, Config, ExportFormat, FragmentKind, LoadedFragments, ResolutionSummary,
    WarbandPipeline, TABLE_WOUNDS,
};

#[derive(Parser)]
#[command(name = "warcry")]
#[command(about = "Warcry warband data pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fragment root directory, overrides the config
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Schema directory, overrides the config
    #[arg(short, long, global = true)]
    schemas: Option<PathBuf>,

    /// Localisation directory, overrides the config
    #[arg(long, global = true)]
    localisation: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the fragment files found under the data root
    Scan,

    /// Give fighters and abilities without a valid _id a new one
    AssignIds {
        /// Rewrite the fragment files that received new identifiers
        #[arg(short, long)]
        write: bool,
    },

    /// Check identifiers, record fields, characteristics and schema files
    Validate {
        /// Write the report to this file (JSON)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve the dataset and write export projections
    Export {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (all, json, warbands, tts, csv, markdown or localisation)
        #[arg(short, long, default_value = "all")]
        format: String,
    },

    /// Show how a fighter was resolved
    Explain {
        /// Fighter identifier or exact name
        #[arg(short, long)]
        fighter: String,
    },

    /// Write a config file with every default filled in
    InitConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warcry=info",
        1 => "warcry=debug",
        _ => "warcry=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> warcry_core::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Scan => cmd_scan(&config),
        Commands::AssignIds { write } => cmd_assign_ids(&config, write),
        Commands::Validate { report, json } => cmd_validate(&config, report, json),
        Commands::Export { output, format } => cmd_export(&config, &output, &format),
        Commands::Explain { fighter } => cmd_explain(&config, &fighter),
        Commands::InitConfig { output } => cmd_init_config(&config, &output),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn load_config(cli: &Cli) -> warcry_core::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(data) = &cli.data {
        config.data_root = data.clone();
    }
    if let Some(schemas) = &cli.schemas {
        config.schema_dir = schemas.clone();
    }
    if let Some(localisation) = &cli.localisation {
        config.localisation_dir = Some(localisation.clone());
    }
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn cmd_scan(config: &Config) -> warcry_core::Result<()> {
    let raw = load_directory(&config.data_root, &config.file_glob)?;

    println!("Scanned {}:", config.data_root.display());
    for fragment in &raw.fragments {
        let kind = match fragment.kind {
            FragmentKind::Fighters => "fighters",
            FragmentKind::Abilities => "abilities",
            FragmentKind::Faction => "faction",
        };
        let encoding = if fragment.latin1 { " [latin-1]" } else { "" };
        println!(
            "  {:<10} {:>4}  {}{}",
            kind,
            fragment.records.len(),
            fragment.path.display(),
            encoding
        );
    }
    println!();
    println!(
        "Found {} files: {} fighters, {} abilities, {} factions",
        raw.fragments.len(),
        raw.fighters.len(),
        raw.abilities.len(),
        raw.factions.len()
    );

    Ok(())
}

fn cmd_assign_ids(config: &Config, write: bool) -> warcry_core::Result<()> {
    let loaded = LoadedFragments::load(config)?;

    if loaded.assignments.is_empty() {
        println!("Every fighter and ability already has a valid _id");
        return Ok(());
    }

    println!("Assigned {} identifier(s):", loaded.assignments.len());
    for a in &loaded.assignments {
        let previous = match &a.previous {
            Some(p) => format!(" (was {})", p),
            None => String::new(),
        };
        println!("  {} #{} '{}': {}{}", a.collection, a.index, a.name, a.id, previous);
    }

    if write {
        let written = loaded.write_assigned()?;
        println!();
        println!("Rewrote {} fragment file(s):", written.len());
        for path in &written {
            println!("  {}", path.display());
        }
    } else {
        println!();
        println!("Run with --write to store these identifiers in the fragment files");
    }

    Ok(())
}

fn cmd_validate(config: &Config, report_path: Option<PathBuf>, json: bool) -> warcry_core::Result<()> {
    let loaded = LoadedFragments::load(config)?;
    let report = loaded.validate();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
        if !report.errors.is_empty() {
            println!("\nErrors:");
            for error in &report.errors {
                println!("  - {}", error);
            }
        }
        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
        }
    }

    if let Some(path) = report_path {
        report.save(&path)?;
        println!("\nReport written to {}", path.display());
    }

    report.into_result().map(|_| ())
}

fn print_resolution(summary: &ResolutionSummary) {
    println!(
        "Resolved {} faction(s), {} subfaction(s), {} ability assignment(s)",
        summary.factions_assigned, summary.subfactions_assigned, summary.ability_assignments
    );
    if !summary.unmatched_fighters.is_empty() {
        println!("Fighters without a faction ({}):", summary.unmatched_fighters.len());
        for fighter in &summary.unmatched_fighters {
            println!("  {}", fighter);
        }
    }
    if !summary.unassigned_abilities.is_empty() {
        println!("Abilities that reached no fighter ({}):", summary.unassigned_abilities.len());
        for ability in &summary.unassigned_abilities {
            println!("  {}", ability);
        }
    }
}

fn cmd_export(config: &Config, output: &PathBuf, format: &str) -> warcry_core::Result<()> {
    let format: ExportFormat = format.parse()?;
    let pipeline = WarbandPipeline::new(config)?;
    print_resolution(pipeline.summary());

    let summary = pipeline.export(output, format)?;

    if !summary.warnings.is_empty() {
        println!("\nWarnings ({}):", summary.warnings.len());
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }
    println!();
    println!("Exported {} ({}) to {}", summary.files.len(), format, output.display());

    Ok(())
}

fn cmd_explain(config: &Config, fighter: &str) -> warcry_core::Result<()> {
    let pipeline = WarbandPipeline::new(config)?;
    let explanation = pipeline.explain(fighter)?;

    println!("Fighter: {} ({})", explanation.name, explanation.id);
    println!("Warband: {}", explanation.warband);
    println!(
        "Faction: {}",
        explanation.faction.as_deref().unwrap_or("(none)")
    );
    println!(
        "Subfaction: {}",
        explanation.subfaction.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Abilities ({}):", explanation.abilities.len());
    for ability in &explanation.abilities {
        println!(
            "  {} [{}] {} <- {} '{}'",
            ability.id, ability.cost, ability.name, ability.reason, ability.key
        );
    }

    if let Some(f) = pipeline.dataset().find_fighter(&explanation.id) {
        println!();
        println!("Average damage (vs lower / same / higher toughness):");
        for weapon in &f.weapons {
            let avg = weapon.average_damage();
            println!(
                "  {:<12} {:>6.2} {:>6.2} {:>6.2}",
                weapon.runemark, avg.vs_lower, avg.vs_same, avg.vs_higher
            );
        }
        if let Some((weapon, chance)) = f.best_kill_chance(f.toughness, f.wounds, 2) {
            println!(
                "Best chance to take down its own profile in two attacks: {:.1}% ({})",
                chance * 100.0,
                weapon.runemark
            );
        }

        println!();
        println!("Chance to take down a target in one attack (%):");
        let header: Vec<String> = TABLE_WOUNDS.iter().map(|w| format!("W{:<3}", w)).collect();
        println!("      {}", header.join(" "));
        for row in f.kill_chance_table(1).chunks(TABLE_WOUNDS.len()) {
            let cells: Vec<String> = row.iter().map(|(_, pct)| format!("{:>4}", pct)).collect();
            println!("  T{}  {}", row[0].0.toughness, cells.join(" "));
        }
    }

    Ok(())
}

fn cmd_init_config(config: &Config, output: &PathBuf) -> warcry_core::Result<()> {
    config.save(output)?;
    println!("Created config file: {}", output.display());
    println!("Edit the file to change paths and export rules.");
    Ok(())
}
