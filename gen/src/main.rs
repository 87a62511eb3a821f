use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use genlib::{
    FXY, builtin,
    prelude::{BUFRTableB, BUFRTableD},
};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gen-ctl")]
#[command(about = "BUFR Table inspection tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a BUFR table in formatted output
    Print {
        /// WMO CSV file; the built-in TEMP subset is printed when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Table type: "d" for Table D, "b" for Table B
        #[arg(short, long)]
        table_type: String,

        /// Maximum number of entries to print (optional)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Check that every Table D sequence resolves and is acyclic
    Check {
        /// WMO Table B CSV; built-in subset when omitted
        #[arg(short, long)]
        btable: Option<PathBuf>,

        /// WMO Table D CSV; built-in subset when omitted
        #[arg(short, long)]
        dtable: Option<PathBuf>,
    },
    /// Write the built-in TEMP subset as WMO-format CSV files
    Export {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Master table version used in the file names
        #[arg(short, long, default_value_t = 0)]
        version: u8,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            input,
            table_type,
            limit,
        } => {
            print_table(input.as_deref(), &table_type, limit)?;
        }
        Commands::Check { btable, dtable } => {
            check_tables(btable.as_deref(), dtable.as_deref())?;
        }
        Commands::Export { output, version } => {
            export_builtin(&output, version)?;
        }
    }

    Ok(())
}

fn load_b(path: Option<&Path>) -> Result<BUFRTableB> {
    match path {
        Some(p) => BUFRTableB::load_from_disk(p),
        None => Ok(builtin::table_b()),
    }
}

fn load_d(path: Option<&Path>) -> Result<BUFRTableD> {
    match path {
        Some(p) => BUFRTableD::load_from_disk(p),
        None => Ok(builtin::table_d()),
    }
}

fn print_table(input: Option<&Path>, table_type: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(usize::MAX);
    match table_type.to_lowercase().as_str() {
        "b" => {
            let table = load_b(input)?;
            println!("Table B ({} entries)", table.len());
            println!("{}", "-".repeat(110));
            for entry in table.get_all_entries().into_iter().take(limit) {
                println!("{}", entry);
            }
        }
        "d" => {
            let table = load_d(input)?;
            println!("Table D ({} entries)", table.len());
            println!("{}", "-".repeat(110));
            for entry in table.get_all_entries().into_iter().take(limit) {
                println!("{}", entry);
            }
        }
        _ => bail!("Invalid table type: {}. Use 'b' or 'd'", table_type),
    }
    Ok(())
}

fn check_tables(btable: Option<&Path>, dtable: Option<&Path>) -> Result<()> {
    let tb = load_b(btable)?;
    let td = load_d(dtable)?;

    let mut problems = 0usize;
    for seq in td.get_all_entries() {
        for member in seq.fxy_chain() {
            let resolved = match member.f {
                0 => tb.lookup(member).is_some(),
                3 => td.lookup(member).is_some(),
                _ => true,
            };
            if !resolved {
                problems += 1;
                println!("{}: unresolved member {}", seq.fxy, member);
            }
        }

        let mut path = vec![seq.fxy];
        if let Some(cycle) = find_cycle(&td, seq.fxy, &mut path, &mut FxHashSet::default()) {
            problems += 1;
            let rendered: Vec<String> = cycle.iter().map(FXY::to_string).collect();
            println!("{}: cycle {}", seq.fxy, rendered.join(" -> "));
        }
    }

    println!(
        "Checked {} Table B and {} Table D entries: {} problem(s)",
        tb.len(),
        td.len(),
        problems
    );
    if problems > 0 {
        bail!("table check failed");
    }
    Ok(())
}

fn find_cycle(
    td: &BUFRTableD,
    fxy: FXY,
    path: &mut Vec<FXY>,
    done: &mut FxHashSet<FXY>,
) -> Option<Vec<FXY>> {
    let seq = td.lookup(&fxy)?;
    for member in seq.fxy_chain().iter().filter(|m| m.f == 3) {
        if path.contains(member) {
            let mut cycle = path.clone();
            cycle.push(*member);
            return Some(cycle);
        }
        if done.contains(member) {
            continue;
        }
        path.push(*member);
        if let Some(cycle) = find_cycle(td, *member, path, done) {
            return Some(cycle);
        }
        path.pop();
        done.insert(*member);
    }
    None
}

fn export_builtin(output: &Path, version: u8) -> Result<()> {
    let (b_path, d_path) = builtin::export_csv(output, version)?;
    println!("Wrote {} and {}", b_path.display(), d_path.display());
    Ok(())
}
