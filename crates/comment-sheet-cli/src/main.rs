//! comtab - inspect the comment tables of a project file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comment_sheet::prelude::*;
use comment_sheet::CellKey;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "comtab")]
#[command(author, version, about = "Inspect comment tables stored in a project file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a comment table as tab-separated text
    Show {
        /// Project file (JSON)
        project: PathBuf,

        /// Comment table number
        comment: u32,

        /// Print raw values instead of evaluated results
        #[arg(short, long)]
        raw: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show size, formula and error counts
    Info {
        /// Project file (JSON)
        project: PathBuf,

        /// Only this comment table (default: all)
        comment: Option<u32>,
    },

    /// List the cells a formula cell reads
    Trace {
        /// Project file (JSON)
        project: PathBuf,

        /// Comment table number
        comment: u32,

        /// Cell in A1 notation
        cell: String,

        /// Follow precedents transitively
        #[arg(short, long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Show {
            project,
            comment,
            raw,
            output,
        } => show(&project, comment, raw, output.as_deref()),
        Commands::Info { project, comment } => info(&project, comment),
        Commands::Trace {
            project,
            comment,
            cell,
            all,
        } => trace(&project, comment, &cell, all),
    }
}

fn load_project(path: &Path) -> Result<ProjectFile> {
    ProjectFile::load(path).with_context(|| format!("Failed to open '{}'", path.display()))
}

fn open_sheet(project: &ProjectFile, path: &Path, comment: u32) -> Result<Sheet> {
    project
        .open_sheet(comment, SheetConfig::default())
        .with_context(|| format!("Failed to load comment {} from '{}'", comment, path.display()))
}

/// Last row and column holding a value, if any
fn used_extent(sheet: &Sheet) -> Option<(u32, u16)> {
    sheet
        .store()
        .iter()
        .filter(|(_, _, cell)| !cell.value.is_empty())
        .fold(None, |acc, (row, col, _)| match acc {
            None => Some((row, col)),
            Some((r, c)) => Some((r.max(row), c.max(col))),
        })
}

fn show(path: &Path, comment: u32, raw: bool, output: Option<&Path>) -> Result<()> {
    let project = load_project(path)?;
    let sheet = open_sheet(&project, path, comment)?;

    let Some((last_row, last_col)) = used_extent(&sheet) else {
        eprintln!("Warning: comment {} is empty", comment);
        return Ok(());
    };

    let rows: Vec<Vec<&str>> = (0..=last_row)
        .map(|row| {
            (0..=last_col)
                .map(|col| {
                    if raw {
                        sheet.value(row, col)
                    } else {
                        sheet.display(row, col)
                    }
                })
                .collect()
        })
        .collect();
    let text = comment_sheet::clipboard::encode(&rows);

    if let Some(output) = output {
        std::fs::write(output, &text)
            .with_context(|| format!("Failed to write '{}'", output.display()))?;
        eprintln!("Wrote {} rows to '{}'", rows.len(), output.display());
    } else {
        io::stdout()
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn info(path: &Path, only: Option<u32>) -> Result<()> {
    let project = load_project(path)?;
    let ids = match only {
        Some(id) => vec![id],
        None => project.comment_ids(),
    };

    println!("File: {}", path.display());
    println!("Comment tables: {}", ids.len());

    for id in ids {
        let sheet = open_sheet(&project, path, id)?;
        let stats = sheet.last_stats();

        println!();
        println!("  Comment {}", id);
        println!("    Size: {} rows x {} columns", sheet.row_count(), sheet.col_count());
        match used_extent(&sheet) {
            Some((row, col)) => println!("    Used range: {} rows x {} columns", row + 1, col + 1),
            None => println!("    Used range: empty"),
        }
        println!("    Formulas: {}", stats.formula_count);
        println!("    Errors: {}", stats.errors);
        if stats.circular_references > 0 {
            println!("    Circular references: {}", stats.circular_references);
        }
    }

    Ok(())
}

fn trace(path: &Path, comment: u32, cell: &str, all: bool) -> Result<()> {
    let address =
        CellAddress::parse(cell).with_context(|| format!("Invalid cell reference '{}'", cell))?;
    let project = load_project(path)?;
    let sheet = open_sheet(&project, path, comment)?;

    if !sheet.store().contains(address.row, address.col) {
        bail!(
            "{} is outside the {}x{} sheet",
            cell,
            sheet.row_count(),
            sheet.col_count()
        );
    }

    let keys = if all {
        sheet.trace_precedents(address.row, address.col)
    } else {
        sheet.precedents(address.row, address.col)
    };

    println!(
        "{}\t{}\t{}",
        address.to_a1_string(),
        sheet.value(address.row, address.col),
        sheet.display(address.row, address.col)
    );
    for CellKey { row, col } in keys {
        println!(
            "  {}\t{}",
            CellAddress::new(row, col).to_a1_string(),
            sheet.display(row, col)
        );
    }
    Ok(())
}
