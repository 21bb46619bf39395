//! folio CLI - document inspection, export and page assembly

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use folio::{
    export, export_page, merge_documents, split_document, Destination, Document, ExportFormat,
    ExportOptions, Folio, JsonFormat, PageFormat,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Inspect, export, merge and split folio documents", long_about = None)]
struct Cli {
    /// License file to activate before running the command
    #[arg(long, global = true, env = "FOLIO_LICENSE", value_name = "FILE")]
    license: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print product information as JSON instead
        #[arg(long)]
        about: bool,
    },

    /// Extract visible text
    Text {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Only this page
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Export to another format
    Export {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format (docx, xlsx, epub, tiff, n-up, png, svg, ...)
        #[arg(short, long)]
        format: String,

        /// Output file (defaults to the input name with the format's extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Export a single page (required for page formats like png or svg)
        #[arg(short, long)]
        page: Option<u32>,

        /// Raster resolution in dots per inch
        #[arg(long)]
        dpi: Option<u32>,

        /// N-up grid as COLUMNSxROWS, e.g. 2x2
        #[arg(long, value_parser = parse_grid)]
        grid: Option<(u32, u32)>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Concatenate documents
    Merge {
        /// Input documents, in order
        #[arg(value_name = "FILES", required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output document
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Split a document by page ranges
    Split {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Ranges separated by ';' (e.g., "1-2;3;4-")
        #[arg(short, long)]
        ranges: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// List pages with size, rotation and text counts
    Pages {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: ListFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    /// Aligned columns
    Table,
    /// One JSON object per page
    Json,
}

fn parse_grid(s: &str) -> Result<(u32, u32), String> {
    let (columns, rows) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("grid '{}' is not COLUMNSxROWS", s))?;
    let columns = columns.trim().parse().map_err(|_| format!("bad column count in '{}'", s))?;
    let rows = rows.trim().parse().map_err(|_| format!("bad row count in '{}'", s))?;
    Ok((columns, rows))
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Some(path) = &cli.license {
        if let Err(e) = folio::set_license(path) {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Info { input, about } => cmd_info(&input, about),
        Commands::Text {
            input,
            output,
            page,
        } => cmd_text(&input, output.as_deref(), page),
        Commands::Export {
            input,
            format,
            output,
            page,
            dpi,
            grid,
            compact,
        } => {
            let mut options = ExportOptions::new();
            if let Some(dpi) = dpi {
                options = options.with_resolution(dpi);
            }
            if let Some((columns, rows)) = grid {
                options = options.with_grid(columns, rows);
            }
            if compact {
                options = options.with_json_format(JsonFormat::Compact);
            }
            cmd_export(&input, &format, output.as_deref(), page, &options)
        }
        Commands::Merge { inputs, output } => cmd_merge(&inputs, &output),
        Commands::Split {
            input,
            ranges,
            output,
        } => cmd_split(&input, &ranges, output.as_deref()),
        Commands::Pages { input, format } => cmd_pages(&input, format),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn open(input: &Path) -> folio::Result<Document> {
    // lenient so that newer minor versions can still be inspected
    Folio::new().lenient().open(input)
}

fn cmd_info(input: &Path, about: bool) -> CliResult {
    if about {
        println!("{}", serde_json::to_string_pretty(&folio::about())?);
        return Ok(());
    }

    let doc = open(input)?;
    let meta = &doc.metadata;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: folio {}", "Format".bold(), meta.version);
    println!("{}: {}", "Pages".bold(), doc.page_count());

    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Subject", &meta.subject),
        ("Keywords", &meta.keywords),
        ("Creator", &meta.creator),
        ("Producer", &meta.producer),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label.bold(), value);
        }
    }
    if let Some(created) = meta.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(modified) = meta.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let images = doc.resources.values().filter(|r| r.is_image()).count();
    println!("{}: {}", "Words".bold(), doc.word_count());
    println!("{}: {}", "Characters".bold(), doc.character_count());
    println!("{}: {}", "Images".bold(), images);
    println!("{}: {}", "Bookmarks".bold(), doc.bookmarks().len());

    Ok(())
}

fn cmd_text(input: &Path, output: Option<&Path>, page: Option<u32>) -> CliResult {
    let doc = open(input)?;
    let text = match page {
        Some(n) => doc.page_text(n)?,
        None => doc.extract_text(),
    };

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_export(
    input: &Path,
    format: &str,
    output: Option<&Path>,
    page: Option<u32>,
    options: &ExportOptions,
) -> CliResult {
    let doc = open(input)?;

    match page {
        Some(n) => {
            let format: PageFormat = format.parse()?;
            let path = output.map(Path::to_path_buf).unwrap_or_else(|| {
                default_output(input, &format!("page-{}.{}", n, format.extension()))
            });
            export_page(&doc, n, format, options, &Destination::file(&path))?;
            println!("{} {}", "Saved to".green(), path.display());
        }
        None => {
            let format: ExportFormat = format.parse().map_err(|e| {
                if format.parse::<PageFormat>().is_ok() {
                    format!("{} is a page format; pass --page", format)
                } else {
                    format!("{}", e)
                }
            })?;
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_output(input, format.extension()));
            export(&doc, format, options, &Destination::file(&path))?;
            println!("{} {}", "Saved to".green(), path.display());
        }
    }

    Ok(())
}

/// `input` with its extension replaced by `suffix`.
fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}.{}", stem, suffix))
}

fn cmd_merge(inputs: &[PathBuf], output: &Path) -> CliResult {
    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut docs = Vec::with_capacity(inputs.len());
    for input in inputs {
        pb.set_message(input.display().to_string());
        docs.push(open(input)?);
        pb.inc(1);
    }
    pb.finish_with_message("loaded");

    let refs: Vec<&Document> = docs.iter().collect();
    let mut merged = merge_documents(&refs);
    merged.save_as(output)?;

    println!(
        "{} {} documents into {} ({} pages)",
        "Merged".green().bold(),
        inputs.len(),
        output.display(),
        merged.page_count()
    );
    Ok(())
}

fn cmd_split(input: &Path, ranges: &str, output: Option<&Path>) -> CliResult {
    let doc = open(input)?;
    let parts = split_document(&doc, ranges)?;

    let output_dir = output.map(Path::to_path_buf).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_split", stem))
    });
    fs::create_dir_all(&output_dir)?;

    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let last = parts.len().saturating_sub(1);
    for (i, mut part) in parts.into_iter().enumerate() {
        let name = format!("{}-{}.folio", stem, i + 1);
        part.save_as(output_dir.join(&name))?;
        let branch = if i == last { "└─" } else { "├─" };
        println!("  {} {} ({} pages)", branch.dimmed(), name, part.page_count());
    }

    println!("{} {}", "Saved to".green(), output_dir.display());
    Ok(())
}

fn cmd_pages(input: &Path, format: ListFormat) -> CliResult {
    let doc = open(input)?;

    if format == ListFormat::Table {
        println!(
            "{}",
            format!(
                "{:>5}  {:>15}  {:>8}  {:>6}  {:>7}  {:>6}",
                "Page", "Size (pt)", "Rotation", "Words", "Chars", "Blank"
            )
            .bold()
        );
    }

    for n in 1..=doc.page_count() {
        let page = doc.page(n)?;
        let stats = doc.page_stats(n)?;
        let blank = doc.is_page_blank(n)?;
        match format {
            ListFormat::Table => {
                let size = format!("{:.0} x {:.0}", page.width, page.height);
                let blank = if blank { "yes".yellow() } else { "no".normal() };
                println!(
                    "{:>5}  {:>15}  {:>8}  {:>6}  {:>7}  {:>6}",
                    n,
                    size,
                    page.rotation.degrees(),
                    stats.word_count,
                    stats.char_count,
                    blank
                );
            }
            ListFormat::Json => {
                let row = serde_json::json!({
                    "page": n,
                    "width": page.width,
                    "height": page.height,
                    "size": page.size.map(|s| format!("{:?}", s)),
                    "rotation": page.rotation.degrees(),
                    "words": stats.word_count,
                    "characters": stats.char_count,
                    "blank": blank,
                });
                println!("{}", row);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grid() {
        assert_eq!(parse_grid("2x3").unwrap(), (2, 3));
        assert_eq!(parse_grid("4X1").unwrap(), (4, 1));
        assert!(parse_grid("2").is_err());
        assert!(parse_grid("ax2").is_err());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("/tmp/report.folio"), "docx"),
            PathBuf::from("/tmp/report.docx")
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
