//! redocx CLI - template-driven DOCX reconstruction tool

mod classifier;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use redocx::filler::FixedFiller;
use redocx::render::{to_json, to_preview_html};
use redocx::{
    DeduplicationFilter, FormatStrategy, InjectOptions, JsonFormat, Package, Pipeline, Redocx,
    RetryPolicy, TemplateParser,
};

use classifier::{HttpClassifier, DEFAULT_MODEL};

#[derive(Parser)]
#[command(name = "redocx")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Rebuild DOCX documents from a template and classified text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the style catalog of a template as JSON
    Styles {
        /// Template DOCX file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the blueprint of a template as JSON
    Blueprint {
        /// Template DOCX file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Maximum number of slots
        #[arg(long, default_value = "500")]
        max_slots: usize,
    },

    /// Inject saved classifier output (JSON blocks) into a template
    Inject {
        /// Template DOCX file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Classified blocks as JSON
        #[arg(value_name = "BLOCKS")]
        blocks: PathBuf,

        /// Output DOCX file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Copy direct formatting of aligned template paragraphs
        #[arg(long, env = "REDOCX_FORMAT_COPY")]
        format_copy: bool,

        /// Last-resort style name
        #[arg(long)]
        default_style: Option<String>,

        /// Keep repeated blocks
        #[arg(long)]
        no_dedup: bool,
    },

    /// Classify raw text through an HTTP endpoint and format it after a template
    Format {
        /// Raw text file
        #[arg(value_name = "TEXT")]
        text: PathBuf,

        /// Template DOCX file (built-in blank template if not specified)
        #[arg(short, long, value_name = "TEMPLATE")]
        template: Option<PathBuf>,

        /// Output DOCX file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// OpenAI-compatible endpoint base URL
        #[arg(long, env = "REDOCX_CLASSIFIER_URL")]
        url: String,

        /// API key for the endpoint
        #[arg(long, env = "REDOCX_CLASSIFIER_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Model name
        #[arg(long, env = "REDOCX_CLASSIFIER_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Timeout per classification call in seconds
        #[arg(long, env = "REDOCX_TIMEOUT_SECS", default_value = "60")]
        timeout: u64,

        /// Copy direct formatting of aligned template paragraphs
        #[arg(long, env = "REDOCX_FORMAT_COPY")]
        format_copy: bool,

        /// Write the plain-text preview next to the output
        #[arg(long)]
        preview: bool,
    },

    /// Show a plain-text (or HTML) preview of a DOCX file
    Preview {
        /// DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Render HTML instead of plain text
        #[arg(long)]
        html: bool,
    },

    /// Show template information
    Info {
        /// Template DOCX file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Styles {
            template,
            output,
            compact,
        }) => cmd_styles(&template, output.as_deref(), compact),
        Some(Commands::Blueprint {
            template,
            output,
            compact,
            max_slots,
        }) => cmd_blueprint(&template, output.as_deref(), compact, max_slots),
        Some(Commands::Inject {
            template,
            blocks,
            output,
            format_copy,
            default_style,
            no_dedup,
        }) => cmd_inject(
            &template,
            &blocks,
            &output,
            format_copy,
            default_style,
            no_dedup,
        ),
        Some(Commands::Format {
            text,
            template,
            output,
            url,
            key,
            model,
            timeout,
            format_copy,
            preview,
        }) => cmd_format(FormatArgs {
            text,
            template,
            output,
            url,
            key,
            model,
            timeout: Duration::from_secs(timeout),
            format_copy,
            preview,
        }),
        Some(Commands::Preview {
            input,
            output,
            html,
        }) => cmd_preview(&input, output.as_deref(), html),
        Some(Commands::Info { template }) => cmd_info(&template),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: redocx <COMMAND> ...".yellow());
            println!("       redocx --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_styles(
    template: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = redocx::extract_styles(template)?;
    let json = to_json(&catalog, json_format(compact))?;
    write_or_print(output, &json)
}

fn cmd_blueprint(
    template: &Path,
    output: Option<&Path>,
    compact: bool,
    max_slots: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = redocx::ExtractOptions::new().with_max_slots(max_slots);
    let parsed = redocx::parse_template_with_options(template, options)?;
    let json = to_json(&parsed.blueprint, json_format(compact))?;
    write_or_print(output, &json)
}

fn cmd_inject(
    template: &Path,
    blocks: &Path,
    output: &Path,
    format_copy: bool,
    default_style: Option<String>,
    no_dedup: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(blocks)?;
    let filler = FixedFiller::from_json(&raw)?;

    let mut builder = Redocx::new();
    if format_copy {
        builder = builder.format_copy();
    }
    if let Some(style) = default_style {
        builder = builder.with_default_style(style);
    }
    if !no_dedup {
        builder = builder.with_dedup(DeduplicationFilter::new());
    }

    let template = builder.template(template)?;
    redocx::filler::validate_blocks(filler.blocks(), template.blueprint())?;
    let injection = template.inject_with_stats(filler.blocks())?;
    injection.document.save(output)?;

    println!("{} {}", "Saved to".green(), output.display());
    print_stats(&injection.stats);
    Ok(())
}

struct FormatArgs {
    text: PathBuf,
    template: Option<PathBuf>,
    output: PathBuf,
    url: String,
    key: Option<String>,
    model: String,
    timeout: Duration,
    format_copy: bool,
    preview: bool,
}

fn cmd_format(args: FormatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw_text = fs::read_to_string(&args.text)?;
    let template = match &args.template {
        Some(path) => fs::read(path)?,
        None => Package::blank()?.to_bytes()?,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Classifying text...");

    let classifier = HttpClassifier::new(&args.url, args.key, args.model, args.timeout)?;
    let strategy = if args.format_copy {
        FormatStrategy::FormatCopy
    } else {
        FormatStrategy::StyleOnly
    };
    let pipeline = Pipeline::builder()
        .filler(classifier)
        .retry_policy(RetryPolicy::new().with_timeout(args.timeout))
        .inject_options(InjectOptions::new().with_strategy(strategy))
        .build()?;

    let result = pipeline.run(&template, &raw_text);
    pb.finish_and_clear();
    let output = result.map_err(|e| format!("{} ({})", e.user_message(), e))?;

    output.document.save(&args.output)?;
    println!("{} {}", "Saved to".green(), args.output.display());

    if args.preview {
        let preview_path = args.output.with_extension("txt");
        fs::write(&preview_path, &output.preview)?;
        println!("{} {}", "Preview".green(), preview_path.display());
    }
    print_stats(&output.stats);
    Ok(())
}

fn cmd_preview(
    input: &Path,
    output: Option<&Path>,
    html: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = redocx::preview_text(input)?;
    let rendered = if html { to_preview_html(&text) } else { text };
    write_or_print(output, &rendered)
}

fn cmd_info(template: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = redocx::detect_format_from_path(template)?;
    let parser = TemplateParser::open(template)?;
    let package_parts = parser.package().parts().len();
    let main_part = parser.package().main_part_name().to_string();
    let parsed = parser.parse()?;

    println!("{}", "Template Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), template.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {}", "Parts".bold(), package_parts);
    println!("{}: {}", "Main part".bold(), main_part);
    println!("{}: {}", "Styles".bold(), parsed.catalog.len());
    if let Some(default) = parsed.catalog.default_paragraph_style() {
        println!("{}: {}", "Default style".bold(), default.name);
    }

    println!();
    println!("{}", "Blueprint".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    for slot in parsed.blueprint.slots() {
        *kinds.entry(slot.kind.to_string()).or_default() += 1;
    }
    println!("{}: {}", "Slots".bold(), parsed.blueprint.len());
    for (kind, count) in &kinds {
        println!("  {} {}: {}", "├─".dimmed(), kind, count);
    }
    println!("{}: {}", "Tables".bold(), parsed.blueprint.tables().len());
    for table in parsed.blueprint.tables() {
        println!(
            "  {} {} ({}x{}{})",
            "├─".dimmed(),
            table.id,
            table.rows,
            table.cols,
            table
                .style_name
                .as_deref()
                .map(|s| format!(", {}", s))
                .unwrap_or_default()
        );
    }

    Ok(())
}

fn print_stats(stats: &redocx::InjectionStats) {
    println!(
        "{} {} paragraphs, {} tables, {} cells, {} skipped",
        "Done!".green().bold(),
        stats.paragraphs,
        stats.tables,
        stats.cells_filled,
        stats.skipped
    );
}

fn cmd_version() {
    println!("{} {}", "redocx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Template-driven DOCX reconstruction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/redocx".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_blank_template(dir: &Path) -> PathBuf {
        let path = dir.join("template.docx");
        fs::write(&path, Package::blank().unwrap().to_bytes().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_parse_inject_command() {
        let cli = Cli::try_parse_from([
            "redocx",
            "inject",
            "template.docx",
            "blocks.json",
            "-o",
            "out.docx",
            "--default-style",
            "Normal",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Inject {
                output,
                default_style,
                no_dedup,
                ..
            }) => {
                assert_eq!(output, PathBuf::from("out.docx"));
                assert_eq!(default_style.as_deref(), Some("Normal"));
                assert!(!no_dedup);
            }
            _ => panic!("expected inject command"),
        }
    }

    #[test]
    fn test_inject_then_preview() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_blank_template(dir.path());
        let blocks = dir.path().join("blocks.json");
        fs::write(
            &blocks,
            r#"[{"kind":"heading","text":"NOTICE OF MOTION"},{"kind":"paragraph","text":"[x] Served"}]"#,
        )
        .unwrap();
        let output = dir.path().join("out.docx");

        cmd_inject(&template, &blocks, &output, false, None, false).unwrap();
        assert!(redocx::is_docx(&output));

        let preview = dir.path().join("out.txt");
        cmd_preview(&output, Some(&preview), false).unwrap();
        assert_eq!(
            fs::read_to_string(&preview).unwrap(),
            "NOTICE OF MOTION\n\n\u{2611} Served"
        );
    }

    #[test]
    fn test_inject_rejects_unknown_table() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_blank_template(dir.path());
        let blocks = dir.path().join("blocks.json");
        fs::write(
            &blocks,
            r#"[{"kind":"table_cell","text":"x","table_id":"parties","row":0,"col":0}]"#,
        )
        .unwrap();
        let output = dir.path().join("out.docx");

        assert!(cmd_inject(&template, &blocks, &output, false, None, false).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_blueprint_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_blank_template(dir.path());
        let output = dir.path().join("blueprint.json");

        cmd_blueprint(&template, Some(&output), true, 500).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert!(json.is_object());
    }
}
