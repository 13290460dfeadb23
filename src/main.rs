use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use studymark::assistant::tutor_instruction;
use studymark::generator::CommandGenerator;
use studymark::records::Difficulty;
use studymark::{Config, Error, StudyAssistant, TextSize, Variant, equation};

#[derive(Parser)]
#[command(name = "studymark")]
#[command(about = "Render study notes and generate study material")]
struct Cli {
    /// Config file (defaults to studymark.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a Markdown-subset file
    Render {
        /// Input text file
        input: PathBuf,

        /// Output file (pdf defaults to the input name with .pdf extension,
        /// other formats default to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Html)]
        format: Format,

        /// Renderer flavor (defaults to the config file's)
        #[arg(long, value_enum)]
        variant: Option<VariantArg>,

        /// Text size preset for the compact variant
        #[arg(long, value_enum)]
        size: Option<SizeArg>,

        /// Treat the input as prose with $inline$ and $$display$$ equations
        #[arg(long)]
        equations: bool,

        /// Wrap HTML output in a complete document
        #[arg(long)]
        standalone: bool,
    },

    /// Generate study material with the configured generator command
    Study {
        #[arg(value_enum)]
        kind: StudyKind,

        /// Lesson content file
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = DifficultyArg::Intermediate)]
        difficulty: DifficultyArg,

        /// Number of quiz questions
        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Message for the tutor (chat only)
        #[arg(long, required_if_eq("kind", "chat"))]
        message: Option<String>,

        /// Subject the tutor specializes in (chat only)
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Typst,
    Pdf,
    Svg,
    Json,
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Full,
    Compact,
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    Normal,
    Small,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StudyKind {
    Summary,
    Flashcards,
    Quiz,
    Glossary,
    Solutions,
    Sources,
    Chat,
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Intermediate,
    Hard,
    Advanced,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Intermediate => Difficulty::Intermediate,
            DifficultyArg::Hard => Difficulty::Hard,
            DifficultyArg::Advanced => Difficulty::Advanced,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref().unwrap_or(Path::new("studymark.toml")));

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: &Config) -> Result<(), Error> {
    match command {
        Commands::Render {
            input,
            output,
            format,
            variant,
            size,
            equations,
            standalone,
        } => {
            let text = read(&input)?;
            let variant = resolve_variant(config, variant, size);
            if equations {
                render_equations(&text, &input, output, format, standalone, config)
            } else {
                render_markdown(&text, &input, output, format, variant, standalone, config)
            }
        }
        Commands::Study {
            kind,
            input,
            difficulty,
            count,
            message,
            subject,
        } => {
            let content = read(&input)?;
            let generator = CommandGenerator::from_config(&config.generator)?;
            let assistant = StudyAssistant::new(generator, config.generator.clone());

            let json = match kind {
                StudyKind::Summary => {
                    let summary = assistant.summary(&content);
                    let blocks = studymark::parse(&summary, config.render.variant());
                    println!("{}", studymark::blocks_to_text(&blocks));
                    return Ok(());
                }
                StudyKind::Chat => {
                    let instruction = tutor_instruction(subject.as_deref(), &content);
                    let message = message.as_deref().unwrap_or_default();
                    let reply = assistant.chat(&[], message, &instruction);
                    let blocks = studymark::parse(&reply, Variant::Compact(TextSize::Normal));
                    println!("{}", studymark::blocks_to_text(&blocks));
                    return Ok(());
                }
                StudyKind::Flashcards => {
                    serde_json::to_string_pretty(&assistant.flashcards(&content))?
                }
                StudyKind::Quiz => {
                    let questions = assistant.quiz(&content, difficulty.into(), count);
                    serde_json::to_string_pretty(&questions)?
                }
                StudyKind::Glossary => {
                    serde_json::to_string_pretty(&assistant.glossary(&content))?
                }
                StudyKind::Solutions => {
                    serde_json::to_string_pretty(&assistant.lesson_solutions(&content))?
                }
                StudyKind::Sources => {
                    serde_json::to_string_pretty(&assistant.suggested_sources(&content))?
                }
            };
            println!("{}", json);
            Ok(())
        }
    }
}

fn resolve_variant(
    config: &Config,
    variant: Option<VariantArg>,
    size: Option<SizeArg>,
) -> Variant {
    let size = match size {
        Some(SizeArg::Normal) => TextSize::Normal,
        Some(SizeArg::Small) => TextSize::Small,
        None => config.render.size,
    };
    match variant {
        Some(VariantArg::Full) => Variant::Full,
        Some(VariantArg::Compact) => Variant::Compact(size),
        None => match config.render.variant() {
            Variant::Full => Variant::Full,
            Variant::Compact(_) => Variant::Compact(size),
        },
    }
}

fn render_markdown(
    text: &str,
    input: &Path,
    output: Option<PathBuf>,
    format: Format,
    variant: Variant,
    standalone: bool,
    config: &Config,
) -> Result<(), Error> {
    match format {
        Format::Html => {
            let html = studymark::markdown_to_html(text, variant);
            emit_text(wrap_html(html, standalone, config), output)
        }
        Format::Typst => emit_text(studymark::markdown_to_typst(text, variant, config), output),
        Format::Json => {
            let blocks = studymark::parse(text, variant);
            emit_text(serde_json::to_string_pretty(&blocks)?, output)
        }
        Format::Text => emit_text(
            studymark::blocks_to_text(&studymark::parse(text, variant)),
            output,
        ),
        Format::Pdf => {
            let bytes = studymark::markdown_to_pdf(text, variant, config)?;
            write_pdf(bytes, input, output)
        }
        Format::Svg => {
            let doc = studymark::markdown_to_svg(text, variant, config)?;
            write_svg(doc, input, output)
        }
    }
}

fn render_equations(
    text: &str,
    input: &Path,
    output: Option<PathBuf>,
    format: Format,
    standalone: bool,
    config: &Config,
) -> Result<(), Error> {
    let parts = equation::split(text);
    match format {
        Format::Html => {
            let html = studymark::equation_to_html(&parts);
            emit_text(wrap_html(html, standalone, config), output)
        }
        Format::Typst => emit_text(studymark::equation_to_typst(&parts, config), output),
        Format::Json => emit_text(serde_json::to_string_pretty(&parts)?, output),
        Format::Text => emit_text(text.to_string(), output),
        Format::Pdf => write_pdf(studymark::equation_to_pdf(text, config)?, input, output),
        Format::Svg => write_svg(studymark::equation_to_svg(text, config)?, input, output),
    }
}

fn wrap_html(html: String, standalone: bool, config: &Config) -> String {
    if standalone {
        studymark::standalone_html(&html, config)
    } else {
        html
    }
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn emit_text(text: String, output: Option<PathBuf>) -> Result<(), Error> {
    match output {
        Some(path) => write(&path, text),
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

fn write_pdf(bytes: Vec<u8>, input: &Path, output: Option<PathBuf>) -> Result<(), Error> {
    let output = output.unwrap_or_else(|| input.with_extension("pdf"));
    write(&output, bytes)?;
    println!("Created {}", output.display());
    Ok(())
}

/// Write one SVG per page: `name.svg` for a single page, `name-N.svg` otherwise.
fn write_svg(
    doc: studymark::SvgDocument,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let base = output.unwrap_or_else(|| input.with_extension("svg"));
    let single = doc.pages.len() == 1;

    for (i, page) in doc.pages.iter().enumerate() {
        let path = if single {
            base.clone()
        } else {
            let stem = base.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            base.with_file_name(format!("{}-{}.svg", stem, i + 1))
        };
        write(&path, page)?;
        println!("Created {}", path.display());
    }
    Ok(())
}
