use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use php_editor::{
    BatchSpec, ChainLocator, Config, DocBlock, FileDiff, FsStorage, PhpFile, Psr4Locator,
    SourceTreeLocator, Style, Visibility,
};

#[derive(Parser)]
#[command(name = "php-editor")]
#[command(about = "Edit PHP class files without reformatting them: add methods and use imports")]
#[command(long_about = "Format-preserving PHP class editor.

Only the regions an edit touches change; every other byte of the file, comments and
whitespace included, is written back exactly as it was.

COMMON USE CASES:
  Create a class skeleton:
    php-editor create --path src/Models/User.php --namespace App\\\\Models --class User

  Preview adding a method (dry run), then write it:
    php-editor add-method --path src/Models/User.php --name isAdmin --body 'return $this->admin;'
    php-editor add-method --path src/Models/User.php --name isAdmin --body 'return $this->admin;' --apply

  Import classes into a file found through composer.json:
    php-editor add-use --class App\\\\Models\\\\User Carbon\\\\Carbon Illuminate\\\\Support\\\\Str --apply")]
#[command(after_help = "For detailed help on any command, use: php-editor <COMMAND> --help")]
#[command(version)]
struct Cli {
    /// Log more (-v for debug, -vv for trace). RUST_LOG is honoured when not given.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: the nearest .php-editor.toml above the target file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// The file to edit, by path or by class name.
#[derive(Args)]
struct Target {
    /// Path of the PHP file
    #[arg(short, long, required_unless_present = "class", conflicts_with = "class")]
    path: Option<PathBuf>,

    /// Fully qualified class name, resolved through composer.json and the source roots
    #[arg(short, long)]
    class: Option<String>,

    /// composer.json used to resolve --class (default: ./composer.json when present)
    #[arg(long)]
    composer: Option<PathBuf>,

    /// Directory scanned for --class when PSR-4 lookup fails (repeatable, default: .)
    #[arg(long)]
    root: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a file containing an empty class
    Create {
        /// Path of the new file
        #[arg(short, long)]
        path: PathBuf,

        /// Namespace of the class (empty for the global namespace)
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Class name
        #[arg(short, long)]
        class: String,
    },

    /// Print a file as the editor sees it
    Show {
        #[command(flatten)]
        target: Target,
    },

    /// Append a method to the class
    #[command(after_help = "EXAMPLES:
    php-editor add-method --path src/Greeter.php --name greet --body 'return \"hi\";'

    php-editor add-method --path src/Greeter.php --name reset --visibility protected \\
        --body '$this->count = 0;' \\
        --doc '{\"message\": \"Reset the counter\", \"return\": \"void\"}' --apply")]
    AddMethod {
        #[command(flatten)]
        target: Target,

        /// Method name
        #[arg(short, long)]
        name: String,

        /// public, protected or private
        #[arg(long, default_value = "public")]
        visibility: String,

        /// Statements of the method body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Documentation comment as a JSON object: "message", "description" and tags
        #[arg(short, long)]
        doc: Option<String>,

        /// Write the file (default is a dry run printing a diff)
        #[arg(long)]
        apply: bool,
    },

    /// Import classes; imports are merged, deduplicated and sorted
    AddUse {
        #[command(flatten)]
        target: Target,

        /// Fully qualified class names
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,

        /// Write the file (default is a dry run printing a diff)
        #[arg(long)]
        apply: bool,
    },

    /// Run a list of operations from a YAML or JSON file
    #[command(after_help = "BATCH FILE:
    path: src/Models/User.php
    create:                # optional, creates the file when missing
      namespace: App\\Models
      class: User
    operations:
      - type: AddUse
        names: [Carbon\\Carbon]
      - type: AddMethod
        name: touch
        visibility: public
        body: \"$this->touched = Carbon::now();\"
        doc:
          message: Mark as touched
          return: void

Relative paths are resolved against the directory of the batch file.")]
    Batch {
        /// Batch file (.yaml, .yml or .json)
        #[arg(short, long)]
        spec: PathBuf,

        /// Write the file (default is a dry run printing a diff)
        #[arg(long)]
        apply: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Create {
            path,
            namespace,
            class,
        } => {
            let style = load_style(cli.config.as_deref(), &path)?;
            PhpFile::create_with(&path, &namespace, &class, FsStorage, style)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            println!("Created {}", path.display());
        }

        Commands::Show { target } => {
            let file = open_target(&target, cli.config.as_deref())?;
            print!("{}", file.contents());
        }

        Commands::AddMethod {
            target,
            name,
            visibility,
            body,
            doc,
            apply,
        } => {
            let visibility: Visibility = visibility.parse()?;
            let doc = match doc {
                Some(json) => serde_json::from_str::<DocBlock>(&json)
                    .context("--doc must be a JSON object")?,
                None => DocBlock::new(),
            };

            let mut file = open_target(&target, cli.config.as_deref())?;
            file.add_method(visibility, &name, &body, &doc)
                .with_context(|| format!("Failed to add method {name}"))?;
            finish(&mut file, apply)?;
        }

        Commands::AddUse {
            target,
            names,
            apply,
        } => {
            let mut file = open_target(&target, cli.config.as_deref())?;
            file.add_use(&names).context("Failed to add use declarations")?;
            finish(&mut file, apply)?;
        }

        Commands::Batch { spec, apply } => {
            let content = std::fs::read_to_string(&spec)
                .with_context(|| format!("Failed to read batch file {}", spec.display()))?;
            let batch = BatchSpec::parse(&content, &spec)?;
            run_batch(batch, &spec, cli.config.as_deref(), apply)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("php_editor=debug"),
        _ => EnvFilter::new("php_editor=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_style(explicit: Option<&Path>, target: &Path) -> Result<Style> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => {
            let dir = match target.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => std::env::current_dir().context("Failed to read current directory")?,
            };
            Config::discover_and_load(&dir)?
        }
    };
    Ok(config.style)
}

fn build_locator(target: &Target) -> Result<ChainLocator> {
    let mut chain = ChainLocator::new();

    let composer = target
        .composer
        .clone()
        .or_else(|| Some(PathBuf::from("composer.json")).filter(|p| p.is_file()));
    if let Some(manifest) = composer {
        let locator = Psr4Locator::from_composer(&manifest)
            .with_context(|| format!("Failed to load {}", manifest.display()))?;
        chain.push(locator);
    }

    let roots = if target.root.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        target.root.clone()
    };
    chain.push(SourceTreeLocator::new(roots));

    Ok(chain)
}

fn open_target(target: &Target, config: Option<&Path>) -> Result<PhpFile> {
    if let Some(path) = &target.path {
        let style = load_style(config, path)?;
        return PhpFile::open_with(path, FsStorage, style)
            .with_context(|| format!("Failed to open {}", path.display()));
    }

    let Some(class) = &target.class else {
        bail!("either --path or --class is required");
    };
    let locator = build_locator(target)?;
    // no file yet, so the configuration is looked up from the working directory
    let style = load_style(config, Path::new(""))?;
    Ok(PhpFile::for_class_with(class, &locator, FsStorage, style)?)
}

/// Write the file, or print what would change.
fn finish(file: &mut PhpFile, apply: bool) -> Result<()> {
    let verb = if file.is_new() { "Created" } else { "Updated" };
    if apply {
        if file.is_modified() {
            file.write()
                .with_context(|| format!("Failed to write {}", file.filename().display()))?;
            println!("{verb} {}", file.filename().display());
        } else {
            println!("No changes to {}", file.filename().display());
        }
        return Ok(());
    }

    let original = if file.is_new() {
        ""
    } else {
        file.editor().original_source()
    };
    show_diff(file.filename(), original, &file.contents());
    Ok(())
}

fn show_diff(path: &Path, original: &str, modified: &str) {
    let diff = FileDiff::new(path, original, modified, 3);
    if diff.stats.is_empty() {
        println!("No changes to {}", path.display());
        return;
    }

    print!("{}", diff.text);
    println!("\n{}", diff.stats);
    println!("Dry run: re-run with --apply to write the changes.");
}

fn run_batch(batch: BatchSpec, spec: &Path, config: Option<&Path>, apply: bool) -> Result<()> {
    let path = match spec.parent() {
        Some(dir) if batch.path.is_relative() => dir.join(&batch.path),
        _ => batch.path.clone(),
    };
    let style = load_style(config, &path)?;

    // a missing file stays in memory until every operation succeeded
    let mut file = match &batch.create {
        Some(create) => PhpFile::open_or_new_with(
            &path,
            &create.namespace,
            &create.class,
            FsStorage,
            style,
        ),
        None => PhpFile::open_with(&path, FsStorage, style),
    }
    .with_context(|| format!("Failed to open {}", path.display()))?;

    for (i, operation) in batch.operations.iter().enumerate() {
        file.apply(operation)
            .with_context(|| format!("Operation {} failed", i + 1))?;
    }
    finish(&mut file, apply)
}
