use bucketgal::browse::Gallery;
use bucketgal::config::{self, CONFIG_FILENAME, GalleryConfig};
use bucketgal::imaging::{PreviewMode, PreviewPipeline};
use bucketgal::pregen::PreviewGenerator;
use bucketgal::schedule::spawn_periodic;
use bucketgal::store::{FsStore, ObjectStore};
use bucketgal::types::EntryKind;
use bucketgal::{logging, output};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bucketgal")]
#[command(about = "Browse an object-store bucket as a paginated gallery")]
#[command(long_about = "\
Browse an object-store bucket as a paginated gallery

The bucket is a flat set of keys. Directories are a naming convention:

  bucket/
  ├── 0000art-                     # Directory marker (shown as \"art\")
  ├── art/0000posters-             # Nested directory (shown as \"art/posters\")
  ├── art/riot.png                 # File
  ├── art/riot.png.meta.json       # Custom metadata: title, alt, tags, author, blur, notours
  └── art/posters/strike.jpg

A key ending in the directory marker (\"-\") is a directory. A leading
padding token (\"0000\") sorts directories ahead of files and is stripped
for display.

Previews: PNG, JPEG, PDF (first page, needs pdftoppm) and SVG.

Run 'bucketgal gen-config' to generate a documented bucketgal.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Bucket directory (overrides [store] root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List one page of a virtual directory
    Ls {
        /// Directory path, empty for the root
        #[arg(default_value = "")]
        dir: String,
        /// Page token printed by a previous call
        #[arg(long)]
        page: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show resolved metadata for an object
    Meta {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Render a preview PNG
    Render {
        path: String,
        /// og (fixed canvas) or browse (size ceiling)
        #[arg(long, default_value = "og")]
        mode: PreviewMode,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build the tag index and list tags, or the entries of one tag
    Index {
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Search titles, alt text and tags
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Restrict to file or directory
        #[arg(long, value_parser = parse_kind)]
        kind: Option<EntryKind>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Write browse previews for every new or changed object
    Pregen {
        /// Output directory (overrides [pregen] output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Keep running at [pregen] interval_secs
        #[arg(long)]
        watch: bool,
    },
    /// Print a stock bucketgal.toml with all options documented
    GenConfig,
}

fn parse_kind(s: &str) -> Result<EntryKind, String> {
    EntryKind::parse(s).ok_or_else(|| format!("unknown kind '{s}' (expected file or directory)"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config)?;
    if let Some(root) = &cli.root {
        config.store.root = root.to_string_lossy().into_owned();
    }
    logging::init(&config.logging, cli.verbose);

    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(&config.store.root));
    let gallery = Gallery::from_config(store.clone(), &config);

    match cli.command {
        Command::Ls { dir, page, json } => {
            let page = gallery.list_page(&dir, page.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                output::print_page(&page);
            }
        }
        Command::Meta { path, json } => match gallery.metadata(&path) {
            Some(meta) if json => println!("{}", serde_json::to_string_pretty(&meta)?),
            Some(meta) => output::print_metadata(&path, &meta),
            None => return Err(format!("no metadata for {path}").into()),
        },
        Command::Render {
            path,
            mode,
            output: out,
        } => {
            let artifact = gallery.preview(&path, mode)?;
            std::fs::write(&out, &artifact.bytes)?;
            output::print_render(
                &path,
                &out.display().to_string(),
                artifact.width,
                artifact.height,
                &artifact.etag(),
            );
        }
        Command::Index { tag, offset } => {
            refresh(&gallery)?;
            match tag {
                Some(tag) => output::print_tag_page(&tag, &gallery.tag_page(&tag, offset), offset),
                None => output::print_tag_groups(&gallery.tag_groups()),
            }
        }
        Command::Search {
            terms,
            kind,
            offset,
        } => {
            refresh(&gallery)?;
            let query = terms.join(" ");
            let page = gallery.search_page(&query, kind, offset);
            output::print_search(&query, &page, offset);
        }
        Command::Pregen { output_dir, watch } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.pregen.output_dir));
            let generator = Arc::new(pregen_for(store, &config, output_dir));
            if watch {
                watch_pregen(generator, Duration::from_secs(config.pregen.interval_secs))?;
            } else if let Some(stats) = generator.run()? {
                output::print_pregen(&stats);
            }
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

fn refresh(gallery: &Gallery) -> Result<(), Box<dyn std::error::Error>> {
    match gallery.refresh_index() {
        bucketgal::index::RefreshOutcome::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

fn pregen_for(store: Arc<dyn ObjectStore>, config: &GalleryConfig, out: PathBuf) -> PreviewGenerator {
    PreviewGenerator::new(
        store,
        config.naming(),
        PreviewPipeline::with_default_rasterizers(config.preview_settings()),
        out,
    )
}

/// Run the generator now and every `interval` until the process is killed.
fn watch_pregen(generator: Arc<PreviewGenerator>, interval: Duration) -> std::io::Result<()> {
    info!(interval_secs = interval.as_secs(), "Watching bucket for new objects");
    let _periodic = spawn_periodic("pregen", interval, move || match generator.run() {
        Ok(Some(stats)) => output::print_pregen(&stats),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Preview generation run failed"),
    })?;
    loop {
        std::thread::park();
    }
}
