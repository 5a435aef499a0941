use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use sticker_provider::config::ProviderConfig;
use sticker_provider::media::thumbnail::{warm_thumbnails, SizeHint, ThumbnailCache};
use sticker_provider::provider::{Cursor, DocumentsProvider, StickerProvider};
use sticker_provider::state::import::{import_folder, import_sticker, ImportOutcome};
use sticker_provider::{Library, ProviderError, Result};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: sticker-provider <command> [args]

Commands:
  roots                          List the provider root
  ls [PARENT]                    List child documents (default: sticker root)
  stat DOC_ID                    Show a single document
  recent                         Recently modified stickers
  search QUERY...                Search titles and tags
  thumb DOC_ID WIDTH HEIGHT      Generate (or reuse) a thumbnail and print its path
  warm WIDTH HEIGHT              Generate thumbnails for every sticker
  import PATH [TITLE] [TAGS]     Import a file (TAGS comma-separated) or a whole folder
  config                         Print the effective configuration

Environment:
  STICKER_PROVIDER_CONFIG        Config file (default: <config dir>/rays/provider.json)
  RUST_LOG                       Log filter (default: info)";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "-h" || args[0] == "--help" {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let config_path = std::env::var_os("STICKER_PROVIDER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(ProviderConfig::default_path);
    let config = ProviderConfig::load(&config_path)?;

    let command = args[0].as_str();
    let rest = &args[1..];

    if command == "config" {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    config.ensure_dirs()?;
    let library = Arc::new(Library::open(&config.database_path)?);
    let provider = StickerProvider::with_library(config.clone(), library.clone());

    match command {
        "roots" => print_cursor(&provider.query_roots(None)?),
        "ls" => print_cursor(&provider.query_child_documents(
            rest.first().map(String::as_str),
            None,
            None,
        )?),
        "stat" => print_cursor(&provider.query_document(required(rest, 0, "DOC_ID")?, None)?),
        "recent" => print_cursor(&provider.query_recent_documents(None, None)?),
        "search" => {
            let query = rest.join(" ");
            print_cursor(&provider.query_search_documents(None, Some(&query), None)?)
        }
        "thumb" => {
            let document_id = required(rest, 0, "DOC_ID")?;
            let hint = size_hint(rest, 1)?;
            let handle = provider.open_document_thumbnail(document_id, hint, None)?;
            println!("{}", handle.path().display());
            Ok(())
        }
        "warm" => {
            let hint = size_hint(rest, 0)?;
            let sources = library
                .all_stickers()?
                .into_iter()
                .map(|sticker| provider.sticker_path(&sticker.uuid))
                .filter(|path| path.exists())
                .collect();
            let cache = Arc::new(ThumbnailCache::new(
                &config.thumbnail_dir,
                config.thumbnail_encoding,
            ));
            let runtime = tokio::runtime::Builder::new_current_thread().build()?;
            let summary = runtime.block_on(warm_thumbnails(cache, sources, hint));
            println!(
                "{} generated, {} cached, {} failed",
                summary.generated, summary.cached, summary.failed
            );
            Ok(())
        }
        "import" => {
            let source = Path::new(required(rest, 0, "PATH")?);
            if source.is_dir() {
                let result = import_folder(&library, &config, source);
                println!(
                    "Added {} stickers, skipped {} duplicates.",
                    result.imported_count, result.skipped_count
                );
                return Ok(());
            }
            let title = rest.get(1).map(String::as_str).unwrap_or_default();
            let tags: Vec<String> = rest
                .get(2)
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            match import_sticker(&library, &config, source, title, &tags)? {
                ImportOutcome::Imported(sticker) => println!("{}", sticker.uuid),
                ImportOutcome::Duplicate(sticker) => println!("{} (already imported)", sticker.uuid),
            }
            Ok(())
        }
        other => Err(ProviderError::InvalidArgument(format!(
            "unknown command `{other}`\n\n{USAGE}"
        ))),
    }
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| ProviderError::InvalidArgument(format!("missing {name}\n\n{USAGE}")))
}

fn size_hint(args: &[String], start: usize) -> Result<SizeHint> {
    let parse = |index: usize, name: &str| -> Result<u32> {
        let raw = required(args, index, name)?;
        raw.parse()
            .map_err(|_| ProviderError::InvalidArgument(format!("{name} must be a number, got `{raw}`")))
    };
    Ok(SizeHint::new(parse(start, "WIDTH")?, parse(start + 1, "HEIGHT")?))
}

fn print_cursor(cursor: &Cursor) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(cursor)?);
    Ok(())
}
