use futures::StreamExt;
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

use lzthumb::{ThumbnailConfig, ThumbnailReady, ThumbnailService};

mod host;

use host::{DirectoryList, HeaderMetadata, ImageRenderer, MountClassifier};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest edge of generated thumbnails.
const THUMBNAIL_SIZE: u32 = 128;

/// Rows treated as visible when no window is given.
const DEFAULT_VISIBLE_ROWS: usize = 40;

/// Exit after this long without a ready notification.
const IDLE_TIMEOUT: Duration = Duration::from_secs(2);

struct Args {
    dir: PathBuf,
    window: (usize, usize),
    verbose: bool,
    show_hidden: bool,
}

fn usage() -> String {
    format!(
        "lzthumb {}\n\nUsage: lzthumb [-v] [-a] [--window BEGIN:END] [DIR]",
        VERSION
    )
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        dir: env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        window: (0, DEFAULT_VISIBLE_ROWS),
        verbose: false,
        show_hidden: false,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("lzthumb {}", VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{}", usage());
                return Ok(None);
            }
            "--verbose" | "-v" => args.verbose = true,
            "--all" | "-a" => args.show_hidden = true,
            "--window" | "-w" => {
                let spec = iter.next().ok_or("--window needs BEGIN:END")?;
                args.window = parse_window(&spec)?;
            }
            other => args.dir = PathBuf::from(other),
        }
    }
    Ok(Some(args))
}

fn parse_window(spec: &str) -> Result<(usize, usize), String> {
    let (begin, end) = spec
        .split_once(':')
        .ok_or_else(|| format!("bad window {:?}, expected BEGIN:END", spec))?;
    let begin = begin.trim().parse().map_err(|_| format!("bad window start {:?}", begin))?;
    let end = end.trim().parse().map_err(|_| format!("bad window end {:?}", end))?;
    if begin >= end {
        return Err(format!("empty window {}:{}", begin, end));
    }
    Ok((begin, end))
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default = if verbose { "info,lzthumb=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn print_ready(list: &DirectoryList, ready: &ThumbnailReady) {
    let name = list.name_at(ready.index).unwrap_or_else(|| ready.source_id.clone());
    match (&ready.data_url, ready.width, ready.height) {
        (Some(data), Some(w), Some(h)) => {
            println!("{:>5}  {:>4}x{:<4}  {}  ({} bytes)", ready.index, w, h, name, data.len());
        }
        _ => println!("{:>5}  {:>9}  {}", ready.index, "-", name),
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("{}\n\n{}", e, usage());
            std::process::exit(2);
        }
    };

    init_logging(args.verbose);

    let config = ThumbnailConfig::load();
    let list = Arc::new(DirectoryList::new());

    let (handle, ready_rx) = ThumbnailService::new(
        list.clone(),
        Arc::new(MountClassifier),
        Arc::new(HeaderMetadata),
        Arc::new(ImageRenderer::new(THUMBNAIL_SIZE)),
    )
    .with_config(config)
    .spawn();

    let count = list.scan(&args.dir, args.show_hidden)?;
    tracing::info!(dir = %args.dir.display(), count, "scanned directory");
    handle.scan_completed();

    let (begin, end) = args.window;
    handle.set_priority_window(begin, end);

    let mut ready_stream = ReceiverStream::new(ready_rx);
    loop {
        let idle = tokio::time::sleep(IDLE_TIMEOUT);
        tokio::pin!(idle);

        tokio::select! {
            ready = ready_stream.next() => match ready {
                Some(ready) => print_ready(&list, &ready),
                None => break,
            },
            _ = &mut idle => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    Ok(())
}
