/* 📖 # What is the webpal CLI for?

It drives the backend against the native host so the PAL can be exercised by hand: walking a
directory tree, moving file contents in and out, and talking to a server over the frame
transport. Every command goes through the same File, Socket and enumerate primitives the
browser build uses; only the host underneath differs.

Exit codes:
- 0: the command succeeded
- 1: the command failed; the error and its context are printed to stderr
*/

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::{debug, info, instrument};

use webpal_backend::{
    CONFIG_FILE, File, PalConfig, PollMode, Socket, create_directory, enumerate, load_config,
    platform,
};
use webpal_base::tracing::init_tracing;
use webpal_base::{
    FilePath, HostHandle, ResultExt, ReturnCode, StdHost, WebPalError, WebPalResult, bail,
};

/// Exercise the webpal platform backend over the native host.
#[derive(Parser, Debug)]
#[command(name = "webpal", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory that stands in for the host filesystem root.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Run inside the configured default directory, creating it if needed.
    #[arg(long, global = true)]
    game_dir: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every file below a directory, depth first.
    List {
        #[arg(default_value = ".")]
        dir: String,
    },

    /// Print a file to stdout.
    Cat { file: String },

    /// Replace a file's contents with the given text.
    Write { file: String, text: String },

    /// Create a directory.
    Mkdir { dir: String },

    /// Connect to a server, send a payload and print what comes back.
    Probe {
        address: String,
        port: u16,
        payload: Option<String>,

        /// Give up after this many milliseconds.
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,
    },
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    let cli = Cli::parse();

    let host = HostHandle::new(StdHost::new(cli.root.clone()));
    platform::init(&host);

    let result = load_config(&host, &FilePath::from(CONFIG_FILE))
        .and_then(|config| run(&host, &config, &cli));
    platform::free(&host);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        debug!("{:?}", e);
        process::exit(1);
    }
}

fn run(host: &HostHandle, config: &PalConfig, cli: &Cli) -> WebPalResult<()> {
    if cli.game_dir {
        enter_default_directory(host, config)?;
    }

    match &cli.command {
        Command::List { dir } => list(host, dir),
        Command::Cat { file } => cat(host, file),
        Command::Write { file, text } => write(host, file, text),
        Command::Mkdir { dir } => mkdir(host, dir),
        Command::Probe {
            address,
            port,
            payload,
            timeout_ms,
        } => probe(
            host,
            address,
            *port,
            payload.as_deref(),
            Duration::from_millis(*timeout_ms),
        ),
    }
}

fn enter_default_directory(host: &HostHandle, config: &PalConfig) -> WebPalResult<()> {
    let dir = FilePath::from(config.default_directory.as_str());
    match create_directory(host, &dir) {
        Ok(()) => info!(dir = %dir, "created default directory"),
        Err(code) if code == ReturnCode::DIRECTORY_EXISTS => {}
        Err(code) => {
            return Err(WebPalError::platform(code)
                .context(format!("creating {}", dir))
                .into());
        }
    }
    platform::set_default_current_directory(host, config)
        .with_context(|| format!("entering {}", dir))
}

fn list(host: &HostHandle, dir: &str) -> WebPalResult<()> {
    let mut count = 0;
    enumerate(host, &FilePath::from(dir), |path| {
        println!("{}", path);
        count += 1;
    })
    .with_context(|| format!("listing {}", dir))?;
    info!(count, "listing complete");
    Ok(())
}

fn cat(host: &HostHandle, path: &str) -> WebPalResult<()> {
    let mut file =
        File::open(host, &FilePath::from(path)).with_context(|| format!("opening {}", path))?;
    let mut stdout = io::stdout().lock();
    io::copy(&mut file, &mut stdout).with_context(|| format!("reading {}", path))?;
    file.close().with_context(|| format!("closing {}", path))
}

fn write(host: &HostHandle, path: &str, text: &str) -> WebPalResult<()> {
    let mut file =
        File::create(host, &FilePath::from(path)).with_context(|| format!("creating {}", path))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("writing {}", path))?;
    file.close().with_context(|| format!("closing {}", path))?;
    info!(path, bytes = text.len(), "file written");
    Ok(())
}

fn mkdir(host: &HostHandle, dir: &str) -> WebPalResult<()> {
    create_directory(host, &FilePath::from(dir)).with_context(|| format!("creating {}", dir))
}

#[instrument(skip(host, payload))]
fn probe(
    host: &HostHandle,
    address: &str,
    port: u16,
    payload: Option<&str>,
    timeout: Duration,
) -> WebPalResult<()> {
    let deadline = Instant::now() + timeout;
    let mut socket = Socket::create(host)?;

    match socket.connect(address, port) {
        Ok(()) => {}
        Err(code) if code == ReturnCode::SOCKET_IN_PROGRESS => {}
        Err(code) => {
            return Err(WebPalError::platform(code)
                .context(format!("connecting to {}:{}", address, port))
                .into());
        }
    }

    while !socket.poll(PollMode::Write)? {
        if let Some(code) = socket.error()? {
            return Err(WebPalError::platform(code)
                .context(format!("connecting to {}:{}", address, port))
                .into());
        }
        if Instant::now() >= deadline {
            bail!("timed out connecting to {}:{}", address, port);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    info!(address, port, "connected");

    if let Some(payload) = payload {
        let mut remaining = payload.as_bytes();
        while !remaining.is_empty() {
            let sent = socket.write(remaining).context("sending payload")?;
            remaining = &remaining[sent..];
            if Instant::now() >= deadline {
                bail!("timed out sending payload");
            }
        }
    }

    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; 4096];
    let mut received = 0;
    while Instant::now() < deadline {
        let count = socket.read(&mut buf).context("receiving")?;
        if count == 0 {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        received += count;
        stdout
            .write_all(&buf[..count])
            .context("writing to stdout")?;
    }
    info!(received, "probe finished");
    socket.close().context("closing socket")
}
