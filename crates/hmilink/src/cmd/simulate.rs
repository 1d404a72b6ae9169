use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hmilink_frame::{FrameConfig, FrameError, FrameReceiver};
use hmilink_session::{ControllerSim, SessionError};
use hmilink_transport::FdChannel;

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, mirror_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::parse::{parse_assignment, parse_duration};

/// How often an idle listener checks for Ctrl-C.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let idle_timeout = parse_duration(&args.idle_timeout)?;

    let sim = ControllerSim::new();
    for preset in &args.presets {
        let (address, value) = parse_assignment(preset)?;
        sim.mirror()
            .write_word(address, value)
            .map_err(|err| mirror_error("preset failed", err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let socket = BoundSocket::bind(&args.path).map_err(|err| io_error("bind failed", err))?;
    socket
        .listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;
    tracing::info!(path = %args.path.display(), "simulated controller listening");

    // The fd channel cannot observe a hang-up, so a connection that stays
    // quiet for one full receive attempt is treated as closed.
    let config = FrameConfig {
        timeout: idle_timeout,
        max_retries: 0,
        ..FrameConfig::default()
    };

    let mut served = 0usize;
    'accept: while running.load(Ordering::SeqCst) {
        let stream = match socket.listener.accept() {
            Ok((stream, _)) => stream,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("accept failed", err)),
        };
        // Some platforms hand out accepted sockets with the listener's flags.
        stream
            .set_nonblocking(false)
            .map_err(|err| io_error("accept failed", err))?;
        let mut channel = FdChannel::new(stream);
        let mut receiver = FrameReceiver::with_config(config.clone());
        tracing::debug!("controller connection accepted");

        while running.load(Ordering::SeqCst) {
            match sim.serve_one(&mut channel, &mut receiver) {
                Ok(()) => {
                    served += 1;
                    tracing::info!(served, "request served");
                    if args.count.is_some_and(|limit| served >= limit) {
                        break 'accept;
                    }
                }
                Err(SessionError::Frame(FrameError::Timeout { .. })) => {
                    tracing::debug!("connection idle, closing");
                    break;
                }
                Err(SessionError::Transport(err))
                | Err(SessionError::Frame(FrameError::Transport(err))) => {
                    tracing::warn!(error = %err, "connection failed");
                    break;
                }
                Err(err) => tracing::warn!(error = %err, "request rejected"),
            }
        }
    }

    Ok(SUCCESS)
}

/// Listener whose socket file is removed again on drop, unless something
/// else has replaced it in the meantime.
struct BoundSocket {
    listener: UnixListener,
    path: PathBuf,
    identity: Option<(u64, u64)>,
}

impl BoundSocket {
    fn bind(path: &Path) -> io::Result<Self> {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.file_type().is_socket() => {
                tracing::debug!(path = %path.display(), "removing stale socket");
                std::fs::remove_file(path)?;
            }
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a socket", path.display()),
                ))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        let listener = UnixListener::bind(path)?;
        let identity = std::fs::symlink_metadata(path)
            .ok()
            .map(|m| (m.dev(), m.ino()));
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            identity,
        })
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        let current = std::fs::symlink_metadata(&self.path)
            .ok()
            .filter(|m| m.file_type().is_socket())
            .map(|m| (m.dev(), m.ino()));
        if current.is_some() && current == self.identity {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
