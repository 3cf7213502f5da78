use crate::aggregate::Aggregate;
use crate::config::ServerConfig;
use crate::error::Error;
use crate::session::Session;
use crate::shutdown::StopSignal;
use crate::snapshot::SnapshotScheduler;
use crate::transport::FixedFrame;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Accepts connections and serves each one on its own thread until the
/// stop signal is raised.
pub struct Server {
    listener: TcpListener,
    aggregate: Arc<Aggregate>,
    stop: StopSignal,
}

impl Server {
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        aggregate: Arc<Aggregate>,
        stop: StopSignal,
    ) -> Result<Server, Error> {
        let listener = TcpListener::bind(addr).map_err(Error::ServerFailedToStart)?;
        // Polled so that a raised stop signal is noticed without a wake-up connection.
        listener
            .set_nonblocking(true)
            .map_err(Error::ServerFailedToStart)?;
        Ok(Server {
            listener,
            aggregate,
            stop,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener
            .local_addr()
            .map_err(Error::ServerFailedToStart)
    }

    pub fn run(self) -> Result<(), Error> {
        let addr = self.local_addr()?;
        info!(%addr, "Server started");
        let mut sessions: Vec<JoinHandle<()>> = Vec::new();

        while !self.stop.is_stopped() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    sessions.retain(|h| !h.is_finished());
                    match self.spawn_session(stream, peer) {
                        Ok(handle) => sessions.push(handle),
                        Err(e) => warn!(%peer, error = ?e, "Cannot start session"),
                    }
                }
                Err(e) => self.back_off(e),
            }
        }

        info!(live = sessions.len(), "Server stopping");
        for handle in sessions {
            // A panicking session has already reported through the panic hook.
            let _ = handle.join();
        }
        info!("Server stopped");
        Ok(())
    }

    /// Waits one poll interval after a failed accept. Errors other than
    /// `WouldBlock` (e.g. out of file descriptors) tend to repeat at once.
    fn back_off(&self, e: io::Error) {
        if e.kind() != io::ErrorKind::WouldBlock {
            warn!(error = ?Error::IncomingConnectionError(e), "Accept failed");
        }
        self.stop.sleep(ACCEPT_POLL_INTERVAL);
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) -> Result<JoinHandle<()>, Error> {
        stream
            .set_nonblocking(false)
            .map_err(Error::IncomingConnectionError)?;
        let guard = self
            .stop
            .register(&stream)
            .map_err(Error::IncomingConnectionError)?;
        let aggregate = self.aggregate.clone();

        info!(%peer, "New client connected");
        thread::Builder::new()
            .name(format!("session-{peer}"))
            .spawn(move || {
                let _guard = guard;
                match Session::new(FixedFrame::new(stream), aggregate).run() {
                    Ok(summary) => info!(
                        %peer,
                        accepted = summary.accepted,
                        rejected = summary.rejected,
                        "Client disconnected"
                    ),
                    Err(e) => warn!(%peer, error = ?e, "Session closed on error"),
                }
            })
            .map_err(Error::ThreadSpawnFailed)
    }
}

/// Runs the whole service: listener plus snapshot scheduler, until `stop`
/// is raised. Fails only if the service cannot start.
pub fn run_service(config: &ServerConfig, stop: StopSignal) -> Result<(), Error> {
    let aggregate = Arc::new(Aggregate::new());
    let server = Server::bind(config.listen_addr(), aggregate.clone(), stop.clone())?;

    let scheduler = SnapshotScheduler::new(
        aggregate.clone(),
        &config.snapshot_dir,
        config.snapshot_interval(),
        stop.clone(),
    )
    .spawn()?;

    let result = server.run();
    stop.stop();
    if scheduler.join().is_err() {
        warn!("Snapshot scheduler panicked");
    }
    debug!(distinct = aggregate.len(), "Final aggregate size");
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Instant;

    #[test]
    fn accept_failure_waits_before_retrying() -> Result<(), Error> {
        let server = Server::bind("127.0.0.1:0", Arc::new(Aggregate::new()), StopSignal::new())?;

        for kind in [io::ErrorKind::Other, io::ErrorKind::WouldBlock] {
            let start = Instant::now();
            server.back_off(io::Error::new(kind, "Too many open files"));
            assert!(start.elapsed() >= ACCEPT_POLL_INTERVAL);
        }
        Ok(())
    }

    #[test]
    fn back_off_returns_at_once_when_stopped() -> Result<(), Error> {
        let stop = StopSignal::new();
        let server = Server::bind("127.0.0.1:0", Arc::new(Aggregate::new()), stop.clone())?;
        stop.stop();

        let start = Instant::now();
        server.back_off(io::Error::new(io::ErrorKind::Other, "Too many open files"));
        assert!(start.elapsed() < Duration::from_secs(5));
        Ok(())
    }
}
