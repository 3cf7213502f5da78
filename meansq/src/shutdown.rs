//! Process-wide stop signal.
//!
//! Raising the signal wakes every [`StopSignal::sleep`] immediately and shuts
//! down every registered connection, so threads blocked in a read or write
//! on those sockets fail and unwind.

use crate::error::Error;
use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Condvar, LockResult, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    stopped: Mutex<bool>,
    wakeup: Condvar,
    connections: Mutex<Connections>,
}

#[derive(Default)]
struct Connections {
    next_id: u64,
    streams: HashMap<u64, TcpStream>,
}

fn relock<T>(result: LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl StopSignal {
    pub fn new() -> StopSignal {
        StopSignal::default()
    }

    /// Raises the signal on SIGINT / SIGTERM.
    pub fn install_ctrlc_handler(&self) -> Result<(), Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            info!("Stop signal received");
            signal.stop();
        })
        .map_err(Error::SignalHandlerFailed)
    }

    pub fn stop(&self) {
        {
            let mut stopped = relock(self.inner.stopped.lock());
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.inner.wakeup.notify_all();

        let streams: Vec<TcpStream> = relock(self.inner.connections.lock())
            .streams
            .drain()
            .map(|(_, stream)| stream)
            .collect();
        debug!(connections = streams.len(), "Closing live connections");
        for stream in streams {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_stopped(&self) -> bool {
        *relock(self.inner.stopped.lock())
    }

    /// Sleeps for `duration` unless stopped first. Returns `true` when the
    /// signal is raised, without sleeping if it already was.
    pub fn sleep(&self, duration: Duration) -> bool {
        let stopped = relock(self.inner.stopped.lock());
        let (stopped, _) = self
            .inner
            .wakeup
            .wait_timeout_while(stopped, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }

    /// Tracks `stream` until the returned guard is dropped, shutting it down
    /// on stop. A stream registered after stop is shut down right away.
    pub fn register(&self, stream: &TcpStream) -> io::Result<ConnectionGuard> {
        let handle = stream.try_clone()?;
        let mut connections = relock(self.inner.connections.lock());
        let id = connections.next_id;
        connections.next_id += 1;

        if self.is_stopped() {
            let _ = handle.shutdown(Shutdown::Both);
        } else {
            connections.streams.insert(id, handle);
        }

        Ok(ConnectionGuard {
            signal: self.clone(),
            id,
        })
    }

    pub fn live_connections(&self) -> usize {
        relock(self.inner.connections.lock()).streams.len()
    }
}

pub struct ConnectionGuard {
    signal: StopSignal,
    id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        relock(self.signal.inner.connections.lock())
            .streams
            .remove(&self.id);
    }
}
