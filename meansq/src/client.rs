use crate::codec::{Request, Response, VALID_RANGE};
use crate::error::Error;
use crate::shutdown::{ConnectionGuard, StopSignal};
use crate::transport::{FixedFrame, Transport};
use rand::Rng;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

pub struct Client<T> {
    transport: T,
    delay: Duration,
    stop: StopSignal,
    _guard: Option<ConnectionGuard>,
}

impl Client<FixedFrame<TcpStream>> {
    /// Connects to a server. The connection is shut down when `stop` is
    /// raised, which also ends a pending `submit`.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        delay: Duration,
        stop: StopSignal,
    ) -> Result<Client<FixedFrame<TcpStream>>, Error> {
        let stream = TcpStream::connect(addr).map_err(Error::OutgoingConnectionError)?;
        let guard = stop
            .register(&stream)
            .map_err(Error::OutgoingConnectionError)?;
        if let Ok(peer) = stream.peer_addr() {
            info!(%peer, "Connected to server");
        }

        Ok(Client {
            transport: FixedFrame::new(stream),
            delay,
            stop,
            _guard: Some(guard),
        })
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, delay: Duration, stop: StopSignal) -> Client<T> {
        Client {
            transport,
            delay,
            stop,
            _guard: None,
        }
    }

    /// Sends one value and waits for the mean of squares.
    ///
    /// Out-of-range values are refused locally: the server would drop them
    /// without answering and this call would never return.
    pub fn submit(&mut self, value: i32) -> Result<f32, Error> {
        let request = Request(value);
        if !request.is_valid() {
            return Err(Error::ValueOutOfRange(value));
        }
        let Response(mean) = self.transport.send_receive(&request)?;
        Ok(mean)
    }

    /// Submits random values until stopped or the server goes away.
    ///
    /// Returns the number of completed round trips. Stop and a graceful
    /// close by the server end the loop with `Ok`.
    pub fn run<R: Rng>(mut self, rng: &mut R) -> Result<u64, Error> {
        let mut completed = 0;

        while !self.stop.is_stopped() {
            let value = rng.gen_range(VALID_RANGE);
            info!(value, "Sending number");

            match self.submit(value) {
                Ok(mean) => {
                    info!(mean, "Received mean of squares");
                    completed += 1;
                }
                // Stop shuts the socket down, which reads as a hang-up.
                Err(_) if self.stop.is_stopped() => break,
                Err(Error::PeerClosed) => {
                    info!("Server closed connection");
                    break;
                }
                Err(e) => return Err(e),
            }

            if self.stop.sleep(self.delay) {
                break;
            }
        }

        info!(completed, "Client stopped");
        Ok(completed)
    }
}
