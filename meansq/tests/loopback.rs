use meansq::client::Client;
use meansq::codec::{Request, Response};
use meansq::error::Error;
use meansq::server::Server;
use meansq::transport::FixedFrame;
use meansq::{Aggregate, StopSignal, Transport};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type ServerHandle = thread::JoinHandle<Result<(), Error>>;

fn start_server(
    aggregate: Arc<Aggregate>,
    stop: StopSignal,
) -> Result<(SocketAddr, ServerHandle), Error> {
    let server = Server::bind("127.0.0.1:0", aggregate, stop)?;
    let addr = server.local_addr()?;
    Ok((addr, thread::spawn(move || server.run())))
}

fn connect(addr: SocketAddr) -> FixedFrame<TcpStream> {
    FixedFrame::new(TcpStream::connect(addr).expect("cannot connect"))
}

#[test]
fn loopback_scenario() -> Result<(), Error> {
    let stop = StopSignal::new();
    let (addr, server) = start_server(Arc::new(Aggregate::new()), stop.clone())?;

    let mut transport = connect(addr);
    assert_eq!(transport.send_receive::<_, Response>(&Request(1))?, Response(1.0));
    assert_eq!(transport.send_receive::<_, Response>(&Request(2))?, Response(2.5));
    assert_eq!(transport.send_receive::<_, Response>(&Request(2))?, Response(2.5));

    // No reply for an out-of-range value; the next reply belongs to the
    // next valid request.
    transport.send(&Request(1024))?;
    assert_eq!(transport.send_receive::<_, Response>(&Request(1))?, Response(2.5));

    stop.stop();
    server.join().expect("server panicked")
}

#[test]
fn rejected_value_leaves_fresh_aggregate_untouched() -> Result<(), Error> {
    let stop = StopSignal::new();
    let aggregate = Arc::new(Aggregate::new());
    let (addr, server) = start_server(aggregate.clone(), stop.clone())?;

    let mut transport = connect(addr);
    transport.send(&Request(1024))?;
    transport.send(&Request(-1))?;
    assert_eq!(transport.send_receive::<_, Response>(&Request(1))?, Response(1.0));
    assert_eq!(aggregate.snapshot(), vec![1]);

    stop.stop();
    server.join().expect("server panicked")
}

#[test]
fn concurrent_connections_see_the_union() -> Result<(), Error> {
    const CLIENTS: i32 = 8;
    const PER_CLIENT: i32 = 64;

    let stop = StopSignal::new();
    let aggregate = Arc::new(Aggregate::new());
    let (addr, server) = start_server(aggregate.clone(), stop.clone())?;
    let start = Barrier::new(CLIENTS as usize);

    thread::scope(|s| {
        let handles: Vec<_> = (0..CLIENTS)
            .map(|c| {
                let start = &start;
                s.spawn(move || -> Result<f32, Error> {
                    let mut client = Client::new(connect(addr), Duration::ZERO, StopSignal::new());
                    start.wait();
                    let mut last = 0.0;
                    for i in 0..PER_CLIENT {
                        // Disjoint values per client.
                        last = client.submit(c * PER_CLIENT + i)?;
                    }
                    Ok(last)
                })
            })
            .collect();

        for handle in handles {
            let last = handle.join().expect("client panicked")?;
            assert!(last > 0.0);
        }
        Ok::<(), Error>(())
    })?;

    let total = CLIENTS * PER_CLIENT;
    let expected = (0..total as i64).map(|v| v * v).sum::<i64>() as f64 / total as f64;
    assert_eq!(aggregate.len(), total as usize);
    assert_eq!(aggregate.mean_of_squares(), expected);

    // Values first seen on other connections change nothing when sent again.
    let mut client = Client::new(connect(addr), Duration::ZERO, StopSignal::new());
    for value in [0, PER_CLIENT, total - 1, 3 * PER_CLIENT + 7] {
        assert_eq!(client.submit(value)?, expected as f32);
    }
    assert_eq!(aggregate.len(), total as usize);

    stop.stop();
    server.join().expect("server panicked")
}

#[test]
fn stop_closes_live_sessions() -> Result<(), Error> {
    let stop = StopSignal::new();
    let (addr, server) = start_server(Arc::new(Aggregate::new()), stop.clone())?;

    let mut transport = connect(addr);
    assert_eq!(transport.send_receive::<_, Response>(&Request(3))?, Response(9.0));

    stop.stop();
    server.join().expect("server panicked")?;

    // The session side of the connection is gone.
    assert!(matches!(
        transport.receive::<Response>(),
        Err(Error::PeerClosed | Error::CannotReadMsgRawData(_))
    ));
    Ok(())
}

#[test]
fn client_loop_runs_until_stopped() -> Result<(), Error> {
    let server_stop = StopSignal::new();
    let aggregate = Arc::new(Aggregate::new());
    let (addr, server) = start_server(aggregate.clone(), server_stop.clone())?;

    let client_stop = StopSignal::new();
    let client = Client::connect(addr, Duration::from_millis(5), client_stop.clone())?;
    let client = thread::spawn(move || client.run(&mut rand::thread_rng()));

    while aggregate.is_empty() {
        thread::sleep(Duration::from_millis(5));
    }
    client_stop.stop();
    let completed = client.join().expect("client panicked")?;
    assert!(completed >= 1);
    assert!(aggregate.snapshot().iter().all(|v| (0..=1023).contains(v)));

    server_stop.stop();
    server.join().expect("server panicked")
}

#[test]
fn client_loop_ends_when_server_stops() -> Result<(), Error> {
    let server_stop = StopSignal::new();
    let aggregate = Arc::new(Aggregate::new());
    let (addr, server) = start_server(aggregate.clone(), server_stop.clone())?;

    let client = Client::connect(addr, Duration::from_millis(5), StopSignal::new())?;
    let client = thread::spawn(move || client.run(&mut rand::thread_rng()));

    // A second value is only sent after the first reply arrived.
    while aggregate.len() < 2 {
        thread::sleep(Duration::from_millis(5));
    }
    server_stop.stop();
    server.join().expect("server panicked")?;

    // Usually a clean close; a write racing the shutdown may see a reset.
    match client.join().expect("client panicked") {
        Ok(completed) => assert!(completed >= 1),
        Err(e) => assert!(
            matches!(
                e,
                Error::CannotReadMsgRawData(_) | Error::CannotWriteMsgRawData(_)
            ),
            "unexpected client error: {e:?}"
        ),
    }
    Ok(())
}

#[test]
fn bind_conflict_is_a_startup_failure() -> Result<(), Error> {
    let stop = StopSignal::new();
    let first = Server::bind("127.0.0.1:0", Arc::new(Aggregate::new()), stop.clone())?;
    let addr = first.local_addr()?;

    assert!(matches!(
        Server::bind(addr, Arc::new(Aggregate::new()), stop),
        Err(Error::ServerFailedToStart(_))
    ));
    Ok(())
}
