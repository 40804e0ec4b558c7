//! UART TCP Bridge
//!
//! Exposes the mote UART on a TCP port. One host at a time: bytes from the
//! client become receive events, bytes the UART writes go to the client.
//! While the mote holds CTS low the bridge stops reading from the socket,
//! so the client is back-pressured by TCP.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::actor::{MoteEvent, MoteHandle};
use crate::error::RunnerError;
use crate::link::HostPort;

/// TCP side of one mote UART.
#[derive(Debug)]
pub struct UartBridge {
    host: HostPort,
    events: MoteHandle,
}

impl UartBridge {
    /// Bridge between `host` and the mote reached through `events`.
    pub fn new(host: HostPort, events: MoteHandle) -> Self {
        UartBridge { host, events }
    }

    /// Listen on all interfaces at `port` and serve hosts until the mote
    /// stops.
    pub async fn serve(self, port: u16) -> Result<(), RunnerError> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr).await?;
        info!("UART: Listening on {}", addr);
        self.run(listener).await
    }

    /// Serve hosts from an already bound listener.
    pub async fn run(mut self, listener: TcpListener) -> Result<(), RunnerError> {
        loop {
            let (stream, peer) = listener.accept().await?;
            info!("UART: Host {} connected", peer);

            // Bytes written while nobody listened are not replayed
            self.host.discard_pending();
            self.host.set_connected(true);
            let result = self.handle_connection(stream).await;
            self.host.set_connected(false);

            match result {
                Ok(()) => info!("UART: Host {} disconnected", peer),
                Err(RunnerError::ActorStopped) => return Ok(()),
                Err(e) => warn!("UART: Connection error with {}: {}", peer, e),
            }
        }
    }

    async fn handle_connection(&mut self, mut stream: TcpStream) -> Result<(), RunnerError> {
        let UartBridge { host, events } = self;
        let (mut reader, mut writer) = stream.split();
        let mut read_buf = [0u8; 1024];

        loop {
            let clear_to_send = host.cts();
            tokio::select! {
                // Host -> mote RX, only while the mote accepts input
                result = reader.read(&mut read_buf), if clear_to_send => {
                    match result? {
                        0 => return Ok(()),
                        n => events.send(MoteEvent::RxBytes(read_buf[..n].to_vec()))?,
                    }
                }

                changed = host.cts.changed() => {
                    if changed.is_err() {
                        return Err(RunnerError::ActorStopped);
                    }
                }

                // Mote TX -> host
                data = host.from_mote.recv() => {
                    let Some(data) = data else {
                        return Err(RunnerError::ActorStopped);
                    };
                    writer.write_all(&data).await?;
                    writer.flush().await?;
                }
            }
        }
    }
}
