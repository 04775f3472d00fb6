// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! TCP listener.
//!
//! One task per accepted socket. Each task reads framed requests, hands them
//! to its [`ServerConnection`] and writes the response with the same request
//! id. A shutdown signal stops the accept loop and every connection task.

use std::net::SocketAddr;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use uanode_core::protocol::{read_frame, write_frame, CodecError, Envelope, Request, Response};
use uanode_core::status::StatusCode;

use crate::error::{ServerError, ServerResult};
use crate::server::{ServerConnection, UaServer};

impl UaServer {
    /// Binds the configured address.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let address = self.config().bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        tracing::info!(address = %address, "Listening");
        Ok(listener)
    }

    /// Accepts connections until `shutdown` fires, then waits for the
    /// connection tasks to finish.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ServerResult<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let conn = self.open_connection(peer.to_string());
                            connections.spawn(run_connection(conn, stream, peer, shutdown.resubscribe()));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                        }
                    }
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!(error = %e, "Connection task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Listener stopped accepting connections");
                    break;
                }
            }
        }

        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "Connection task failed");
            }
        }
        Ok(())
    }
}

async fn run_connection(
    mut conn: ServerConnection,
    stream: TcpStream,
    peer: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
    }
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = tokio::select! {
            frame = read_frame::<_, Envelope<Request>>(&mut reader) => frame,
            _ = shutdown.recv() => break,
        };

        let envelope = match frame {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(CodecError::Malformed(e)) => {
                tracing::warn!(peer = %peer, error = %e, "Malformed request");
                let fault = Envelope {
                    request_id: 0,
                    body: Response::fault(StatusCode::BAD_DECODING_ERROR),
                };
                let _ = write_frame(&mut write_half, &fault).await;
                break;
            }
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "Connection read failed");
                break;
            }
        };

        let response = Envelope {
            request_id: envelope.request_id,
            body: conn.handle(envelope.body).await,
        };
        if let Err(e) = write_frame(&mut write_half, &response).await {
            tracing::debug!(peer = %peer, error = %e, "Connection write failed");
            break;
        }
        if conn.is_closed() {
            break;
        }
    }
}
