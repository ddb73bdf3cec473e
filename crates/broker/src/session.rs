use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tagsheet_printing::{
    PrintDocument, PrintTransport, PrinterProfile, SessionState, TransportError,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::protocol::{
    call_digest, parse_reply, ChallengeResponse, Hello, PrintParams, Reply, SignedCall,
};
use crate::signing::{Authenticator, SIGN_ALGORITHM};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`PrintTransport`] backed by a QZ Tray compatible websocket broker.
/// 以 QZ Tray 相容 websocket 代理程式實作的 [`PrintTransport`]。
///
/// The session authenticates once and is reused for every submission until
/// the socket fails or [`PrintTransport::disconnect`] is called. There is no
/// timeout and no retry.
/// 工作階段只驗證一次，之後的送出皆沿用，直到連線中斷或呼叫 `disconnect`。
pub struct BrokerTransport<A> {
    url: String,
    auth: A,
    socket: Option<Socket>,
    state: SessionState,
    next_uid: u64,
}

impl<A: Authenticator> BrokerTransport<A> {
    pub fn new(url: impl Into<String>, auth: A) -> Self {
        Self {
            url: url.into(),
            auth,
            socket: None,
            state: SessionState::Disconnected,
            next_uid: 1,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn uid(&mut self) -> String {
        let uid = format!("tagsheet-{}", self.next_uid);
        self.next_uid += 1;
        uid
    }

    fn drop_session(&mut self) {
        self.socket = None;
        self.state = SessionState::Disconnected;
    }

    async fn handshake(&mut self) -> Result<Socket, TransportError> {
        let certificate = self.auth.certificate()?;
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|err| TransportError::ConnectionFailed(format!("{}: {err}", self.url)))?;

        let uid = self.uid();
        send_json(
            &mut socket,
            &Hello {
                certificate: &certificate,
                uid: &uid,
                timestamp: now_millis(),
            },
        )
        .await?;

        loop {
            match next_reply(&mut socket, &uid).await? {
                Reply::Challenge(challenge) => {
                    tracing::debug!(uid = %uid, "signing broker challenge");
                    let signature = self.auth.sign(&challenge)?;
                    send_json(
                        &mut socket,
                        &ChallengeResponse {
                            uid: &uid,
                            signature: &signature,
                            sign_algorithm: SIGN_ALGORITHM,
                        },
                    )
                    .await?;
                }
                Reply::Result(_) => return Ok(socket),
                Reply::Error(message) => return Err(TransportError::ConnectionFailed(message)),
            }
        }
    }
}

impl<A> std::fmt::Debug for BrokerTransport<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerTransport")
            .field("url", &self.url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<A: Authenticator> PrintTransport for BrokerTransport<A> {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state == SessionState::Connected && self.socket.is_some() {
            return Ok(());
        }
        self.state = SessionState::Authenticating;
        let started = Instant::now();
        match self.handshake().await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.state = SessionState::Connected;
                tracing::info!(
                    url = %self.url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "connected to print broker"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "broker handshake failed");
                self.drop_session();
                Err(err)
            }
        }
    }

    async fn submit(
        &mut self,
        document: &PrintDocument,
        profile: &PrinterProfile,
    ) -> Result<(), TransportError> {
        self.connect().await?;

        let params = PrintParams::new(document, profile);
        let timestamp = now_millis();
        let digest = call_digest("print", &params, timestamp).map_err(|err| {
            TransportError::Rejected(format!("failed to encode print call: {err}"))
        })?;
        let signature = self.auth.sign(&digest)?;
        let uid = self.uid();
        let call = SignedCall {
            call: "print",
            params: &params,
            uid: &uid,
            timestamp,
            signature,
            sign_algorithm: SIGN_ALGORITHM,
        };

        let Some(socket) = self.socket.as_mut() else {
            return Err(TransportError::ConnectionFailed("no broker session".into()));
        };
        match exchange(socket, &call, &uid).await {
            Ok(Reply::Error(message)) => Err(TransportError::Rejected(message)),
            Ok(_) => {
                tracing::debug!(
                    printer = %profile.name,
                    pages = document.page_count(),
                    "broker accepted print call"
                );
                Ok(())
            }
            Err(err) => {
                self.drop_session();
                Err(err)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(err) = socket.close(None).await {
                tracing::debug!(error = %err, "broker socket did not close cleanly");
            }
        }
        self.state = SessionState::Disconnected;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

async fn send_json<T: Serialize>(socket: &mut Socket, message: &T) -> Result<(), TransportError> {
    let text = serde_json::to_string(message).map_err(|err| {
        TransportError::ConnectionFailed(format!("failed to encode message: {err}"))
    })?;
    socket
        .send(Message::Text(text))
        .await
        .map_err(|err| TransportError::ConnectionFailed(err.to_string()))
}

async fn exchange(
    socket: &mut Socket,
    call: &SignedCall<'_>,
    uid: &str,
) -> Result<Reply, TransportError> {
    send_json(socket, call).await?;
    next_reply(socket, uid).await
}

/// Reads until a reply addressed to `uid` arrives, skipping unrelated traffic.
/// 讀取直到收到對應 `uid` 的回覆，略過其他訊息。
async fn next_reply(socket: &mut Socket, uid: &str) -> Result<Reply, TransportError> {
    while let Some(message) = socket.next().await {
        let message = message.map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let (reply_uid, reply) = parse_reply(&text).map_err(|err| {
            TransportError::ConnectionFailed(format!("malformed broker reply: {err}"))
        })?;
        match reply_uid {
            Some(reply_uid) if reply_uid != uid => {
                tracing::trace!(uid = %reply_uid, "ignoring reply for another call");
            }
            _ => return Ok(reply),
        }
    }
    Err(TransportError::ConnectionFailed(
        "broker closed the connection".into(),
    ))
}
