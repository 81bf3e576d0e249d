use crate::networking::api_message::ResponseMessage;
use async_trait::async_trait;
use futures::stream::{SplitSink, Stream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, event, Level};

/// Parsed inbound traffic, in the order the peer sent it. A fatal error is
/// the last item the reader task ever forwards.
pub type Inbound = mpsc::UnboundedReceiver<crate::Result<ResponseMessage>>;
pub type InboundSender = mpsc::UnboundedSender<crate::Result<ResponseMessage>>;

/// The write half of a connection to the peer. Owned exclusively by one
/// session.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> crate::Result<()>;

    async fn close(&mut self) -> crate::Result<()>;
}

pub struct WebSocketTransport {
    write_sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Opens the socket and spawns the reader task feeding the returned
    /// channel.
    pub async fn connect(url: &str) -> crate::Result<(WebSocketTransport, Inbound)> {
        let url = url::Url::parse(url)?;
        let (ws_stream, _) = connect_async(url.clone()).await?;
        event!(Level::INFO, "connected to {}", url);

        let (write_sink, read_stream) = ws_stream.split();
        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_stream, sender));

        Ok((WebSocketTransport { write_sink, reader }, receiver))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> crate::Result<()> {
        self.write_sink.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> crate::Result<()> {
        // anything still in flight is discarded with the reader
        self.reader.abort();
        match self.write_sink.close().await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Forwards every text frame, parsed, into `sender`. Stops at the first
/// fatal item, at end of stream, or once nobody is listening.
pub async fn read_loop<S>(mut read_stream: S, sender: InboundSender)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(result) = read_stream.next().await {
        let parsed = match result {
            Ok(Message::Text(text)) => ResponseMessage::deserialize(&text),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => ResponseMessage::deserialize(&text),
                Err(err) => Err(crate::Error::malformed_message(err)),
            },
            Ok(Message::Close(frame)) => {
                debug!("peer closed the socket: {:?}", frame);
                break;
            }
            Ok(_) => continue,
            Err(err) => Err(err.into()),
        };
        let fatal = parsed.is_err();
        if sender.send(parsed).is_err() {
            debug!("session is gone, dropping inbound traffic");
            break;
        }
        if fatal {
            break;
        }
    }
}
