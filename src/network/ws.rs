//! WebSocket Client Transport
//!
//! Connects a participant to a relay. Two background tasks move frames
//! between the socket and a pair of bounded queues so the frame loop never
//! waits on the network. A full queue drops the frame, except rosters: the
//! newest one is parked until the next drain.

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

use crate::network::protocol::{ClientFrame, ErrorCode, JoinMode, RelayFrame, RosterEntry, WireMessage};
use crate::network::transport::{Envelope, Hub, Transport, TransportError, DEFAULT_CHANNEL_CAPACITY};

/// Relay endpoint.
#[derive(Debug, Clone)]
pub struct WsHub {
    url: String,
}

impl WsHub {
    /// Point at a relay, e.g. `ws://127.0.0.1:8080`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Relay URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Hub for WsHub {
    type Transport = WsTransport;

    fn open(
        &self,
        session_id: &str,
        entry: RosterEntry,
        mode: JoinMode,
    ) -> impl Future<Output = Result<WsTransport, TransportError>> + Send {
        WsTransport::connect(self.url.clone(), session_id.to_string(), entry, mode)
    }
}

/// Subscription held open through a relay.
pub struct WsTransport {
    outbound: Option<mpsc::Sender<ClientFrame>>,
    inbound: mpsc::Receiver<Envelope>,
    parked_roster: Arc<Mutex<Option<Vec<RosterEntry>>>>,
    reader: JoinHandle<()>,
    open: bool,
}

impl WsTransport {
    /// Connect, subscribe and wait for the relay to confirm.
    pub async fn connect(
        url: String,
        session_id: String,
        entry: RosterEntry,
        mode: JoinMode,
    ) -> Result<Self, TransportError> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let subscribe = ClientFrame::Subscribe {
            session_id: session_id.clone(),
            entry,
            mode,
        };
        ws_sender.send(Message::Text(subscribe.to_json()?)).await?;

        // First answer is either the confirmation or the refusal
        loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => match RelayFrame::from_json(&text)? {
                    RelayFrame::Subscribed { .. } => break,
                    RelayFrame::Error { code, message } => {
                        return Err(match code {
                            ErrorCode::SessionNotFound => TransportError::SessionNotFound(session_id),
                            ErrorCode::SessionExists => TransportError::SessionExists(session_id),
                            _ => TransportError::Rejected(message),
                        });
                    }
                    other => debug!(?other, "Frame before subscription confirmed"),
                },
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::Closed),
            }
        }
        info!(%url, %session_id, "Subscribed through relay");

        let (inbound_tx, inbound) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (outbound, mut outbound_rx) = mpsc::channel::<ClientFrame>(DEFAULT_CHANNEL_CAPACITY);
        let parked_roster = Arc::new(Mutex::new(None));
        let parked = parked_roster.clone();

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let envelope = match RelayFrame::from_json(&text) {
                    Ok(RelayFrame::Roster { entries }) => {
                        if !deliver_roster(&inbound_tx, &parked, entries) {
                            break;
                        }
                        continue;
                    }
                    Ok(RelayFrame::Message { from, message }) => Envelope::Message { from, message },
                    Ok(RelayFrame::Error { code, message }) => {
                        debug!(?code, %message, "Relay error");
                        continue;
                    }
                    Ok(RelayFrame::Subscribed { .. }) => continue,
                    Err(e) => {
                        debug!("Invalid frame from relay: {}", e);
                        continue;
                    }
                };
                match inbound_tx.try_send(envelope) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => debug!("Inbound queue full, message dropped"),
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let leaving = frame == ClientFrame::Leave;
                let text = match frame.to_json() {
                    Ok(t) => t,
                    Err(e) => {
                        debug!("Failed to serialize frame: {}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(text)).await.is_err() || leaving {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        Ok(Self {
            outbound: Some(outbound),
            inbound,
            parked_roster,
            reader,
            open: true,
        })
    }
}

/// Queue a roster, or park it when the queue is full. Returns false once the
/// transport is gone.
///
/// While a roster is parked later ones replace it instead of queueing, so
/// the parked roster is always the newest.
fn deliver_roster(
    inbound: &mpsc::Sender<Envelope>,
    parked: &Mutex<Option<Vec<RosterEntry>>>,
    entries: Vec<RosterEntry>,
) -> bool {
    let Ok(mut slot) = parked.lock() else {
        return false;
    };
    if slot.is_some() {
        *slot = Some(entries);
        return true;
    }
    match inbound.try_send(Envelope::Roster(entries)) {
        Ok(()) => true,
        Err(TrySendError::Full(Envelope::Roster(entries))) => {
            debug!("Inbound queue full, roster parked");
            *slot = Some(entries);
            true
        }
        Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Closed(_)) => false,
    }
}

impl Transport for WsTransport {
    fn publish(&mut self, message: WireMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let Some(outbound) = self.outbound.as_ref() else {
            return Err(TransportError::Closed);
        };
        match outbound.try_send(ClientFrame::Publish { message }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full, message dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::Closed),
        }
    }

    fn drain(&mut self) -> Vec<Envelope> {
        let mut received = Vec::new();
        while let Ok(envelope) = self.inbound.try_recv() {
            received.push(envelope);
        }
        if let Ok(mut parked) = self.parked_roster.lock() {
            if let Some(entries) = parked.take() {
                received.push(Envelope::Roster(entries));
            }
        }
        received
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        // Dropping the sender lets the writer flush and close the socket
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.try_send(ClientFrame::Leave);
        }
        self.reader.abort();
    }

    fn is_open(&self) -> bool {
        self.open && self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::Archetype;
    use crate::game::input::InputVector;

    fn roster(ids: &[&str]) -> Vec<RosterEntry> {
        ids.iter().map(|id| RosterEntry::new(*id, Archetype::Austin)).collect()
    }

    #[test]
    fn test_full_queue_parks_newest_roster() {
        let (tx, mut rx) = mpsc::channel(1);
        let parked = Mutex::new(None);
        let filler = Envelope::Message {
            from: "a".into(),
            message: WireMessage::Input { slot: 1, input: InputVector::idle() },
        };
        tx.try_send(filler.clone()).unwrap();

        assert!(deliver_roster(&tx, &parked, roster(&["a", "c"])));
        assert!(deliver_roster(&tx, &parked, roster(&["a", "b", "c"])));
        assert_eq!(parked.lock().unwrap().as_ref(), Some(&roster(&["a", "b", "c"])));

        // Room in the queue does not bypass a parked roster
        assert_eq!(rx.try_recv().unwrap(), filler);
        assert!(deliver_roster(&tx, &parked, roster(&["b", "c"])));
        assert!(rx.try_recv().is_err());
        assert_eq!(parked.lock().unwrap().take(), Some(roster(&["b", "c"])));

        assert!(deliver_roster(&tx, &parked, roster(&["c"])));
        assert_eq!(rx.try_recv().unwrap(), Envelope::Roster(roster(&["c"])));

        drop(rx);
        assert!(!deliver_roster(&tx, &parked, roster(&["c"])));
    }
}
