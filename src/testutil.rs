//! Shared helpers for unit tests

use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream};

use crate::events::EventSink;
use crate::session::Session;

/// A connected loopback pair: (connecting end, accepted end)
pub async fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), async {
        listener.accept().await.unwrap().0
    });
    (client.unwrap(), accepted)
}

/// An already-activated session plus the peer-side stream its sends
/// arrive on
pub async fn active_session(name: &str) -> (Arc<Session>, TcpStream) {
    let (client, accepted) = socket_pair().await;
    let (_read, write) = accepted.into_split();
    let session = Arc::new(Session::new(write));
    session.set_username(name.to_string());
    session.activate();
    (session, client)
}

/// One observed sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(String, bool),
    Connect(String),
    Disconnect(String),
    Roster(Vec<String>),
}

/// EventSink test double that records every call in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventSink for RecordingSink {
    fn on_message(&self, text: &str, own: bool) {
        self.push(Event::Message(text.to_string(), own));
    }

    fn on_connect(&self, username: &str) {
        self.push(Event::Connect(username.to_string()));
    }

    fn on_disconnect(&self, username: &str) {
        self.push(Event::Disconnect(username.to_string()));
    }

    fn on_roster_changed(&self, usernames: &[String]) {
        self.push(Event::Roster(usernames.to_vec()));
    }
}
