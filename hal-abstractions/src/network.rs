//! Network collaborator ports
//!
//! Link bring-up, the MQTT client and the cloud document store are vendor
//! plumbing. The core only needs readiness checks, an event pump and a
//! "did it work" answer from each.

use core::fmt::Debug;
use core::future::Future;

use heapless::String;

/// Maximum length of a document store task identifier
pub const TASK_ID_LEN: usize = 32;

/// Maximum length of a document store result message
pub const MESSAGE_LEN: usize = 96;

/// Physical/IP link (WiFi association, Ethernet + DHCP)
pub trait NetworkLink {
    /// Link is associated and has an address
    fn is_up(&self) -> bool;
}

/// Connected MQTT session
pub trait MqttTransport {
    /// Session or socket failure
    type Error: Debug;

    /// Broker session is established
    fn is_connected(&self) -> bool;

    /// Service keep-alive and reconnects; must not block for long
    fn poll(&mut self) -> impl Future<Output = ()>;

    /// Publish `payload` on `topic` (QoS 0, not retained)
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Result delivered by a document store for one task
///
/// The variants are mutually exclusive; the store reports exactly one per
/// completed request.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreResult {
    /// Progress/auth event with a status code
    Event {
        task: String<TASK_ID_LEN>,
        message: String<MESSAGE_LEN>,
        code: i32,
    },
    /// Debug chatter from the SDK
    Debug {
        task: String<TASK_ID_LEN>,
        message: String<MESSAGE_LEN>,
    },
    /// The request failed
    Error {
        task: String<TASK_ID_LEN>,
        message: String<MESSAGE_LEN>,
        code: i32,
    },
    /// The request completed and a response payload is available
    Available { task: String<TASK_ID_LEN> },
}

impl StoreResult {
    /// Task identifier the result belongs to
    pub fn task(&self) -> &str {
        match self {
            Self::Event { task, .. }
            | Self::Debug { task, .. }
            | Self::Error { task, .. }
            | Self::Available { task } => task.as_str(),
        }
    }
}

/// Cloud document store (Firestore-like)
pub trait DocumentStore {
    /// Drive the SDK's internal state machine (auth refresh, pending requests)
    fn poll(&mut self) -> impl Future<Output = ()>;

    /// Authenticated and able to accept writes
    fn is_ready(&self) -> bool;

    /// Create a new document under `path` from a JSON `body`
    fn create_document(&mut self, path: &str, body: &str) -> impl Future<Output = StoreResult>;
}
