//! Core Infrastructure
//!
//! HTTP transport and clock abstractions injected into the token components.

pub mod clock;
pub mod transport;

pub use clock::{Clock, MockClock, SystemClock};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, MockReply,
    ReqwestHttpTransport, DEFAULT_TIMEOUT, MAX_RESPONSE_SIZE,
};
