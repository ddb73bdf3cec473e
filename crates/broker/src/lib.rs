//! Print broker client speaking the QZ Tray websocket protocol.
//! 以 QZ Tray websocket 協定與列印代理程式溝通的用戶端。

pub mod protocol;
pub mod session;
pub mod signing;

pub use session::BrokerTransport;
pub use signing::{
    sign_message, verify_signature, Authenticator, FileCredentials, PemCredentials,
    SIGN_ALGORITHM,
};
