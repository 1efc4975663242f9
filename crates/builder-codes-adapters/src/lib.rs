pub mod clock;
pub mod config;
pub mod cookie;
pub mod eip1193;
pub mod rpc;
pub mod session;
pub mod transport;

pub use clock::SystemClockAdapter;
pub use config::{AppConfig, RuntimeProfile};
pub use cookie::{CookieJar, CookieStorage, SESSION_COOKIE_NAME};
pub use eip1193::{Eip1193Adapter, SubmittedBatch, DEMO_CONNECTOR_UID, PROXY_CONNECTOR_UID};
pub use session::{discover_connectors, WalletSession};
pub use transport::{transports, HttpTransport};
