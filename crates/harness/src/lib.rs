pub mod capture;
pub mod client;
pub mod hooked;
pub mod network;

pub use capture::{CaptureLayer, CapturedEvent, CapturedLogs};
pub use client::TestClient;
pub use hooked::HookedStore;
pub use network::TestNetwork;
