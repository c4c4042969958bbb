pub mod authorize;
pub mod db;
mod dispatch;
pub mod heartbeat;
pub mod onboard;

pub use dispatch::dispatch;
