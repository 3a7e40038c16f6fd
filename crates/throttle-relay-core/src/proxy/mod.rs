//! Relay implementation: copiers, sessions and the accept loop.

pub mod acceptor;
pub mod relay;
pub mod session;
pub mod throttle;

pub use acceptor::{Acceptor, Sessions};
pub use relay::{passthrough_copy, Copier};
pub use throttle::{throttle_copy, Throttle};
