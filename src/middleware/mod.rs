mod auth;
mod blocklist;
mod license_gate;

pub use auth::*;
pub use blocklist::*;
pub use license_gate::*;
