mod blocked_ip;
mod failed_attempt;
mod license;
mod user;

pub use blocked_ip::*;
pub use failed_attempt::*;
pub use license::*;
pub use user::*;
