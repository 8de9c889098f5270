pub mod debug;
pub mod observe_on;
pub mod share_latest;
