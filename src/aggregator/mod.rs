/// Rolling window of recent request outcomes
pub mod rolling_window;

pub use rolling_window::RollingWindow;
