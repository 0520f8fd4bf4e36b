pub mod gate;
pub mod kill_switch;
pub mod pnl;

pub use gate::{AccountSnapshot, RiskConfig, RiskGate};
pub use kill_switch::{InMemoryKillSwitchStore, KillSwitch, KillSwitchStore};
pub use pnl::DailyPnlTracker;
