//! Domain types: bars, orders, positions, portfolio snapshots, signals, ids.

pub mod bar;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;

pub use bar::Bar;
pub use ids::{IdGen, OrderId, RunId};
pub use order::{Order, OrderKind, OrderSide, OrderStatus};
pub use portfolio::PortfolioSnapshot;
pub use position::Position;
pub use signal::{Signal, SignalAction};
