//! Domain types for TicketLab

pub mod draw;
pub mod pool;
pub mod scores;
pub mod ticket;

pub use draw::Draw;
pub use pool::{Pool, MAIN_PICKS, MAIN_POOL_SIZE, STAR_PICKS, STAR_POOL_SIZE};
pub use scores::{ScoreSnapshot, ScoreVector};
pub use ticket::{validate_selection, Ticket, TicketError};
