//! The externally visible operations of the market economy engine.
//! Each mutating operation owns exactly one transaction (`db::with_tx`)
//! spanning every read and write it performs.

pub mod lifecycle;
pub mod markets;
pub mod orders;
pub mod quote;
pub mod wallets;
