pub mod quote;

pub use quote::{apply_net_amount, execution_price, fee, slippage_bps};
