//! Portal-specific receipt parsers

pub mod nfce;

pub use nfce::{parse_brl_value, parse_receipt, NfceParser};
