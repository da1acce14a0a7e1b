use alloy_primitives::{ Address, U256 };

/// Direction inferred from settlement-token flow. Not ground truth: a
/// transaction with no settlement transfer, or with offsetting transfers,
/// stays Unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
    Unknown,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => Side::Unknown,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoded OrdersMatched event. Amounts and asset ids are full 256-bit
/// words; on-chain values routinely exceed u64 range.
#[derive(Debug, Clone)]
pub struct OrderFill {
    pub taker_order_hash: String,
    pub taker_order_maker: Address,
    pub maker_asset_id: U256,
    pub taker_asset_id: U256,
    pub maker_amount_filled: U256,
    pub taker_amount_filled: U256,
    pub block_number: u64,
    /// Chain timestamp when the source carries one, decode-time wall clock
    /// otherwise (live filter logs never carry one)
    pub timestamp: i64,
    pub tx_hash: String,
    pub side: Side,
}

/// Lowercase 0x-prefixed form used for storage and log lines
pub fn address_to_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}
