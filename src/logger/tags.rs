/// Log tags, one per subsystem
///
/// The tag decides both the console color and which --debug-<module> flag
/// gates Debug-level output for that subsystem.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Monitor,
    Rpc,
    Filter,
    Dedup,
    Decoder,
    Database,
    Stats,
}

impl LogTag {
    /// The suffix used in --debug-<module> flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Monitor => "monitor",
            LogTag::Rpc => "rpc",
            LogTag::Filter => "filters",
            LogTag::Dedup => "dedup",
            LogTag::Decoder => "decoder",
            LogTag::Database => "database",
            LogTag::Stats => "stats",
        }
        .to_string()
    }

    /// Uncolored fixed-width name for file output
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Monitor => "MONITOR",
            LogTag::Rpc => "RPC",
            LogTag::Filter => "FILTER",
            LogTag::Dedup => "DEDUP",
            LogTag::Decoder => "DECODER",
            LogTag::Database => "DATABASE",
            LogTag::Stats => "STATS",
        }
    }
}
