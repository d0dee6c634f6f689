use serde::{Deserialize, Serialize};

// Which part an instrument plays in the forecast. The five weighted roles
// each contribute a change, the target only supplies the baseline close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sp500,
    Nasdaq,
    Sox,
    Tsm,
    Currency,
    Target,
}

impl Role {
    pub const WEIGHTED: [Role; 5] = [
        Role::Sp500,
        Role::Nasdaq,
        Role::Sox,
        Role::Tsm,
        Role::Currency,
    ];

    pub fn is_weighted(self) -> bool {
        self != Role::Target
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sp500 => "sp500",
            Role::Nasdaq => "nasdaq",
            Role::Sox => "sox",
            Role::Tsm => "tsm",
            Role::Currency => "currency",
            Role::Target => "target",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub label: String,
    pub role: Role,
}

impl Instrument {
    pub fn new(symbol: &str, label: &str, role: Role) -> Self {
        Instrument {
            symbol: symbol.to_string(),
            label: label.to_string(),
            role,
        }
    }
}

pub fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("^GSPC", "S&P500", Role::Sp500),
        Instrument::new("^IXIC", "NASDAQ", Role::Nasdaq),
        Instrument::new("^SOX", "PHLX Semiconductor (SOX)", Role::Sox),
        Instrument::new("TSM", "TSMC ADR (TSM)", Role::Tsm),
        Instrument::new("USDTWD=X", "USD/TWD", Role::Currency),
        Instrument::new("^TWII", "TAIEX (TWII)", Role::Target),
    ]
}
