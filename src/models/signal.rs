//! Live signal display models

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Label the backend reports for instruments where no rule fired
pub const NO_SIGNAL: &str = "NO_SIGNAL";

/// Per-symbol value of the `/api/signals` mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub signal: String,
    #[serde(default)]
    pub rule_name: Option<String>,
}

/// Display row: one instrument and the signal currently attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub symbol: String,
    pub signal: String,
    pub rule_name: Option<String>,
}

impl SignalEntry {
    pub fn new(symbol: impl Into<String>, state: SignalState) -> Self {
        Self {
            symbol: symbol.into(),
            signal: state.signal,
            rule_name: state.rule_name,
        }
    }

    pub fn is_no_signal(&self) -> bool {
        self.signal == NO_SIGNAL
    }

    pub fn tone(&self) -> SignalTone {
        SignalTone::classify(&self.signal)
    }
}

/// Display colouring derived from a signal label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalTone {
    Buy,
    Sell,
    Neutral,
}

impl SignalTone {
    pub fn classify(signal: &str) -> Self {
        if signal.contains("BUY") {
            SignalTone::Buy
        } else if signal.contains("SELL") {
            SignalTone::Sell
        } else {
            SignalTone::Neutral
        }
    }
}

/// Decoded `/api/signals` body, in the key order the server sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalsPayload(Vec<SignalEntry>);

impl SignalsPayload {
    pub fn new(entries: Vec<SignalEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[SignalEntry] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<SignalEntry> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct SignalsVisitor;

impl<'de> Visitor<'de> for SignalsVisitor {
    type Value = SignalsPayload;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of symbol to signal state")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((symbol, state)) = access.next_entry::<String, SignalState>()? {
            entries.push(SignalEntry::new(symbol, state));
        }
        Ok(SignalsPayload(entries))
    }
}

impl<'de> Deserialize<'de> for SignalsPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SignalsVisitor)
    }
}
