use super::{IndicatorSnapshot, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification produced by the strength-sum policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Neutral,
}

/// Classification produced by the tally policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TallySignal {
    Buy,
    Sell,
    #[serde(rename = "trending")]
    Trending,
}

/// The fuller composite counters used by the tally policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub moving_averages: i32,
    pub oscillators: i32,
}

/// A classified snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal<C> {
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(rename = "type")]
    pub classification: C,
    pub strength: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tally: Option<Tally>,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub indicators: IndicatorSnapshot,
}

impl<C> Signal<C> {
    pub fn new(
        classification: C,
        strength: i32,
        snapshot: &IndicatorSnapshot,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            timeframe: snapshot.timeframe,
            classification,
            strength,
            tally: None,
            timestamp,
            price: snapshot.price,
            indicators: snapshot.clone(),
        }
    }

    pub fn with_tally(mut self, tally: Tally) -> Self {
        self.tally = Some(tally);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_signal_type_wire_names() {
        assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"BUY\"");
        assert_eq!(
            serde_json::to_string(&SignalType::Neutral).unwrap(),
            "\"NEUTRAL\""
        );
        assert_eq!(serde_json::to_string(&TallySignal::Buy).unwrap(), "\"Buy\"");
        assert_eq!(
            serde_json::to_string(&TallySignal::Trending).unwrap(),
            "\"trending\""
        );
    }

    #[test]
    fn test_signal_copies_snapshot() {
        let snapshot = IndicatorSnapshot::empty("ETHUSDT", Timeframe::FourHours, 2500.0);
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let signal = Signal::new(SignalType::Neutral, 0, &snapshot, at);
        assert_eq!(signal.symbol, "ETHUSDT");
        assert_eq!(signal.price, 2500.0);
        assert_eq!(signal.indicators, snapshot);
        assert!(signal.tally.is_none());
        assert_eq!(signal.timestamp, at);

        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "NEUTRAL");
        assert!(json.get("tally").is_none());
    }
}
