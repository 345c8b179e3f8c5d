//! Classification and field extraction for bank / mobile-money notifications.
//!
//! Everything here is a pure function over the message text. Classification
//! answers two independent questions: which network sent the message (from
//! the sender id) and which way the money moved (from the body phrasing).
//! Extraction pulls the amount, transaction reference and counterparty name
//! out of the free text, best effort.
//!
//! The patterns are an ordered rule list per network and direction, so new
//! providers or phrasings are additive.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The network a notification originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    MtnMobileMoney,
    Bank,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MtnMobileMoney => "MTN_MOBILE_MONEY",
            Self::Bank => "BANK",
        }
    }
}

/// Which way the money moved, as phrased in the body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Received,
    Sent,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Sent => "SENT",
        }
    }
}

/// Result of [`classify`]. `None` in either field means "unknown".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub network: Option<Network>,
    pub direction: Option<Direction>,
}

impl Classification {
    /// A message is financial only when both sender and phrasing matched.
    #[must_use]
    pub fn is_financial(&self) -> bool {
        self.network.is_some() && self.direction.is_some()
    }
}

// Sender id fragments, compared against the uppercased sender.
const MTN_SENDERS: [&str; 3] = ["MTN", "MOMO", "182"];
const BANK_SENDERS: [&str; 7] = [
    "BANK",
    "EQUITY",
    "BK",
    "COGEBANQUE",
    "BPR",
    "ECOBANK",
    "ACCESS",
];

// Amount capture shared by every body pattern: grouped digits, optional
// 2-digit fraction, optional currency tag.
const AMOUNT: &str = r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*(?:RWF|FRW|Frw)?";

fn compile<S: AsRef<str>>(fragments: &[S]) -> Vec<Regex> {
    fragments
        .iter()
        .map(|f| match Regex::new(f.as_ref()) {
            Ok(re) => re,
            // All inputs are compile-time literals below.
            Err(err) => unreachable!("invalid built-in pattern {}: {err}", f.as_ref()),
        })
        .collect()
}

static BANK_RECEIVED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!(r"(?i)received\s+{AMOUNT}"),
        format!(r"(?i)credited\s+(?:with\s+)?{AMOUNT}"),
        format!(r"(?i)deposit\s+of\s+{AMOUNT}"),
    ])
});

static BANK_SENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!(r"(?i)sent\s+{AMOUNT}"),
        format!(r"(?i)debited\s+{AMOUNT}"),
        format!(r"(?i)paid\s+{AMOUNT}"),
        format!(r"(?i)withdrawal\s+of\s+{AMOUNT}"),
    ])
});

static MTN_RECEIVED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!(r"(?i)You\s+have\s+received\s+{AMOUNT}"),
        format!(r"(?i)Received\s+{AMOUNT}\s+from"),
    ])
});

static MTN_SENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!(r"(?i)You\s+have\s+sent\s+{AMOUNT}"),
        format!(r"(?i)Sent\s+{AMOUNT}\s+to"),
        format!(r"(?i)successfully\s+sent\s+{AMOUNT}"),
    ])
});

static REFERENCE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)Ref(?:erence)?[:\s]+([A-Z0-9]+)",
        r"(?i)Transaction[:\s]+([A-Z0-9]+)",
        r"(?i)TXN[:\s]+([A-Z0-9]+)",
    ])
});

static COUNTERPARTY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)from\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
        r"(?i)by\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    ])
});

/// Classifies a raw message into network and direction.
///
/// The network comes from a case-insensitive substring match on the sender
/// id; mobile-money tokens are checked before bank tokens, so a sender that
/// somehow matches both counts as mobile money. The direction comes from
/// the body: received phrasings are tested first, sent phrasings second, so
/// a body matching both classifies as SENT.
#[must_use]
pub fn classify(sender: &str, body: &str) -> Classification {
    let upper_sender = sender.to_uppercase();

    let network = if MTN_SENDERS.iter().any(|s| upper_sender.contains(s)) {
        Some(Network::MtnMobileMoney)
    } else if BANK_SENDERS.iter().any(|s| upper_sender.contains(s)) {
        Some(Network::Bank)
    } else {
        None
    };

    let mut direction = None;
    if BANK_RECEIVED.iter().any(|p| p.is_match(body))
        || MTN_RECEIVED.iter().any(|p| p.is_match(body))
    {
        direction = Some(Direction::Received);
    }
    if BANK_SENT.iter().any(|p| p.is_match(body)) || MTN_SENT.iter().any(|p| p.is_match(body)) {
        direction = Some(Direction::Sent);
    }

    Classification { network, direction }
}

/// Extracts the transaction amount from a message body.
///
/// Tries every known pattern in order (bank received, bank sent, mobile
/// money received, mobile money sent) and parses the first capture. `None`
/// is not an error; the caller is expected to fall back to manual entry.
#[must_use]
pub fn extract_amount(body: &str) -> Option<Money> {
    BANK_RECEIVED
        .iter()
        .chain(BANK_SENT.iter())
        .chain(MTN_RECEIVED.iter())
        .chain(MTN_SENT.iter())
        .find_map(|p| p.captures(body))
        .and_then(|caps| Money::parse_grouped(&caps[1]).ok())
}

/// Extracts a transaction reference (`Ref: ABC123`, `TXN 456`), if present.
#[must_use]
pub fn extract_transaction_ref(body: &str) -> Option<String> {
    REFERENCE
        .iter()
        .find_map(|p| p.captures(body))
        .map(|caps| caps[1].to_string())
}

/// Extracts the counterparty name (`from John Doe`, `by Alice`), if present.
#[must_use]
pub fn extract_counterparty_name(body: &str) -> Option<String> {
    COUNTERPARTY
        .iter()
        .find_map(|p| p.captures(body))
        .map(|caps| caps[1].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_mtn_received() {
        let c = classify("MTN", "You have received 5,000 RWF from John");
        assert_eq!(c.network, Some(Network::MtnMobileMoney));
        assert_eq!(c.direction, Some(Direction::Received));
        assert!(c.is_financial());
    }

    #[test]
    fn classify_bank_sent() {
        let c = classify("COGEBANQUE", "You sent 3,000 RWF");
        assert_eq!(c.network, Some(Network::Bank));
        assert_eq!(c.direction, Some(Direction::Sent));
    }

    #[test]
    fn classify_sender_is_case_insensitive() {
        let c = classify("MoMo Rwanda", "Received 1,000 RWF from Jane");
        assert_eq!(c.network, Some(Network::MtnMobileMoney));
    }

    #[test]
    fn classify_unknown_sender_and_body() {
        let c = classify("GARAGE", "your car is ready");
        assert_eq!(c.network, None);
        assert_eq!(c.direction, None);
        assert!(!c.is_financial());
    }

    #[test]
    fn sent_phrasing_overrides_received() {
        // "received ... sent ..." bodies exist (e.g. confirmations quoting
        // both legs); the defined tie-break is SENT.
        let c = classify(
            "MTN",
            "Received 5,000 RWF from John. You have sent 5,000 RWF to the group wallet",
        );
        assert_eq!(c.direction, Some(Direction::Sent));
    }

    #[test]
    fn amount_from_grouped_received() {
        let amount = extract_amount("Received 12,500 RWF from Kamana").unwrap();
        assert_eq!(amount, Money::new(1_250_000));
    }

    #[test]
    fn amount_with_decimals() {
        let amount = extract_amount("Your account was credited with 1,234.50 RWF").unwrap();
        assert_eq!(amount, Money::new(123_450));
    }

    #[test]
    fn amount_absent_from_random_text() {
        assert_eq!(extract_amount("random text"), None);
    }

    #[test]
    fn amount_from_withdrawal() {
        let amount = extract_amount("withdrawal of 20,000 Frw at agent").unwrap();
        assert_eq!(amount, Money::new(2_000_000));
    }

    #[test]
    fn transaction_ref_variants() {
        assert_eq!(
            extract_transaction_ref("Ref: AB12CD34").as_deref(),
            Some("AB12CD34")
        );
        assert_eq!(
            extract_transaction_ref("Reference 99ZZ").as_deref(),
            Some("99ZZ")
        );
        assert_eq!(extract_transaction_ref("TXN: 777").as_deref(), Some("777"));
        assert_eq!(extract_transaction_ref("no reference here..."), None);
    }

    #[test]
    fn counterparty_name() {
        assert_eq!(
            extract_counterparty_name("You have received 5,000 RWF from John Doe").as_deref(),
            Some("John Doe")
        );
        assert_eq!(
            extract_counterparty_name("Payment by Alice").as_deref(),
            Some("Alice")
        );
        assert_eq!(extract_counterparty_name("1234567890"), None);
    }
}
