use std::fmt;

use sipline_core::{HeaderAccess, Message};

/// Identifies a transaction by the branch parameter of the top Via.
///
/// A CANCEL carries the branch of the INVITE it cancels, so it is routed to
/// the INVITE's transaction; the same goes for the 200 answering it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionKey(String);

impl TransactionKey {
    pub fn new(branch: impl Into<String>) -> Self {
        Self(branch.into())
    }

    /// Key of the transaction `message` belongs to, if it carries a branch.
    pub fn from_message(message: &Message) -> Option<Self> {
        message.via_branch().map(Self)
    }

    pub fn branch(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionKey {
    fn from(branch: &str) -> Self {
        Self::new(branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipline_core::parse_message;

    #[test]
    fn test_key_from_message() {
        let message = parse_message(
            b"BYE sip:bob@biloxi.com SIP/2.0\r\n\
              Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKkey1\r\n\
              CSeq: 2 BYE\r\n\r\n",
        )
        .unwrap();

        let key = TransactionKey::from_message(&message).unwrap();
        assert_eq!(key.branch(), "z9hG4bKkey1");
        assert_eq!(key.to_string(), "z9hG4bKkey1");
    }

    #[test]
    fn test_no_branch_no_key() {
        let message = parse_message(
            b"BYE sip:bob@biloxi.com SIP/2.0\r\n\
              Via: SIP/2.0/UDP pc33.atlanta.com\r\n\r\n",
        )
        .unwrap();
        assert!(TransactionKey::from_message(&message).is_none());
    }
}
