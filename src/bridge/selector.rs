//! Reply arbitration.

use crate::bus::ReplyMessage;

/// Pick the reply of record: the last one received.
///
/// Earlier replies of a multi-reply exchange are observed but never used to
/// build the response. An empty sequence has no reply of record.
pub fn select_reply(replies: &[ReplyMessage]) -> Option<&ReplyMessage> {
    replies.last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replies(n: u16) -> Vec<ReplyMessage> {
        (1..=n).map(|i| ReplyMessage::with_status(200 + i)).collect()
    }

    #[test]
    fn test_last_reply_wins() {
        assert_eq!(select_reply(&replies(1)).unwrap().status_code, Some(201));
        assert_eq!(select_reply(&replies(5)).unwrap().status_code, Some(205));
    }

    #[test]
    fn test_empty_sequence() {
        assert!(select_reply(&[]).is_none());
    }
}
