use std::fmt;

use uuid::Uuid;

/// Canonical, order-independent key for a two-party conversation.
///
/// The lower id always comes first, so `new(a, b)` and `new(b, a)` produce
/// the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantKey {
    low: Uuid,
    high: Uuid,
}

impl ParticipantKey {
    /// Returns `None` when both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        if a == b {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Some(Self { low, high })
    }

    pub fn ids(&self) -> [Uuid; 2] {
        [self.low, self.high]
    }

    /// The counterpart of `me`, or `None` if `me` is not in the pair.
    pub fn other(&self, me: Uuid) -> Option<Uuid> {
        if me == self.low {
            Some(self.high)
        } else if me == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_order_does_not_matter() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ParticipantKey::new(a, b), ParticipantKey::new(b, a));
        assert_eq!(
            ParticipantKey::new(a, b).unwrap().to_string(),
            ParticipantKey::new(b, a).unwrap().to_string()
        );
    }

    #[test]
    fn lower_id_first() {
        let a = Uuid::from_u128(2);
        let b = Uuid::from_u128(1);
        let key = ParticipantKey::new(a, b).unwrap();
        assert_eq!(key.ids(), [b, a]);
    }

    #[test]
    fn same_user_rejected() {
        let a = Uuid::new_v4();
        assert!(ParticipantKey::new(a, a).is_none());
    }

    #[test]
    fn other_resolves_counterpart() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = ParticipantKey::new(a, b).unwrap();
        assert_eq!(key.other(a), Some(b));
        assert_eq!(key.other(b), Some(a));
        assert_eq!(key.other(Uuid::new_v4()), None);
    }
}
