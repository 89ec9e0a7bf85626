/// A bounded-duration status effect. The level polls it at the current
/// logical time; the transition back to `Inactive` happens exactly once per
/// activation, and re-activating simply replaces the deadline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Timed {
    #[default]
    Inactive,
    Active {
        expires_at: u64,
    },
}

impl Timed {
    pub fn activate(&mut self, now_ms: u64, duration_ms: u64) {
        *self = Timed::Active {
            expires_at: now_ms.saturating_add(duration_ms),
        };
    }

    pub fn cancel(&mut self) {
        *self = Timed::Inactive;
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Timed::Active { .. })
    }

    pub fn expires_at(&self) -> Option<u64> {
        match self {
            Timed::Active { expires_at } => Some(*expires_at),
            Timed::Inactive => None,
        }
    }

    pub fn poll(&mut self, now_ms: u64) -> bool {
        match *self {
            Timed::Active { expires_at } if now_ms >= expires_at => {
                *self = Timed::Inactive;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_once_at_deadline() {
        let mut effect = Timed::default();
        effect.activate(1_000, 500);
        assert!(!effect.poll(1_499));
        assert!(effect.is_active());
        assert!(effect.poll(1_500));
        assert!(!effect.poll(1_600));
        assert!(!effect.is_active());
    }

    #[test]
    fn reactivation_extends_instead_of_stacking() {
        let mut effect = Timed::default();
        effect.activate(0, 1_000);
        effect.activate(800, 1_000);
        assert!(!effect.poll(1_000));
        assert_eq!(effect.expires_at(), Some(1_800));
        assert!(effect.poll(1_800));
    }
}
