use core::fmt;
use core::num::NonZeroU32;

use crate::{PfError, PfResult};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create an id from a 0-based index by storing index+1.
            pub fn from_index(index: usize) -> PfResult<Self> {
                u32::try_from(index)
                    .ok()
                    .and_then(|i| i.checked_add(1))
                    .and_then(NonZeroU32::new)
                    .map(Self)
                    .ok_or(PfError::IndexOob {
                        what: stringify!($name),
                        index,
                        len: u32::MAX as usize,
                    })
            }

            /// Recover the 0-based index.
            pub fn index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.index())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.index())
            }
        }
    };
}

define_id!(
    /// Position of a cell in the pack's flat cell vector.
    CellId,
    "cell#"
);

define_id!(
    /// Parallel group id; ordering of group ids is the series order.
    GroupId,
    "group#"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            assert_eq!(CellId::from_index(i).unwrap().index(), i);
            assert_eq!(GroupId::from_index(i).unwrap().index(), i);
        }
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<CellId>(),
            core::mem::size_of::<Option<CellId>>()
        );
    }

    #[test]
    fn index_past_u32_is_rejected() {
        assert!(GroupId::from_index(u32::MAX as usize).is_err());
    }

    #[test]
    fn display_uses_prefix() {
        let id = CellId::from_index(3).unwrap();
        assert_eq!(id.to_string(), "cell#3");
    }
}
