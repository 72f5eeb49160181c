//! Numeric codes used in the canonical encoding.

use core::fmt;

macro_rules! u8_enum {
    ($(#[$attr:meta])* $vis:vis enum $name:ident { $($(#[$var_attr:meta])* $variant:ident = $val:expr),* $(,)? }) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        $vis enum $name {
            $($(#[$var_attr])* $variant = $val,)*
        }

        impl core::convert::TryFrom<u8> for $name {
            type Error = InvalidEnumValue;

            fn try_from(val: u8) -> Result<Self, Self::Error> {
                match val {
                    $($val => Ok($name::$variant),)*
                    _ => Err(InvalidEnumValue(val))
                }
            }
        }
    }
}

u8_enum! {
    /// Kind of the operation a transaction performs.
    pub enum TxType {
        Payment = 1,
        AssetConfig = 2,
        AssetTransfer = 3,
        ApplicationCall = 4,
    }
}

u8_enum! {
    /// What happens to the caller's application state after an application call.
    pub enum OnComplete {
        /// Only run the approval program.
        NoOp = 0,
        /// Allocate local state for the caller.
        OptIn = 1,
        CloseOut = 2,
        ClearState = 3,
        UpdateApplication = 4,
        DeleteApplication = 5,
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InvalidEnumValue(pub u8);

impl fmt::Display for InvalidEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid enum value {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::TryFrom;
    use super::{OnComplete, TxType, InvalidEnumValue};

    #[test]
    fn codes() {
        assert_eq!(OnComplete::try_from(5), Ok(OnComplete::DeleteApplication));
        assert_eq!(OnComplete::try_from(6), Err(InvalidEnumValue(6)));
        assert_eq!(TxType::try_from(0), Err(InvalidEnumValue(0)));
        assert_eq!(TxType::ApplicationCall as u8, 4);
    }
}
