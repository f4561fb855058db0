/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Global enums and constants of the engine.

use std::fmt;

use crate::obj::EngineEnum;

/// Declares an engine enum as a newtype over its ordinal, with one associated constant per enumerator.
///
/// Unknown ordinals received from the engine are kept as-is instead of being rejected.
macro_rules! engine_enum {
    (
        $( #[doc = $doc:literal] )*
        pub struct $Name:ident {
            $( $CONST:ident = $ord:literal, )*
        }
    ) => {
        $( #[doc = $doc] )*
        #[repr(transparent)]
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $Name {
            ord: i32,
        }

        impl $Name {
            $(
                pub const $CONST: Self = Self { ord: $ord };
            )*
        }

        impl $crate::obj::EngineEnum for $Name {
            fn try_from_ord(ord: i32) -> Option<Self> {
                match ord {
                    $( $ord )|* => Some(Self { ord }),
                    _ => None,
                }
            }

            fn ord(self) -> i32 {
                self.ord
            }

            fn as_str(&self) -> &'static str {
                match self.ord {
                    $( $ord => stringify!($CONST), )*
                    _ => "",
                }
            }

            fn values() -> &'static [Self] {
                &[ $( Self::$CONST, )* ]
            }
        }

        impl std::fmt::Debug for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use $crate::obj::EngineEnum as _;

                match self.as_str() {
                    "" => write!(f, "{} {{ ord: {} }}", stringify!($Name), self.ord),
                    name => write!(f, "{}::{name}", stringify!($Name)),
                }
            }
        }

        // SAFETY: engine enums are passed as 64-bit integers in ptrcalls.
        unsafe impl $crate::sys::GodotFfi for $Name {
            type Repr = i64;

            fn to_repr(&self) -> i64 {
                self.ord as i64
            }

            unsafe fn from_repr(repr: i64) -> Self {
                Self { ord: repr as i32 }
            }
        }
    };
}

pub(crate) use engine_enum;

engine_enum! {
    /// Error codes returned by engine methods.
    ///
    /// Codes are passed through unchanged, including ordinals this binding does not know; [`as_str()`](EngineEnum::as_str)
    /// returns an empty string for those.
    pub struct Error {
        OK = 0,
        FAILED = 1,
        ERR_UNAVAILABLE = 2,
        ERR_UNCONFIGURED = 3,
        ERR_UNAUTHORIZED = 4,
        ERR_PARAMETER_RANGE_ERROR = 5,
        ERR_OUT_OF_MEMORY = 6,
        ERR_FILE_NOT_FOUND = 7,
        ERR_FILE_BAD_DRIVE = 8,
        ERR_FILE_BAD_PATH = 9,
        ERR_FILE_NO_PERMISSION = 10,
        ERR_FILE_ALREADY_IN_USE = 11,
        ERR_FILE_CANT_OPEN = 12,
        ERR_FILE_CANT_WRITE = 13,
        ERR_FILE_CANT_READ = 14,
        ERR_FILE_UNRECOGNIZED = 15,
        ERR_FILE_CORRUPT = 16,
        ERR_FILE_MISSING_DEPENDENCIES = 17,
        ERR_FILE_EOF = 18,
        ERR_CANT_OPEN = 19,
        ERR_CANT_CREATE = 20,
        ERR_QUERY_FAILED = 21,
        ERR_ALREADY_IN_USE = 22,
        ERR_LOCKED = 23,
        ERR_TIMEOUT = 24,
        ERR_CANT_CONNECT = 25,
        ERR_CANT_RESOLVE = 26,
        ERR_CONNECTION_ERROR = 27,
        ERR_CANT_ACQUIRE_RESOURCE = 28,
        ERR_CANT_FORK = 29,
        ERR_INVALID_DATA = 30,
        ERR_INVALID_PARAMETER = 31,
        ERR_ALREADY_EXISTS = 32,
        ERR_DOES_NOT_EXIST = 33,
        ERR_DATABASE_CANT_READ = 34,
        ERR_DATABASE_CANT_WRITE = 35,
        ERR_COMPILATION_FAILED = 36,
        ERR_METHOD_NOT_FOUND = 37,
        ERR_LINK_FAILED = 38,
        ERR_SCRIPT_FAILED = 39,
        ERR_CYCLIC_LINK = 40,
        ERR_INVALID_DECLARATION = 41,
        ERR_DUPLICATE_SYMBOL = 42,
        ERR_PARSE_ERROR = 43,
        ERR_BUSY = 44,
        ERR_SKIP = 45,
        ERR_HELP = 46,
        ERR_BUG = 47,
        ERR_PRINTER_ON_FIRE = 48,
    }
}

impl Error {
    /// Constructs an error code from any ordinal, known or not.
    pub const fn from_ord_unchecked(ord: i32) -> Self {
        Self { ord }
    }

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// `Ok(())` for [`Error::OK`], otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for Error {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            "" => write!(f, "unknown engine error ({})", self.ord),
            name => write!(f, "{name} ({})", self.ord),
        }
    }
}

impl std::error::Error for Error {}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::GodotFfi;

    #[test]
    fn ordinals_cover_engine_range() {
        let values = Error::values();
        assert_eq!(values.len(), 49);

        for (i, value) in values.iter().enumerate() {
            assert_eq!(value.ord(), i as i32);
        }
        assert_eq!(Error::ERR_PRINTER_ON_FIRE.ord(), 48);
    }

    #[test]
    fn unknown_ordinal_is_preserved() {
        assert_eq!(Error::try_from_ord(49), None);

        let unknown = Error::from_ord_unchecked(1234);
        assert_eq!(unknown.ord(), 1234);
        assert_eq!(unknown.as_str(), "");
        assert_eq!(unknown.to_string(), "unknown engine error (1234)");
    }

    #[test]
    fn into_result() {
        assert_eq!(Error::OK.into_result(), Ok(()));
        assert_eq!(
            Error::ERR_FILE_NOT_FOUND.into_result(),
            Err(Error::ERR_FILE_NOT_FOUND)
        );
    }

    #[test]
    fn display_and_debug() {
        assert_eq!(Error::ERR_FILE_NOT_FOUND.to_string(), "ERR_FILE_NOT_FOUND (7)");
        assert_eq!(format!("{:?}", Error::FAILED), "Error::FAILED");
    }

    #[test]
    fn ffi_round_trip() {
        let repr = Error::ERR_BUSY.to_repr();
        assert_eq!(repr, 44);
        assert_eq!(unsafe { Error::from_repr(repr) }, Error::ERR_BUSY);
    }
}
