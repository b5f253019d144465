#[cfg(all(not(test), not(feature = "debug-checks")))]
pub const HSTT_ASSERT_LEVEL_DEFINITION: u8 = HSTT_ASSERT_SIMPLE;

#[cfg(any(test, feature = "debug-checks"))]
pub const HSTT_ASSERT_LEVEL_DEFINITION: u8 = HSTT_ASSERT_ADVANCED;

pub const HSTT_ASSERT_SIMPLE: u8 = 1;
pub const HSTT_ASSERT_MODERATE: u8 = 2;
pub const HSTT_ASSERT_ADVANCED: u8 = 3;
pub const HSTT_ASSERT_EXTREME: u8 = 4;

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_simple {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_SIMPLE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_eq_simple {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_SIMPLE {
            assert_eq!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_moderate {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_MODERATE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_eq_moderate {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_MODERATE {
            assert_eq!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_advanced {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_ADVANCED {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! hstt_assert_extreme {
    ($($arg:tt)*) => {
        if $crate::hstt_asserts::HSTT_ASSERT_LEVEL_DEFINITION >= $crate::hstt_asserts::HSTT_ASSERT_EXTREME {
            assert!($($arg)*);
        }
    };
}
