//! Contains containers which are used by the engine.
mod id_set;
mod keyed_vec;

use fnv::FnvBuildHasher;
pub use id_set::*;
pub use keyed_vec::*;

/// [`std::collections::HashMap`] that defaults to a deterministic hasher.
#[allow(clippy::disallowed_types, reason = "this is how we define our HashMap")]
pub type HashMap<K, V, Hasher = FnvBuildHasher> = std::collections::HashMap<K, V, Hasher>;
/// [`std::collections::HashSet`] that defaults to a deterministic hasher.
#[allow(clippy::disallowed_types, reason = "this is how we define our HashSet")]
pub type HashSet<K, Hasher = FnvBuildHasher> = std::collections::HashSet<K, Hasher>;

/// Declares a `u32` handle type which indexes a [`KeyedVec`].
///
/// Handles are plain indices; they stay valid for the lifetime of the arena they index into,
/// since entities are tombstoned rather than removed.
#[macro_export]
#[doc(hidden)]
macro_rules! storage_key {
    ($(#[$documentation:meta])* $name:ident, $display:literal) => {
        $(#[$documentation])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $display, self.0)
            }
        }

        impl $crate::containers::StorageKey for $name {
            fn index(&self) -> usize {
                self.0 as usize
            }

            fn create_from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }
    };
}
