use std::{
    fmt::{self, Display},
    num::NonZeroU64,
};

/// Raw value the managed side uses for "no native object".
pub const UNBOUND: u64 = 0;

/// Opaque identifier correlating a listener with a native-side object.
///
/// The value is never dereferenced. It only means something to the
/// [`HandleTable`](super::dispatch::HandleTable) that handed it out, and a
/// handle the table no longer knows about is simply ignored.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NativeHandle(NonZeroU64);

impl NativeHandle {
    /// Returns `None` for the unbound sentinel.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn as_raw(self) -> u64 {
        self.0.get()
    }

    /// Java's `long` is signed, so handles cross JNI as `i64`.
    pub fn from_jlong(raw: i64) -> Option<Self> {
        Self::from_raw(raw as u64)
    }

    pub fn as_jlong(self) -> i64 {
        self.as_raw() as i64
    }
}

impl Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
