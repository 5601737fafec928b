//! Generation-stamped token handles.

use core::fmt;

use crate::counter::Counter;

/// Proof that a generation was current at the moment of acquisition.
///
/// A `Token` pins one counter on the page for its generation; the matching
/// [`Pending::wait`] cannot complete until the token is released. Release
/// happens on drop, or explicitly through [`release`].
///
/// [`Pending::wait`]: crate::Pending::wait
/// [`release`]: Token::release
pub struct Token {
    ctr: &'static Counter,
    gen: u64,
    hint: usize,
}

impl Token {
    pub(crate) fn new(ctr: &'static Counter, gen: u64, hint: usize) -> Self {
        Self { ctr, gen, hint }
    }

    /// Releases the token, allowing a wait on its generation to complete.
    ///
    /// Equivalent to dropping the token.
    #[inline]
    pub fn release(self) {}

    /// The generation the tracker was at when this token was acquired.
    #[inline]
    pub fn gen(&self) -> u64 {
        self.gen
    }

    /// The shard hint used to pick this token's counter. Best-effort and
    /// informational only.
    #[inline]
    pub fn hint(&self) -> usize {
        self.hint
    }
}

impl Drop for Token {
    #[inline]
    fn drop(&mut self) {
        self.ctr.release();
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("gen", &self.gen)
            .field("hint", &self.hint)
            .finish()
    }
}
