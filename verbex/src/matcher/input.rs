use bon::Builder;

/// The parameters of one search call: the haystack plus where to begin.
///
/// `start` must lie on a char boundary; offsets reported in the resulting
/// [`Match`](super::Match) are absolute haystack offsets, not relative to
/// `start`.
#[derive(Builder, Clone, Copy, Debug)]
pub struct Input<'h> {
    #[builder(start_fn)]
    pub(crate) haystack: &'h str,
    /// Begin searching at this byte offset. Akin to POSIX `REG_NOTBOL` in
    /// that `^` does not match at a non-zero `start` unless it is a line
    /// start under multiline.
    #[builder(default = 0)]
    pub(crate) start: usize,
}

impl<'h> Input<'h> {
    #[inline]
    pub fn haystack(&self) -> &'h str {
        self.haystack
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }
}

impl<'h> From<&'h str> for Input<'h> {
    #[inline]
    fn from(haystack: &'h str) -> Self {
        Input { haystack, start: 0 }
    }
}
