//! Stamp - ordering key of a dispatch
//!
//! A stamp is either a time point or a sequence number. The engine only
//! needs a total order, a minimum value and a saturating offset arithmetic
//! for delays and periods.

use std::fmt;
use std::time::Duration;

/// Totally ordered alignment key.
///
/// `Offset` is the type of the distance between two stamps (delays, periods,
/// chunk lengths). Arithmetic saturates instead of wrapping so that
/// `MIN.retreat(delay)` stays `MIN`.
pub trait Stamp: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Distance between two stamps. `Default` is the zero offset.
    type Offset: Copy + Ord + fmt::Debug + Default + Send + Sync + 'static;

    /// Smallest representable stamp.
    const MIN: Self;

    /// `self - earlier`, saturating at zero.
    fn distance(self, earlier: Self) -> Self::Offset;

    /// `self - by`, saturating at [`Stamp::MIN`].
    fn retreat(self, by: Self::Offset) -> Self;

    /// `self + by`, saturating at the largest value.
    fn advance(self, by: Self::Offset) -> Self;

    /// Largest stamp strictly below `self`, or [`Stamp::MIN`] itself.
    ///
    /// Turns a half-open upper bound into an inclusive one.
    fn predecessor(self) -> Self;
}

macro_rules! impl_integer_stamp {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Stamp for $ty {
                type Offset = $ty;

                const MIN: Self = <$ty>::MIN;

                #[inline]
                fn distance(self, earlier: Self) -> Self {
                    if self <= earlier {
                        0
                    } else {
                        self.saturating_sub(earlier)
                    }
                }

                #[inline]
                fn retreat(self, by: Self) -> Self {
                    self.saturating_sub(by)
                }

                #[inline]
                fn advance(self, by: Self) -> Self {
                    self.saturating_add(by)
                }

                #[inline]
                fn predecessor(self) -> Self {
                    self.saturating_sub(1)
                }
            }
        )*
    };
}

impl_integer_stamp!(i32, i64, u32, u64, usize);

impl Stamp for Duration {
    type Offset = Duration;

    const MIN: Self = Duration::ZERO;

    #[inline]
    fn distance(self, earlier: Self) -> Duration {
        self.saturating_sub(earlier)
    }

    #[inline]
    fn retreat(self, by: Duration) -> Self {
        self.saturating_sub(by)
    }

    #[inline]
    fn advance(self, by: Duration) -> Self {
        self.saturating_add(by)
    }

    #[inline]
    fn predecessor(self) -> Self {
        self.saturating_sub(Duration::from_nanos(1))
    }
}
