//! Field bindings between a composed state and its slices.
//!
//! A store's state is a plain struct that embeds one state value per slice.
//! Each slice handle is given a [`Lens`] that picks its own field out of that
//! struct, so handles for different slices can share one store.

use std::fmt;

/// Name of the lens over the whole state.
pub(crate) const ROOT: &str = "<root>";

/// A named accessor from a composed state `S` to one of its parts `T`.
///
/// Build one with the [`lens!`](crate::lens!) macro:
///
/// ```
/// use slicekit::{lens, DataState, Lens};
///
/// #[derive(Clone)]
/// struct App {
///     user: DataState<String>,
/// }
///
/// let user: Lens<App, DataState<String>> = lens!(App, user);
/// assert_eq!(user.name(), "user");
/// ```
pub struct Lens<S, T> {
    name: &'static str,
    view: fn(&S) -> &T,
    view_mut: fn(&mut S) -> &mut T,
}

impl<S, T> Lens<S, T> {
    pub const fn new(
        name: &'static str,
        view: fn(&S) -> &T,
        view_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        Self {
            name,
            view,
            view_mut,
        }
    }

    /// The field name this lens is bound to.
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn get<'a>(&self, state: &'a S) -> &'a T {
        (self.view)(state)
    }

    #[inline]
    pub fn get_mut<'a>(&self, state: &'a mut S) -> &'a mut T {
        (self.view_mut)(state)
    }
}

impl<S> Lens<S, S> {
    /// Lens over the whole state, for stores holding a single slice.
    pub fn root() -> Self {
        Self::new(ROOT, |state| state, |state| state)
    }
}

impl<S, T> Clone for Lens<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for Lens<S, T> {}

impl<S, T> fmt::Debug for Lens<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lens").field(&self.name).finish()
    }
}

/// Build a [`Lens`] for a (possibly nested) field of a state struct.
///
/// `lens!(App, todos)` or `lens!(App, board.order)`.
#[macro_export]
macro_rules! lens {
    ($state:ty, $($field:ident).+) => {
        $crate::Lens::<$state, _>::new(
            stringify!($($field).+),
            |state: &$state| &state.$($field).+,
            |state: &mut $state| &mut state.$($field).+,
        )
    };
}
