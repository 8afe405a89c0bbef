/// Errors raised by store composition and lookup.
///
/// Slice actions never fail: invalid input (unknown ids, absent data,
/// out-of-range indices) is a silent no-op. Only wiring mistakes surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SliceError {
    /// A store was requested outside of any `provide` scope for its state type.
    #[error("no store of `{state}` is provided in this scope; call it inside `provide`")]
    MissingProvider { state: &'static str },

    /// A slice was bound to a field, or a path overlapping a field, that a
    /// live slice already drives. `field` is the path already bound.
    #[error("field `{field}` is already bound to a {existing} slice, cannot bind a {requested} slice")]
    FieldCollision {
        field: &'static str,
        existing: &'static str,
        requested: &'static str,
    },
}

/// Result alias for slice wiring.
pub type SliceResult<T> = Result<T, SliceError>;
