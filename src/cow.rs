//! Copy-on-write helpers.
//!
//! A snapshot is an `Arc<S>` whose fields are themselves `Arc`s. Producing a
//! new snapshot clones only the outer struct, so every field the recipe does
//! not touch stays pointer-identical to the previous snapshot. Nested values
//! are copied lazily through [`write`].

use std::sync::Arc;

/// Produce the next snapshot by running `recipe` against a draft of `base`.
///
/// `base` is never modified. If `recipe` panics the draft is dropped and the
/// panic propagates.
pub fn produce<S, F>(base: &Arc<S>, recipe: F) -> Arc<S>
where
    S: Clone,
    F: FnOnce(&mut S),
{
    let mut draft = S::clone(base);
    recipe(&mut draft);
    Arc::new(draft)
}

/// Like [`produce`], but keeps the draft only if `recipe` succeeds.
pub fn try_produce<S, E, F>(base: &Arc<S>, recipe: F) -> Result<Arc<S>, E>
where
    S: Clone,
    F: FnOnce(&mut S) -> Result<(), E>,
{
    let mut draft = S::clone(base);
    recipe(&mut draft)?;
    Ok(Arc::new(draft))
}

/// Get a writable view of a shared value, cloning it first if any other
/// snapshot still references it.
#[inline]
pub fn write<T: Clone>(slot: &mut Arc<T>) -> &mut T {
    Arc::make_mut(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Doc {
        title: Arc<String>,
        tags: Arc<Vec<String>>,
    }

    fn doc() -> Arc<Doc> {
        Arc::new(Doc {
            title: Arc::new("draft".to_string()),
            tags: Arc::new(vec!["a".to_string()]),
        })
    }

    #[test]
    fn untouched_fields_are_shared() {
        let base = doc();
        let next = produce(&base, |d| write(&mut d.tags).push("b".to_string()));

        assert!(Arc::ptr_eq(&base.title, &next.title));
        assert!(!Arc::ptr_eq(&base.tags, &next.tags));
        assert_eq!(*base.tags, vec!["a".to_string()]);
        assert_eq!(*next.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn failed_recipe_leaves_base_alone() {
        let base = doc();
        let result: Result<_, &str> = try_produce(&base, |d| {
            d.title = Arc::new("changed".to_string());
            Err("nope")
        });

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(*base.title, "draft");
    }

    #[test]
    fn write_does_not_clone_unique_values() {
        let mut slot = Arc::new(vec![1, 2]);
        let before = Arc::as_ptr(&slot);
        write(&mut slot).push(3);
        assert_eq!(Arc::as_ptr(&slot), before);
    }
}
