/*!
 * Escape Tags
 * Unforgeable identity tokens pairing a throw with its catch
 */

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Allocation backing a freshly minted tag
struct Anchor;

/// Identity-compared escape tag
///
/// Two tags are equal only when they share the same allocation. Tags built
/// independently never match, whatever their content or label.
#[derive(Clone)]
pub struct Tag {
    anchor: Arc<dyn Any + Send + Sync>,
    label: Option<Arc<str>>,
}

impl Tag {
    /// Mint a fresh tag
    pub fn new() -> Self {
        Self {
            anchor: Arc::new(Anchor),
            label: None,
        }
    }

    /// Mint a fresh tag with a label used only for display
    pub fn labeled(label: impl Into<Arc<str>>) -> Self {
        Self {
            anchor: Arc::new(Anchor),
            label: Some(label.into()),
        }
    }

    /// Use a caller-owned shared value as the tag
    ///
    /// Tags built from clones of the same `Arc` are identical; tags built
    /// from distinct allocations are not, even when the values compare equal.
    pub fn from_shared<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        let anchor: Arc<dyn Any + Send + Sync> = value.clone();
        Self {
            anchor,
            label: None,
        }
    }

    /// Reference equality
    #[inline]
    pub fn is(&self, other: &Tag) -> bool {
        self.addr() == other.addr()
    }

    /// The value this tag was built from, if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.anchor.downcast_ref::<T>()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[inline]
    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.anchor) as *const ()
    }
}

impl Default for Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.addr() as usize).hash(state);
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("addr", &self.addr())
            .field("label", &self.label)
            .finish()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, ":{}", label),
            None => write!(f, "#<Tag:{:p}>", self.addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tags_are_distinct() {
        let a = Tag::new();
        let b = Tag::new();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_labels_do_not_affect_identity() {
        let a = Tag::labeled("done");
        let b = Tag::labeled("done");
        assert!(!a.is(&b));
        assert_eq!(a.to_string(), ":done");
    }

    #[test]
    fn test_shared_values_compare_by_allocation() {
        let first = Arc::new(String::from("key"));
        let second = Arc::new(String::from("key"));

        assert!(Tag::from_shared(&first).is(&Tag::from_shared(&first.clone())));
        assert!(!Tag::from_shared(&first).is(&Tag::from_shared(&second)));
        assert_eq!(
            Tag::from_shared(&first).downcast_ref::<String>().map(String::as_str),
            Some("key")
        );
    }
}
