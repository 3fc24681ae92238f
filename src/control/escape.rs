/*!
 * Tag Escape
 * catch/throw as result-channel propagation
 */

use super::tag::Tag;
use std::convert::Infallible;
use std::error::Error;
use std::fmt;
use tracing::trace;

/// In-flight throw: the tag and payload travelling outward to a matching catch
pub struct Escape<V> {
    tag: Tag,
    value: V,
}

impl<V> Escape<V> {
    pub fn new(tag: Tag, value: V) -> Self {
        Self { tag, value }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_parts(self) -> (Tag, V) {
        (self.tag, self.value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Escape<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Escape")
            .field("tag", &self.tag)
            .field("value", &self.value)
            .finish()
    }
}

/// Shown when an escape reaches the outermost caller unmatched
impl<V> fmt::Display for Escape<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uncaught throw {}", self.tag)
    }
}

impl<V: fmt::Debug> Error for Escape<V> {}

/// Abnormal exit of a body run under `catch`
///
/// `Throw` is the escape channel. `Raise` carries the caller's ordinary
/// errors, which `catch` never intercepts.
pub enum Unwind<V, E = Infallible> {
    Throw(Escape<V>),
    Raise(E),
}

impl<V, E> Unwind<V, E> {
    pub fn is_throw(&self) -> bool {
        matches!(self, Unwind::Throw(_))
    }

    /// The escape, if this unwind is one
    pub fn into_escape(self) -> Option<Escape<V>> {
        match self {
            Unwind::Throw(escape) => Some(escape),
            Unwind::Raise(_) => None,
        }
    }

    /// The ordinary error, if this unwind is one
    pub fn into_raised(self) -> Option<E> {
        match self {
            Unwind::Throw(_) => None,
            Unwind::Raise(err) => Some(err),
        }
    }
}

impl<V, E> From<Escape<V>> for Unwind<V, E> {
    fn from(escape: Escape<V>) -> Self {
        Unwind::Throw(escape)
    }
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for Unwind<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unwind::Throw(escape) => f.debug_tuple("Throw").field(escape).finish(),
            Unwind::Raise(err) => f.debug_tuple("Raise").field(err).finish(),
        }
    }
}

impl<V, E: fmt::Display> fmt::Display for Unwind<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unwind::Throw(escape) => fmt::Display::fmt(escape, f),
            Unwind::Raise(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<V: fmt::Debug, E: Error + 'static> Error for Unwind<V, E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Unwind::Throw(_) => None,
            Unwind::Raise(err) => Some(err),
        }
    }
}

/// Result of a body run under `catch`
pub type Completion<V, E = Infallible> = Result<V, Unwind<V, E>>;

/// Raise an escape carrying `value` towards the catch for `tag`
///
/// Always returns `Err`; the `Ok` type is free so the call fits any
/// expression position.
pub fn throw<T, V, R>(tag: &Tag, value: V) -> Result<T, R>
where
    R: From<Escape<V>>,
{
    trace!(tag = %tag, "throw");
    Err(R::from(Escape::new(tag.clone(), value)))
}

/// Run `body` and stop escapes thrown to `tag`
///
/// The body receives the tag. A matching escape yields its payload;
/// non-matching escapes and raised errors propagate unchanged.
pub fn catch<V, E, F>(tag: &Tag, body: F) -> Completion<V, E>
where
    F: FnOnce(&Tag) -> Completion<V, E>,
{
    match body(tag) {
        Ok(value) => Ok(value),
        Err(Unwind::Throw(escape)) if escape.tag().is(tag) => {
            trace!(tag = %tag, "throw caught");
            Ok(escape.into_value())
        }
        Err(other) => Err(other),
    }
}

/// `catch` under a freshly minted tag
pub fn catch_fresh<V, E, F>(body: F) -> Completion<V, E>
where
    F: FnOnce(&Tag) -> Completion<V, E>,
{
    let tag = Tag::new();
    catch(&tag, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_completion_returns_body_value() {
        let tag = Tag::new();
        let result: Completion<i32> = catch(&tag, |_| Ok(7));
        assert_eq!(result.ok(), Some(7));
    }

    #[test]
    fn test_matching_throw_returns_payload() {
        let tag = Tag::new();
        let result: Completion<i32> = catch(&tag, |t| throw(t, 42));
        assert_eq!(result.ok(), Some(42));
    }

    #[test]
    fn test_throw_skips_rest_of_body() {
        let tag = Tag::new();
        let mut reached = false;
        let result: Completion<&str> = catch(&tag, |t| {
            throw::<(), _, Unwind<&str>>(t, "early")?;
            reached = true;
            Ok("late")
        });
        assert_eq!(result.ok(), Some("early"));
        assert!(!reached);
    }

    #[test]
    fn test_mismatched_throw_propagates_unchanged() {
        let outer = Tag::new();
        let inner = Tag::new();
        let result: Completion<i32> = catch(&inner, |_| throw(&outer, 5));

        let escape = result.err().and_then(Unwind::into_escape).unwrap();
        assert!(escape.tag().is(&outer));
        assert_eq!(*escape.value(), 5);
    }

    #[test]
    fn test_raised_errors_pass_through() {
        let tag = Tag::new();
        let result: Completion<i32, String> =
            catch(&tag, |_| Err(Unwind::Raise("boom".to_string())));
        assert_eq!(result.err().and_then(Unwind::into_raised).as_deref(), Some("boom"));
    }

    #[test]
    fn test_uncaught_display() {
        let escape = Escape::new(Tag::labeled("finished"), 1);
        assert_eq!(escape.to_string(), "uncaught throw :finished");
    }
}
