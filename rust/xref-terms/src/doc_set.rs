//! Operations on ascending, de-duplicated document id sets.

use std::{cmp::Ordering, iter::Peekable};

use crate::term::DocId;

/// Creates an iterator over the set-union of two strictly ascending streams.
///
/// A value present in both inputs is yielded once. The merge is streaming and
/// holds one item of look-ahead per side.
pub fn union<T, L, R>(a: L, b: R) -> Union<L::IntoIter, R::IntoIter>
where
    T: Ord,
    L: IntoIterator<Item = T>,
    R: IntoIterator<Item = T>,
{
    Union {
        a: a.into_iter().peekable(),
        b: b.into_iter().peekable(),
    }
}

/// Iterator returned by [`union`].
pub struct Union<I: Iterator, J: Iterator> {
    a: Peekable<I>,
    b: Peekable<J>,
}

impl<T, I, J> Iterator for Union<I, J>
where
    T: Ord,
    I: Iterator<Item = T>,
    J: Iterator<Item = T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let ord = match (self.a.peek(), self.b.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(y),
        };
        match ord {
            Ordering::Less => self.a.next(),
            Ordering::Greater => self.b.next(),
            Ordering::Equal => {
                self.b.next();
                self.a.next()
            }
        }
    }
}

/// Unions `other` into `target` in place. `scratch` is reused across calls to
/// avoid an allocation per union.
pub fn union_into(target: &mut Vec<DocId>, other: &[DocId], scratch: &mut Vec<DocId>) {
    if other.is_empty() {
        return;
    }
    match (target.last(), other.first()) {
        (None, _) => {
            target.extend_from_slice(other);
            return;
        }
        (Some(&last), Some(&first)) if last < first => {
            target.extend_from_slice(other);
            return;
        }
        _ => {}
    }
    scratch.clear();
    scratch.extend(union(target.iter().copied(), other.iter().copied()));
    std::mem::swap(target, scratch);
}

/// Returns `true` if `docs` is strictly ascending.
pub fn is_strictly_ascending(docs: &[DocId]) -> bool {
    docs.windows(2).all(|w| w[0] < w[1])
}
