//! `repeat`: keyed lists.
//!
//! # How It Works
//!
//! Each item renders into its own nested child part. On update, items are
//! matched to the previous render by key:
//!
//! 1. Old items whose key is gone are removed.
//!
//! 2. Among the reused items, the longest run whose old order already
//!    matches the new order stays where it is.
//!
//! 3. Walking the new list from the end, every other reused item is moved in
//!    front of its successor and every new item is created there.
//!
//! Reused items keep their nodes, so only values that actually changed are
//! committed.

use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use super::{Directive, DirectivePart, DirectiveResult};
use crate::error::RenderError;
use crate::part::{ChildPart, ChildState, PartKind};
use crate::value::Value;

/// Identity of an item across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepeatKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for RepeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatKey::Int(key) => write!(f, "{key}"),
            RepeatKey::Str(key) => f.write_str(key),
        }
    }
}

impl From<i64> for RepeatKey {
    fn from(key: i64) -> Self {
        RepeatKey::Int(key)
    }
}

impl From<i32> for RepeatKey {
    fn from(key: i32) -> Self {
        RepeatKey::Int(key.into())
    }
}

impl From<u32> for RepeatKey {
    fn from(key: u32) -> Self {
        RepeatKey::Int(key.into())
    }
}

impl From<usize> for RepeatKey {
    fn from(key: usize) -> Self {
        RepeatKey::Int(key as i64)
    }
}

impl From<&str> for RepeatKey {
    fn from(key: &str) -> Self {
        RepeatKey::Str(key.to_owned())
    }
}

impl From<String> for RepeatKey {
    fn from(key: String) -> Self {
        RepeatKey::Str(key)
    }
}

/// Keyed items of one render.
pub struct RepeatArgs {
    items: Vec<(RepeatKey, Value)>,
}

/// Renders a keyed list into a child part. See [`repeat`].
pub struct Repeat {
    keys: Vec<RepeatKey>,
}

impl Directive for Repeat {
    type Args = RepeatArgs;
    const NAME: &'static str = "repeat";

    fn create(part: &DirectivePart<'_>) -> Result<Self, RenderError> {
        if part.kind() != PartKind::Child {
            return Err(RenderError::DirectiveMisuse {
                directive: Self::NAME,
                part: part.kind(),
            });
        }
        Ok(Self { keys: Vec::new() })
    }

    fn update(&mut self, part: &mut DirectivePart<'_>, args: &RepeatArgs) -> Result<Value, RenderError> {
        let mut positions = IndexMap::with_capacity(args.items.len());
        for (index, (key, _)) in args.items.iter().enumerate() {
            if positions.insert(key, index).is_some() {
                return Err(RenderError::DuplicateKey(key.to_string()));
            }
        }

        let kind = part.kind();
        let child = part.child_mut().ok_or(RenderError::DirectiveMisuse {
            directive: Self::NAME,
            part: kind,
        })?;

        let mut previous = child.take_list();
        if previous.len() != self.keys.len() {
            // The list was rendered by something else; start over.
            previous.drain(..).for_each(|item| item.remove());
            self.keys.clear();
        }
        let keys = std::mem::take(&mut self.keys);

        match reconcile(child, &keys, previous, &args.items) {
            Ok(parts) => {
                trace!(items = parts.len(), "reconciled keyed list");
                child.set_list(parts);
                self.keys = args.items.iter().map(|(key, _)| key.clone()).collect();
                Ok(Value::NoChange)
            }
            Err((parts, error)) => {
                // Keys stay cleared so the next render rebuilds from scratch.
                child.set_list(parts);
                Err(error)
            }
        }
    }
}

type Reconciled = Result<Vec<ChildPart>, (Vec<ChildPart>, RenderError)>;

fn reconcile(
    child: &mut ChildState,
    old_keys: &[RepeatKey],
    previous: Vec<ChildPart>,
    items: &[(RepeatKey, Value)],
) -> Reconciled {
    let old_index: IndexMap<&RepeatKey, usize> =
        old_keys.iter().enumerate().map(|(i, key)| (key, i)).collect();
    let sources: Vec<Option<usize>> = items
        .iter()
        .map(|(key, _)| old_index.get(key).copied())
        .collect();

    let mut used = vec![false; previous.len()];
    for &source in sources.iter().flatten() {
        used[source] = true;
    }
    let mut slots: Vec<Option<ChildPart>> = previous
        .into_iter()
        .zip(used)
        .map(|(item, used)| {
            if !used {
                item.remove();
                return None;
            }
            Some(item)
        })
        .collect();

    let stable = stable_positions(&sources);
    let mut parts: Vec<ChildPart> = Vec::with_capacity(items.len());
    for (index, (_, value)) in items.iter().enumerate().rev() {
        let next = parts.last();
        let placed = match sources[index].and_then(|old| slots[old].take()) {
            Some(item) if stable[index] => Ok(item),
            Some(item) => child.move_item(&item, next).map(|()| item),
            None => child.insert_item(next),
        };
        let outcome = placed.and_then(|item| {
            let committed = item.set_value(value.clone());
            parts.push(item);
            committed
        });
        if let Err(error) = outcome {
            parts.reverse();
            parts.extend(slots.into_iter().flatten());
            return Err((parts, error));
        }
    }
    parts.reverse();
    Ok(parts)
}

/// Mark the entries of `sources` that form a longest increasing subsequence
/// of old positions. Those items can stay where they are.
fn stable_positions(sources: &[Option<usize>]) -> Vec<bool> {
    // (old position, index into sources) of the smallest tail per length
    let mut tails: Vec<(usize, usize)> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; sources.len()];

    for (index, source) in sources.iter().enumerate() {
        let Some(old) = *source else { continue };
        let at = tails.partition_point(|&(tail, _)| tail < old);
        previous[index] = at.checked_sub(1).map(|p| tails[p].1);
        if at == tails.len() {
            tails.push((old, index));
        } else {
            tails[at] = (old, index);
        }
    }

    let mut stable = vec![false; sources.len()];
    let mut cursor = tails.last().map(|&(_, index)| index);
    while let Some(index) = cursor {
        stable[index] = true;
        cursor = previous[index];
    }
    stable
}

/// Render `items` as a keyed list.
///
/// `key` gives each item its identity and `template` renders it; both
/// receive the item's index.
///
/// # Example
///
/// ```rust,ignore
/// let rows = repeat(users, |user, _| user.id, |user, _| html!("<li>{}</li>", user.name));
/// render(html!("<ul>{}</ul>", rows), &container, &RenderOptions::default())?;
/// ```
pub fn repeat<T, K, V>(
    items: impl IntoIterator<Item = T>,
    key: impl Fn(&T, usize) -> K,
    template: impl Fn(T, usize) -> V,
) -> DirectiveResult
where
    K: Into<RepeatKey>,
    V: Into<Value>,
{
    let items = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let key = key(&item, index).into();
            (key, template(item, index).into())
        })
        .collect();
    DirectiveResult::new::<Repeat>(RepeatArgs { items })
}
