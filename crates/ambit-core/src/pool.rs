//! Slot arenas and typed identifiers.
//!
//! Every layer of the pipeline stores its nodes in a [`Pool`]: a
//! grow-only arena addressed by typed ids. An id prints as a kind tag
//! followed by six base-36 digits (`"D00001A"`) and parses back
//! through `FromStr`. Slot 0 of every pool is reserved; looking up
//! the reserved id, a removed id, or an id the pool never issued all
//! resolve to a sentinel end object, so navigation code can chain
//! lookups without optional types.

use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::Regex;

/// Shape shared by all identifier kinds: one tag letter, six base-36
/// digits.
static ID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z][0-9A-Z]{6}$").expect("pattern is valid"));

/// Error raised when an identifier string does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    /// The string is not a tag letter followed by six base-36 digits.
    BadFormat(String),
    /// The string is well-formed but tagged for another entity kind.
    WrongTag {
        /// Tag letter of the kind being parsed.
        expected: char,
        /// Tag letter found in the input.
        found: char,
    },
}

impl std::fmt::Display for IdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdParseError::BadFormat(input) => {
                write!(f, "Malformed identifier: {:?}", input)
            }
            IdParseError::WrongTag { expected, found } => {
                write!(f, "Identifier tag {:?} where {:?} expected", found, expected)
            }
        }
    }
}

impl std::error::Error for IdParseError {}

fn write_id(f: &mut std::fmt::Formatter<'_>, tag: char, slot: u32) -> std::fmt::Result {
    let mut digits = [0u8; 6];
    let mut rest = slot;
    for place in (0..6).rev() {
        let digit = (rest % 36) as u8;
        digits[place] = if digit < 10 { b'0' + digit } else { b'A' + digit - 10 };
        rest /= 36;
    }
    write!(f, "{}", tag)?;
    for &byte in &digits {
        write!(f, "{}", byte as char)?;
    }
    Ok(())
}

fn parse_id(tag: char, s: &str) -> Result<u32, IdParseError> {
    if !ID_SHAPE.is_match(s) {
        return Err(IdParseError::BadFormat(s.to_string()));
    }
    let Some(found) = s.chars().next() else {
        return Err(IdParseError::BadFormat(s.to_string()));
    };
    if found != tag {
        return Err(IdParseError::WrongTag {
            expected: tag,
            found,
        });
    }
    u32::from_str_radix(&s[1..], 36).map_err(|_| IdParseError::BadFormat(s.to_string()))
}

/// Identifier kinds a [`Pool`] can be addressed by.
pub trait PoolId: Copy + Eq {
    /// Tag letter leading the printed form.
    const TAG: char;

    /// Wraps a raw slot index.
    fn from_slot(slot: u32) -> Self;

    /// Raw slot index.
    fn slot(self) -> u32;

    /// The reserved sentinel id of this kind.
    fn end() -> Self {
        Self::from_slot(0)
    }
}

/// Identifier of a line in a document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocLineId(u32);

impl DocLineId {
    /// Id of the document's sentinel end line.
    pub const END: DocLineId = DocLineId(0);

    /// Raw slot index inside the document's pool.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// True for the sentinel end id.
    pub fn is_end(&self) -> bool {
        self.0 == 0
    }
}

impl PoolId for DocLineId {
    const TAG: char = 'D';

    fn from_slot(slot: u32) -> Self {
        DocLineId(slot)
    }

    fn slot(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for DocLineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_id(f, Self::TAG, self.0)
    }
}

impl std::str::FromStr for DocLineId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(Self::TAG, s).map(DocLineId)
    }
}

/// Identifier of a row in a fold-state overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteRowId(u32);

impl SiteRowId {
    /// Id of the overlay's sentinel end row.
    pub const END: SiteRowId = SiteRowId(0);

    /// Raw slot index inside the overlay's pool.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// True for the sentinel end id.
    pub fn is_end(&self) -> bool {
        self.0 == 0
    }
}

impl PoolId for SiteRowId {
    const TAG: char = 'S';

    fn from_slot(slot: u32) -> Self {
        SiteRowId(slot)
    }

    fn slot(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SiteRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_id(f, Self::TAG, self.0)
    }
}

impl std::str::FromStr for SiteRowId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(Self::TAG, s).map(SiteRowId)
    }
}

/// Identifier of a visible row in a scene projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneRowId(u32);

impl SceneRowId {
    /// Id of the projection's sentinel end row.
    pub const END: SceneRowId = SceneRowId(0);

    /// Raw slot index inside the projection's pool.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// True for the sentinel end id.
    pub fn is_end(&self) -> bool {
        self.0 == 0
    }
}

impl PoolId for SceneRowId {
    const TAG: char = 'R';

    fn from_slot(slot: u32) -> Self {
        SceneRowId(slot)
    }

    fn slot(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SceneRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_id(f, Self::TAG, self.0)
    }
}

impl std::str::FromStr for SceneRowId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(Self::TAG, s).map(SceneRowId)
    }
}

/// Grow-only arena with a sentinel end object in slot 0.
///
/// Slots are issued monotonically and never reused, so an id stays
/// unambiguous for the life of the pool even after its object is
/// removed.
pub struct Pool<I, T> {
    end: T,
    slots: Vec<Option<T>>,
    _id: PhantomData<I>,
}

impl<I: PoolId, T> Pool<I, T> {
    /// Creates a pool holding only the sentinel end object.
    pub fn new(end: T) -> Self {
        Pool {
            end,
            slots: vec![None],
            _id: PhantomData,
        }
    }

    /// Id the next [`Pool::create`] call will issue.
    pub fn next_id(&self) -> I {
        I::from_slot(self.slots.len() as u32)
    }

    /// Issues a fresh id and stores the object built by `factory`,
    /// which receives that id.
    pub fn create(&mut self, factory: impl FnOnce(I) -> T) -> I {
        let id = self.next_id();
        self.slots.push(Some(factory(id)));
        id
    }

    /// Looks up an object. The sentinel id, removed ids, and ids the
    /// pool never issued all resolve to the end object.
    pub fn get(&self, id: I) -> &T {
        match self.slots.get(id.slot() as usize) {
            Some(Some(object)) => object,
            _ => &self.end,
        }
    }

    /// Mutable lookup. The sentinel end object is immutable, so this
    /// returns `None` for it as well as for dead ids.
    pub(crate) fn get_mut(&mut self, id: I) -> Option<&mut T> {
        match self.slots.get_mut(id.slot() as usize) {
            Some(slot) => slot.as_mut(),
            None => None,
        }
    }

    /// The sentinel end object.
    pub fn end(&self) -> &T {
        &self.end
    }

    /// True when `id` addresses a live object. The sentinel is not a
    /// live object.
    pub fn contains(&self, id: I) -> bool {
        matches!(self.slots.get(id.slot() as usize), Some(Some(_)))
    }

    /// Tombstones a slot, after which the id resolves to the end
    /// object. Returns whether a live object was removed. The
    /// sentinel cannot be removed.
    pub fn remove(&mut self, id: I) -> bool {
        let slot = id.slot() as usize;
        if slot == 0 {
            return false;
        }
        match self.slots.get_mut(slot) {
            Some(entry) => entry.take().is_some(),
            None => false,
        }
    }

    /// Id of the first live object matching `predicate`, or the
    /// sentinel id when none matches.
    pub fn search(&self, mut predicate: impl FnMut(&T) -> bool) -> I {
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(object) = entry {
                if predicate(object) {
                    return I::from_slot(slot as u32);
                }
            }
        }
        I::end()
    }

    /// Number of live objects. The sentinel is not counted.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_some()).count()
    }

    /// True when no live objects remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live `(id, object)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry.as_ref().map(|object| (I::from_slot(slot as u32), object))
        })
    }
}

impl<I: PoolId, T: std::fmt::Debug> std::fmt::Debug for Pool<I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("len", &self.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}
