//! Triple codec.
//!
//! A triple is four opaque byte strings: subject, predicate, object and a
//! provenance/value payload. Only the first three take part in keys.
//!
//! # Key Format
//!
//! ```text
//! S 0x00 P 0x00 O 0x00
//! ```
//!
//! Every field is followed by a zero terminator, so a prefix made of whole
//! leading fields can never match across a field boundary (`"ab"` vs
//! `"a","b"`). Fields must not contain the terminator byte.

use std::fmt;

/// Terminator written after every key field.
pub const KEY_DELIMITER: u8 = 0x00;

/// A graph node name. Vertices have no storage of their own.
pub type Vertex = Vec<u8>;

/// Physical field ordering of one of the three sub-keyspaces.
///
/// The discriminant is the tag byte that prefixes every physical key of the
/// sub-keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Index {
    /// Subject leads. Serves queries fixing S, or S+P.
    Spo = 0,
    /// Object leads. Serves queries fixing O, or O+P.
    Ops = 1,
    /// Predicate leads. Serves queries fixing P, or P+S.
    Pso = 2,
}

impl Index {
    /// All indexes, in tag order.
    pub const ALL: [Self; 3] = [Self::Spo, Self::Ops, Self::Pso];

    /// The tag byte prefixing keys of this sub-keyspace.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Prefix `key` with this index's tag byte.
    #[must_use]
    pub fn tagged(self, key: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(key.len() + 1);
        bytes.push(self.tag());
        bytes.extend_from_slice(key);
        bytes
    }
}

impl TryFrom<u8> for Index {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Spo),
            1 => Ok(Self::Ops),
            2 => Ok(Self::Pso),
            _ => Err(value),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spo => write!(f, "SPO"),
            Self::Ops => write!(f, "OPS"),
            Self::Pso => write!(f, "PSO"),
        }
    }
}

/// A subject/predicate/object triple with its provenance payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Triple {
    pub s: Vec<u8>,
    pub p: Vec<u8>,
    pub o: Vec<u8>,
    pub v: Vec<u8>,
}

impl Triple {
    #[must_use]
    pub fn new(
        s: impl Into<Vec<u8>>,
        p: impl Into<Vec<u8>>,
        o: impl Into<Vec<u8>>,
        v: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            s: s.into(),
            p: p.into(),
            o: o.into(),
            v: v.into(),
        }
    }

    /// Build a triple from up to four strings in S, P, O, V order.
    ///
    /// Missing trailing fields are empty; anything past the fourth is ignored.
    #[must_use]
    pub fn from_strs(fields: &[&str]) -> Self {
        let field = |i: usize| fields.get(i).map(|f| f.as_bytes().to_vec()).unwrap_or_default();
        Self {
            s: field(0),
            p: field(1),
            o: field(2),
            v: field(3),
        }
    }

    /// A pattern that fixes only the leading (subject-position) field.
    #[must_use]
    pub fn pattern(s: impl Into<Vec<u8>>) -> Self {
        Self {
            s: s.into(),
            ..Self::default()
        }
    }

    /// Decode a physical key (without tag byte) and its stored value.
    ///
    /// # Panics
    ///
    /// Panics if the key does not hold three terminated fields. Keys are only
    /// ever produced by [`Triple::key`], so this is a broken invariant rather
    /// than bad input.
    #[must_use]
    pub fn decode(key: &[u8], value: &[u8]) -> Self {
        let mut fields = key.split(|b| *b == KEY_DELIMITER);
        let mut next_field = |name: &str| -> Vec<u8> {
            match fields.next() {
                Some(field) => field.to_vec(),
                None => panic!("key {key:?} is missing its {name} field"),
            }
        };
        let s = next_field("subject");
        let p = next_field("predicate");
        let o = next_field("object");
        // A terminated object leaves an empty trailing split.
        assert!(
            key.last() == Some(&KEY_DELIMITER) && fields.next().is_some(),
            "key {key:?} is missing its object terminator"
        );
        Self {
            s,
            p,
            o,
            v: value.to_vec(),
        }
    }

    /// Full physical key: every field followed by a terminator.
    ///
    /// # Panics
    ///
    /// Panics if S, P or O contains the terminator byte.
    #[must_use]
    pub fn key(&self) -> Vec<u8> {
        self.assert_well_formed();
        let mut key = Vec::with_capacity(self.s.len() + self.p.len() + self.o.len() + 3);
        for field in [&self.s, &self.p, &self.o] {
            key.extend_from_slice(field);
            key.push(KEY_DELIMITER);
        }
        key
    }

    /// The stored value.
    #[must_use]
    pub fn val(&self) -> &[u8] {
        &self.v
    }

    /// Inclusive lower scan bound for this triple used as a pattern.
    ///
    /// Empty when the subject is empty; otherwise the full key.
    #[must_use]
    pub fn start_key(&self) -> Vec<u8> {
        if self.s.is_empty() {
            return Vec::new();
        }
        self.key()
    }

    /// Prefix every match of this pattern must carry.
    ///
    /// This is the key with trailing terminators stripped down to the single
    /// terminator after the last non-empty field. An empty subject still
    /// contributes its terminator, so an all-empty pattern yields `[0x00]`
    /// and matches only empty-subject keys.
    #[must_use]
    pub fn key_prefix(&self) -> Vec<u8> {
        let mut prefix = self.key();
        let Some(last) = prefix.iter().rposition(|b| *b != KEY_DELIMITER) else {
            return vec![KEY_DELIMITER];
        };
        prefix.truncate(last + 2);
        prefix
    }

    /// Reorder fields for `index`.
    ///
    /// `Spo` is the identity, `Ops` swaps S and O, `Pso` swaps S and P. Each
    /// permutation is its own inverse, so the same call maps a triple into an
    /// index's orientation and back out of it.
    #[must_use]
    pub fn permute(mut self, index: Index) -> Self {
        match index {
            Index::Spo => {}
            Index::Ops => std::mem::swap(&mut self.s, &mut self.o),
            Index::Pso => std::mem::swap(&mut self.s, &mut self.p),
        }
        self
    }

    /// True if none of the key fields contains the terminator byte.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        [&self.s, &self.p, &self.o]
            .iter()
            .all(|field| !field.contains(&KEY_DELIMITER))
    }

    fn assert_well_formed(&self) {
        assert!(
            self.is_well_formed(),
            "triple {self} contains the key delimiter byte"
        );
    }

    /// The four fields as (lossy) UTF-8 strings.
    #[must_use]
    pub fn strings(&self) -> [String; 4] {
        [&self.s, &self.p, &self.o, &self.v].map(|f| String::from_utf8_lossy(f).into_owned())
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [s, p, o, v] = self.strings();
        write!(f, "<'{s}','{p}','{o}','{v}'>")
    }
}
