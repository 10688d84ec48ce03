//! Access mode classification.
//!
//! Open-mode strings are loosely formed (`"r"`, `"rb"`, `"br+"` all mean something to the OS).
//! [`normalize`] maps any of them onto one canonical [`AccessMode`] so capability checks are
//! plain set membership. The binary flag carries no meaning for classification, the plus flag
//! does.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::OnceLock;

use ahash::{HashSet, HashSetExt};

use crate::core::UnknownModeError;

const BINARY_FLAG: char = 'b';
const PLUS_FLAG: char = '+';

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModeKind {
    Read,
    Write,
    Append,
    CreateExclusive,
    Create,
}

impl ModeKind {
    pub const ALL: [ModeKind; 5] = [
        ModeKind::Read,
        ModeKind::Write,
        ModeKind::Append,
        ModeKind::CreateExclusive,
        ModeKind::Create,
    ];

    fn letter(self) -> &'static str {
        match self {
            ModeKind::Read => "r",
            ModeKind::Write => "w",
            ModeKind::Append => "a",
            ModeKind::CreateExclusive => "x",
            ModeKind::Create => "c",
        }
    }

    fn from_letter(letter: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.letter() == letter)
    }
}

// Indexed by kind, then [plain, binary, plus, binary+plus].
const TOKENS: [[&str; 4]; 5] = [
    ["r", "rb", "r+", "rb+"],
    ["w", "wb", "w+", "wb+"],
    ["a", "ab", "a+", "ab+"],
    ["x", "xb", "x+", "xb+"],
    ["c", "cb", "c+", "cb+"],
];

const READABLE: [&str; 12] = [
    "r", "rb", "r+", "rb+", "w+", "wb+", "a+", "ab+", "x+", "xb+", "c+", "cb+",
];

const WRITABLE: [&str; 18] = [
    "r+", "rb+", "w", "wb", "w+", "wb+", "a", "ab", "a+", "ab+", "x", "xb", "x+", "xb+", "c",
    "cb", "c+", "cb+",
];

const REWRITE: [&str; 4] = ["w", "wb", "w+", "wb+"];

const NON_SUITABLE: [&str; 4] = ["x", "xb", "x+", "xb+"];

/// One token of the closed open-mode vocabulary.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccessMode {
    kind: ModeKind,
    binary: bool,
    plus: bool,
}

impl AccessMode {
    pub const fn new(kind: ModeKind, binary: bool, plus: bool) -> Self {
        Self { kind, binary, plus }
    }

    /// All 20 tokens of the vocabulary.
    pub fn all() -> impl Iterator<Item = AccessMode> {
        ModeKind::ALL.into_iter().flat_map(|kind| {
            [(false, false), (true, false), (false, true), (true, true)]
                .into_iter()
                .map(move |(binary, plus)| AccessMode::new(kind, binary, plus))
        })
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn is_plus(&self) -> bool {
        self.plus
    }

    pub fn as_str(&self) -> &'static str {
        let column = usize::from(self.binary) + 2 * usize::from(self.plus);
        TOKENS[self.kind as usize][column]
    }

    /// The canonical form of this token: binary flag always set, plus flag kept.
    pub fn canonical(&self) -> AccessMode {
        AccessMode::new(self.kind, true, self.plus)
    }

    pub fn is_readable(&self) -> bool {
        ModeSet::Readable.contains(*self)
    }

    pub fn is_writable(&self) -> bool {
        ModeSet::Writable.contains(*self)
    }

    /// Opening with this mode truncates existing content.
    pub fn truncates(&self) -> bool {
        ModeSet::Rewrite.contains(*self)
    }

    /// Opening with this mode fails when the target already exists.
    pub fn is_exclusive(&self) -> bool {
        ModeSet::NonSuitable.contains(*self)
    }

    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self.kind {
            ModeKind::Read => {
                options.read(true).write(self.plus);
            }
            ModeKind::Write => {
                options.read(self.plus).write(true).create(true).truncate(true);
            }
            ModeKind::Append => {
                options.read(self.plus).append(true).create(true);
            }
            ModeKind::CreateExclusive => {
                options.read(self.plus).write(true).create_new(true);
            }
            ModeKind::Create => {
                options.read(self.plus).write(true).create(true);
            }
        }
        options
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: the input must be one of the 20 tokens verbatim.
/// Use [`normalize`] to accept loosely-formed strings.
impl FromStr for AccessMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessMode::all()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownModeError::new(s))
    }
}

/// Strips every binary and plus marker, then re-appends the binary flag and
/// (only if the input had one) the plus flag.
pub fn normalize(raw: &str) -> Result<AccessMode, UnknownModeError> {
    let plus = raw.contains(PLUS_FLAG);
    let clear: String = raw
        .chars()
        .filter(|c| *c != BINARY_FLAG && *c != PLUS_FLAG)
        .collect();

    ModeKind::from_letter(&clear)
        .map(|kind| AccessMode::new(kind, true, plus))
        .ok_or_else(|| UnknownModeError::new(raw))
}

/// Capability classification of the mode vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeSet {
    All,
    Readable,
    Writable,
    ReadableOnly,
    WritableOnly,
    ReadableAndWritable,
    Rewrite,
    NonSuitable,
}

struct ModeTables {
    all: HashSet<AccessMode>,
    readable: HashSet<AccessMode>,
    writable: HashSet<AccessMode>,
    readable_only: HashSet<AccessMode>,
    writable_only: HashSet<AccessMode>,
    readable_and_writable: HashSet<AccessMode>,
    rewrite: HashSet<AccessMode>,
    non_suitable: HashSet<AccessMode>,
}

fn from_tokens(tokens: &[&str]) -> HashSet<AccessMode> {
    AccessMode::all()
        .filter(|mode| tokens.contains(&mode.as_str()))
        .collect()
}

fn tables() -> &'static ModeTables {
    static TABLES: OnceLock<ModeTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let readable = from_tokens(&READABLE);
        let writable = from_tokens(&WRITABLE);

        let all = readable.union(&writable).copied().collect();
        let readable_only = readable.difference(&writable).copied().collect();
        let writable_only = writable.difference(&readable).copied().collect();
        let readable_and_writable = readable.intersection(&writable).copied().collect();

        ModeTables {
            all,
            readable,
            writable,
            readable_only,
            writable_only,
            readable_and_writable,
            rewrite: from_tokens(&REWRITE),
            non_suitable: from_tokens(&NON_SUITABLE),
        }
    })
}

impl ModeSet {
    /// Membership is unordered; never rely on iteration order.
    pub fn modes(self) -> &'static HashSet<AccessMode> {
        let tables = tables();
        match self {
            ModeSet::All => &tables.all,
            ModeSet::Readable => &tables.readable,
            ModeSet::Writable => &tables.writable,
            ModeSet::ReadableOnly => &tables.readable_only,
            ModeSet::WritableOnly => &tables.writable_only,
            ModeSet::ReadableAndWritable => &tables.readable_and_writable,
            ModeSet::Rewrite => &tables.rewrite,
            ModeSet::NonSuitable => &tables.non_suitable,
        }
    }

    pub fn contains(self, mode: AccessMode) -> bool {
        self.modes().contains(&mode)
    }

    /// Modes of this set that can be opened against a file that already exists.
    pub fn suitable(self) -> HashSet<AccessMode> {
        let excluded = ModeSet::NonSuitable.modes();
        let mut result = HashSet::with_capacity(self.modes().len());
        result.extend(self.modes().iter().filter(|m| !excluded.contains(m)));
        result
    }
}
