//! A lightweight, text-level SMILES toolkit.
//!
//! [`SmilesToolkit`] validates SMILES syntax and works on the token stream of
//! each disconnected fragment. It has no molecular graph model: "canonical"
//! text only orders fragments (largest first, then lexically), so `OCC` and
//! `CCO` stay distinct. Operations that need real chemistry (tautomers,
//! explicit hydrogens, Murcko scaffolds, BRICS/RECAP) report
//! [`ToolkitError::Unsupported`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngExt, SeedableRng};

use crate::toolkit::{FragmentMethod, Toolkit, ToolkitError, ToolkitResult, Transform};

/// Element symbols accepted inside brackets.
const ELEMENTS: &[&str] = &[
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Aromatic symbols accepted inside brackets.
const AROMATIC_BRACKET: &[&str] = &["se", "as", "te", "b", "c", "n", "o", "p", "s"];

/// Organic-subset symbols usable without brackets, with their lowest normal valence.
const ORGANIC: &[(&str, u32)] = &[
    ("Cl", 1),
    ("Br", 1),
    ("B", 3),
    ("C", 4),
    ("N", 3),
    ("O", 2),
    ("P", 3),
    ("S", 2),
    ("F", 1),
    ("I", 1),
];

const AROMATIC_ORGANIC: &[&str] = &["b", "c", "n", "o", "p", "s"];

/// Elements that take a hydrogen when a negative charge is removed.
const PROTONATABLE: &[&str] = &["N", "O", "S", "P", "n", "o", "s"];

/// Tetrahedral centres considered when enumerating stereoisomers.
const MAX_STEREO_CENTRES: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Chirality {
    None,
    /// `@`
    Anticlockwise,
    /// `@@`
    Clockwise,
    /// `@TH1`, `@SP2`, ...
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BracketAtom {
    isotope: Option<u16>,
    symbol: String,
    chirality: Chirality,
    hydrogens: u8,
    charge: i8,
    class: Option<u16>,
}

impl BracketAtom {
    fn is_aromatic(&self) -> bool {
        self.symbol.starts_with(|c: char| c.is_ascii_lowercase())
    }

    /// The organic-subset form of this atom, when it is equivalent.
    fn organic_form(&self, bond_sum: u32) -> Option<&'static str> {
        if self.isotope.is_some()
            || self.class.is_some()
            || self.charge != 0
            || self.chirality != Chirality::None
        {
            return None;
        }
        ORGANIC.iter().find(|(symbol, _)| *symbol == self.symbol).and_then(|&(symbol, valence)| {
            (u32::from(self.hydrogens) + bond_sum == valence).then_some(symbol)
        })
    }
}

impl fmt::Display for BracketAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if let Some(isotope) = self.isotope {
            write!(f, "{isotope}")?;
        }
        f.write_str(&self.symbol)?;
        match &self.chirality {
            Chirality::None => {}
            Chirality::Anticlockwise => f.write_str("@")?,
            Chirality::Clockwise => f.write_str("@@")?,
            Chirality::Other(class) => write!(f, "@{class}")?,
        }
        match self.hydrogens {
            0 => {}
            1 => f.write_str("H")?,
            n => write!(f, "H{n}")?,
        }
        match self.charge {
            0 => {}
            1 => f.write_str("+")?,
            -1 => f.write_str("-")?,
            n if n > 0 => write!(f, "+{n}")?,
            n => write!(f, "-{}", -i16::from(n))?,
        }
        if let Some(class) = self.class {
            write!(f, ":{class}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    /// Organic-subset atom or `*`.
    Atom(&'static str),
    Bracket(BracketAtom),
    Bond(char),
    Open,
    Close,
    Ring(u8),
}

impl Token {
    fn is_atom(&self) -> bool {
        matches!(self, Self::Atom(_) | Self::Bracket(_))
    }

    fn is_aromatic(&self) -> bool {
        match self {
            Self::Atom(symbol) => AROMATIC_ORGANIC.contains(symbol),
            Self::Bracket(atom) => atom.is_aromatic(),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(symbol) => f.write_str(symbol),
            Self::Bracket(atom) => atom.fmt(f),
            Self::Bond(c) => write!(f, "{c}"),
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
            Self::Ring(n) if *n < 10 => write!(f, "{n}"),
            Self::Ring(n) => write!(f, "%{n:02}"),
        }
    }
}

/// One connected component, stored as validated tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Fragment {
    tokens: Vec<Token>,
    atoms: usize,
}

impl Fragment {
    fn text(&self) -> String {
        self.to_string()
    }

    /// Bond-order sum per atom, in atom order. Aromatic bonds count 1.5.
    fn bond_sums(&self) -> Vec<f64> {
        let mut sums = Vec::with_capacity(self.atoms);
        let mut aromatic = Vec::with_capacity(self.atoms);
        let mut prev: Option<usize> = None;
        let mut branches: Vec<Option<usize>> = Vec::new();
        let mut pending: Option<char> = None;
        let mut rings: BTreeMap<u8, (usize, Option<char>)> = BTreeMap::new();

        let order = |bond: Option<char>, a: bool, b: bool| match bond {
            Some('=') => 2.0,
            Some('#') => 3.0,
            Some('$') => 4.0,
            Some(':') => 1.5,
            Some(_) => 1.0,
            None if a && b => 1.5,
            None => 1.0,
        };

        for token in &self.tokens {
            match token {
                Token::Atom(_) | Token::Bracket(_) => {
                    let index = sums.len();
                    sums.push(0.0);
                    aromatic.push(token.is_aromatic());
                    if let Some(p) = prev {
                        let o = order(pending, aromatic[p], aromatic[index]);
                        sums[p] += o;
                        sums[index] += o;
                    }
                    pending = None;
                    prev = Some(index);
                }
                Token::Bond(c) => pending = Some(*c),
                Token::Open => branches.push(prev),
                Token::Close => prev = branches.pop().flatten(),
                Token::Ring(n) => {
                    if let Some(current) = prev {
                        if let Some((other, bond)) = rings.remove(n) {
                            let o = order(pending.or(bond), aromatic[other], aromatic[current]);
                            sums[other] += o;
                            sums[current] += o;
                        } else {
                            rings.insert(*n, (current, pending));
                        }
                    }
                    pending = None;
                }
            }
        }
        sums
    }

    /// Rewrites bracket atoms that have an equivalent organic-subset form.
    fn simplified(mut self) -> Self {
        let sums = self.bond_sums();
        let mut atom_index = 0;
        for token in &mut self.tokens {
            if !token.is_atom() {
                continue;
            }
            if let Token::Bracket(atom) = token {
                let sum = sums[atom_index];
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let organic = (sum.fract() == 0.0)
                    .then(|| atom.organic_form(sum as u32))
                    .flatten();
                if let Some(symbol) = organic {
                    *token = Token::Atom(symbol);
                }
            }
            atom_index += 1;
        }
        self
    }

    fn neutralized(mut self) -> ToolkitResult<Self> {
        for token in &mut self.tokens {
            if let Token::Bracket(atom) = token {
                if atom.charge == 1 && atom.hydrogens > 0 {
                    atom.charge = 0;
                    atom.hydrogens -= 1;
                } else if atom.charge == -1 && PROTONATABLE.contains(&atom.symbol.as_str()) {
                    let Some(hydrogens) = atom.hydrogens.checked_add(1) else {
                        return Err(ToolkitError::Failed(format!("cannot protonate {atom}")));
                    };
                    atom.charge = 0;
                    atom.hydrogens = hydrogens;
                }
            }
        }
        Ok(self.simplified())
    }

    fn without_stereo(mut self) -> Self {
        self.tokens.retain(|t| !matches!(t, Token::Bond('/' | '\\')));
        for token in &mut self.tokens {
            if let Token::Bracket(atom) = token {
                atom.chirality = Chirality::None;
            }
        }
        self.simplified()
    }

    /// A straight chain: no branches, rings or stereo, so it reads the same reversed.
    fn is_reversible_chain(&self) -> bool {
        self.tokens.iter().all(|t| match t {
            Token::Atom(_) | Token::Bond('-' | '=' | '#' | '$' | ':') => true,
            Token::Bracket(atom) => atom.chirality == Chirality::None,
            _ => false,
        })
    }

    fn reversed(&self) -> Self {
        Self { tokens: self.tokens.iter().rev().cloned().collect(), atoms: self.atoms }
    }

    /// Token positions of `@`/`@@` centres.
    fn stereo_centres(&self) -> impl Iterator<Item = usize> + '_ {
        self.tokens.iter().enumerate().filter_map(|(i, t)| match t {
            Token::Bracket(BracketAtom {
                chirality: Chirality::Anticlockwise | Chirality::Clockwise,
                ..
            }) => Some(i),
            _ => None,
        })
    }

    fn invert_centre(&mut self, position: usize) {
        if let Some(Token::Bracket(atom)) = self.tokens.get_mut(position) {
            atom.chirality = match atom.chirality {
                Chirality::Anticlockwise => Chirality::Clockwise,
                Chirality::Clockwise => Chirality::Anticlockwise,
                ref other => other.clone(),
            };
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tokens.iter().try_for_each(|t| t.fmt(f))
    }
}

/// A molecule as an ordered list of disconnected fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmilesMolecule {
    fragments: Vec<Fragment>,
}

impl SmilesMolecule {
    /// Number of disconnected fragments.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    fn atom_count(&self) -> usize {
        self.fragments.iter().map(|f| f.atoms).sum()
    }

    /// Fragments largest first, ties broken by text.
    fn canonical_fragments(&self) -> Vec<(&Fragment, String)> {
        let mut ordered: Vec<_> = self.fragments.iter().map(|f| (f, f.text())).collect();
        ordered.sort_by(|(a, a_text), (b, b_text)| {
            (Reverse(a.atoms), a_text).cmp(&(Reverse(b.atoms), b_text))
        });
        ordered
    }

    fn canonical_text(&self) -> String {
        self.canonical_fragments().into_iter().map(|(_, text)| text).collect::<Vec<_>>().join(".")
    }

    fn largest_fragment(&self) -> Self {
        let fragments = self.canonical_fragments().first().map(|(f, _)| (*f).clone());
        Self { fragments: fragments.into_iter().collect() }
    }

    fn map_fragments(&self, f: impl Fn(Fragment) -> Fragment) -> Self {
        Self { fragments: self.fragments.iter().cloned().map(f).collect() }
    }

    fn try_map_fragments(
        &self,
        f: impl Fn(Fragment) -> ToolkitResult<Fragment>,
    ) -> ToolkitResult<Self> {
        let fragments = self.fragments.iter().cloned().map(f).collect::<ToolkitResult<_>>()?;
        Ok(Self { fragments })
    }
}

impl fmt::Display for SmilesMolecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            fragment.fmt(f)?;
        }
        Ok(())
    }
}

/// Compiled textual query: matched as a substring of each fragment's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmilesQuery {
    fragments: Vec<String>,
}

/// The bundled toolkit. Stateless and freely shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmilesToolkit;

impl SmilesToolkit {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Toolkit for SmilesToolkit {
    type Molecule = SmilesMolecule;
    type Query = SmilesQuery;

    fn parse(&self, text: &str) -> ToolkitResult<SmilesMolecule> {
        parse_smiles(text)
    }

    fn canonical_text(&self, mol: &SmilesMolecule) -> ToolkitResult<String> {
        Ok(mol.canonical_text())
    }

    fn atom_count(&self, mol: &SmilesMolecule) -> usize {
        mol.atom_count()
    }

    fn transform(
        &self,
        mol: &SmilesMolecule,
        transform: Transform,
    ) -> ToolkitResult<SmilesMolecule> {
        match transform {
            Transform::LargestFragment => Ok(mol.largest_fragment()),
            Transform::Neutralize => mol.try_map_fragments(Fragment::neutralized),
            Transform::RemoveStereo => Ok(mol.map_fragments(Fragment::without_stereo)),
            Transform::Standardize => {
                Ok(mol.try_map_fragments(Fragment::neutralized)?.largest_fragment())
            }
            Transform::Tautomer => {
                Err(ToolkitError::Unsupported("tautomer canonicalization".into()))
            }
            Transform::AddHydrogens => Err(ToolkitError::Unsupported("explicit hydrogens".into())),
        }
    }

    fn fragments(
        &self,
        mol: &SmilesMolecule,
        method: FragmentMethod,
    ) -> ToolkitResult<Vec<SmilesMolecule>> {
        match method {
            FragmentMethod::Components => {
                if mol.fragments.len() < 2 {
                    return Ok(Vec::new());
                }
                let mut seen = AHashSet::new();
                Ok(mol
                    .canonical_fragments()
                    .into_iter()
                    .filter(|(_, text)| seen.insert(text.clone()))
                    .map(|(fragment, _)| SmilesMolecule { fragments: vec![fragment.clone()] })
                    .collect())
            }
            FragmentMethod::Brics | FragmentMethod::Recap => {
                Err(ToolkitError::Unsupported(format!("{method} fragmentation")))
            }
        }
    }

    fn stereoisomers(
        &self,
        mol: &SmilesMolecule,
        limit: usize,
    ) -> ToolkitResult<Vec<SmilesMolecule>> {
        let centres: Vec<(usize, usize)> = mol
            .fragments
            .iter()
            .enumerate()
            .flat_map(|(f, fragment)| fragment.stereo_centres().map(move |p| (f, p)))
            .take(MAX_STEREO_CENTRES)
            .collect();
        if centres.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut seen = AHashSet::new();
        seen.insert(mol.canonical_text());
        let mut isomers = Vec::new();
        let combinations = 1_u64 << centres.len();
        for mask in 1..combinations {
            if isomers.len() >= limit {
                break;
            }
            let mut isomer = mol.clone();
            for (bit, &(f, position)) in centres.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    isomer.fragments[f].invert_centre(position);
                }
            }
            if seen.insert(isomer.canonical_text()) {
                isomers.push(isomer);
            }
        }
        Ok(isomers)
    }

    fn random_text(&self, mol: &SmilesMolecule, seed: u64) -> ToolkitResult<String> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut fragments = mol.fragments.clone();
        fragments.shuffle(&mut rng);
        for fragment in &mut fragments {
            if fragment.is_reversible_chain() && rng.random_bool(0.5) {
                *fragment = fragment.reversed();
            }
        }
        Ok(SmilesMolecule { fragments }.to_string())
    }

    fn scaffold(&self, _mol: &SmilesMolecule) -> ToolkitResult<Option<SmilesMolecule>> {
        Err(ToolkitError::Unsupported("Murcko scaffolds".into()))
    }

    fn compile_query(&self, text: &str) -> ToolkitResult<SmilesQuery> {
        let mol = parse_smiles(text)?;
        Ok(SmilesQuery { fragments: mol.fragments.iter().map(Fragment::text).collect() })
    }

    fn has_match(&self, mol: &SmilesMolecule, query: &SmilesQuery) -> ToolkitResult<bool> {
        let texts: Vec<String> = mol.fragments.iter().map(Fragment::text).collect();
        Ok(query.fragments.iter().all(|q| texts.iter().any(|t| t.contains(q.as_str()))))
    }
}

/// Parses and validates SMILES text.
///
/// # Errors
/// [`ToolkitError::Parse`] describing the first syntax problem.
pub fn parse_smiles(text: &str) -> ToolkitResult<SmilesMolecule> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ToolkitError::Parse("empty SMILES".into()));
    }
    if !text.is_ascii() {
        return Err(ToolkitError::Parse(format!("non-ASCII character in '{text}'")));
    }
    let fragments = text
        .split('.')
        .map(|piece| {
            FragmentParser::new(piece)
                .parse()
                .map_err(|reason| ToolkitError::Parse(format!("{reason} in '{text}'")))
        })
        .collect::<ToolkitResult<Vec<_>>>()?;
    Ok(SmilesMolecule { fragments })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Atom,
    Bond,
    Open,
    Close,
    Ring,
}

struct FragmentParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    atoms: usize,
    last: Last,
    /// Kind of the token before the pending bond.
    before_bond: Last,
    depth: usize,
    open_rings: BTreeSet<u8>,
}

impl<'a> FragmentParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            atoms: 0,
            last: Last::Start,
            before_bond: Last::Start,
            depth: 0,
            open_rings: BTreeSet::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn push(&mut self, token: Token, kind: Last) {
        if token.is_atom() {
            self.atoms += 1;
        }
        self.tokens.push(token);
        self.last = kind;
    }

    fn parse(mut self) -> Result<Fragment, String> {
        if self.bytes.is_empty() {
            return Err("empty fragment".into());
        }
        while let Some(c) = self.peek() {
            match c {
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.push(Token::Bracket(atom), Last::Atom);
                }
                b'(' => {
                    if !matches!(self.last, Last::Atom | Last::Ring | Last::Close) {
                        return Err(format!("unexpected '(' at position {}", self.pos));
                    }
                    self.pos += 1;
                    self.depth += 1;
                    self.push(Token::Open, Last::Open);
                }
                b')' => {
                    if self.depth == 0 {
                        return Err(format!("unmatched ')' at position {}", self.pos));
                    }
                    if !matches!(self.last, Last::Atom | Last::Ring | Last::Close) {
                        return Err(format!("empty or dangling branch at position {}", self.pos));
                    }
                    self.pos += 1;
                    self.depth -= 1;
                    self.push(Token::Close, Last::Close);
                }
                b'-' | b'=' | b'#' | b'$' | b':' | b'/' | b'\\' => {
                    if !matches!(self.last, Last::Atom | Last::Ring | Last::Close | Last::Open) {
                        let bond = c as char;
                        return Err(format!("unexpected bond '{bond}' at position {}", self.pos));
                    }
                    self.pos += 1;
                    self.before_bond = self.last;
                    self.push(Token::Bond(c as char), Last::Bond);
                }
                b'0'..=b'9' | b'%' => {
                    let anchored = match self.last {
                        Last::Atom | Last::Ring => true,
                        Last::Bond => matches!(self.before_bond, Last::Atom | Last::Ring),
                        _ => false,
                    };
                    if !anchored {
                        return Err(format!("ring bond without atom at position {}", self.pos));
                    }
                    let number = self.ring_number()?;
                    if !self.open_rings.remove(&number) {
                        self.open_rings.insert(number);
                    }
                    self.push(Token::Ring(number), Last::Ring);
                }
                _ => {
                    let symbol = self.organic_atom()?;
                    self.push(Token::Atom(symbol), Last::Atom);
                }
            }
        }

        if self.depth > 0 {
            return Err("unclosed branch".into());
        }
        if let Some(number) = self.open_rings.first() {
            return Err(format!("unclosed ring bond {number}"));
        }
        if !matches!(self.last, Last::Atom | Last::Ring | Last::Close) {
            return Err("dangling bond at end".into());
        }
        Ok(Fragment { tokens: self.tokens, atoms: self.atoms })
    }

    fn organic_atom(&mut self) -> Result<&'static str, String> {
        let rest = &self.bytes[self.pos..];
        let candidates = ORGANIC.iter().map(|(s, _)| *s).chain(AROMATIC_ORGANIC.iter().copied());
        for symbol in candidates.chain(std::iter::once("*")) {
            if rest.starts_with(symbol.as_bytes()) {
                self.pos += symbol.len();
                return Ok(symbol);
            }
        }
        Err(format!("unexpected character '{}' at position {}", rest[0] as char, self.pos))
    }

    fn ring_number(&mut self) -> Result<u8, String> {
        let start = self.pos;
        if self.peek() == Some(b'%') {
            let digits = self.bytes.get(self.pos + 1..self.pos + 3);
            match digits {
                Some(d) if d.iter().all(u8::is_ascii_digit) => {
                    self.pos += 3;
                    Ok((d[0] - b'0') * 10 + (d[1] - b'0'))
                }
                _ => Err(format!("invalid ring bond number at position {start}")),
            }
        } else {
            let d = self.bytes[self.pos];
            self.pos += 1;
            Ok(d - b'0')
        }
    }

    /// A run of digits, `None` when there is none. Values above `u16::MAX` are rejected.
    fn digits(&mut self) -> Result<Option<u16>, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]);
        text.parse().map(Some).map_err(|_| format!("number {text} too large at position {start}"))
    }

    fn bracket_atom(&mut self) -> Result<BracketAtom, String> {
        let start = self.pos;
        self.pos += 1;
        let isotope = self.digits()?;
        let symbol = self
            .bracket_symbol()
            .ok_or_else(|| format!("invalid element in bracket atom at position {start}"))?;

        let chirality = if self.peek() == Some(b'@') {
            self.pos += 1;
            if self.peek() == Some(b'@') {
                self.pos += 1;
                Chirality::Clockwise
            } else if self.peek().is_some_and(|c| c.is_ascii_uppercase() && c != b'H') {
                // TH, AL, SQ, SP, TB or OH, then the class number
                let class_start = self.pos;
                self.pos += 1;
                if self.peek().is_some_and(|c| c.is_ascii_uppercase()) {
                    self.pos += 1;
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let class = String::from_utf8_lossy(&self.bytes[class_start..self.pos]);
                Chirality::Other(class.into_owned())
            } else {
                Chirality::Anticlockwise
            }
        } else {
            Chirality::None
        };

        let mut hydrogens = 0;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            hydrogens = match self.digits()? {
                Some(n) => u8::try_from(n)
                    .map_err(|_| format!("too many hydrogens at position {start}"))?,
                None => 1,
            };
        }

        let mut charge: i16 = 0;
        if let Some(sign @ (b'+' | b'-')) = self.peek() {
            let unit: i16 = if sign == b'+' { 1 } else { -1 };
            self.pos += 1;
            let out_of_range = || format!("charge out of range at position {start}");
            if let Some(n) = self.digits()? {
                charge = unit * i16::try_from(n).map_err(|_| out_of_range())?;
            } else {
                charge = unit;
                while self.peek() == Some(sign) {
                    self.pos += 1;
                    charge = charge.checked_add(unit).ok_or_else(out_of_range)?;
                }
            }
        }
        let charge = i8::try_from(charge)
            .ok()
            .filter(|c| (-15..=15).contains(c))
            .ok_or_else(|| format!("charge out of range at position {start}"))?;

        let class = if self.peek() == Some(b':') {
            self.pos += 1;
            Some(self.digits()?.ok_or_else(|| format!("missing atom class at position {start}"))?)
        } else {
            None
        };

        if self.peek() != Some(b']') {
            return Err(format!("unclosed bracket atom at position {start}"));
        }
        self.pos += 1;
        Ok(BracketAtom { isotope, symbol, chirality, hydrogens, charge, class })
    }

    fn bracket_symbol(&mut self) -> Option<String> {
        let rest = &self.bytes[self.pos..];
        let first = *rest.first()?;
        let symbol = if first == b'*' {
            "*"
        } else if first.is_ascii_lowercase() {
            AROMATIC_BRACKET.iter().copied().find(|s| rest.starts_with(s.as_bytes()))?
        } else if first.is_ascii_uppercase() {
            let two = rest.get(..2).and_then(|b| std::str::from_utf8(b).ok());
            let one = rest.get(..1).and_then(|b| std::str::from_utf8(b).ok());
            two.and_then(|s| ELEMENTS.iter().copied().find(|e| *e == s))
                .or_else(|| one.and_then(|s| ELEMENTS.iter().copied().find(|e| *e == s)))?
        } else {
            return None;
        };
        self.pos += symbol.len();
        Some(symbol.to_string())
    }
}
