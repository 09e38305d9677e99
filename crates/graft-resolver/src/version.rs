//! Version ordering and version selectors.
//!
//! Versions order the way Maven orders them:
//! - tokens are split on `.`, `-`, `_` and on digit/letter transitions
//! - numeric tokens compare as numbers, missing trailing zeros are ignored
//! - known qualifiers order as
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < release < `sp`
//! - unknown text sorts below a release but above the pre-release qualifiers
//!   it is not compared to, case-insensitively among itself

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with comparable tokens.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(Qualifier),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Qualifier {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.to_string(),
            tokens: tokenize(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }

    /// The highest of `versions`, if any.
    pub fn max_of<'a, I>(versions: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        versions
            .into_iter()
            .map(|v| (Version::parse(v), v))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, v)| v)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        (0..len)
            .map(|i| compare_tokens(self.tokens.get(i), other.tokens.get(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn compare_tokens(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(t), None) => against_missing(t),
        (None, Some(t)) => against_missing(t).reverse(),
        (Some(a), Some(b)) => compare_present(a, b),
    }
}

// A missing token behaves like `0` or a plain release.
fn against_missing(token: &Token) -> Ordering {
    match token {
        Token::Number(0) => Ordering::Equal,
        Token::Number(_) => Ordering::Greater,
        Token::Qualifier(q) => q.cmp(&Qualifier::Release),
        Token::Text(_) => Ordering::Less,
    }
}

fn compare_present(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Number(a), Token::Number(b)) => a.cmp(b),
        (Token::Qualifier(a), Token::Qualifier(b)) => a.cmp(b),
        (Token::Text(a), Token::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Token::Number(_), _) => Ordering::Greater,
        (_, Token::Number(_)) => Ordering::Less,
        (Token::Qualifier(q), Token::Text(_)) => {
            if *q >= Qualifier::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Token::Text(_), Token::Qualifier(_)) => compare_present(b, a).reverse(),
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut digits = false;

    for ch in version.chars() {
        if matches!(ch, '.' | '-' | '_') {
            if !current.is_empty() {
                tokens.push(classify(&current));
                current.clear();
            }
            continue;
        }
        if !current.is_empty() && ch.is_ascii_digit() != digits {
            tokens.push(classify(&current));
            current.clear();
        }
        digits = ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(classify(&current));
    }
    tokens
}

fn classify(token: &str) -> Token {
    if let Ok(n) = token.parse::<u64>() {
        return Token::Number(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Token::Qualifier(Qualifier::Alpha),
        "beta" | "b" => Token::Qualifier(Qualifier::Beta),
        "milestone" | "m" => Token::Qualifier(Qualifier::Milestone),
        "rc" | "cr" => Token::Qualifier(Qualifier::Rc),
        "snapshot" => Token::Qualifier(Qualifier::Snapshot),
        "ga" | "final" | "release" => Token::Qualifier(Qualifier::Release),
        "sp" => Token::Qualifier(Qualifier::Sp),
        _ => Token::Text(token.to_string()),
    }
}

/// A version interval such as `[1.0,2.0)`, `(,2.0]` or `[1.5]`.
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl Bound {
    fn parse(s: &str, inclusive: bool) -> Option<Self> {
        let s = s.trim();
        (!s.is_empty()).then(|| Bound {
            version: Version::parse(s),
            inclusive,
        })
    }
}

impl VersionRange {
    /// Parse a range; `None` for anything that is not bracketed.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        let lower_inclusive = match s.chars().next()? {
            '[' => true,
            '(' => false,
            _ => return None,
        };
        let upper_inclusive = match s.chars().last()? {
            ']' => true,
            ')' => false,
            _ => return None,
        };
        if s.len() < 2 {
            return None;
        }
        let inner = &s[1..s.len() - 1];

        match inner.split_once(',') {
            Some((lower, upper)) => Some(VersionRange {
                lower: Bound::parse(lower, lower_inclusive),
                upper: Bound::parse(upper, upper_inclusive),
            }),
            None => {
                let exact = Bound::parse(inner, true)?;
                Some(VersionRange {
                    lower: Some(exact.clone()),
                    upper: Some(exact),
                })
            }
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above = self.lower.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Greater => true,
            Ordering::Equal => b.inclusive,
            Ordering::Less => false,
        });
        let below = self.upper.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Less => true,
            Ordering::Equal => b.inclusive,
            Ordering::Greater => false,
        });
        above && below
    }
}

/// How a requested version string picks among available versions.
#[derive(Debug, Clone)]
pub enum VersionSelector {
    /// Exactly this version.
    Exact(String),
    /// Any version starting with the prefix, written `1.+`.
    Prefix(String),
    /// Any version inside the range.
    Range(VersionRange),
    /// The highest non-snapshot version, written `latest.release` or `+`.
    Latest,
}

impl VersionSelector {
    pub fn parse(requested: &str) -> Self {
        let requested = requested.trim();
        if requested == "+" || requested == "latest.release" {
            return Self::Latest;
        }
        if let Some(prefix) = requested.strip_suffix('+') {
            return Self::Prefix(prefix.to_string());
        }
        match VersionRange::parse(requested) {
            Some(range) => Self::Range(range),
            None => Self::Exact(requested.to_string()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }

    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(v) => v == candidate,
            Self::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            Self::Range(range) => range.contains(&Version::parse(candidate)),
            Self::Latest => !Version::parse(candidate).is_snapshot(),
        }
    }

    /// Pick a version from `available`: the highest accepted one.
    pub fn select<'a, I>(&self, available: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Version::max_of(available.into_iter().filter(|v| self.accepts(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn qualifier_ordering() {
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("1.0-beta") < v("1.0-rc"));
        assert!(v("1.0-rc") < v("1.0-SNAPSHOT"));
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0") < v("1.0-sp"));
    }

    #[test]
    fn digit_letter_transitions_split() {
        assert!(v("1.0rc1") < v("1.0rc2"));
        assert_eq!(v("1.0rc1"), v("1.0-rc-1"));
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0"));
    }

    #[test]
    fn text_qualifier_below_release() {
        assert!(v("1.0.0-jre") < v("1.0.0"));
        assert!(v("31.0-jre") < v("32.0-jre"));
    }

    #[test]
    fn max_of_picks_highest() {
        assert_eq!(Version::max_of(["1.0", "2.0", "1.10"]), Some("2.0"));
        assert_eq!(Version::max_of(Vec::<&str>::new()), None);
    }

    #[test]
    fn range_bounds() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.9.9")));
        assert!(!range.contains(&v("2.0")));

        let range = VersionRange::parse("(,2.0]").unwrap();
        assert!(range.contains(&v("0.1")));
        assert!(range.contains(&v("2.0")));

        let range = VersionRange::parse("[1.5]").unwrap();
        assert!(range.contains(&v("1.5")));
        assert!(!range.contains(&v("1.6")));

        assert!(VersionRange::parse("1.0").is_none());
        assert!(VersionRange::parse("[").is_none());
    }

    #[test]
    fn selector_parsing() {
        assert!(matches!(VersionSelector::parse("1.0"), VersionSelector::Exact(_)));
        assert!(matches!(VersionSelector::parse("1.+"), VersionSelector::Prefix(p) if p == "1."));
        assert!(matches!(VersionSelector::parse("[1,2)"), VersionSelector::Range(_)));
        assert!(matches!(VersionSelector::parse("+"), VersionSelector::Latest));
        assert!(matches!(VersionSelector::parse("latest.release"), VersionSelector::Latest));
        assert!(!VersionSelector::parse("1.0").is_dynamic());
        assert!(VersionSelector::parse("1.+").is_dynamic());
    }

    #[test]
    fn selector_select() {
        let available = ["1.0", "1.5", "2.0", "2.1-SNAPSHOT"];
        assert_eq!(VersionSelector::parse("1.0").select(available), Some("1.0"));
        assert_eq!(VersionSelector::parse("1.+").select(available), Some("1.5"));
        assert_eq!(VersionSelector::parse("[1.0,2.0)").select(available), Some("1.5"));
        assert_eq!(VersionSelector::parse("latest.release").select(available), Some("2.0"));
        assert_eq!(VersionSelector::parse("3.0").select(available), None);
    }
}
