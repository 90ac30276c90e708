//! Name datatypes: rfc822Name and x500Name.

use std::fmt;

use crate::error::IndeterminateError;

/// An RFC 822 mailbox name. The local part is case-sensitive, the domain
/// part is not; the domain is stored lowercased so derived equality is the
/// datatype's equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rfc822Name {
    pub local: String,
    pub domain: String,
}

impl Rfc822Name {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let bad =
            || IndeterminateError::syntax_error(format!("Invalid rfc822Name '{lexical}'"));
        let (local, domain) = lexical.split_once('@').ok_or_else(bad)?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(bad());
        }
        Ok(Self {
            local: local.to_owned(),
            domain: domain.to_ascii_lowercase(),
        })
    }

    /// Match against an rfc822Name pattern: a full mailbox (`a@b.com`),
    /// a whole domain (`b.com`), or a sub-domain suffix (`.b.com`).
    pub fn matches(&self, pattern: &str) -> bool {
        match pattern.split_once('@') {
            Some((local, domain)) => {
                self.local == local && self.domain == domain.to_ascii_lowercase()
            }
            None => {
                let pattern = pattern.to_ascii_lowercase();
                if let Some(suffix) = pattern.strip_prefix('.') {
                    self.domain.ends_with(&format!(".{suffix}"))
                } else {
                    self.domain == pattern
                }
            }
        }
    }
}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// An X.500 distinguished name, compared on an RDN-canonical form
/// (lowercased attribute types, trimmed values, collapsed inner spaces).
#[derive(Debug, Clone)]
pub struct X500Name {
    original: String,
    canonical: String,
}

impl X500Name {
    pub fn parse(lexical: &str) -> Result<Self, IndeterminateError> {
        let canonical = canonicalize(lexical).ok_or_else(|| {
            IndeterminateError::syntax_error(format!("Invalid x500Name '{lexical}'"))
        })?;
        Ok(Self {
            original: lexical.to_owned(),
            canonical,
        })
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// True when `other`'s RDN sequence is a terminal subsequence of this
    /// name (the x500Name-match semantics: does this name end in `other`).
    pub fn ends_with(&self, other: &X500Name) -> bool {
        let mine: Vec<&str> = self.canonical.split(',').collect();
        let theirs: Vec<&str> = other.canonical.split(',').collect();
        theirs.len() <= mine.len() && mine[mine.len() - theirs.len()..] == theirs[..]
    }
}

fn canonicalize(lexical: &str) -> Option<String> {
    if lexical.trim().is_empty() {
        return None;
    }
    let mut rdns = Vec::new();
    for rdn in lexical.split(',') {
        let (attr, value) = rdn.split_once('=')?;
        let attr = attr.trim().to_ascii_lowercase();
        if attr.is_empty() {
            return None;
        }
        let value = value
            .trim()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        rdns.push(format!("{attr}={value}"));
    }
    Some(rdns.join(","))
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}
impl Eq for X500Name {}

impl std::hash::Hash for X500Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc822_domain_case_insensitive() {
        let a = Rfc822Name::parse("Alice@Example.COM").unwrap();
        let b = Rfc822Name::parse("Alice@example.com").unwrap();
        assert_eq!(a, b);
        // Local part stays case-sensitive.
        let c = Rfc822Name::parse("alice@example.com").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn rfc822_pattern_match() {
        let name = Rfc822Name::parse("alice@mail.example.com").unwrap();
        assert!(name.matches("alice@mail.example.com"));
        assert!(name.matches("mail.example.com"));
        assert!(name.matches(".example.com"));
        assert!(!name.matches("example.com"));
        assert!(!name.matches("bob@mail.example.com"));
    }

    #[test]
    fn rfc822_rejects_malformed() {
        for lex in ["no-at-sign", "@domain", "local@", "a@b@c"] {
            assert!(Rfc822Name::parse(lex).is_err(), "{lex}");
        }
    }

    #[test]
    fn x500_canonical_equality() {
        let a = X500Name::parse("CN=Alice Smith, O=Example, C=US").unwrap();
        let b = X500Name::parse("cn=alice  smith,o=example,c=us").unwrap();
        assert_eq!(a, b);
        // Display keeps the original spelling.
        assert_eq!(a.to_string(), "CN=Alice Smith, O=Example, C=US");
    }

    #[test]
    fn x500_terminal_match() {
        let full = X500Name::parse("CN=Alice, O=Example, C=US").unwrap();
        let suffix = X500Name::parse("O=Example, C=US").unwrap();
        let other = X500Name::parse("O=Other, C=US").unwrap();
        assert!(full.ends_with(&suffix));
        assert!(full.ends_with(&full));
        assert!(!full.ends_with(&other));
        assert!(!suffix.ends_with(&full));
    }
}
