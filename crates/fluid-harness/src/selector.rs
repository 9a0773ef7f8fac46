#![forbid(unsafe_code)]

//! Naive selector matching.
//!
//! Supports compound selectors built from a tag, `#id`, `.class` and `*`,
//! joined by descendant (whitespace) and child (`>`) combinators. Anything
//! else (attributes, pseudo-classes, sibling combinators) never matches.

/// One compound selector, e.g. `div.card#main`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Compound {
    pub fn parse(text: &str) -> Option<Self> {
        let mut compound = Self::default();
        let mut chars = text.chars().peekable();
        let mut tag = String::new();
        while let Some(&c) = chars.peek() {
            if !is_ident_char(c) && c != '*' {
                break;
            }
            tag.push(c);
            chars.next();
        }
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        while let Some(marker) = chars.next() {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if !is_ident_char(c) {
                    break;
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return None;
            }
            match marker {
                '#' => compound.id = Some(name),
                '.' => compound.classes.push(name),
                _ => return None,
            }
        }
        Some(compound)
    }

    pub fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        self.tag.as_deref().is_none_or(|t| t.eq_ignore_ascii_case(tag))
            && self.id.as_deref().is_none_or(|want| id == Some(want))
            && self.classes.iter().all(|class| classes.contains(class))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Parsed complex selector, rightmost compound last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

impl Selector {
    pub fn parse(text: &str) -> Option<Self> {
        let spaced = text.replace('>', " > ");
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pending = None;
        for token in spaced.split_whitespace() {
            if token == ">" {
                if compounds.is_empty() || pending.is_some() {
                    return None;
                }
                pending = Some(Combinator::Child);
                continue;
            }
            if !compounds.is_empty() {
                combinators.push(pending.take().unwrap_or(Combinator::Descendant));
            }
            compounds.push(Compound::parse(token)?);
        }
        if compounds.is_empty() || pending.is_some() {
            return None;
        }
        Some(Self {
            compounds,
            combinators,
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compounds_parse_tag_id_and_classes() {
        let compound = Compound::parse("DIV.card.wide#main").unwrap();
        assert_eq!(compound.tag.as_deref(), Some("div"));
        assert_eq!(compound.id.as_deref(), Some("main"));
        assert_eq!(compound.classes, vec!["card", "wide"]);
        assert_eq!(Compound::parse("*").unwrap(), Compound::default());
        assert!(Compound::parse("a:hover").is_none());
        assert!(Compound::parse("a[href]").is_none());
    }

    #[test]
    fn combinators_are_recorded_between_compounds() {
        let selector = Selector::parse(".nav>li a").unwrap();
        assert_eq!(selector.compounds.len(), 3);
        assert_eq!(
            selector.combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
        assert!(Selector::parse("> a").is_none());
        assert!(Selector::parse("a >").is_none());
        assert!(Selector::parse("   ").is_none());
    }

    #[test]
    fn compound_matching() {
        let compound = Compound::parse("div.card").unwrap();
        let classes = vec!["card".to_owned(), "x".to_owned()];
        assert!(compound.matches("DIV", None, &classes));
        assert!(!compound.matches("span", None, &classes));
        assert!(!compound.matches("div", None, &[]));
    }
}
