use hashbrown::HashMap;
use regex::Regex;
use std::sync::LazyLock;

// `##name value` or `#!name value`
static PRAGMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[#!]([-\w]+) (.*)").expect("valid pragma regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PragmaValue {
    Single(String),
    Multiple(Vec<String>),
}

impl PragmaValue {
    pub fn first(&self) -> &str {
        match self {
            PragmaValue::Single(s) => s,
            PragmaValue::Multiple(v) => v.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            PragmaValue::Single(s) => std::slice::from_ref(s),
            PragmaValue::Multiple(v) => v,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            PragmaValue::Single(s) => {
                let first = std::mem::take(s);
                *self = PragmaValue::Multiple(vec![first, value]);
            }
            PragmaValue::Multiple(v) => v.push(value),
        }
    }
}

/// Pragmas found in the comment lines seen before the first feature.
#[derive(Debug, Clone, Default)]
pub struct Header {
    pragmas: HashMap<String, PragmaValue>,
}

impl Header {
    pub fn parse<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut header = Self::default();
        for line in lines {
            header.push_line(line.as_ref());
        }
        header
    }

    /// Adds one raw comment line; lines that are not pragmas are ignored.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);

        let Some(caps) = PRAGMA_RE.captures(line) else {
            return;
        };
        let name = caps[1].to_string();
        let value = caps[2].to_string();

        match self.pragmas.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.pragmas.insert(name, PragmaValue::Single(value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PragmaValue> {
        self.pragmas.get(name)
    }

    pub fn len(&self) -> usize {
        self.pragmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pragmas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_parse_pragmas() {
        let text = indoc! {"
            ##gff-version 3
            #!genome-build GRCm39
            ##sequence-region 1 1 195154279
            ##sequence-region 2 1 181755017
            ##sequence-region X 1 169476592
            # a plain comment
            ###
        "};
        let header = Header::parse(text.lines());

        assert_eq!(header.len(), 3);
        assert_eq!(
            header.get("gff-version"),
            Some(&PragmaValue::Single("3".to_string()))
        );
        assert_eq!(header.get("genome-build").unwrap().first(), "GRCm39");
        assert_eq!(
            header.get("sequence-region").unwrap().values(),
            &["1 1 195154279", "2 1 181755017", "X 1 169476592"]
        );
        assert!(header.get("a").is_none());
    }

    #[test]
    fn test_two_occurrences_become_list() {
        let header = Header::parse(["##taxonid 10090", "##taxonid 10116"]);
        assert_eq!(
            header.get("taxonid"),
            Some(&PragmaValue::Multiple(vec!["10090".into(), "10116".into()]))
        );
    }
}
