use std::fmt;

/// Attribute names whose values are always comma-split lists.
pub const MULTI_VALUED: [&str; 5] = ["Parent", "Dbxref", "Alias", "Note", "Ontology_term"];

#[inline(always)]
pub fn is_multi_valued(name: &str) -> bool {
    MULTI_VALUED.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Scalar(String),
    List(Vec<String>),
}

impl AttrValue {
    /// Scalar value, or the first element of a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(s) => Some(s),
            AttrValue::List(v) => v.first().map(String::as_str),
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            AttrValue::Scalar(s) => std::slice::from_ref(s),
            AttrValue::List(v) => v,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Scalar(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Scalar(s)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        AttrValue::List(v)
    }
}

/// Column 9, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a column 9 string.
    ///
    /// Pairs without `=` are skipped rather than rejected: provider files
    /// regularly carry unescaped `;` inside values.
    pub fn parse(text: &str) -> Self {
        let mut attributes = Self::new();
        let text = text.trim();
        if text == "." {
            return attributes;
        }

        for pair in text.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };

            let name = decode(name.trim());
            let value = value.trim();
            let value = if is_multi_valued(&name) {
                AttrValue::List(value.split(',').map(decode).collect())
            } else {
                AttrValue::Scalar(decode(value))
            };
            attributes.insert(name, value);
        }

        attributes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    /// List view of an attribute; empty when absent.
    pub fn get_list(&self, name: &str) -> &[String] {
        self.get(name).map(AttrValue::as_list).unwrap_or(&[])
    }

    /// Sets `name`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, ".");
        }

        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                write!(f, ";")?;
            }
            write!(f, "{}=", urlencoding::encode(name))?;
            match value {
                AttrValue::Scalar(s) => write!(f, "{}", urlencoding::encode(s))?,
                AttrValue::List(values) => {
                    let joined = values
                        .iter()
                        .map(|v| urlencoding::encode(v))
                        .collect::<Vec<_>>()
                        .join(",");
                    write!(f, "{joined}")?;
                }
            }
        }
        Ok(())
    }
}

#[inline(always)]
fn decode(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gff() {
        let line = "ID=ENSG00000223972;Name=DDX11L1;biotype=transcribed_unprocessed_pseudogene";
        let attr = Attributes::parse(line);
        assert_eq!(attr.len(), 3);
        assert_eq!(attr.get_str("ID"), Some("ENSG00000223972"));
        assert_eq!(attr.get_str("biotype"), Some("transcribed_unprocessed_pseudogene"));
    }

    #[test]
    fn test_multi_valued_always_lists() {
        let attr = Attributes::parse("Parent=t1;Alias=a,b;Name=x,y");
        assert_eq!(attr.get("Parent"), Some(&AttrValue::List(vec!["t1".into()])));
        assert_eq!(
            attr.get("Alias"),
            Some(&AttrValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(attr.get("Name"), Some(&AttrValue::Scalar("x,y".into())));
    }

    #[test]
    fn test_pairs_without_equals_are_skipped() {
        let attr = Attributes::parse("ID=g1;description=foo [Source:ZFIN;Acc:ZDB-GENE-1];Name=abc");
        assert_eq!(attr.get_str("ID"), Some("g1"));
        assert_eq!(attr.get_str("description"), Some("foo [Source:ZFIN"));
        assert_eq!(attr.get_str("Name"), Some("abc"));
        assert_eq!(attr.len(), 3);
    }

    #[test]
    fn test_percent_decoding() {
        let attr = Attributes::parse("Note=a%2Cb,c;description=x%3By%20z");
        assert_eq!(attr.get_list("Note"), &["a,b", "c"]);
        assert_eq!(attr.get_str("description"), Some("x;y z"));
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut attr = Attributes::parse("ID=a;Name=b;curie=c");
        attr.insert("Name", "z");
        attr.insert("tCount", "2");
        assert_eq!(attr.to_string(), "ID=a;Name=z;curie=c;tCount=2");
        assert_eq!(attr.remove("ID"), Some(AttrValue::from("a")));
        assert_eq!(attr.to_string(), "Name=z;curie=c;tCount=2");
    }

    #[test]
    fn test_format_encodes_reserved() {
        let mut attr = Attributes::new();
        attr.insert("ID", "transcript:ENSMUST1");
        attr.insert("exons", vec!["0_201".to_string(), "300_20".to_string()]);
        assert_eq!(attr.to_string(), "ID=transcript%3AENSMUST1;exons=0_201,300_20");
    }
}
