mod attr;
mod header;
pub use attr::*;
pub use header::*;

use std::fmt;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    Unstranded,
    Unknown,
}

impl Strand {
    /// Reads GFF3 column 7. Anything but `+`, `-` or `?` is unstranded.
    pub fn from_column(s: &str) -> Self {
        match s {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            "?" => Strand::Unknown,
            _ => Strand::Unstranded,
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Strand::Reverse
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
            Strand::Unstranded => write!(f, "."),
            Strand::Unknown => write!(f, "?"),
        }
    }
}

/// One GFF3 feature line.
///
/// Coordinates stay 1-based and inclusive, exactly as they appear in the file.
#[derive(Debug, PartialEq, Clone)]
pub struct Feature {
    pub seqid: String,
    pub source: String,
    pub kind: String,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: Strand,
    pub phase: Option<u8>,
    pub attributes: Attributes,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 9 tab-separated columns, found {0}")]
    ColumnCount(usize),

    #[error("invalid {column} coordinate {value:?}")]
    Coordinate { column: &'static str, value: String },

    #[error("end {end} is before start {start}")]
    ReversedCoordinates { start: u64, end: u64 },
}

impl Feature {
    /// Tokenizes a single feature line.
    ///
    /// Column 9 is decoded leniently (see [`Attributes::parse`]); the column
    /// count and both coordinates are strict, and `start <= end` must hold.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields = line.split('\t').collect::<Vec<_>>();
        if fields.len() != 9 {
            return Err(ParseError::ColumnCount(fields.len()));
        }

        let start = parse_coordinate("start", fields[3])?;
        let end = parse_coordinate("end", fields[4])?;
        if end < start {
            return Err(ParseError::ReversedCoordinates { start, end });
        }

        let phase = match fields[7] {
            "0" => Some(0),
            "1" => Some(1),
            "2" => Some(2),
            _ => None,
        };

        Ok(Self {
            seqid: fields[0].to_string(),
            source: fields[1].to_string(),
            kind: fields[2].to_string(),
            start,
            end,
            score: fields[5].to_string(),
            strand: Strand::from_column(fields[6]),
            phase,
            attributes: Attributes::parse(fields[8]),
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get_str("ID")
    }

    pub fn parents(&self) -> &[String] {
        self.attributes.get_list("Parent")
    }

    pub fn is_top_level(&self) -> bool {
        !self.attributes.contains("Parent")
    }

    /// Span in bases; 0 for a hand-built feature with `end < start`.
    pub fn len(&self) -> u64 {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Renders the feature back into a newline-terminated GFF3 line.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let phase = match self.phase {
            Some(p) => p.to_string(),
            None => ".".to_string(),
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.kind,
            self.start,
            self.end,
            self.score,
            self.strand,
            phase,
            self.attributes
        )
    }
}

fn parse_coordinate(column: &'static str, value: &str) -> Result<u64, ParseError> {
    value.trim().parse::<u64>().map_err(|_| ParseError::Coordinate {
        column,
        value: value.to_string(),
    })
}

pub fn parse_line(line: &str) -> Result<Feature, ParseError> {
    Feature::parse(line)
}

pub fn format_line(feature: &Feature) -> String {
    feature.to_line()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gene_line() {
        let line = "1\tMGI\tgene\t3269956\t3741733\t.\t-\t.\tID=MGI:1918911;Name=Xkr4;Dbxref=ENSEMBL:ENSMUSG00000051951,NCBI_Gene:497097\n";
        let f = parse_line(line).unwrap();
        assert_eq!(f.seqid, "1");
        assert_eq!(f.source, "MGI");
        assert_eq!(f.kind, "gene");
        assert_eq!(f.start, 3269956);
        assert_eq!(f.end, 3741733);
        assert_eq!(f.strand, Strand::Reverse);
        assert_eq!(f.phase, None);
        assert_eq!(f.id(), Some("MGI:1918911"));
        assert!(f.is_top_level());
        assert_eq!(
            f.attributes.get_list("Dbxref"),
            &["ENSEMBL:ENSMUSG00000051951", "NCBI_Gene:497097"]
        );
    }

    #[test]
    fn test_parse_cds_phase_and_parents() {
        let line = "2\tsrc\tCDS\t100\t200\t.\t+\t2\tID=cds1;Parent=t1,t2";
        let f = parse_line(line).unwrap();
        assert_eq!(f.phase, Some(2));
        assert_eq!(f.parents(), &["t1", "t2"]);
        assert!(!f.is_top_level());
        assert_eq!(f.len(), 101);
    }

    #[test]
    fn test_wrong_column_count() {
        let line = "1\tsrc\tgene\t1\t10\t.\t+\t.";
        assert_eq!(parse_line(line), Err(ParseError::ColumnCount(8)));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let line = "1\tsrc\tgene\tabc\t10\t.\t+\t.\tID=g1";
        assert_eq!(
            parse_line(line),
            Err(ParseError::Coordinate {
                column: "start",
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_reversed_coordinates() {
        let line = "1\tsrc\texon\t300\t200\t.\t+\t.\tParent=t1";
        assert_eq!(
            parse_line(line),
            Err(ParseError::ReversedCoordinates { start: 300, end: 200 })
        );

        let single_base = parse_line("1\tsrc\tSNV\t300\t300\t.\t+\t.\tID=v1").unwrap();
        assert_eq!(single_base.len(), 1);

        let mut f = single_base;
        f.start = 400;
        assert_eq!(f.len(), 0);
        assert!(f.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let mut attributes = Attributes::new();
        attributes.insert("ID", AttrValue::from("tx;1"));
        attributes.insert("Parent", AttrValue::List(vec!["g,1".into(), "g2".into()]));
        attributes.insert("Note", AttrValue::List(vec!["50% done=yes".into()]));
        attributes.insert("description", AttrValue::from("DEAD/H box [Source:HGNC;Acc:HGNC:1]"));
        let feature = Feature {
            seqid: "chrX".to_string(),
            source: "ensembl_havana".to_string(),
            kind: "mRNA".to_string(),
            start: 10,
            end: 20,
            score: "0.5".to_string(),
            strand: Strand::Unknown,
            phase: Some(1),
            attributes,
        };

        let line = format_line(&feature);
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\t').count(), 8);
        assert_eq!(parse_line(&line).unwrap(), feature);
    }

    #[test]
    fn test_empty_attributes_round_trip() {
        let line = "1\tsrc\tregion\t1\t500\t.\t.\t.\t.";
        let f = parse_line(line).unwrap();
        assert!(f.attributes.is_empty());
        assert_eq!(f.to_string(), line);
    }
}
