use gff2mgv::detect::{detect_fasta, detect_input, Compression, InputSource};
use gff2mgv::Gff2MgvError;
use std::path::Path;

/// Ensures plain GFF3 input is detected correctly.
#[test]
fn detect_plain_gff3() {
    let source = detect_input(Path::new("MGI.gff3")).unwrap();
    assert_eq!(source, InputSource::File(Compression::None));
    let source = detect_input(Path::new("annotations.GFF")).unwrap();
    assert_eq!(source, InputSource::File(Compression::None));
}

/// Ensures gzip-compressed GFF3 input is detected correctly.
#[test]
fn detect_gff3_gz() {
    let source = detect_input(Path::new("Mus_musculus.GRCm39.110.gff3.gz")).unwrap();
    assert_eq!(source, InputSource::File(Compression::Gzip));
    assert!(Compression::Gzip.is_compressed());
}

/// A lone dash reads standard input.
#[test]
fn detect_stdin() {
    assert_eq!(detect_input(Path::new("-")).unwrap(), InputSource::Stdin);
}

/// Rejects unsupported extensions, including compressed ones.
#[test]
fn detect_rejects_unknown() {
    for name in ["sample.gtf", "sample.txt.gz", "sample", "sample.gz"] {
        let err = detect_input(Path::new(name)).unwrap_err();
        assert!(matches!(err, Gff2MgvError::UnsupportedExtension(_)), "{name}");
    }
}

/// Assembly files are plain or gzipped FASTA.
#[test]
fn detect_fasta_files() {
    assert_eq!(detect_fasta(Path::new("GRCm39.fa")).unwrap(), Compression::None);
    assert_eq!(detect_fasta(Path::new("genome.FASTA")).unwrap(), Compression::None);
    assert_eq!(
        detect_fasta(Path::new("Mus_musculus.GRCm39.dna.toplevel.fa.gz")).unwrap(),
        Compression::Gzip
    );
    assert_eq!(detect_fasta(Path::new("GCF_000001635.fna.gzip")).unwrap(), Compression::Gzip);

    for name in ["MGI.gff3", "genome.txt.gz", "genome", "-"] {
        let err = detect_fasta(Path::new(name)).unwrap_err();
        assert!(matches!(err, Gff2MgvError::UnsupportedExtension(_)), "{name}");
    }
}
