use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;
use gff2mgv::config::HeaderValue;
use gff2mgv::{run, Config};
use indoc::indoc;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes gz-compressed contents to a file and returns its path.
fn write_gzip_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let mut encoder = GzEncoder::new(Vec::new(), GzCompression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    let gz = encoder.finish().unwrap();

    let path = dir.join(name);
    std::fs::write(&path, gz).unwrap();
    path
}

/// Imports a gzipped GFF3 the same way as a plain one.
#[test]
fn import_gzipped_gff3() {
    let dir = tempfile::tempdir().unwrap();
    let gff = indoc! {"
        ##gff-version 3
        ##genome-name CAST/EiJ
        1\tsrc\tgene\t100\t200\t.\t+\t.\tID=g1;Name=Xkr4
        1\tsrc\tmRNA\t100\t200\t.\t+\t.\tID=tx1;Parent=g1
        1\tsrc\texon\t100\t150\t.\t+\t.\tParent=tx1
        1\tsrc\texon\t180\t200\t.\t+\t.\tParent=tx1
        1\tsrc\tCDS\t120\t150\t.\t+\t0\tID=cds1;Parent=tx1;protein_id=P1
        1\tsrc\tCDS\t180\t190\t.\t+\t2\tID=cds1;Parent=tx1;protein_id=P1
    "};
    let input_path = write_gzip_file(dir.path(), "input.gff3.gz", gff);
    let out = dir.path().join("out");

    let mut config = Config::new(input_path, &out);
    config.timestamp = Some(HeaderValue::Literal("now".to_string()));
    let stats = run(&config).unwrap();
    assert_eq!(stats.written.models, 1);

    let genes = std::fs::read_to_string(out.join("casteij/models/genes/0.gff3")).unwrap();
    assert_eq!(
        genes,
        "1\tsrc\tgene\t100\t200\t.\t+\t.\tID=g1;Name=Xkr4;tCount=1\n"
    );

    let transcripts =
        std::fs::read_to_string(out.join("casteij/models/transcripts/1/0.gff3")).unwrap();
    let fields = transcripts.trim_end().split('\t').collect::<Vec<_>>();
    assert_eq!(fields[2], "mRNA");
    assert_eq!(
        fields[8],
        "ID=tx1;Parent=g1;exons=0_51,80_21;cds=cds1%7CP1%7C120%7C190"
    );
}
