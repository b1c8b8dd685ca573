//! Classification of a captured `rsync -aAv --info=progress2,stats` run.

use backup_host::transfer::codec::TransferLineCodec;
use backup_host::transfer::{classify_line, LineRouter, TransferLine};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

const CORPUS: &[u8] = include_bytes!("fixtures/rsync_progress2.txt");

fn corpus_lines() -> Vec<String> {
    let mut codec = TransferLineCodec::new();
    let mut buf = BytesMut::from(CORPUS);
    let mut lines = Vec::new();
    while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
        lines.push(line);
    }
    lines
}

fn kind(line: &TransferLine) -> &'static str {
    match line {
        TransferLine::Blank => "blank",
        TransferLine::Summary(_) => "summary",
        TransferLine::Progress(_) => "progress",
        TransferLine::Warning(_) => "warning",
        TransferLine::Error(_) => "error",
        TransferLine::Path(_) => "path",
        TransferLine::Other(_) => "other",
    }
}

#[test]
fn test_corpus_classification() {
    let kinds: Vec<&str> = corpus_lines().iter().map(|l| kind(&classify_line(l))).collect();

    let mut expected = vec![
        "other", "other", "path", "path", "path", "path", "progress", "progress", "path", "path",
        "path", "progress", "error", "path", "path", "path", "path", "path", "warning", "error",
        "path", "progress", "blank",
    ];
    expected.extend(std::iter::repeat("summary").take(10));
    expected.extend(["blank", "summary", "summary", "error"]);

    assert_eq!(kinds, expected);
}

#[test]
fn test_corpus_final_progress() {
    let progress: Vec<_> = corpus_lines()
        .iter()
        .filter_map(|l| match classify_line(l) {
            TransferLine::Progress(p) => Some(p),
            _ => None,
        })
        .collect();

    let last = progress.last().unwrap();
    assert_eq!(last.bytes, Some(2_750_012_416));
    assert_eq!(last.percent, Some(100));
    assert_eq!(last.transfers, Some(2210));
    assert_eq!(last.to_check, Some((0, 8901)));
    assert_eq!(progress[1].to_check, Some((1021, 1045)));
}

#[test]
fn test_corpus_logged_directories() {
    let mut router = LineRouter::new(true);
    let logged: Vec<String> = corpus_lines()
        .iter()
        .filter_map(|l| match classify_line(l) {
            line @ TransferLine::Path(_) => router.route(&line).log.map(|e| e.message),
            _ => None,
        })
        .collect();

    assert_eq!(
        logged,
        vec![
            "/",
            "/etc",
            "/etc/ssh",
            "/etc/ssh/sshd_config.d",
            "/home/alice",
            "/home/alice/projects/app",
            "/home/alice/notes",
            "/usr/lib/python3.12/site-packages/jsonschema",
            "/usr/share/perl5/vendor_perl",
            "/usr/share/doc",
        ]
    );
}
