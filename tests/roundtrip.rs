//! End-to-end exercise of a multi-record WARC stream: iterate, filter,
//! parse embedded HTTP, verify digests, and round-trip through the writer.

use fastwarc::iterator::{ArchiveIterator, ArchiveIteratorConfig, NextRecord};
use fastwarc::record_type::{RecordType, RecordTypeFilter};
use fastwarc::stream::MemoryStream;
use fastwarc::writer::RecordWriter;

fn warc_record(warc_type: &str, record_id: &str, extra_headers: &str, payload: &[u8]) -> Vec<u8> {
    let mut record = format!(
        "WARC/1.1\r\nWARC-Type: {warc_type}\r\nWARC-Record-ID: <{record_id}>\r\n{extra_headers}Content-Length: {}\r\n\r\n",
        payload.len()
    )
    .into_bytes();
    record.extend_from_slice(payload);
    record.extend_from_slice(b"\r\n\r\n");
    record
}

fn sample_warc() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&warc_record(
        "warcinfo",
        "urn:uuid:11111111-1111-1111-1111-111111111111",
        "",
        b"format: WARC",
    ));

    let http_body = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello world";
    data.extend_from_slice(&warc_record(
        "response",
        "urn:uuid:22222222-2222-2222-2222-222222222222",
        "Content-Type: application/http; msgtype=response\r\n",
        http_body,
    ));

    data.extend_from_slice(&warc_record(
        "metadata",
        "urn:uuid:33333333-3333-3333-3333-333333333333",
        "",
        b"metadata",
    ));

    data
}

#[test]
fn iterates_every_record_in_order_with_correct_metadata() {
    let mut it = ArchiveIterator::new(MemoryStream::from_bytes(sample_warc()));

    let mut seen = Vec::new();
    loop {
        match it.next().unwrap() {
            NextRecord::HasNext(mut record) => {
                seen.push(record.record_type);
                let payload = record.read_to_end().unwrap();
                match record.record_type {
                    RecordType::WarcInfo => assert_eq!(&payload, b"format: WARC"),
                    RecordType::Response => {
                        assert_eq!(payload, b"hello world");
                        assert!(record.http_parsed);
                    }
                    RecordType::Metadata => assert_eq!(&payload, b"metadata"),
                    other => panic!("unexpected record type: {other:?}"),
                }
            }
            NextRecord::SkipNext => continue,
            NextRecord::Eof => break,
        }
    }

    assert_eq!(
        seen,
        vec![RecordType::WarcInfo, RecordType::Response, RecordType::Metadata]
    );
}

#[test]
fn filter_yields_only_matching_types_and_ends_at_eof() {
    let config = ArchiveIteratorConfig {
        record_type_filter: RecordTypeFilter::of(&[RecordType::Response]),
        ..Default::default()
    };
    let mut it = ArchiveIterator::with_config(MemoryStream::from_bytes(sample_warc()), config);

    let mut matched = 0;
    loop {
        match it.next().unwrap() {
            NextRecord::HasNext(record) => {
                assert_eq!(record.record_type, RecordType::Response);
                matched += 1;
            }
            NextRecord::SkipNext => continue,
            NextRecord::Eof => break,
        }
    }
    assert_eq!(matched, 1);
}

#[test]
fn stream_pos_is_strictly_increasing_across_records() {
    let mut it = ArchiveIterator::new(MemoryStream::from_bytes(sample_warc()));
    let mut positions = Vec::new();
    loop {
        match it.next().unwrap() {
            NextRecord::HasNext(mut record) => {
                positions.push(record.stream_pos);
                record.consume(None).unwrap();
            }
            NextRecord::SkipNext => continue,
            NextRecord::Eof => break,
        }
    }
    assert_eq!(positions.len(), 3);
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn writing_without_checksums_then_re_reading_reproduces_the_payload() {
    let mut it = ArchiveIterator::with_config(
        MemoryStream::from_bytes(sample_warc()),
        ArchiveIteratorConfig {
            parse_http: false,
            ..Default::default()
        },
    );

    let mut out = Vec::new();
    {
        let mut writer = RecordWriter::new(&mut out);
        loop {
            match it.next().unwrap() {
                NextRecord::HasNext(mut record) => {
                    writer.write_record(&mut record).unwrap();
                }
                NextRecord::SkipNext => continue,
                NextRecord::Eof => break,
            }
        }
    }

    let mut reread = ArchiveIterator::new(MemoryStream::from_bytes(out));
    let mut types = Vec::new();
    loop {
        match reread.next().unwrap() {
            NextRecord::HasNext(record) => types.push(record.record_type),
            NextRecord::SkipNext => continue,
            NextRecord::Eof => break,
        }
    }
    assert_eq!(
        types,
        vec![RecordType::WarcInfo, RecordType::Response, RecordType::Metadata]
    );
}

#[test]
fn write_with_checksums_then_verify_block_digest_round_trips() {
    let mut record = fastwarc::WarcRecord::new();
    record.init_headers(3, RecordType::Resource, None);
    record.set_bytes_content(b"abc".to_vec());

    let mut out = Vec::new();
    {
        let mut writer = RecordWriter::with_checksums(&mut out);
        writer.write_record(&mut record).unwrap();
    }

    let mut it = ArchiveIterator::new(MemoryStream::from_bytes(out));
    match it.next().unwrap() {
        NextRecord::HasNext(mut record) => {
            assert!(record.verify_block_digest().unwrap());
            assert_eq!(record.read_to_end().unwrap(), b"abc");
        }
        _ => panic!("expected the written record back"),
    }
}

#[test]
fn http_record_digests_verify_after_default_config_reread() {
    let mut record = fastwarc::WarcRecord::new();
    record.init_headers(0, RecordType::Response, None);
    record
        .warc_headers
        .set("Content-Type", "application/http; msgtype=response");
    let http_body = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello world";
    record.set_bytes_content(http_body.to_vec());
    record.parse_http().unwrap();

    let mut out = Vec::new();
    {
        let mut writer = RecordWriter::with_checksums(&mut out);
        writer.write_record(&mut record).unwrap();
    }

    // Default config auto-parses HTTP before the caller ever sees the
    // record, so verify_block_digest() must reconstruct the full block
    // (HTTP headers + blank line + body) even though the shared reader has
    // already had its HTTP headers consumed.
    let mut it = ArchiveIterator::new(MemoryStream::from_bytes(out));
    match it.next().unwrap() {
        NextRecord::HasNext(mut record) => {
            assert!(record.http_parsed);
            assert!(record.verify_block_digest().unwrap());
            assert!(record.verify_payload_digest().unwrap());
            assert_eq!(record.read_to_end().unwrap(), b"hello world");
        }
        _ => panic!("expected the written HTTP record back"),
    }
}
