use super::*;

fn sample_segment() -> Segment {
    Segment {
        text: "This is test content for the segment".to_string(),
        source: "manual.pdf".to_string(),
        page: 3,
        index: 7,
        char_count: 36,
    }
}

#[test]
fn record_carries_segment_fields() {
    let record = SegmentRecord::new(&sample_segment(), vec![0.1, 0.2, 0.3], 42);

    assert!(!record.id.is_empty());
    assert_eq!(record.vector.len(), 3);
    assert_eq!(record.metadata.source, "manual.pdf");
    assert_eq!(record.metadata.page, 3);
    assert_eq!(record.metadata.chunk_index, 7);
    assert_eq!(record.metadata.seq, 42);
    assert_eq!(
        record.metadata.content,
        "This is test content for the segment"
    );
    assert_eq!(record.metadata.char_count, 36);
}

#[test]
fn record_ids_are_unique() {
    let segment = sample_segment();
    let first = SegmentRecord::new(&segment, vec![0.0], 0);
    let second = SegmentRecord::new(&segment, vec![0.0], 1);

    assert_ne!(first.id, second.id);
}

#[test]
fn record_timestamps_are_valid_rfc3339() {
    let record = SegmentRecord::new(&sample_segment(), vec![0.0], 0);

    assert!(chrono::DateTime::parse_from_rfc3339(&record.metadata.created_at).is_ok());
}

#[test]
fn metadata_serialization() {
    let metadata = SegmentMetadata {
        source: "report.pdf".to_string(),
        page: 1,
        chunk_index: 0,
        seq: 5,
        content: "Test content".to_string(),
        char_count: 12,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    };

    let json = serde_json::to_string(&metadata).expect("can serialize json");
    let deserialized: SegmentMetadata = serde_json::from_str(&json).expect("can parse json");

    assert_eq!(metadata.source, deserialized.source);
    assert_eq!(metadata.seq, deserialized.seq);
    assert_eq!(metadata.content, deserialized.content);
}
