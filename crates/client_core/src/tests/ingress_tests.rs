use super::*;
use shared::domain::PodId;

fn frame(event: &str, data: &str) -> SseFrame {
    SseFrame {
        event: event.to_string(),
        data: data.to_string(),
    }
}

#[test]
fn splits_frames_across_arbitrary_chunk_boundaries() {
    let wire = b"event: pod_update\r\ndata: {\"pod\":{\"id\":1,\"x\":10,\"y\":10}}\r\n\r\n: keep-alive\n\nevent: formation_update\ndata: {\"formation\":\"STAR\"}\n\n";
    let mut decoder = SseFrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in wire.chunks(7) {
        frames.extend(decoder.push(chunk));
    }

    assert_eq!(
        frames,
        vec![
            frame("pod_update", r#"{"pod":{"id":1,"x":10,"y":10}}"#),
            frame("formation_update", r#"{"formation":"STAR"}"#),
        ]
    );
}

#[test]
fn joins_multi_line_data_and_defaults_event_name() {
    let mut decoder = SseFrameDecoder::new();
    let frames = decoder.push(b"data: first\ndata: second\n\nevent: ping\n\n");
    assert_eq!(frames, vec![frame("message", "first\nsecond")]);
}

#[test]
fn reset_discards_partial_frame() {
    let mut decoder = SseFrameDecoder::new();
    assert!(decoder
        .push(b"event: pod_update\ndata: {\"pod\":")
        .is_empty());
    decoder.reset();
    let frames = decoder.push(b"event: formation_update\ndata: {\"formation\":\"X\"}\n\n");
    assert_eq!(frames, vec![frame("formation_update", r#"{"formation":"X"}"#)]);
}

#[test]
fn decodes_known_event_kinds() {
    let pod = decode_frame(&frame("pod_update", r#"{"pod":{"id":3,"x":12.5,"y":40}}"#))
        .expect("decode");
    assert_eq!(
        pod,
        Some(StreamEvent::PodUpdate(Pod::new(PodId(3), 12.5, 40.0)))
    );

    let formation =
        decode_frame(&frame("formation_update", r#"{"formation":"RANDOM"}"#)).expect("decode");
    assert_eq!(
        formation,
        Some(StreamEvent::FormationUpdate(Formation::Random))
    );
}

#[test]
fn rejects_malformed_payloads() {
    for (event, data) in [
        ("pod_update", "not json"),
        ("pod_update", r#"{"pod":{"id":3,"x":"left","y":1}}"#),
        ("pod_update", r#"{"pod":{"id":3,"y":1}}"#),
        ("pod_update", r#"{"status":"ok"}"#),
        ("formation_update", r#"{"formation":""}"#),
        ("formation_update", r#"{"formation":7}"#),
        ("formation_update", "{}"),
    ] {
        assert!(
            decode_frame(&frame(event, data)).is_err(),
            "{event} {data} should be rejected"
        );
    }
}

#[test]
fn ignores_unrecognized_event_kinds() {
    assert!(decode_frame(&frame("telemetry", r#"{"battery":3}"#))
        .expect("unknown kinds are not errors")
        .is_none());
}

#[test]
fn invalid_utf8_discards_only_its_own_frame() {
    let mut decoder = SseFrameDecoder::new();
    let mut wire = b"event: pod_update\ndata: {\"pod\":{\"id\":1,\"x\":10,\"y\":10}}\n\n".to_vec();
    wire.extend_from_slice(b"event: pod_update\ndata: \xff\xfe\ndata: tail\n\n");
    wire.extend_from_slice(b"event: pod_update\ndata: {\"pod\":{\"id\":2,\"x\":20,\"y\":20}}\n\n");

    let frames = decoder.push(&wire);
    let ids: Vec<PodId> = frames
        .iter()
        .filter_map(|frame| match decode_frame(frame).expect("decode") {
            Some(StreamEvent::PodUpdate(pod)) => Some(pod.id),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec![PodId(1), PodId(2)]);
}

#[test]
fn invalid_utf8_in_event_line_does_not_leak_into_next_frame() {
    let mut decoder = SseFrameDecoder::new();
    assert!(decoder.push(b"event: \xff\ndata: orphan\n").is_empty());
    let frames = decoder.push(b"\nevent: formation_update\ndata: {\"formation\":\"X\"}\n\n");
    assert_eq!(frames, vec![frame("formation_update", r#"{"formation":"X"}"#)]);
}

#[test]
fn non_finite_position_is_an_invalid_field() {
    assert!(matches!(
        validate_position(&Pod::new(PodId(1), f64::NAN, 4.0)),
        Err(IngressError::InvalidField { field: "position", .. })
    ));
    assert!(validate_position(&Pod::new(PodId(1), 3.0, 4.0)).is_ok());
}

#[test]
fn out_of_range_number_is_malformed() {
    assert!(matches!(
        decode_frame(&frame("pod_update", r#"{"pod":{"id":1,"x":1e400,"y":4}}"#)),
        Err(IngressError::MalformedPayload { .. })
    ));
}
