use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::utils::test_utils::{releases, ScriptedSource};

fn text(s: &str) -> DeltaEvent {
    DeltaEvent::Text(s.to_string())
}

async fn collect<S: ByteSource>(
    decoder: &mut StreamDecoder<S>,
) -> (Vec<DeltaEvent>, Option<StreamError>) {
    let mut events = Vec::new();
    loop {
        match decoder.next_event().await {
            Ok(Some(event)) => events.push(event),
            Ok(None) => return (events, None),
            Err(err) => return (events, Some(err)),
        }
    }
}

async fn decode_all(source: ScriptedSource) -> Vec<DeltaEvent> {
    let mut decoder = StreamDecoder::new(source);
    let (events, err) = collect(&mut decoder).await;
    assert_eq!(err, None);
    events
}

#[tokio::test]
async fn decoded_events_do_not_depend_on_chunk_boundaries() {
    let body = b"data: {\"delta\":\"Hi\"}\n";

    for size in [1, 2, 20, body.len()] {
        let events = decode_all(ScriptedSource::split_every(body, size)).await;
        assert_eq!(events, vec![text("Hi")], "chunk size {size}");
    }
}

#[tokio::test]
async fn every_split_point_of_a_mixed_body_decodes_identically() {
    let body = concat!(
        "0:{\"type\":\"text-delta\",\"textDelta\":\"你好\"}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" wörld\"}}]}\r\n",
        "\n",
        "plain 🙂 text\n",
        "data: [DONE]\n",
    )
    .as_bytes();
    let expected = vec![
        text("你好"),
        text(" wörld"),
        text("plain 🙂 text"),
        DeltaEvent::Done,
    ];

    for split in 1..body.len() {
        let (head, tail) = body.split_at(split);
        let events = decode_all(ScriptedSource::new([head.to_vec(), tail.to_vec()])).await;
        assert_eq!(events, expected, "split at byte {split}");
    }
}

#[tokio::test]
async fn done_marker_ends_the_sequence_even_with_trailing_bytes() {
    let source = ScriptedSource::new([
        "data: {\"delta\":\"a\"}\ndata: [DONE]\ndata: {\"delta\":\"late\"}\n",
        "data: {\"delta\":\"later\"}\n",
    ]);
    let released = source.release_counter();
    let mut decoder = StreamDecoder::new(source);

    let (events, err) = collect(&mut decoder).await;
    assert_eq!(err, None);
    assert_eq!(events, vec![text("a"), DeltaEvent::Done]);
    assert_eq!(releases(&released), 1);
    assert!(decoder.is_source_released());
}

#[tokio::test]
async fn finished_decoder_is_not_restartable() {
    let mut decoder = StreamDecoder::new(ScriptedSource::new(["data: [DONE]\n"]));
    assert_eq!(decoder.next_event().await, Ok(Some(DeltaEvent::Done)));
    assert!(decoder.is_finished());
    assert_eq!(decoder.next_event().await, Ok(None));
    assert_eq!(decoder.next_event().await, Ok(None));
}

#[tokio::test]
async fn malformed_frames_do_not_abort_decoding() {
    let events = decode_all(ScriptedSource::new([
        "data: {not json\n",
        "0:{\"type\":\"text-delta\",\"textDelta\":\"foo\"}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"bar\"}}]}\n",
    ]))
    .await;
    assert_eq!(events, vec![text("foo"), text("bar")]);
}

#[tokio::test]
async fn end_of_source_without_marker_completes_implicitly() {
    let source = ScriptedSource::new(["Hello", " world"]);
    let released = source.release_counter();
    let mut decoder = StreamDecoder::new(source);

    let (events, err) = collect(&mut decoder).await;
    assert_eq!(err, None);
    assert_eq!(events, vec![text("Hello world")]);
    assert_eq!(releases(&released), 1);
}

#[tokio::test]
async fn empty_lines_are_discarded() {
    let events = decode_all(ScriptedSource::new(["\n\r\n   \n", "line\n\n"])).await;
    assert_eq!(events, vec![text("line")]);
}

#[tokio::test]
async fn read_errors_propagate_and_release_the_source() {
    let source = ScriptedSource::new(["data: {\"delta\":\"a\"}\n"]).then_fail("reset by peer");
    let released = source.release_counter();
    let mut decoder = StreamDecoder::new(source);

    let (events, err) = collect(&mut decoder).await;
    assert_eq!(events, vec![text("a")]);
    assert_eq!(err, Some(StreamError::Read("reset by peer".into())));
    assert_eq!(releases(&released), 1);
    assert_eq!(decoder.next_event().await, Ok(None));
}

#[tokio::test]
async fn in_band_error_frames_end_the_stream() {
    let source = ScriptedSource::new([
        "data: {\"delta\":\"a\"}\n",
        "data: {\"error\":{\"message\":\"quota exceeded\"}}\n",
        "data: {\"delta\":\"b\"}\n",
    ]);
    let mut decoder = StreamDecoder::new(source);

    let (events, err) = collect(&mut decoder).await;
    assert_eq!(events, vec![text("a")]);
    assert_eq!(err, Some(StreamError::Remote("quota exceeded".into())));
}

#[tokio::test]
async fn plain_text_lines_shaped_like_fields_or_parts_are_kept() {
    let events = decode_all(ScriptedSource::new([
        "Here is the answer:\nx: [1, 2]\n:) thanks\nid: 42\n",
        "10:30 standup\n",
    ]))
    .await;
    assert_eq!(
        events,
        vec![
            text("Here is the answer:"),
            text("x: [1, 2]"),
            text(":) thanks"),
            text("id: 42"),
            text("10:30 standup"),
        ]
    );
}

#[tokio::test]
async fn bare_error_object_between_text_lines_is_not_fatal() {
    let events = decode_all(ScriptedSource::new([
        "before\n{\"error\":\"not found\"}\nafter\n",
    ]))
    .await;
    assert_eq!(events, vec![text("before"), text("after")]);
}

#[tokio::test]
async fn event_stream_fields_are_skipped_once_data_frames_appear() {
    let events = decode_all(ScriptedSource::new([
        "data: {\"delta\":\"a\"}\n",
        "event: ping\nid: 7\n: keep-alive\n",
        "data: {\"delta\":\"b\"}\n",
    ]))
    .await;
    assert_eq!(events, vec![text("a"), text("b")]);
}

#[tokio::test]
async fn declared_event_stream_skips_leading_fields() {
    let mut decoder = StreamDecoder::new(ScriptedSource::new([
        "event: message_start\ndata: {\"delta\":\"a\"}\n",
    ]))
    .with_event_stream();
    let (events, err) = collect(&mut decoder).await;
    assert_eq!(err, None);
    assert_eq!(events, vec![text("a")]);
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_read() {
    let source = ScriptedSource::new(["data: {\"delta\":\"partial\"}\n"]).then_hang();
    let released = source.release_counter();
    let token = CancellationToken::new();
    let mut decoder = StreamDecoder::new(source).with_cancellation(token.clone());

    assert_eq!(decoder.next_event().await, Ok(Some(text("partial"))));

    let canceller = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            token.cancel();
        }
    });

    assert_eq!(decoder.next_event().await, Err(StreamError::Cancelled));
    canceller.await.expect("canceller task");
    assert_eq!(releases(&released), 1);
    assert_eq!(decoder.next_event().await, Ok(None));
}

#[tokio::test]
async fn cancelled_decoder_drops_already_buffered_lines() {
    let token = CancellationToken::new();
    let mut decoder = StreamDecoder::new(ScriptedSource::new([
        "data: {\"delta\":\"a\"}\ndata: {\"delta\":\"b\"}\n",
    ]))
    .with_cancellation(token.clone());

    assert_eq!(decoder.next_event().await, Ok(Some(text("a"))));
    token.cancel();
    assert_eq!(decoder.next_event().await, Err(StreamError::Cancelled));
}

#[tokio::test]
async fn dropping_an_unfinished_decoder_releases_the_source() {
    let source = ScriptedSource::new(["data: {\"delta\":\"a\"}\n"]).then_hang();
    let released = source.release_counter();
    let mut decoder = StreamDecoder::new(source);

    assert_eq!(decoder.next_event().await, Ok(Some(text("a"))));
    assert_eq!(releases(&released), 0);
    drop(decoder);
    assert_eq!(releases(&released), 1);
}

#[tokio::test]
async fn split_multibyte_characters_survive_chunking() {
    let body = "data: {\"delta\":\"héllo 世界\"}\n".as_bytes();
    let events = decode_all(ScriptedSource::split_every(body, 1)).await;
    assert_eq!(events, vec![text("héllo 世界")]);
}

#[tokio::test]
async fn into_stream_yields_the_same_sequence() {
    let decoder = StreamDecoder::new(ScriptedSource::new([
        "0:\"one\"\n",
        "{\"delta\":\"two\"}\n",
        "data: [DONE]\n",
    ]));
    let events: Vec<_> = decoder.into_stream().collect().await;
    assert_eq!(
        events,
        vec![Ok(text("one")), Ok(text("two")), Ok(DeltaEvent::Done)]
    );
}

#[tokio::test]
async fn into_stream_ends_after_an_error() {
    let decoder = StreamDecoder::new(ScriptedSource::new(["a\n"]).then_fail("boom"));
    let events: Vec<_> = decoder.into_stream().collect().await;
    assert_eq!(
        events,
        vec![Ok(text("a")), Err(StreamError::Read("boom".into()))]
    );
}
