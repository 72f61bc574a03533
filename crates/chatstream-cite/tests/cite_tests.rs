use chatstream_cite::{
    dedup, find_markers, CitationResolver, DedupResult, Highlight, IndexBase, UnresolvedReason,
};
use chatstream_core::traits::EscapingRenderer;
use chatstream_core::types::{AnswerSegment, Source};
use serde_json::json;

fn src(url: &str) -> Source {
    Source::new(url, format!("title of {url}"))
}

fn text(html: &str) -> AnswerSegment {
    AnswerSegment::Text { html: html.to_string() }
}

fn cited(segments: &[AnswerSegment]) -> Vec<usize> {
    segments
        .iter()
        .filter_map(|s| match s {
            AnswerSegment::Citation { source_index, .. } => Some(*source_index),
            AnswerSegment::Text { .. } => None,
        })
        .collect()
}

#[test]
fn dedup_keeps_first_occurrence_order() {
    let sources = vec![src("a"), src("b"), src("a"), src("c"), src("b")];
    let result = dedup(&sources);
    assert_eq!(result.filtered, vec![src("a"), src("b"), src("c")]);
    let map: Vec<(usize, usize)> = result.index_map.iter().collect();
    assert_eq!(map, vec![(0, 0), (1, 1), (2, 0), (3, 2), (4, 1)]);
}

#[test]
fn dedup_repeats_resolve_to_first_occurrence() {
    let sources = vec![src("A"), src("B"), src("A"), src("A")];
    let result = dedup(&sources);
    let first = result.index_map.get(0);
    assert_eq!(result.index_map.get(2), first);
    assert_eq!(result.index_map.get(3), first);
    assert_eq!(result.index_map.get(1), Some(1));
}

#[test]
fn dedup_is_stable_and_bounded() {
    let inputs = vec![
        vec![],
        vec![src("x")],
        vec![src("x"), src("x"), src("x")],
        vec![src("p"), Source::default(), src("q"), Source::default(), src("p")],
    ];
    for sources in &inputs {
        let once = dedup(sources);
        assert_eq!(once, dedup(sources), "deterministic");
        assert!(once.filtered.len() <= sources.len());
        assert_eq!(once.index_map.len(), sources.len(), "one entry per original index");
        for (_, filtered) in once.index_map.iter() {
            assert!(filtered < once.filtered.len());
        }
    }
}

#[test]
fn dedup_groups_sources_without_url() {
    let result = dedup(&[Source::default(), src("u"), Source { url: None, title: Some("other".into()) }]);
    assert_eq!(result.filtered.len(), 2);
    assert_eq!(result.index_map.get(2), Some(0));
}

#[test]
fn source_for_follows_index_map() {
    let d = dedup(&[src("a"), src("b"), src("a")]);
    assert_eq!(d.source_for(2), Some((0, &src("a"))));
    assert_eq!(d.source_for(1), Some((1, &src("b"))));
    assert_eq!(d.source_for(3), None);
}

#[test]
fn map_entry_past_filtered_list_is_out_of_range() {
    let d: DedupResult = serde_json::from_value(json!({
        "filtered": [{"url": "a", "title": "A"}],
        "index_map": [0, 4]
    }))
    .unwrap();
    let resolver = CitationResolver::default();
    assert_eq!(resolver.resolve_index(1, &d), Ok(0));
    assert_eq!(resolver.resolve_index(2, &d), Err(UnresolvedReason::OutOfRange));
    assert_eq!(resolver.resolve_index(3, &d), Err(UnresolvedReason::UnknownSource));

    let report = resolver.resolve_with_report("x[^1] y[^2]", &d, Highlight::none(), &EscapingRenderer);
    assert_eq!(cited(&report.segments), vec![0]);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].reason, UnresolvedReason::OutOfRange);
}

#[test]
fn finds_marker_variants_with_offsets() {
    let t = "a[1] b[^2] c[^{3}] d[$4] e[^5^] f[x] g[^]";
    let markers = find_markers(t);
    let numbers: Vec<usize> = markers.iter().map(|m| m.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    for m in &markers {
        let literal = &t[m.start..m.end()];
        assert!(literal.starts_with('[') && literal.ends_with(']'), "{literal}");
    }
    assert_eq!(&t[markers[2].start..markers[2].end()], "[^{3}]");
}

#[test]
fn resolves_two_citations_into_four_segments() {
    let answer = "Paris is the capital.[^1] It has a famous tower.[^2]";
    let d = dedup(&[src("https://paris.example"), src("https://tower.example")]);
    let segments = CitationResolver::default().resolve(answer, &d, Highlight::none(), &EscapingRenderer);

    assert_eq!(segments.len(), 4);
    assert_eq!(segments[0], text("Paris is the capital."));
    assert_eq!(segments[2], text(" It has a famous tower."));
    assert_eq!(cited(&segments), vec![0, 1]);
    match &segments[3] {
        AnswerSegment::Citation { source, highlighted, .. } => {
            assert_eq!(source.url.as_deref(), Some("https://tower.example"));
            assert!(!highlighted);
        }
        other => panic!("expected citation, got {other:?}"),
    }
}

#[test]
fn citations_follow_dedup_remapping() {
    // Sources 1 and 3 share a URL, so [^3] points at the same slot as [^1].
    let d = dedup(&[src("a"), src("b"), src("a")]);
    let segments = CitationResolver::default().resolve("x[^1]y[^3]z[^2]", &d, Highlight::none(), &EscapingRenderer);
    assert_eq!(cited(&segments), vec![0, 0, 1]);
}

#[test]
fn unresolved_marker_stays_as_prose() {
    let answer = "Known.[^1] Unknown.[^99] Zero.[^0]";
    let d = dedup(&[src("a"), src("b")]);
    let report = CitationResolver::default().resolve_with_report(answer, &d, Highlight::none(), &EscapingRenderer);

    assert_eq!(cited(&report.segments), vec![0]);
    assert_eq!(report.segments.last(), Some(&text(" Unknown.[^99] Zero.[^0]")));
    assert_eq!(report.unresolved.len(), 2);
    assert!(report.unresolved.iter().all(|u| u.reason == UnresolvedReason::UnknownSource));
    assert_eq!(report.unresolved[0].marker.number, 99);
}

#[test]
fn zero_based_numbering() {
    let d = dedup(&[src("a"), src("b")]);
    let resolver = CitationResolver::new(IndexBase::Zero);
    let segments = resolver.resolve("x[0]y[1]z[2]", &d, Highlight::none(), &EscapingRenderer);
    assert_eq!(cited(&segments), vec![0, 1]);
    assert_eq!(segments.last(), Some(&text("z[2]")));
}

#[test]
fn no_markers_yields_single_text_segment() {
    let d = dedup(&[]);
    let resolver = CitationResolver::default();
    assert_eq!(
        resolver.resolve("plain answer", &d, Highlight::none(), &EscapingRenderer),
        vec![text("plain answer")]
    );
    assert!(resolver.resolve("", &d, Highlight::none(), &EscapingRenderer).is_empty());
}

#[test]
fn segments_reconstruct_the_text() {
    let answer = "[^1]Lead. Middle[^2][^1] tail [^7] end";
    let d = dedup(&[src("a"), src("b")]);
    let segments = CitationResolver::default().resolve(answer, &d, Highlight::none(), &EscapingRenderer);
    let rebuilt: String = segments
        .iter()
        .map(|s| match s {
            AnswerSegment::Text { html } => html.clone(),
            AnswerSegment::Citation { source_index, .. } => format!("[^{}]", source_index + 1),
        })
        .collect();
    assert_eq!(rebuilt, answer);
}

#[test]
fn hover_highlights_exactly_one_source() {
    let h = Highlight::none().on_hover(2);
    assert_eq!(h.states(4), vec![false, false, true, false]);
    let h = h.on_hover(0);
    assert_eq!(h.states(4), vec![true, false, false, false]);
    assert_eq!(h.on_unhover().states(4), vec![false; 4]);
    assert_eq!(h.current(), Some(0));
}

#[test]
fn highlight_changes_flags_not_resolution() {
    let answer = "a[^1] b[^2] c[^3]";
    let d = dedup(&[src("x"), src("y"), src("x")]);
    let resolver = CitationResolver::default();
    let plain = resolver.resolve(answer, &d, Highlight::none(), &EscapingRenderer);
    let hovered = resolver.resolve(answer, &d, Highlight::none().on_hover(0), &EscapingRenderer);

    assert_eq!(cited(&plain), cited(&hovered));
    let flags: Vec<bool> = hovered
        .iter()
        .filter_map(|s| match s {
            AnswerSegment::Citation { highlighted, .. } => Some(*highlighted),
            AnswerSegment::Text { .. } => None,
        })
        .collect();
    // Both markers of the shared source light up together.
    assert_eq!(flags, vec![true, false, true]);
}

#[test]
fn reflagging_matches_fresh_resolution() {
    let answer = "a[^1] b[^2]";
    let d = dedup(&[src("x"), src("y")]);
    let resolver = CitationResolver::default();
    let resolved = resolver.resolve(answer, &d, Highlight::none(), &EscapingRenderer);
    let hover = Highlight::none().on_hover(1);
    assert_eq!(hover.apply(&resolved), resolver.resolve(answer, &d, hover, &EscapingRenderer));
    assert_eq!(hover.on_unhover().apply(&hover.apply(&resolved)), resolved);
}
