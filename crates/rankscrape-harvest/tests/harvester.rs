//! Paginated harvest behaviour against a scripted transport.

mod support;

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use rankscrape_core::{generate_rank_targets, grand_prix_plan, DayKind, StreamId};
use rankscrape_harvest::{HarvestError, ProbeOutcome, RankHarvester, StopOffsets};

use support::{
    client, client_with_backoff, event_inactive, ladder_page, offset, ok, ranking_type, session,
    status, FakeApi,
};

const PAGE: u32 = 26;

fn day_total() -> StreamId {
    StreamId::new("day-total")
}

fn harvester(api: &std::sync::Arc<FakeApi>, concurrency: usize) -> RankHarvester {
    RankHarvester::new(client(api), session(), concurrency)
}

fn previous_day_streams() -> Vec<rankscrape_core::StreamDef> {
    grand_prix_plan(805_103, DayKind::Previous, PAGE).streams
}

#[tokio::test]
async fn list_tail_sets_stop_offset_and_entity_count() {
    let api = FakeApi::new(|req| ok(ladder_page("id", offset(req), 52, PAGE)));

    let harvest = harvester(&api, 100)
        .harvest(&[1, 27, 53], &previous_day_streams())
        .await
        .unwrap();

    assert_eq!(harvest.stop_offsets[&day_total()], Some(53));
    let entities = harvest.entities(&day_total());
    assert_eq!(entities.len(), 52);
    assert_eq!(entities.first().unwrap().rank, 1);
    assert_eq!(entities.last().unwrap().rank, 52);
    assert_eq!(harvest.failed_units, 0);
}

#[tokio::test]
async fn abandoned_probe_contributes_nothing_and_keeps_stop_offset() {
    let api = FakeApi::new(|req| match offset(req) {
        27 => status(500),
        o => ok(ladder_page("id", o, 52, PAGE)),
    });

    let harvest = harvester(&api, 100)
        .harvest(&[1, 27], &previous_day_streams())
        .await
        .unwrap();

    assert_eq!(harvest.entities(&day_total()).len(), 26);
    assert_eq!(harvest.stop_offsets[&day_total()], None);
    assert_eq!(harvest.failed_units, 1);
    let attempts_at_27 = api
        .ranking_calls()
        .iter()
        .filter(|r| offset(r) == 27)
        .count();
    assert_eq!(attempts_at_27, 3);
}

#[tokio::test]
async fn event_inactive_aborts_before_further_probes() {
    let api = FakeApi::new(|_| event_inactive(403));

    let err = harvester(&api, 1)
        .harvest(&[1, 27, 53, 79], &previous_day_streams())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::EventInactive { .. }), "got: {err:?}");
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn streams_keep_independent_stop_offsets() {
    // Day total ends after one page; sub-ladder A runs three pages deep.
    let api = FakeApi::with_delay(Duration::from_millis(2), |req| {
        let len = match ranking_type(req) {
            21 => 26,
            10 => 78,
            _ => 0,
        };
        ok(ladder_page("id", offset(req), len, PAGE))
    });
    let plan = grand_prix_plan(805_103, DayKind::Current, PAGE);
    let streams: Vec<_> = plan.streams.into_iter().take(2).collect();

    let harvest = harvester(&api, 4)
        .harvest(&[1, 27, 53, 79, 105], &streams)
        .await
        .unwrap();

    let category_a = StreamId::new("category-a");
    assert_eq!(harvest.stop_offsets[&day_total()], Some(27));
    assert_eq!(harvest.stop_offsets[&category_a], Some(79));
    assert_eq!(harvest.entities(&day_total()).len(), 26);
    assert_eq!(harvest.entities(&category_a).len(), 78);

    let probed_a: HashSet<u32> = api
        .ranking_calls()
        .iter()
        .filter(|r| ranking_type(r) == 10)
        .map(offset)
        .collect();
    for needed in [1, 27, 53, 79] {
        assert!(probed_a.contains(&needed), "category A never probed {needed}");
    }
    assert!(harvest
        .entities(&category_a)
        .iter()
        .all(|e| e.category.as_deref() == Some("A")));
}

#[tokio::test]
async fn no_call_is_made_beyond_an_observed_tail() {
    let api = FakeApi::new(|req| ok(ladder_page("id", offset(req), 40, PAGE)));
    let targets = generate_rank_targets(99_999, PAGE);

    let harvest = harvester(&api, 1)
        .harvest(&targets, &previous_day_streams())
        .await
        .unwrap();

    let probed: Vec<u32> = api.ranking_calls().iter().map(offset).collect();
    assert_eq!(probed, vec![1, 27, 53]);
    assert_eq!(harvest.skipped_units, targets.len() - 3);
    assert_eq!(harvest.entities(&day_total()).len(), 40);
}

#[tokio::test(start_paused = true)]
async fn retries_stop_once_tail_is_found_below_offset() {
    let api = FakeApi::with_delay(Duration::from_millis(10), |req| match offset(req) {
        53 => status(500),
        o => ok(ladder_page("id", o, 26, PAGE)),
    });

    let harvest = RankHarvester::new(client_with_backoff(&api, 30), session(), 100)
        .harvest(&[1, 27, 53], &previous_day_streams())
        .await
        .unwrap();

    assert_eq!(harvest.stop_offsets[&day_total()], Some(27));
    let calls_at_53 = api.ranking_calls().iter().filter(|r| offset(r) == 53).count();
    assert_eq!(calls_at_53, 1, "no retry after the tail at 27 is known");
    assert_eq!(harvest.skipped_units, 1);
    assert_eq!(harvest.failed_units, 0);
    assert_eq!(harvest.entities(&day_total()).len(), 26);
}

#[tokio::test]
async fn overlapping_pages_keep_first_recorded_entry() {
    // Page at 14 overlaps both neighbours; its scores are marked so the
    // winner is visible.
    let api = FakeApi::new(|req| {
        let o = offset(req);
        let mut page = ladder_page("id", o, 52, PAGE);
        if o == 14 {
            for entry in page["point_rankings"].as_array_mut().unwrap() {
                entry["point"] = serde_json::Value::from(-1);
            }
        }
        ok(page)
    });

    let harvest = harvester(&api, 1)
        .harvest(&[27, 14, 1, 53], &previous_day_streams())
        .await
        .unwrap();

    let entities = harvest.entities(&day_total());
    assert_eq!(entities.len(), 52);
    let keys: HashSet<_> = entities.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys.len(), 52);
    // Offsets run ascending, so page 1 wins ranks 1..=26 and page 14 wins 27..=39.
    let by_rank = |rank: u32| entities.iter().find(|e| e.rank == rank).unwrap();
    assert_eq!(by_rank(20).score, 100_000 - 20);
    assert_eq!(by_rank(30).score, -1);
    assert_eq!(by_rank(45).score, 100_000 - 45);
}

#[tokio::test]
async fn concurrent_harvest_converges_on_true_tail() {
    for _ in 0..5 {
        let len = rand::rng().random_range(1..=600);
        let api = FakeApi::new(move |req| ok(ladder_page("id", offset(req), len, PAGE)));
        let targets = generate_rank_targets(2_000, PAGE);

        let harvest = harvester(&api, 16)
            .harvest(&targets, &previous_day_streams())
            .await
            .unwrap();

        let expected_stop = targets.iter().copied().find(|t| *t > len);
        assert_eq!(harvest.stop_offsets[&day_total()], expected_stop, "len {len}");
        assert_eq!(harvest.entities(&day_total()).len(), len as usize);
        let ranks: Vec<u32> = harvest.entities(&day_total()).iter().map(|e| e.rank).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }
}

#[tokio::test]
async fn probe_skips_offsets_beyond_known_tail() {
    let api = FakeApi::new(|req| ok(ladder_page("id", offset(req), 10, PAGE)));
    let streams = previous_day_streams();
    let harvester = harvester(&api, 1);
    let stops = StopOffsets::new();

    let empty = harvester.probe(&streams[0], 27, &stops).await.unwrap();
    assert_eq!(empty, ProbeOutcome::Page(Vec::new()));
    assert_eq!(stops.get(&day_total()), Some(27));

    let skipped = harvester.probe(&streams[0], 53, &stops).await.unwrap();
    assert_eq!(skipped, ProbeOutcome::Skipped);
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn non_fatal_error_code_counts_as_failed_not_empty() {
    let api = FakeApi::new(|req| match offset(req) {
        27 => ok(serde_json::json!({"error_code": "10001_100001", "message": "busy"})),
        o => ok(ladder_page("id", o, 60, PAGE)),
    });

    let harvest = harvester(&api, 100)
        .harvest(&[1, 27, 53], &previous_day_streams())
        .await
        .unwrap();

    assert_eq!(harvest.stop_offsets[&day_total()], None);
    assert_eq!(harvest.failed_units, 1);
    assert_eq!(harvest.entities(&day_total()).len(), 34);
}
