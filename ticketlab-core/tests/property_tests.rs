//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Ticket validity: every generated ticket holds 5+2 distinct in-range ids
//! 2. Reproducibility: identical inputs always give identical tickets
//! 3. Evaluation: match counts are order-insensitive and bounded
//! 4. Ranked order: weight descending, ties by ascending id
//! 5. Diversified bands and ticket confidence bounds

use proptest::prelude::*;
use ticketlab_core::domain::{Draw, Pool, ScoreSnapshot, ScoreVector, Ticket};
use ticketlab_core::evaluator::{evaluate, MatchCount};
use ticketlab_core::generator::{generate_ticket, HybridParams, Strategy as TicketStrategy};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_weights(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![Just(0.0), 0.01..100.0_f64], n).prop_filter(
        "enough positive weights for any strategy",
        move |w| w.iter().filter(|x| **x > 0.0).count() >= if n == 50 { 12 } else { 4 },
    )
}

fn arb_snapshot() -> impl Strategy<Value = ScoreSnapshot> {
    (arb_weights(50), arb_weights(12))
        .prop_map(|(m, s)| ScoreSnapshot::from_weights(m, s).expect("valid weights"))
}

fn arb_strategy() -> impl Strategy<Value = TicketStrategy> {
    prop_oneof![
        Just(TicketStrategy::TopK),
        Just(TicketStrategy::WeightedRandom),
        (6usize..=50, 3usize..=12).prop_map(|(m, s)| TicketStrategy::Hybrid(HybridParams {
            main_top_n: m,
            star_top_n: s,
            widen_on_shortfall: true,
        })),
    ]
}

fn arb_ids(pool: Pool) -> impl Strategy<Value = Vec<u8>> {
    let max = pool.size() as u8;
    prop::sample::subsequence((1..=max).collect::<Vec<u8>>(), pool.picks()).prop_shuffle()
}

fn arb_ticket() -> impl Strategy<Value = Ticket> {
    (arb_ids(Pool::Main), arb_ids(Pool::Star))
        .prop_map(|(m, s)| Ticket::new(&m, &s).expect("valid ids"))
}

// ── 1. Ticket validity ───────────────────────────────────────────────

proptest! {
    #[test]
    fn generated_tickets_are_valid(
        snap in arb_snapshot(),
        strategy in arb_strategy(),
        seed in any::<u64>(),
        draw in 0usize..1000,
        ticket in 0usize..10,
    ) {
        let t = generate_ticket(&snap, strategy, seed, draw, ticket).unwrap();
        for pool in [Pool::Main, Pool::Star] {
            let ids = t.ids(pool);
            prop_assert_eq!(ids.len(), pool.picks());
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(ids.iter().all(|id| pool.contains(*id)));
        }
    }

    // ── 2. Reproducibility ───────────────────────────────────────────

    #[test]
    fn generation_is_reproducible(
        snap in arb_snapshot(),
        strategy in arb_strategy(),
        seed in any::<u64>(),
        draw in 0usize..1000,
    ) {
        let a = generate_ticket(&snap, strategy, seed, draw, 0).unwrap();
        let b = generate_ticket(&snap, strategy, seed, draw, 0).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn weighted_picks_only_positive_ids(
        snap in arb_snapshot(),
        seed in any::<u64>(),
    ) {
        let t = generate_ticket(&snap, TicketStrategy::WeightedRandom, seed, 0, 0).unwrap();
        for pool in [Pool::Main, Pool::Star] {
            for id in t.ids(pool) {
                prop_assert!(snap.pool(pool).weight(*id) > 0.0);
            }
        }
    }

    // ── 3. Evaluation ────────────────────────────────────────────────

    #[test]
    fn evaluation_ignores_draw_order(
        ticket in arb_ticket(),
        main in arb_ids(Pool::Main),
        stars in arb_ids(Pool::Star),
    ) {
        let draw = Draw::new(0, None, main.clone(), stars.clone());
        let mut main_rev = main;
        main_rev.reverse();
        let mut stars_rev = stars;
        stars_rev.reverse();
        let reversed = Draw::new(0, None, main_rev, stars_rev);
        prop_assert_eq!(evaluate(&ticket, &draw).unwrap(), evaluate(&ticket, &reversed).unwrap());
    }

    #[test]
    fn evaluation_is_symmetric_and_bounded(a in arb_ticket(), b in arb_ticket()) {
        let draw_b = Draw::new(0, None, b.main().to_vec(), b.stars().to_vec());
        let draw_a = Draw::new(0, None, a.main().to_vec(), a.stars().to_vec());
        let ab = evaluate(&a, &draw_b).unwrap();
        let ba = evaluate(&b, &draw_a).unwrap();
        prop_assert_eq!(ab, ba);
        prop_assert!(ab <= MatchCount::new(5, 2));
        prop_assert!(ab.main <= 5 && ab.stars <= 2);
    }

    #[test]
    fn self_match_is_full(t in arb_ticket()) {
        let draw = Draw::new(0, None, t.main().to_vec(), t.stars().to_vec());
        prop_assert!(evaluate(&t, &draw).unwrap().is_jackpot());
    }

    // ── 4. Ranked order ──────────────────────────────────────────────

    #[test]
    fn ranked_order_is_weight_desc_then_id_asc(w in arb_weights(12)) {
        let v = ScoreVector::new(Pool::Star, w).unwrap();
        let ranked = v.ranked();
        prop_assert_eq!(ranked.len(), 12);
        for pair in ranked.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (wa, wb) = (v.weight(a), v.weight(b));
            prop_assert!(wa > wb || (wa == wb && a < b));
        }
    }
}

fn arb_positive_snapshot() -> impl Strategy<Value = ScoreSnapshot> {
    (
        prop::collection::vec(0.01..100.0_f64, 50),
        prop::collection::vec(0.01..100.0_f64, 12),
    )
        .prop_map(|(m, s)| ScoreSnapshot::from_weights(m, s).expect("valid weights"))
}

fn rank_of(v: &ScoreVector, id: u8) -> usize {
    v.ranked().iter().position(|r| *r == id).expect("ranked id")
}

proptest! {
    // ── 5. Diversified bands and confidence ──────────────────────────

    #[test]
    fn diversified_respects_rank_bands(
        snap in arb_positive_snapshot(),
        seed in any::<u64>(),
        draw in 0usize..1000,
    ) {
        let t = generate_ticket(&snap, TicketStrategy::Diversified, seed, draw, 0).unwrap();
        let main_ranks: Vec<usize> = t.main().iter().map(|id| rank_of(snap.main(), *id)).collect();
        prop_assert_eq!(main_ranks.iter().filter(|r| **r < 10).count(), 3);
        prop_assert_eq!(main_ranks.iter().filter(|r| (10..30).contains(*r)).count(), 2);
        let star_ranks: Vec<usize> = t.stars().iter().map(|id| rank_of(snap.stars(), *id)).collect();
        prop_assert!(star_ranks.contains(&0));
        prop_assert!(star_ranks.iter().any(|r| (1..6).contains(r)));
    }

    #[test]
    fn confidence_is_a_percentage(snap in arb_snapshot(), t in arb_ticket()) {
        let c = snap.confidence(&t);
        prop_assert!((0.0..=100.0).contains(&c), "confidence {}", c);
    }
}
