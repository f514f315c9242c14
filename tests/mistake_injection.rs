use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::keyboard::{adjacent_typo_char, typo_candidates};
use typist::mistake::{emit_char, plan_mistake};
use typist::settings::Settings;
use typist::sink::BufferSink;

#[test]
fn candidates_come_from_neighboring_keys() {
    assert_eq!(typo_candidates('a'), &['q', 'w', 's', 'z', 'x']);
    assert_eq!(typo_candidates('A'), typo_candidates('a'));
    assert!(typo_candidates('5').contains(&'4'));
    assert!(typo_candidates('5').contains(&'t'));
}

#[test]
fn typos_preserve_the_original_case() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let wrong = adjacent_typo_char('A', &mut rng);
        assert!(
            wrong.is_ascii_uppercase(),
            "expected an uppercase neighbor, got {wrong:?}"
        );
    }
    for _ in 0..100 {
        let wrong = adjacent_typo_char('k', &mut rng);
        assert!(typo_candidates('k').contains(&wrong));
    }
}

#[test]
fn characters_off_the_keymap_fall_back_to_letters() {
    let mut rng = StdRng::seed_from_u64(12);
    for c in ['%', 'é', '★'] {
        let wrong = adjacent_typo_char(c, &mut rng);
        assert!(
            wrong.is_ascii_lowercase(),
            "fallback for {c:?} should draw a letter, got {wrong:?}"
        );
    }
}

#[test]
fn line_breaks_are_never_mistyped() {
    let settings = Settings {
        mistake_rate: 100,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..50 {
        assert_eq!(plan_mistake('\n', &settings, &mut rng), None);
    }
}

#[test]
fn disabling_self_correction_disables_typos() {
    let settings = Settings {
        mistake_rate: 100,
        self_correction: false,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(14);
    assert_eq!(plan_mistake('a', &settings, &mut rng), None);
}

#[test]
fn zero_rate_never_plans_a_typo() {
    let settings = Settings {
        mistake_rate: 0,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(15);
    for c in "The quick brown fox jumps over the lazy dog.".chars() {
        assert_eq!(plan_mistake(c, &settings, &mut rng), None);
    }
}

#[test]
fn full_rate_always_plans_a_typo_within_bounds() {
    let settings = Settings {
        mistake_rate: 100,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(16);
    for _ in 0..50 {
        let plan = plan_mistake('h', &settings, &mut rng).expect("rate 100 must fire");
        assert!(typo_candidates('h').contains(&plan.wrong_char));
        assert!((100..=300).contains(&plan.hold_ms));
        assert!((50..=150).contains(&plan.recovery_ms));
    }
}

#[tokio::test(start_paused = true)]
async fn corrected_typo_leaves_only_the_right_character() {
    let settings = Settings {
        mistake_rate: 100,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(17);
    let mut sink = BufferSink::new();

    let plan = emit_char('r', &settings, &mut sink, &mut rng)
        .await
        .expect("buffer writes cannot fail")
        .expect("rate 100 must fire");

    assert_ne!(plan.wrong_char, 'r');
    assert_eq!(sink.contents(), "r");
}

#[tokio::test(start_paused = true)]
async fn clean_emission_skips_the_correction_dance() {
    let settings = Settings {
        mistake_rate: 0,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(18);
    let mut sink = BufferSink::new();

    let plan = emit_char('r', &settings, &mut sink, &mut rng)
        .await
        .expect("buffer writes cannot fail");

    assert_eq!(plan, None);
    assert_eq!(sink.contents(), "r");
}
