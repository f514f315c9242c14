use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::error::TypistError;
use typist::estimate::rehearse;
use typist::settings::Settings;
use typist::verify;

#[test]
fn rehearsal_reproduces_the_source_text() {
    let text = "First paragraph, with a pause.\n\nSecond one ends here!\n";
    let settings = Settings {
        wpm: 80,
        variance: 40,
        mistake_rate: 30,
        thinking_pause: true,
        self_correction: true,
        paragraph_breaks: 2,
    };

    let mut rng = StdRng::seed_from_u64(21);
    let rehearsal = rehearse(text, &settings, &mut rng).expect("settings are valid");

    assert!(
        verify::matches(text, &rehearsal.typed),
        "typed text drifted from the source"
    );
    assert_eq!(rehearsal.chars, text.chars().count());
    assert_eq!(rehearsal.paragraphs, 2);
    assert!(rehearsal.estimated_ms > 0);
    assert_eq!(
        rehearsal.estimated(),
        Duration::from_millis(rehearsal.estimated_ms)
    );
}

#[test]
fn full_rate_counts_a_mistake_per_typable_character() {
    let settings = Settings {
        mistake_rate: 100,
        ..Default::default()
    };

    let mut rng = StdRng::seed_from_u64(22);
    let rehearsal = rehearse("ab\ncd", &settings, &mut rng).expect("settings are valid");

    // The line break is never mistyped.
    assert_eq!(rehearsal.mistakes, 4);
    assert_eq!(rehearsal.typed, "ab\ncd");
}

#[test]
fn mistakes_extend_the_estimate() {
    let text = "steady hands type this";
    let base = Settings {
        wpm: 60,
        variance: 0,
        thinking_pause: false,
        self_correction: true,
        paragraph_breaks: 0,
        mistake_rate: 0,
    };
    let sloppy = Settings {
        mistake_rate: 100,
        ..base.clone()
    };

    let mut rng = StdRng::seed_from_u64(23);
    let clean = rehearse(text, &base, &mut rng).expect("settings are valid");
    let mut rng = StdRng::seed_from_u64(23);
    let messy = rehearse(text, &sloppy, &mut rng).expect("settings are valid");

    assert_eq!(clean.mistakes, 0);
    assert!(
        messy.estimated_ms > clean.estimated_ms,
        "corrections must add hold and recovery time"
    );
}

#[test]
fn same_seed_gives_the_same_rehearsal() {
    let text = "Deterministic runs make debugging bearable.";
    let settings = Settings {
        mistake_rate: 40,
        variance: 30,
        ..Default::default()
    };

    let mut a = StdRng::seed_from_u64(9);
    let mut b = StdRng::seed_from_u64(9);
    let first = rehearse(text, &settings, &mut a).expect("settings are valid");
    let second = rehearse(text, &settings, &mut b).expect("settings are valid");

    assert_eq!(first, second);
}

#[test]
fn out_of_range_settings_are_rejected() {
    let mut rng = StdRng::seed_from_u64(24);
    let err = rehearse(
        "Hi",
        &Settings {
            variance: 101,
            ..Default::default()
        },
        &mut rng,
    )
    .expect_err("variance above 100 must be refused");
    assert!(matches!(err, TypistError::Settings(_)));
}

#[test]
fn divergence_is_found_at_the_first_mismatch() {
    assert_eq!(verify::first_divergence("abc", "abc"), None);
    assert_eq!(verify::first_divergence("", ""), None);
    assert_eq!(verify::first_divergence("abc", "abd"), Some(2));
    assert_eq!(verify::first_divergence("abc", "ab"), Some(2));
    assert_eq!(verify::first_divergence("ab", "abc"), Some(2));
    assert!(verify::matches("same", "same"));
    assert!(!verify::matches("same", "sane"));
}

#[test]
fn differences_are_bounded_by_the_limit() {
    let diffs = verify::differences("abcd", "axcy", 10);
    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0].position, 1);
    assert_eq!(diffs[0].expected, Some('b'));
    assert_eq!(diffs[0].actual, Some('x'));
    assert_eq!(diffs[1].position, 3);

    assert_eq!(verify::differences("abcd", "axcy", 1).len(), 1);
    assert!(verify::differences("same", "same", 5).is_empty());
}

#[test]
fn length_mismatches_show_a_missing_side() {
    let diffs = verify::differences("abc", "ab", 10);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].position, 2);
    assert_eq!(diffs[0].expected, Some('c'));
    assert_eq!(diffs[0].actual, None);
}
