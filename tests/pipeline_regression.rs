//! Pipeline Regression Tests
//!
//! Drives the full decode -> reconstruct -> classify -> record path through
//! the public API and asserts on the history log, the cluster model and the
//! decoder's retained state.

use harmonic_pipeline::config::PipelineConfig;
use harmonic_pipeline::{
    AnalysisPipeline, FingerprintDecoder, FingerprintLibrary, ProcessingError, RetentionPolicy,
};
use std::sync::{Arc, Mutex};
use std::thread;

/// Timestamps at uniform 1-unit spacing.
fn uniform(n: u32) -> Vec<f64> {
    (0..n).map(f64::from).collect()
}

/// Timestamps whose intervals repeat `cycle`.
fn cyclic(n: usize, cycle: &[f64]) -> Vec<f64> {
    let mut t = 0.0;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if i > 0 {
            t += cycle[(i - 1) % cycle.len()];
        }
        out.push(t);
    }
    out
}

fn small_pipeline(library: FingerprintLibrary) -> AnalysisPipeline {
    AnalysisPipeline::new(library, (16, 16), 4).unwrap()
}

/// Reference library holding the spectrum of each named stream.
fn library_from(streams: &[(&str, Vec<f64>)]) -> FingerprintLibrary {
    let mut reference = FingerprintDecoder::new(FingerprintLibrary::new());
    streams
        .iter()
        .map(|(name, stream)| {
            reference.decode(stream).unwrap();
            (*name, reference.last_spectrum().unwrap().to_vec())
        })
        .collect()
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn empty_stream_returns_no_result_and_leaves_history_unchanged() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());
    pipeline.analyze(&cyclic(32, &[1.0, 2.0])).unwrap();
    let before = pipeline.get_history().len();

    assert_eq!(pipeline.analyze(&[]), Ok(None));
    assert_eq!(pipeline.get_history().len(), before);
}

#[test]
fn uniform_stream_with_empty_library_still_classifies() {
    let mut pipeline = AnalysisPipeline::from_config(&PipelineConfig::default()).unwrap();
    let group = pipeline.analyze(&uniform(20)).unwrap();

    assert_eq!(group, Some(0));
    assert!(pipeline.decoder().last_match().is_none());
    assert_eq!(
        pipeline.decoder().last_result_summary(),
        "Last harmonic match: none (19 bins)"
    );

    let history = pipeline.get_history();
    assert_eq!(history.len(), 1);
    let entry = history.last().unwrap();
    assert_eq!(entry.group_id, 0);
    assert_eq!(entry.field.len(), 256 * 256);
    assert!(entry.matched_tag.is_none());
}

#[test]
fn far_second_field_still_lands_in_group_zero() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());

    let first = pipeline.analyze(&cyclic(64, &[1.0, 1.0, 1.0, 2.0])).unwrap();
    assert_eq!(first, Some(0));
    let centroid = pipeline.classifier().centroids()[0].clone();

    let second = pipeline
        .analyze(&cyclic(64, &[0.1, 0.1, 0.1, 0.1, 0.1, 5.0]))
        .unwrap();
    assert_eq!(second, Some(0));

    // The second field differs from the fitted centroid, which never moves
    let second_field = &pipeline.get_history().last().unwrap().field;
    assert_ne!(second_field, &centroid);
    assert_eq!(pipeline.classifier().centroids(), &[centroid]);
    assert_eq!(pipeline.classifier().occupied_clusters(), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn fewer_than_sixteen_deltas_never_decode() {
    let library = library_from(&[("beat", cyclic(40, &[1.0, 3.0]))]);
    let mut decoder = FingerprintDecoder::new(library);
    for n in 0u32..=16 {
        let err = decoder.decode(&uniform(n)).unwrap_err();
        assert!(matches!(err, ProcessingError::InsufficientData { needed: 16, .. }));
        assert!(decoder.last_spectrum().is_none());
    }
    assert!(decoder.decode(&uniform(17)).is_ok());
}

#[test]
fn failed_runs_never_append() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());
    let streams = [
        cyclic(30, &[1.0, 2.0]),
        uniform(3),
        Vec::new(),
        cyclic(30, &[2.0, 1.0, 1.0]),
        uniform(16),
    ];
    let results: Vec<Option<usize>> = streams
        .iter()
        .map(|s| pipeline.analyze(s).unwrap())
        .collect();

    assert_eq!(results, vec![Some(0), None, None, Some(0), None]);
    assert_eq!(pipeline.get_history().len(), 2);
    let sequences: Vec<u64> = pipeline.get_history().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1]);

    let stats = pipeline.stats();
    assert_eq!(stats.runs, 5);
    assert_eq!(stats.classified, 2);
    assert_eq!(stats.insufficient_data, 3);
}

#[test]
fn failed_first_run_does_not_fit_model() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());
    pipeline.analyze(&uniform(5)).unwrap();
    assert!(!pipeline.classifier().is_fitted());
    assert!(pipeline.reconstructor().last_field().is_none());
}

#[test]
fn first_fit_is_deterministic_across_runs() {
    let streams = vec![
        cyclic(48, &[1.0, 1.5]),
        cyclic(48, &[0.1, 0.1, 5.0]),
        cyclic(48, &[4.0, 9.0, 6.0, 12.0]),
        uniform(48),
    ];
    let run = || {
        let mut pipeline = small_pipeline(FingerprintLibrary::new());
        let groups: Vec<Option<usize>> =
            streams.iter().map(|s| pipeline.analyze(s).unwrap()).collect();
        let centroids = pipeline.classifier().centroids().to_vec();
        (groups, centroids)
    };
    assert_eq!(run(), run());
}

#[test]
fn same_stream_twice_gives_same_group() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());
    pipeline.analyze(&cyclic(40, &[1.0, 2.0, 3.0])).unwrap();

    let stream = cyclic(40, &[0.5, 0.5, 4.0]);
    let a = pipeline.analyze(&stream).unwrap();
    let b = pipeline.analyze(&stream).unwrap();
    assert_eq!(a, b);

    let history = pipeline.get_history();
    let n = history.len();
    assert_eq!(history.entries()[n - 1].field, history.entries()[n - 2].field);
}

// ============================================================================
// Fingerprint matching through the pipeline
// ============================================================================

#[test]
fn recorded_tag_follows_best_reference() {
    let beat = cyclic(64, &[1.0, 1.0, 1.0, 2.0]);
    let burst = cyclic(64, &[0.1, 0.1, 0.1, 0.1, 0.1, 5.0]);
    let library = library_from(&[("beat", beat.clone()), ("burst", burst.clone())]);
    let mut pipeline = small_pipeline(library);

    pipeline.analyze(&burst).unwrap();
    pipeline.analyze(&beat).unwrap();

    let tags: Vec<Option<&str>> = pipeline
        .get_history()
        .iter()
        .map(|e| e.matched_tag.as_deref())
        .collect();
    assert_eq!(tags, vec![Some("burst"), Some("beat")]);
    assert_eq!(pipeline.stats().fingerprint_matches, 2);
    assert!(pipeline.decoder().last_match().unwrap().score > 0.99);
}

#[test]
fn library_from_config_table_is_used() {
    let beat = cyclic(40, &[1.0, 2.0]);
    let mut reference = FingerprintDecoder::new(FingerprintLibrary::new());
    reference.decode(&beat).unwrap();

    let mut config = PipelineConfig::default();
    config.reconstruction.rows = 8;
    config.reconstruction.cols = 8;
    config
        .fingerprints
        .insert("two-step".to_string(), reference.last_spectrum().unwrap().to_vec());

    let mut pipeline = AnalysisPipeline::from_config(&config).unwrap();
    pipeline.analyze(&beat).unwrap();
    assert_eq!(pipeline.decoder().last_tag(), Some("two-step"));
}

// ============================================================================
// Malformed streams
// ============================================================================

#[test]
fn reversed_stream_decodes_to_silent_spectrum() {
    let reversed: Vec<f64> = uniform(24).into_iter().rev().collect();
    let library = library_from(&[("beat", cyclic(40, &[1.0, 3.0]))]);

    let mut decoder = FingerprintDecoder::new(library.clone());
    assert_eq!(decoder.decode(&reversed), Ok(None));
    assert_eq!(decoder.last_tag(), None);
    assert!(decoder.last_spectrum().unwrap().iter().all(|m| m.abs() < 1e-12));

    let mut pipeline = AnalysisPipeline::new(library, (4, 4), 4).unwrap();
    assert_eq!(pipeline.analyze(&reversed), Ok(Some(0)));
    assert_eq!(pipeline.decoder().last_tag(), None);
    let entry = pipeline.get_history().last().unwrap();
    assert!(entry.field.iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn non_finite_timestamp_records_nan_field() {
    let library = library_from(&[("beat", cyclic(40, &[1.0, 3.0]))]);

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut stream = cyclic(24, &[1.0, 2.0]);
        stream[3] = bad;

        let mut decoder = FingerprintDecoder::new(library.clone());
        assert_eq!(decoder.decode(&stream), Ok(None), "timestamp {bad}");
        assert_eq!(decoder.last_tag(), None);
        assert!(decoder.last_spectrum().unwrap().iter().all(|m| m.is_nan()));

        // Still classified and recorded; every cell of the field is NaN
        let mut pipeline = AnalysisPipeline::new(library.clone(), (4, 4), 4).unwrap();
        assert_eq!(pipeline.analyze(&stream), Ok(Some(0)));
        assert_eq!(pipeline.decoder().last_tag(), None);
        let entry = pipeline.get_history().last().unwrap();
        assert!(entry.matched_tag.is_none());
        assert_eq!(entry.field.len(), 16);
        assert!(entry.field.iter().all(|v| v.is_nan()));
    }
}

// ============================================================================
// Config gating
// ============================================================================

#[test]
fn rejected_config_never_builds_pipeline() {
    let mut zero_sigma = PipelineConfig::default();
    zero_sigma.reconstruction.smoothing_sigma = 0.0;
    assert!(zero_sigma.validate().is_err());
    assert!(AnalysisPipeline::with_library(&zero_sigma, FingerprintLibrary::new()).is_err());

    let mut zero_rows = PipelineConfig::default();
    zero_rows.reconstruction.rows = 0;
    assert!(AnalysisPipeline::from_config(&zero_rows).is_err());

    assert!(AnalysisPipeline::new(FingerprintLibrary::new(), (0, 16), 4).is_err());
}

// ============================================================================
// Retention and sharing
// ============================================================================

#[test]
fn bounded_history_keeps_newest_entries() {
    let mut pipeline =
        small_pipeline(FingerprintLibrary::new()).with_retention(RetentionPolicy::MaxEntries(2));
    for _ in 0..4 {
        pipeline.analyze(&cyclic(24, &[1.0, 2.0])).unwrap();
    }
    let history = pipeline.get_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.entries()[0].sequence, 2);
    assert_eq!(history.stats().evicted, 2);
}

#[test]
fn pipeline_shared_behind_mutex() {
    let pipeline = Arc::new(Mutex::new(small_pipeline(FingerprintLibrary::new())));

    let handles: Vec<_> = (0u32..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                let stream = cyclic(32, &[1.0, 1.0 + f64::from(i)]);
                for _ in 0..3 {
                    pipeline.lock().unwrap().analyze(&stream).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let pipeline = pipeline.lock().unwrap();
    assert_eq!(pipeline.get_history().len(), 12);
    assert!(pipeline.get_history().iter().all(|e| e.group_id == 0));
}

#[test]
fn history_exports_json() {
    let mut pipeline = small_pipeline(FingerprintLibrary::new());
    pipeline.analyze(&cyclic(24, &[1.0, 2.0])).unwrap();
    let json = pipeline.get_history().to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    assert_eq!(parsed[0]["group_id"], 0);
}
