//! Integration tests for the topictrack segmentation engines.

use std::fs;
use tempfile::tempdir;
use topictrack::{
    window_diff_per_document, BetaPrior, Config, Corpus, CorpusSource, DpSegmentor, GreedySegmentor,
    LanguageModelDp, LogSink, MemorySink, SegmentationConfig, Segmentor, SyntheticConfig, SyntheticCorpus, TopicTrackError,
    WriterSink,
};

fn config(beta: f64) -> SegmentationConfig {
    SegmentationConfig {
        beta: BetaPrior::Symmetric(beta),
        ..SegmentationConfig::default()
    }
}

/// Two identical documents with a clear topic change after the second sentence.
fn identical_documents() -> Corpus {
    let doc = vec![vec![5, 0, 0], vec![5, 0, 0], vec![0, 5, 0], vec![0, 5, 0]];
    Corpus::from_rows(3, &[doc.clone(), doc]).unwrap()
}

/// Documents of different lengths.
fn uneven_documents() -> Corpus {
    Corpus::from_rows(2, &[vec![vec![1, 0], vec![0, 1], vec![0, 1]], vec![vec![1, 0]]]).unwrap()
}

fn synthetic(seed: u64) -> SyntheticCorpus {
    SyntheticCorpus::generate(&SyntheticConfig {
        n_docs: 3,
        doc_len: 8,
        vocab_size: 6,
        n_topics: 4,
        seed: Some(seed),
        ..SyntheticConfig::default()
    })
    .unwrap()
}

#[test]
fn test_identical_documents_share_boundaries() {
    let corpus = identical_documents();
    let dp = DpSegmentor::new(&config(0.1), 3).unwrap().segment(&corpus).unwrap();
    let greedy = GreedySegmentor::new(&config(0.1), 3).unwrap().segment(&corpus).unwrap();

    for result in [&dp, &greedy] {
        assert_eq!(result.boundaries, vec![vec![0, 1, 0, 0], vec![0, 1, 0, 0]]);
        assert!((result.log_likelihood - (-3.5061)).abs() < 1e-3);
        // Both documents are tracked by the same two topics.
        assert_eq!(result.segmentation.len(), 2);
    }
}

#[test]
fn test_uneven_documents() {
    let corpus = uneven_documents();
    let dp = DpSegmentor::new(&config(0.5), 2).unwrap().segment(&corpus).unwrap();
    let greedy = GreedySegmentor::new(&config(0.5), 2).unwrap().segment(&corpus).unwrap();
    let lm = LanguageModelDp::new(&config(0.5), 2).unwrap().segment(&corpus).unwrap();

    for result in [&dp, &greedy, &lm] {
        assert_eq!(result.boundaries, vec![vec![1, 0, 0], vec![0]]);
    }
    assert!((dp.log_likelihood - (-1.96166)).abs() < 1e-4);
    assert!((greedy.log_likelihood - dp.log_likelihood).abs() < 1e-9);
    assert!((lm.log_likelihood - (-2.36712)).abs() < 1e-4);
}

#[test]
fn test_synthetic_corpus_roundtrip_and_segment() {
    let generated = synthetic(11);
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.json");
    generated.corpus.save(&path).unwrap();

    let corpus = Corpus::load(&path).unwrap();
    assert_eq!(corpus, generated.corpus);
    assert_eq!(corpus.document_count(), 3);

    let segmentor = GreedySegmentor::new(&config(0.6), corpus.vocab_size()).unwrap();
    let result = segmentor.segment(&corpus).unwrap();
    assert_eq!(result.boundaries.len(), 3);
    for (doc, rho) in result.boundaries.iter().enumerate() {
        assert_eq!(rho.len(), corpus.document_length(doc));
        assert_eq!(rho.last(), Some(&0));
    }

    let scores = window_diff_per_document(&result, &corpus).unwrap();
    for score in scores {
        let wd = score.unwrap();
        assert!((0.0..=1.0).contains(&wd));
    }
}

#[test]
fn test_single_documents_agree_across_engines() {
    let corpus = synthetic(5).corpus;
    for single in corpus.single_documents() {
        let vocab = single.vocab_size();
        let dp = DpSegmentor::new(&config(0.6), vocab).unwrap().segment(&single).unwrap();
        let lm = LanguageModelDp::new(&config(0.6), vocab).unwrap().segment(&single).unwrap();
        assert!((dp.log_likelihood - lm.log_likelihood).abs() < 1e-9);
    }
}

#[test]
fn test_config_file_drives_segmentation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = Config {
        segmentation: SegmentationConfig {
            beta: BetaPrior::Vector(vec![0.1, 0.1, 0.1]),
            max_cache: 4,
            max_topics: Some(1),
            ..SegmentationConfig::default()
        },
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.segmentation.max_cache, 4);
    assert_eq!(loaded.segmentation.beta, BetaPrior::Vector(vec![0.1, 0.1, 0.1]));

    let result = GreedySegmentor::new(&loaded.segmentation, 3)
        .unwrap()
        .segment(&identical_documents())
        .unwrap();
    assert_eq!(result.segmentation.len(), 1);
    assert_eq!(result.all_boundaries(), vec![0; 8]);
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"segmentation": {"beta": 0.3, "run_parallel": true}}"#).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.segmentation.beta, BetaPrior::Symmetric(0.3));
    assert!(loaded.segmentation.run_parallel);
    assert_eq!(loaded.segmentation.max_cache, 50);
    assert_eq!(loaded.synthetic.n_docs, 3);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"segmentation": {"max_cache": 0}}"#).unwrap();
    assert!(matches!(Config::from_file(&path), Err(TopicTrackError::Config(_))));

    assert!(matches!(
        Config::from_file(dir.path().join("missing.json")),
        Err(TopicTrackError::FileNotFound(_))
    ));
    assert!(matches!(
        Corpus::load(dir.path().join("missing.json")),
        Err(TopicTrackError::FileNotFound(_))
    ));
}

#[test]
fn test_trace_file() {
    let corpus = uneven_documents();
    let greedy = GreedySegmentor::new(&config(0.5), 2).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.txt");
    let mut sink = WriterSink::new(fs::File::create(&path).unwrap());
    greedy.segment_with_trace(&corpus, &mut sink).unwrap();
    drop(sink);

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("===============").count(), 3);
    assert!(text.starts_with("(0)\t0\tll: "));
}

#[test]
fn test_log_sink_leaves_result_unchanged() {
    let corpus = identical_documents();
    let dp = DpSegmentor::new(&config(0.1), 3).unwrap();
    let logged = dp.segment_with_trace(&corpus, &mut LogSink).unwrap();
    let plain = dp.segment(&corpus).unwrap();
    assert_eq!(logged.boundaries, plain.boundaries);
    assert_eq!(logged.log_likelihood, plain.log_likelihood);
}

#[test]
fn test_memory_trace_ends_with_result() {
    let corpus = identical_documents();
    let greedy = GreedySegmentor::new(&config(0.1), 3).unwrap();
    let mut sink = MemorySink::new();
    let result = greedy.segment_with_trace(&corpus, &mut sink).unwrap();

    let last = sink.steps_at(3).next().unwrap();
    assert_eq!(last.rank, 0);
    assert_eq!(last.log_likelihood, result.log_likelihood);
    assert_eq!(last.boundaries, result.boundaries);
}

#[test]
fn test_ditto_copies_document() {
    let generated = synthetic(3);
    let doc = &generated.corpus.documents()[0];
    let copies = SyntheticCorpus::ditto(doc, 6, 3).unwrap();
    assert_eq!(copies.document_count(), 3);
    for copy in copies.documents() {
        assert_eq!(copy.word_counts(), doc.word_counts());
    }
}

#[test]
fn test_dp_rejects_too_many_documents() {
    let rows = vec![vec![1u32]];
    let docs: Vec<Vec<Vec<u32>>> = (0..topictrack::segmentation::MAX_DP_DOCUMENTS + 1)
        .map(|_| rows.clone())
        .collect();
    let corpus = Corpus::from_rows(1, &docs).unwrap();
    let dp = DpSegmentor::new(&config(0.5), 1).unwrap();
    assert!(matches!(dp.segment(&corpus), Err(TopicTrackError::Config(_))));
}
