#![cfg(feature = "train")]

use std::fs;

use webcompat_ml::{
    encode, ArtifactPaths, EncoderStore, OutputFormat, Pipeline, PipelineKind, Record,
    TrainConfig, WebcompatError,
};

const ISSUES_CSV: &str = "\
title,body,labels,invalid
Video freezes,Playback stops after three seconds,browser-firefox,yes
Login button broken,Clicking the login button does nothing,browser-chrome,no
Video stutters,Playback freezes on fullscreen,browser-firefox,yes
Menu broken,The menu does not open when clicking,browser-chrome,no
";

fn labelled_records() -> Vec<Record> {
    vec![
        Record::new(
            "Video freezes",
            "Playback stops after three seconds",
            "browser-firefox",
            Some("yes"),
        ),
        Record::new(
            "Login button broken",
            "Clicking the login button does nothing",
            "browser-chrome",
            Some("no"),
        ),
        Record::new(
            "Video stutters",
            "Playback freezes on fullscreen",
            "browser-firefox",
            Some("yes"),
        ),
        Record::new(
            "Menu broken",
            "The menu does not open when clicking",
            "browser-chrome",
            Some("no"),
        ),
    ]
}

fn small_config() -> TrainConfig {
    TrainConfig {
        split_ratio: 0.5,
        seed: 1,
        ..TrainConfig::default()
    }
}

#[test]
fn test_train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let records = labelled_records();

    let encoders = pipeline.build_encoders(&records, 10000).unwrap();
    let output = pipeline
        .model_train(&records, &encoders, &small_config())
        .unwrap();
    assert_eq!(2, output.split.train.len());
    assert_eq!(2, output.split.eval.len());
    assert!(pipeline.model_path().exists());

    let predictions = pipeline.model_predict(&records).unwrap();
    assert_eq!(4, predictions.len());
    for prediction in &predictions {
        assert!(prediction.label == "yes" || prediction.label == "no");
        assert!((0.0..=1.0).contains(&prediction.probability));
    }
}

#[test]
fn test_single_letter_rows() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let records = vec![
        Record::new("a", "b", "c", Some("yes")),
        Record::new("d", "e", "f", Some("no")),
        Record::new("g", "h", "i", Some("yes")),
        Record::new("j", "k", "l", Some("no")),
    ];

    let encoders = pipeline.build_encoders(&records, 10000).unwrap();
    pipeline
        .model_train(&records, &encoders, &small_config())
        .unwrap();
    let predictions = pipeline.model_predict(&records).unwrap();
    assert_eq!(4, predictions.len());
    assert!(predictions
        .iter()
        .all(|p| p.label == "yes" || p.label == "no"));
}

#[test]
fn test_predict_without_encoders() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::NeedsDiagnosis, ArtifactPaths::new(dir.path()));
    let records = vec![Record::new("Video freezes", "Stops", "", None)];
    assert!(matches!(
        pipeline.model_predict(&records),
        Err(WebcompatError::EncoderNotFound { .. })
    ));
}

#[test]
fn test_predict_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    pipeline.build_encoders(&labelled_records(), 10000).unwrap();
    assert!(matches!(
        pipeline.model_predict(&labelled_records()),
        Err(WebcompatError::ModelNotFound { .. })
    ));
}

#[test]
fn test_stored_encoders_match_fitted() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let records = labelled_records();

    let fitted = pipeline.build_encoders(&records, 10000).unwrap();
    let loaded = pipeline.load_encoders().unwrap();
    assert_eq!(fitted, loaded);

    let a = encode(&records, &fitted).unwrap();
    let b = encode(&records, &loaded).unwrap();
    assert_eq!(a, b);
    assert_eq!(fitted.n_features(), a.n_features());
}

#[test]
fn test_rebuild_encoders_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let records = labelled_records();

    pipeline.build_encoders(&records, 10000).unwrap();
    let small = pipeline.build_encoders(&records[..2], 10000).unwrap();
    assert_eq!(small, pipeline.load_encoders().unwrap());
}

#[test]
fn test_unseen_tokens_encode_to_empty_rows() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let encoders = pipeline.build_encoders(&labelled_records(), 10000).unwrap();

    let unseen = vec![Record::new("Zyxwv", "Qwrtp", "", None)];
    let features = encode(&unseen, &encoders).unwrap();
    assert_eq!(1, features.n_rows());
    assert!(features.row(0).is_empty());
}

#[test]
fn test_train_and_predict_files() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("issues.csv");
    fs::write(
        &data,
        "\
title,body,labels,needsdiagnosis
Video freezes,Playback stops after three seconds,browser-firefox,true
Login button broken,Clicking the login button does nothing,browser-chrome,false
Video stutters,Playback freezes on fullscreen,browser-firefox,true
Menu broken,The menu does not open when clicking,browser-chrome,false
",
    )
    .unwrap();

    let pipeline = Pipeline::new(
        PipelineKind::NeedsDiagnosis,
        ArtifactPaths::new(dir.path().join("artifacts")),
    );
    pipeline.train(&data, &small_config()).unwrap();

    let out_dir = dir.path().join("out");
    let path = pipeline.predict(&data, OutputFormat::Csv, &out_dir).unwrap();
    let written = fs::read_to_string(path).unwrap();
    let mut lines = written.lines();
    assert_eq!(Some("label,probability"), lines.next());
    assert_eq!(4, lines.count());

    let path = pipeline
        .predict(&data, OutputFormat::Json, &out_dir)
        .unwrap();
    assert!(path.extension().map_or(false, |ext| ext == "json"));
}

#[test]
fn test_train_missing_target_column() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("issues.csv");
    fs::write(&data, "title,body,labels\nVideo freezes,Stops,\n").unwrap();

    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    assert!(matches!(
        pipeline.train(&data, &small_config()),
        Err(WebcompatError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_failed_retrain_keeps_previous_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("issues.csv");
    fs::write(&data, ISSUES_CSV).unwrap();
    let pipeline = Pipeline::new(
        PipelineKind::Invalid,
        ArtifactPaths::new(dir.path().join("artifacts")),
    );
    pipeline.train(&data, &small_config()).unwrap();
    let encoders = pipeline.load_encoders().unwrap();
    let records = labelled_records();
    let before = pipeline.model_predict(&records).unwrap();

    // One row per class cannot fill both partitions.
    let retrain = dir.path().join("retrain.csv");
    fs::write(
        &retrain,
        "title,body,labels,invalid\nPopup blocked,Ads cover page,type-ads,yes\nFont tiny,Text unreadable,type-css,no\n",
    )
    .unwrap();
    assert!(matches!(
        pipeline.train(&retrain, &small_config()),
        Err(WebcompatError::InsufficientData { .. })
    ));

    assert_eq!(encoders, pipeline.load_encoders().unwrap());
    assert_eq!(before, pipeline.model_predict(&records).unwrap());
}

#[test]
fn test_rebuilt_encoders_drop_stale_model() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    let records = labelled_records();
    let encoders = pipeline.build_encoders(&records, 10000).unwrap();
    pipeline
        .model_train(&records, &encoders, &small_config())
        .unwrap();

    pipeline.build_encoders(&records[..2], 10000).unwrap();
    assert!(!pipeline.model_path().exists());
    assert!(matches!(
        pipeline.model_predict(&records),
        Err(WebcompatError::ModelNotFound { .. })
    ));
}

#[test]
fn test_model_rejects_encoders_of_equal_width() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    let pipeline = Pipeline::new(PipelineKind::Invalid, paths.clone());
    let first = vec![
        Record::new("alpha", "bravo", "charlie", Some("yes")),
        Record::new("delta", "echo", "foxtrot", Some("no")),
        Record::new("golf", "hotel", "india", Some("yes")),
        Record::new("juliet", "kilo", "lima", Some("no")),
    ];
    let second = vec![
        Record::new("mike", "november", "oscar", Some("yes")),
        Record::new("papa", "quebec", "romeo", Some("no")),
        Record::new("sierra", "tango", "uniform", Some("yes")),
        Record::new("victor", "whiskey", "xray", Some("no")),
    ];
    let encoders = pipeline.build_encoders(&first, 10000).unwrap();
    pipeline
        .model_train(&first, &encoders, &small_config())
        .unwrap();

    // Writing encoders through the store leaves the model in place.
    let store = EncoderStore::new(paths, PipelineKind::Invalid);
    let replaced = store.build_encoders(&second, 10000).unwrap();
    assert_eq!(encoders.n_features(), replaced.n_features());
    assert!(pipeline.model_path().exists());
    assert!(matches!(
        pipeline.model_predict(&first),
        Err(WebcompatError::EncoderMismatch)
    ));
}

#[test]
fn test_predict_missing_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("issues.csv");
    fs::write(&data, ISSUES_CSV).unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    pipeline.train(&data, &small_config()).unwrap();

    let missing = dir.path().join("new_issues.csv");
    let err = pipeline
        .predict(&missing, OutputFormat::Csv, dir.path())
        .unwrap_err();
    assert!(matches!(err, WebcompatError::FileIOError { .. }));
    assert!(err.to_string().contains("new_issues.csv"));
}

#[test]
fn test_predict_requires_target_column() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("issues.csv");
    fs::write(&data, ISSUES_CSV).unwrap();
    let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new(dir.path()));
    pipeline.train(&data, &small_config()).unwrap();

    let unlabelled = dir.path().join("unlabelled.csv");
    fs::write(&unlabelled, "title,body,labels,invalid\nVideo freezes,Playback stops,,\n").unwrap();
    let path = pipeline
        .predict(&unlabelled, OutputFormat::Json, dir.path())
        .unwrap();
    assert!(path.is_file());

    fs::write(&unlabelled, "title,body,labels\nVideo freezes,Playback stops,\n").unwrap();
    assert!(matches!(
        pipeline.predict(&unlabelled, OutputFormat::Json, dir.path()),
        Err(WebcompatError::SchemaMismatch { .. })
    ));
}
