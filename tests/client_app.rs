use std::{fs, num::NonZeroUsize, path::PathBuf};

use our_federation::{
    Client, ClientErr, Context, LocalSession, NodeConfig, RunConfig, app,
    client::RoundConfig,
    data::{DatasetSource, load_data},
    model::{get_model_params, set_model_params},
};

fn context(partition_id: usize, num_partitions: usize, dataset: DatasetSource) -> Context {
    Context::new(
        NodeConfig {
            partition_id,
            num_partitions: NonZeroUsize::new(num_partitions).unwrap(),
            dataset,
        },
        RunConfig {
            n_estimators: NonZeroUsize::new(10).unwrap(),
            max_depth: None,
            seed: Some(5),
        },
    )
    .unwrap()
}

fn temp_csv(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("our-federation-{}-{name}", std::process::id()));
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn partition_zero_of_three_sets_up() {
    let ctx = Context::from_json(
        r#"{
            "node_config": { "partition-id": 0, "num-partitions": 3 },
            "run_config": { "n_estimators": 10 }
        }"#,
    )
    .unwrap();

    let client = app().build(&ctx).unwrap();
    assert_eq!(client.partition_id(), 0);
    assert_eq!(client.model().n_estimators(), 10);
}

#[test]
fn shipped_context_file_loads() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/partition-0.json");
    let ctx = Context::from_file(path).unwrap();
    assert_eq!(ctx.node_config.partition_id, 0);
    assert_eq!(ctx.run_config.seed, Some(7));
}

#[test]
fn loading_is_deterministic_per_partition() {
    let source = DatasetSource::default();
    for id in 0..3 {
        assert_eq!(
            load_data(&source, id, 3, 0.1).unwrap(),
            load_data(&source, id, 3, 0.1).unwrap()
        );
    }
}

#[test]
fn fit_uses_the_whole_training_split() {
    for id in 0..3 {
        let mut client = app().build(&context(id, 3, DatasetSource::default())).unwrap();
        let config = RoundConfig::new();
        let params = client.get_parameters(&config).unwrap();

        let res = client.fit(&params, &config).unwrap();
        assert_eq!(res.num_examples, client.train_len());
    }
}

#[test]
fn accuracy_is_always_reported_in_unit_range() {
    let client = app().build(&context(1, 3, DatasetSource::default())).unwrap();
    let reports = LocalSession::new(client).run(2).unwrap();

    for report in reports {
        let accuracy = report.accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
        assert!(report.loss.is_finite());
    }
}

#[test]
fn fresh_params_evaluate_to_a_finite_loss() {
    let mut client = app().build(&context(0, 3, DatasetSource::default())).unwrap();
    let config = RoundConfig::new();
    let params = client.get_parameters(&config).unwrap();

    let res = client.evaluate(&params, &config).unwrap();
    assert!(res.loss.is_finite());
    let accuracy = res.metrics["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn parameter_round_trip_keeps_predictions() {
    let mut client = app().build(&context(2, 3, DatasetSource::default())).unwrap();
    let config = RoundConfig::new();
    let initial = client.get_parameters(&config).unwrap();
    client.fit(&initial, &config).unwrap();

    let mut model = client.model().clone();
    let splits = load_data(&DatasetSource::default(), 2, 3, 0.1).unwrap();
    let before = model.predict(splits.x_test.view()).unwrap();

    let params = get_model_params(&model).unwrap();
    set_model_params(&mut model, &params).unwrap();
    assert_eq!(model.predict(splits.x_test.view()).unwrap(), before);
}

#[test]
fn clients_of_one_run_exchange_parameters() {
    let config = RoundConfig::new();
    let mut a = app().build(&context(0, 2, DatasetSource::default())).unwrap();
    let mut b = app().build(&context(1, 2, DatasetSource::default())).unwrap();

    let initial = a.get_parameters(&config).unwrap();
    let from_a = a.fit(&initial, &config).unwrap();

    let res = b.evaluate(&from_a.parameters, &config).unwrap();
    assert_eq!(res.num_examples, b.test_len());
}

#[test]
fn csv_partitions_feed_the_client() {
    let mut body = String::from("x,label\n");
    for i in 0..40 {
        let label = i % 2;
        let offset = if label == 0 { -3.0 } else { 3.0 };
        body.push_str(&format!("{},{label}\n", offset + (i % 5) as f32 * 0.1));
    }
    let path = temp_csv("two-class.csv", &body);

    let mut client = app()
        .build(&context(0, 2, DatasetSource::Csv { path: path.clone() }))
        .unwrap();
    let config = RoundConfig::new();
    let params = client.get_parameters(&config).unwrap();
    let fitted = client.fit(&params, &config).unwrap();
    let res = client.evaluate(&fitted.parameters, &config).unwrap();

    assert_eq!(res.metrics["accuracy"].as_f64(), Some(1.0));
    fs::remove_file(path).unwrap();
}

#[test]
fn non_finite_csv_features_fail_setup() {
    let mut body = String::from("x,label\n");
    for i in 0..40 {
        let value = if i % 4 == 0 { "-inf".to_string() } else { i.to_string() };
        body.push_str(&format!("{value},{}\n", i % 2));
    }
    let path = temp_csv("neg-inf.csv", &body);

    let res = app().build(&context(0, 2, DatasetSource::Csv { path: path.clone() }));
    assert!(matches!(res, Err(ClientErr::Dataset(_))));
    fs::remove_file(path).unwrap();
}

#[test]
fn missing_csv_propagates_io_error() {
    let ctx = context(
        0,
        1,
        DatasetSource::Csv {
            path: "/nonexistent/our-federation.csv".into(),
        },
    );

    assert!(matches!(app().build(&ctx), Err(ClientErr::Io(_))));
}
