use log::{debug, info};
use ndarray::{Array1, Array2, ArrayD};

use super::{Client, EvaluateRes, FitRes, Metrics, RoundConfig, Scalar};
use crate::{
    config::{Context, NodeConfig, RunConfig},
    data::{Splits, load_data},
    error::Result,
    metrics,
    model::{ForestClassifier, Parameters, get_model_params, set_initial_params, set_model_params},
};

/// Fraction of every partition held out for evaluation.
pub const HOLDOUT: f64 = 0.1;

/// Client adapter owning a forest and the local splits for one session.
#[derive(Debug)]
pub struct ForestClient {
    partition_id: usize,
    model: ForestClassifier,
    x_train: Array2<f32>,
    x_test: Array2<f32>,
    y_train: Array1<i64>,
    y_test: Array1<i64>,
}

impl ForestClient {
    /// Creates a new `ForestClient`.
    ///
    /// # Arguments
    /// * `partition_id` - The partition this client owns, for observability.
    /// * `model` - A forest whose parameters are already initialized.
    /// * `splits` - The local train/test splits.
    pub fn new(partition_id: usize, model: ForestClassifier, splits: Splits) -> Self {
        let Splits {
            x_train,
            x_test,
            y_train,
            y_test,
            ..
        } = splits;

        Self {
            partition_id,
            model,
            x_train,
            x_test,
            y_train,
            y_test,
        }
    }

    #[inline]
    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    #[inline]
    pub fn model(&self) -> &ForestClassifier {
        &self.model
    }

    #[inline]
    pub fn train_len(&self) -> usize {
        self.x_train.nrows()
    }

    #[inline]
    pub fn test_len(&self) -> usize {
        self.x_test.nrows()
    }
}

impl Client for ForestClient {
    fn get_parameters(&mut self, _config: &RoundConfig) -> Result<Parameters> {
        get_model_params(&self.model)
    }

    fn fit(&mut self, parameters: &[ArrayD<f32>], _config: &RoundConfig) -> Result<FitRes> {
        set_model_params(&mut self.model, parameters)?;
        self.model.fit(self.x_train.view(), self.y_train.view())?;

        debug!(partition_id = self.partition_id, examples = self.train_len(); "local fit done");

        Ok(FitRes {
            parameters: get_model_params(&self.model)?,
            num_examples: self.train_len(),
            metrics: Metrics::new(),
        })
    }

    fn evaluate(
        &mut self,
        parameters: &[ArrayD<f32>],
        _config: &RoundConfig,
    ) -> Result<EvaluateRes> {
        set_model_params(&mut self.model, parameters)?;

        // Log-loss columns are the model's label space; a test label outside
        // of it fails here instead of shifting the columns.
        let y_idx = self.model.encode_labels(self.y_test.view())?;
        let proba = self.model.predict_proba(self.x_test.view())?;
        let loss = metrics::log_loss(&y_idx, proba.view());
        let accuracy = self.model.score(self.x_test.view(), self.y_test.view())?;

        debug!(
            partition_id = self.partition_id,
            loss = loss,
            accuracy = accuracy;
            "local evaluation done"
        );

        let mut metrics = Metrics::new();
        metrics.insert("accuracy".into(), Scalar::from(accuracy));

        Ok(EvaluateRes {
            loss,
            num_examples: self.test_len(),
            metrics,
        })
    }
}

/// Builds the client of the node described by `context`: loads its partition
/// with a `HOLDOUT` test split, creates the forest from the run configuration
/// and initializes its parameters.
///
/// # Errors
/// Propagates data loading and model construction failures unmodified.
pub fn client_fn(context: &Context) -> Result<ForestClient> {
    let NodeConfig {
        partition_id,
        num_partitions,
        ref dataset,
    } = context.node_config;
    let RunConfig {
        n_estimators,
        max_depth,
        seed,
    } = context.run_config;

    let splits = load_data(dataset, partition_id, num_partitions.get(), HOLDOUT)?;

    let mut model = ForestClassifier::new(n_estimators, max_depth, seed)?;
    set_initial_params(&mut model, &splits.classes, splits.n_features())?;

    info!(partition_id = partition_id; "Client {partition_id} is setup.");
    Ok(ForestClient::new(partition_id, model, splits))
}
