use std::{error::Error, fmt, io};

/// The client module's result type.
pub type Result<T> = std::result::Result<T, ClientErr>;

/// Failures raised while setting up or driving a federated client.
#[derive(Debug)]
pub enum ClientErr {
    Io(io::Error),
    Config(String),
    Json(serde_json::Error),
    Shape(ndarray::ShapeError),
    Dataset(String),
    InvalidPartition {
        partition_id: usize,
        num_partitions: usize,
    },
    InvalidHoldout(f64),
    ParamsCountMismatch {
        got: usize,
        expected: usize,
    },
    ParamsShapeMismatch {
        index: usize,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    InvalidParameter {
        index: usize,
        detail: String,
    },
    LabelSpaceMismatch {
        label: i64,
    },
    Uninitialized,
}

impl fmt::Display for ClientErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErr::Io(e) => write!(f, "io error: {e}"),
            ClientErr::Config(msg) => write!(f, "invalid config: {msg}"),
            ClientErr::Json(e) => write!(f, "invalid json: {e}"),
            ClientErr::Shape(e) => write!(f, "array shape error: {e}"),
            ClientErr::Dataset(msg) => write!(f, "dataset error: {msg}"),
            ClientErr::InvalidPartition {
                partition_id,
                num_partitions,
            } => write!(
                f,
                "partition {partition_id} is out of range for {num_partitions} partition(s)"
            ),
            ClientErr::InvalidHoldout(holdout) => {
                write!(f, "holdout fraction must lie in (0, 1), got {holdout}")
            }
            ClientErr::ParamsCountMismatch { got, expected } => write!(
                f,
                "parameter count mismatch: got {got} arrays, expected {expected}"
            ),
            ClientErr::ParamsShapeMismatch {
                index,
                got,
                expected,
            } => write!(
                f,
                "parameter {index} shape mismatch: got {got:?}, expected {expected:?}"
            ),
            ClientErr::InvalidParameter { index, detail } => {
                write!(f, "parameter {index} is invalid: {detail}")
            }
            ClientErr::LabelSpaceMismatch { label } => write!(
                f,
                "label {label} is not part of the label space the model was initialized with"
            ),
            ClientErr::Uninitialized => {
                write!(f, "model parameters were used before set_initial_params")
            }
        }
    }
}

impl Error for ClientErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientErr::Io(e) => Some(e),
            ClientErr::Json(e) => Some(e),
            ClientErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ClientErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ndarray::ShapeError> for ClientErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Shape(value)
    }
}
