pub mod baselines;
pub mod evaluation;
pub mod feature_selector;
pub mod forest_predictor;
pub mod onnx_predictor;
pub mod predictor;
pub mod reconstructor;
pub mod scaler;
pub mod windower;
