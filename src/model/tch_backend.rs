use std::{path::Path, sync::Arc};

use ndarray::Array4;
use parking_lot::Mutex;
use tch::{Device, Kind, Tensor, no_grad};

use crate::{
    config::{AppConfig, TensorLayout},
    error::ServiceError,
    model::{ArtifactLoader, Classifier},
};

/// Loads TorchScript modules exported from the trained classifiers.
pub struct TorchScriptLoader {
    device: Device,
    layout: TensorLayout,
}

impl TorchScriptLoader {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            device: config.device,
            layout: config.tensor_layout,
        }
    }
}

impl ArtifactLoader for TorchScriptLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Classifier>, ServiceError> {
        let model = TorchScriptClassifier::new(path, self.device, self.layout)?;
        Ok(Arc::new(model))
    }
}

pub struct TorchScriptClassifier {
    device: Device,
    layout: TensorLayout,
    module: Mutex<tch::CModule>,
}

impl TorchScriptClassifier {
    pub fn new(
        module_path: &Path,
        device: Device,
        layout: TensorLayout,
    ) -> Result<Self, ServiceError> {
        let mut module = tch::CModule::load_on_device(module_path, device).map_err(|e| {
            ServiceError::ModelLoad(format!("{}: {e}", module_path.display()))
        })?;
        module.set_eval();

        Ok(Self {
            device,
            layout,
            module: Mutex::new(module),
        })
    }

    fn to_tensor(&self, batch: &Array4<f32>) -> Result<Tensor, ServiceError> {
        let (n, h, w, c) = batch.dim();
        let data = batch
            .as_slice()
            .ok_or_else(|| ServiceError::Inference("input batch is not contiguous".into()))?;

        let input = Tensor::from_slice(data).reshape([n as i64, h as i64, w as i64, c as i64]);
        let input = match self.layout {
            TensorLayout::Nhwc => input,
            TensorLayout::Nchw => input.permute([0i64, 3, 1, 2]).contiguous(),
        };
        Ok(input.to(self.device))
    }
}

impl Classifier for TorchScriptClassifier {
    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>, ServiceError> {
        let input = self.to_tensor(batch)?;

        no_grad(|| {
            let module = self.module.lock();
            let output = module
                .forward_ts(&[input])
                .map_err(|e| ServiceError::Inference(e.to_string()))?;

            // [1, classes] -> [classes]
            let scores = output
                .to_device(Device::Cpu)
                .to_kind(Kind::Float)
                .flatten(0, -1);
            Vec::<f32>::try_from(&scores).map_err(|e| ServiceError::Inference(e.to_string()))
        })
    }
}
