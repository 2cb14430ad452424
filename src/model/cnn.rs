//! CNN Model Architecture for LISA traffic-sign classification
//!
//! Three strided convolutions with ReLU and a linear classifier, sized for
//! 32x32 RGB crops:
//!
//! ```text
//! [B, 3, 32, 32] -conv 8x8/2, pad 3-> [B, 64, 16, 16]
//!                -conv 6x6/2------->  [B, 128, 6, 6]
//!                -conv 5x5/1------->  [B, 128, 2, 2] -flatten-> [B, 512] -fc-> [B, n]
//! ```

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Initializer, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Flattened feature size after the last convolution
const FEATURES: usize = 128 * 2 * 2;

/// Configuration for the LisaCnn model
#[derive(Config, Debug)]
pub struct LisaCnnConfig {
    /// Number of output classes
    #[config(default = "16")]
    pub num_classes: usize,
}

/// Traffic-sign classifier
#[derive(Module, Debug)]
pub struct LisaCnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub fc: Linear<B>,
    relu: Relu,
}

impl LisaCnnConfig {
    /// Initialize the model with Xavier-uniform convolution weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> LisaCnn<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };

        let conv1 = Conv2dConfig::new([3, 64], [8, 8])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_initializer(xavier.clone())
            .init(device);
        let conv2 = Conv2dConfig::new([64, 128], [6, 6])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Valid)
            .with_initializer(xavier.clone())
            .init(device);
        let conv3 = Conv2dConfig::new([128, 128], [5, 5])
            .with_padding(PaddingConfig2d::Valid)
            .with_initializer(xavier)
            .init(device);

        LisaCnn {
            conv1,
            conv2,
            conv3,
            fc: LinearConfig::new(FEATURES, self.num_classes).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> LisaCnn<B> {
    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, 32, 32]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.conv1.forward(x));
        let x = self.relu.forward(self.conv2.forward(x));
        let x = self.relu.forward(self.conv3.forward(x));

        let [batch_size, _, _, _] = x.dims();
        let x = x.reshape([batch_size, FEATURES]);

        self.fc.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }
}
